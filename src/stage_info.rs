//! Stage identity: the handful of process facts an agent reports to a southbound collaborator.
//! Discovery from environment variables is out of core scope (§6) — callers provide these
//! values directly.

pub struct StageInfo {
    name: String,
    env: Option<String>,
    pid: i32,
    ppid: i32,
    hostname: String,
    login: String,
}

impl StageInfo {
    pub fn new(name: impl Into<String>, env: Option<String>, pid: i32, ppid: i32, hostname: impl Into<String>, login: impl Into<String>) -> Self {
        StageInfo {
            name: name.into(),
            env,
            pid,
            ppid,
            hostname: hostname.into(),
            login: login.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn ppid(&self) -> i32 {
        self.ppid
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn to_string_summary(&self) -> String {
        format!(
            "StageInfo(name={}, pid={}, ppid={}, host={})",
            self.name, self.pid, self.ppid, self.hostname
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_includes_name_and_pid() {
        let info = StageInfo::new("stage-a", None, 123, 1, "host", "user");
        let summary = info.to_string_summary();
        assert!(summary.contains("stage-a"));
        assert!(summary.contains("123"));
    }
}
