//! The post-enforcement outcome handed back to the caller.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Success,
    Failure,
    NotEnforced,
}

#[derive(Debug, Clone)]
pub struct EnforcementResult {
    ticket_id: u64,
    status: ResultStatus,
    content: Option<Vec<u8>>,
}

impl EnforcementResult {
    pub fn new(status: ResultStatus) -> Self {
        EnforcementResult {
            ticket_id: 0,
            status,
            content: None,
        }
    }

    pub fn with_content(status: ResultStatus, content: Vec<u8>) -> Self {
        EnforcementResult {
            ticket_id: 0,
            status,
            content: Some(content),
        }
    }

    pub fn set_ticket_id(&mut self, ticket_id: u64) {
        self.ticket_id = ticket_id;
    }

    pub fn ticket_id(&self) -> u64 {
        self.ticket_id
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ResultStatus::Success)
    }
}

impl Default for EnforcementResult {
    fn default() -> Self {
        EnforcementResult::new(ResultStatus::NotEnforced)
    }
}
