use std::path::PathBuf;
use std::sync::Arc;

use git_version::git_version;
use slog::{info, o, Drain};
use structopt::StructOpt;

use stageflow::config;
use stageflow::core::{Agent, Core};
use stageflow::stage_info::StageInfo;

const GIT_VERSION: &str = git_version!(fallback = "unknown");

#[derive(Debug, StructOpt)]
#[structopt(name = "stageflow", about = "Programmable I/O data-plane policy stage.")]
struct Opt {
    /// Path to the stage's YAML configuration file.
    #[structopt(short, long, parse(from_os_str))]
    config: PathBuf,

    /// Raise the log level to debug regardless of what the config file requests.
    #[structopt(short, long)]
    verbose: bool,
}

fn build_logger(level: slog::Level) -> slog::Logger {
    let decorator = slog_term::PlainDecorator::new(std::io::stdout());
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!("version" => GIT_VERSION, "pkg_version" => env!("CARGO_PKG_VERSION")))
}

fn stage_info_from(name: &str, env: Option<String>) -> StageInfo {
    let pid = std::process::id() as i32;
    let hostname = hostname_or_unknown();
    let login = std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_else(|_| "unknown".to_string());
    StageInfo::new(name, env, pid, pid, hostname, login)
}

fn hostname_or_unknown() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    let internal = config::load(&opt.config)?;

    let level = if opt.verbose { slog::Level::Debug } else { internal.log_level };
    let logger = build_logger(level);

    info!(logger, "starting stage";
        "stage_name" => &internal.stage_name,
        "started_at" => chrono::Utc::now().to_rfc3339(),
        "submission_queue_timeout" => humantime::format_duration(internal.core_defaults.submission_queue_timeout).to_string(),
    );

    let core_logger = logger.new(o!("component" => "core"));
    let core = Arc::new(Core::bootstrap_with_defaults(core_logger, internal.create_default_channel, internal.core_defaults));

    let stage_info = stage_info_from(&internal.stage_name, internal.env.clone());
    let agent_logger = logger.new(o!("component" => "agent"));
    let agent = Agent::new(Arc::clone(&core), stage_info, internal.execute_on_receive, agent_logger);

    agent.mark_ready();
    info!(logger, "stage ready"; "stage_name" => agent.get_stage_name().to_string());

    // The control-plane socket transport that would otherwise feed housekeeping/enforcement
    // rules into this agent is out of core scope; this process exists to host the core's
    // channels and worker threads for whatever embeds it.
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}
