use clap::Parser;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    /// Overrides the agent stored in the session file.
    pub agent_id: Option<i64>,
    pub session_path: String,
    /// Sent as a bearer token when set. Read from file or environment only.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    /// IANA name; the machine's local time is used when unset.
    pub timezone: Option<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api/".to_string(),
            agent_id: None,
            session_path: crate::local_state::default_state_path().to_string(),
            api_token: None,
            timeout_secs: 15,
            timezone: None,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "review_agent", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000/api/).
    #[arg(long)]
    base_url: Option<String>,
    /// Review as this agent and remember it in the session file.
    #[arg(long)]
    agent_id: Option<i64>,
    /// Override the session file path.
    #[arg(long)]
    session_path: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

pub fn load() -> Result<AppConfig> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("REVIEW_AGENT"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(agent_id) = args.agent_id {
        settings.agent_id = Some(agent_id);
    }
    if let Some(session_path) = args.session_path {
        settings.session_path = session_path;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = Some(timezone);
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }

    Ok(settings)
}
