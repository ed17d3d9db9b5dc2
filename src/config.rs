use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BUSY_DELAY_MS: u64 = 300;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Workspace to open before the first request, if any.
    pub workspace: Option<PathBuf>,
    /// How long the loading indicator stays on after marking attendance.
    pub busy_delay: Duration,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            workspace: None,
            busy_delay: Duration::from_millis(DEFAULT_BUSY_DELAY_MS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `ATTENDD_*` variables; a `.env` file is loaded first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = AppConfig::default();

        if let Some(ws) = lookup("ATTENDD_WORKSPACE") {
            let ws = ws.trim();
            if !ws.is_empty() {
                cfg.workspace = Some(PathBuf::from(ws));
            }
        }

        if let Some(raw) = lookup("ATTENDD_BUSY_DELAY_MS") {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("ATTENDD_BUSY_DELAY_MS must be an integer, got {raw:?}"))?;
            cfg.busy_delay = Duration::from_millis(ms);
        }

        if let Some(filter) = lookup("ATTENDD_LOG") {
            if !filter.trim().is_empty() {
                cfg.log_filter = filter.trim().to_string();
            }
        }

        Ok(cfg)
    }
}
