// calico-upgrade/src/logging.rs
use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full `EnvFilter` directives when set.
pub const LOG_FILTER_ENV: &str = "CALICO_UPGRADE_LOG";

/// Installs the stderr log subscriber. Operator feedback goes to stdout, so
/// diagnostics never interleave with it on the same stream.
pub fn init_logging(level: &str) -> Result<()> {
    let env_directives = std::env::var(LOG_FILTER_ENV).ok();
    let filter = build_filter(env_directives.as_deref(), level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}

fn build_filter(env_directives: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directives = env_directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directives).with_context(|| format!("Invalid log filter '{}'", directives))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_flag_used_without_env() -> anyhow::Result<()> {
        assert_eq!(build_filter(None, "debug")?.to_string(), "debug");
        Ok(())
    }

    #[test]
    fn test_env_directives_win() -> anyhow::Result<()> {
        let filter = build_filter(Some("calico_upgrade=trace"), "off")?;
        assert_eq!(filter.to_string(), "calico_upgrade=trace");
        Ok(())
    }

    #[test]
    fn test_blank_env_is_ignored() -> anyhow::Result<()> {
        assert_eq!(build_filter(Some("  "), "warn")?.to_string(), "warn");
        Ok(())
    }
}
