//! Environment overrides
//!
//! Deployments configure credentials and per-worker limits through the
//! environment. Each recognised variable replaces the matching file value.

use crate::config::types::Config;
use crate::ConfigError;
use std::str::FromStr;

/// Applies environment overrides to a parsed configuration
///
/// `lookup` returns the value of a variable, or `None` when unset. Passing the
/// lookup in keeps this testable without touching the process environment.
///
/// | Variable | Field |
/// |----------|-------|
/// | `RIOT_API_KEY` | `api.key` |
/// | `PATCH_TAG` | `crawler.patch-tag` |
/// | `DEFAULT_QUEUE` | `crawler.queue-id` |
/// | `RATE_LIMIT_PER_SEC` | `rate-limit.per-second` |
/// | `RATE_LIMIT_PER_2MIN` | `rate-limit.per-two-minutes` |
/// | `LEDGER_PATH` | `ledger.database-path` |
/// | `STORAGE_ROOT` | `storage.root` |
/// | `WORKER_POLL_SECONDS` | `crawler.poll-interval-secs` |
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("RIOT_API_KEY") {
        config.api.key = key;
    }
    if let Some(tag) = lookup("PATCH_TAG") {
        config.crawler.patch_tag = tag;
    }
    if let Some(path) = lookup("LEDGER_PATH") {
        config.ledger.database_path = path;
    }
    if let Some(root) = lookup("STORAGE_ROOT") {
        config.storage.root = root;
    }

    if let Some(v) = parse_var(&lookup, "DEFAULT_QUEUE")? {
        config.crawler.queue_id = v;
    }
    if let Some(v) = parse_var(&lookup, "RATE_LIMIT_PER_SEC")? {
        config.rate_limit.per_second = v;
    }
    if let Some(v) = parse_var(&lookup, "RATE_LIMIT_PER_2MIN")? {
        config.rate_limit.per_two_minutes = v;
    }
    if let Some(v) = parse_var(&lookup, "WORKER_POLL_SECONDS")? {
        config.crawler.poll_interval_secs = v;
    }

    Ok(())
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_config() -> Config {
        toml::from_str(
            r#"
[api]
key = "from-file"
[ledger]
database-path = "./ledger.db"
[storage]
root = "./blobs"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("RIOT_API_KEY", "RGAPI-env"),
            ("PATCH_TAG", "14.21"),
            ("RATE_LIMIT_PER_SEC", "4"),
            ("RATE_LIMIT_PER_2MIN", " 40 "),
            ("LEDGER_PATH", "/var/lib/crawler/ledger.db"),
        ]
        .into_iter()
        .collect();

        let mut config = base_config();
        apply_env_overrides(&mut config, |n| vars.get(n).map(|v| v.to_string())).unwrap();

        assert_eq!(config.api.key, "RGAPI-env");
        assert_eq!(config.crawler.patch_tag, "14.21");
        assert_eq!(config.rate_limit.per_second, 4);
        assert_eq!(config.rate_limit.per_two_minutes, 40);
        assert_eq!(config.ledger.database_path, "/var/lib/crawler/ledger.db");
        assert_eq!(config.storage.root, "./blobs");
    }

    #[test]
    fn test_unset_variables_keep_file_values() {
        let mut config = base_config();
        apply_env_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.api.key, "from-file");
        assert_eq!(config.crawler.queue_id, 420);
    }

    #[test]
    fn test_non_numeric_override_is_rejected() {
        let mut config = base_config();
        let err = apply_env_overrides(&mut config, |n| {
            (n == "DEFAULT_QUEUE").then(|| "solo".to_string())
        })
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == "DEFAULT_QUEUE"));
    }
}
