use crate::config::types::{ApiConfig, Config, CrawlerConfig, RateLimitConfig, SeedTarget};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage(config)?;
    validate_routing(config)?;
    validate_seed_targets(&config.seed)?;
    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    if !config.base_url.contains("{host}") {
        return Err(ConfigError::Validation(format!(
            "base-url must contain a {{host}} placeholder, got '{}'",
            config.base_url
        )));
    }

    Url::parse(&config.base_url.replace("{host}", "na1"))
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.per_second < 1 {
        return Err(ConfigError::Validation(format!(
            "per-second must be >= 1, got {}",
            config.per_second
        )));
    }

    if config.per_two_minutes < config.per_second {
        return Err(ConfigError::Validation(format!(
            "per-two-minutes ({}) must be >= per-second ({})",
            config.per_two_minutes, config.per_second
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.patch_tag.is_empty() || config.patch_tag.contains('/') {
        return Err(ConfigError::Validation(format!(
            "patch-tag must be non-empty and contain no '/', got '{}'",
            config.patch_tag
        )));
    }

    if config.matches_per_player < 1 || config.matches_per_player > 100 {
        return Err(ConfigError::Validation(format!(
            "matches-per-player must be between 1 and 100, got {}",
            config.matches_per_player
        )));
    }

    if config.backoff_initial_ms == 0 || config.backoff_max_ms < config.backoff_initial_ms {
        return Err(ConfigError::Validation(format!(
            "backoff must satisfy 0 < backoff-initial-ms ({}) <= backoff-max-ms ({})",
            config.backoff_initial_ms, config.backoff_max_ms
        )));
    }

    if config.report_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "report-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.lease_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "lease-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ConfigError> {
    if config.ledger.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.storage.backend != "fs" {
        return Err(ConfigError::Validation(format!(
            "unsupported storage backend '{}' (supported: fs)",
            config.storage.backend
        )));
    }

    if config.storage.root.is_empty() {
        return Err(ConfigError::Validation(
            "storage root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_routing(config: &Config) -> Result<(), ConfigError> {
    for (platform, region) in &config.routing {
        validate_host_label(platform)?;
        validate_host_label(region)?;
    }
    Ok(())
}

fn validate_seed_targets(targets: &[SeedTarget]) -> Result<(), ConfigError> {
    for target in targets {
        validate_host_label(&target.platform)?;

        if target.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "seed target {} {:?}: max-pages must be >= 1",
                target.platform, target.tier
            )));
        }

        if target.max_players == Some(0) {
            return Err(ConfigError::Validation(format!(
                "seed target {} {:?}: max-players must be >= 1",
                target.platform, target.tier
            )));
        }
    }
    Ok(())
}

/// Platform and region names become host labels, so keep them DNS-safe
fn validate_host_label(label: &str) -> Result<(), ConfigError> {
    if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "'{}' is not a valid platform or region name",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        toml::from_str(
            r#"
[api]
[ledger]
database-path = "./ledger.db"
[storage]
root = "./blobs"
[[seed]]
platform = "na1"
tier = "MASTER"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_zero_rate_limit() {
        let mut config = valid_config();
        config.rate_limit.per_second = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_rejects_window_smaller_than_second_limit() {
        let mut config = valid_config();
        config.rate_limit.per_second = 20;
        config.rate_limit.per_two_minutes = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_base_url_without_placeholder() {
        let mut config = valid_config();
        config.api.base_url = "https://na1.api.riotgames.com".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let mut config = valid_config();
        config.storage.backend = "gcs".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_host_label() {
        assert!(validate_host_label("na1").is_ok());
        assert!(validate_host_label("americas").is_ok());

        assert!(validate_host_label("").is_err());
        assert!(validate_host_label("na1.evil").is_err());
        assert!(validate_host_label("na 1").is_err());
    }

    #[test]
    fn test_rejects_zero_page_cap() {
        let mut config = valid_config();
        config.seed[0].max_pages = Some(0);
        assert!(validate(&config).is_err());
    }
}
