use crate::config::types::{
    Config, CrawlConfig, OutputConfig, RetryConfig, SourceConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_limits(
        config.num_levels,
        config.num_disambig_links,
        config.num_page_links,
    )?;

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "deadline_secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Checks the per-run expansion limits
///
/// Shared by the `[crawl]` section and by crawl parameters built from it.
pub fn validate_limits(
    num_levels: u32,
    num_disambig_links: Option<usize>,
    num_page_links: usize,
) -> Result<(), ConfigError> {
    if num_levels < 1 {
        return Err(ConfigError::Validation(format!(
            "num_levels must be >= 1, got {}",
            num_levels
        )));
    }

    if num_disambig_links == Some(0) {
        return Err(ConfigError::Validation(
            "num_disambig_links must be >= 1 when set".to_string(),
        ));
    }

    if num_page_links < 1 {
        return Err(ConfigError::Validation(format!(
            "num_page_links must be >= 1, got {}",
            num_page_links
        )));
    }

    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let api_url = Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_url: {}", e)))?;
    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "api_url must use http or https, got '{}'",
            config.api_url
        )));
    }

    let base_url = Url::parse(&config.article_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid article_base_url: {}", e)))?;
    if base_url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "article_base_url must name a host, got '{}'",
            config.article_base_url
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.min_request_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "min_request_delay_ms must be at most 60000, got {}",
            config.min_request_delay_ms
        )));
    }

    if config.rate_limit_cooldown_ms > 600_000 {
        return Err(ConfigError::Validation(format!(
            "rate_limit_cooldown_ms must be at most 600000, got {}",
            config.rate_limit_cooldown_ms
        )));
    }

    validate_retry_config(&config.retry)
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= initial_backoff_ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.graph_path.is_empty() {
        return Err(ConfigError::Validation(
            "graph_path cannot be empty".to_string(),
        ));
    }

    let optional = [
        ("dot_path", &config.dot_path),
        ("duplicates_dot_path", &config.duplicates_dot_path),
        ("summary_path", &config.summary_path),
        ("cache_path", &config.cache_path),
        ("articles_dir", &config.articles_dir),
    ];
    for (name, path) in optional {
        if matches!(path, Some(p) if p.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}

/// Validates an email address (basic validation)
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "Email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email address '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_levels_rejected() {
        let mut config = Config::default();
        config.crawl.num_levels = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_page_links_rejected() {
        let mut config = Config::default();
        config.crawl.num_page_links = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_disambig_links_rejected() {
        let mut config = Config::default();
        config.crawl.num_disambig_links = Some(0);
        assert!(validate(&config).is_err());

        config.crawl.num_disambig_links = Some(3);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = Config::default();
        config.crawl.max_concurrent_fetches = 0;
        assert!(validate(&config).is_err());

        config.crawl.max_concurrent_fetches = 101;
        assert!(validate(&config).is_err());

        config.crawl.max_concurrent_fetches = 1;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = Config::default();
        config.source.api_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.source.api_url = "ftp://example.com/api.php".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = Config::default();
        config.source.retry.max_attempts = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.source.retry.initial_backoff_ms = 1_000;
        config.source.retry.max_backoff_ms = 10;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_request_delay_bounds() {
        let mut config = Config::default();
        config.source.min_request_delay_ms = 0;
        assert!(validate(&config).is_ok());

        config.source.min_request_delay_ms = 60_001;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.source.rate_limit_cooldown_ms = 600_001;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_crawler_name_characters() {
        let mut config = Config::default();
        config.user_agent.crawler_name = "Disam Graph".to_string();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = "Disam-Graph".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("admin@localhost").is_err());
    }

    #[test]
    fn test_empty_optional_output_path() {
        let mut config = Config::default();
        config.output.dot_path = Some(String::new());
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.output.articles_dir = Some(String::new());
        assert!(validate(&config).is_err());
    }
}
