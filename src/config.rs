//! Application configuration management with security considerations.
//!
//! All values come from the process environment and are read exactly once at
//! startup. The resulting [`AppConfig`] is immutable and handed to request
//! handlers through the application state, request code never touches the
//! environment.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Production environments should use secure secret management systems

use derive_more::{Display, Error};
use envconfig::Envconfig;

/// Errors raised while loading the configuration. All of them are fatal.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("missing config value for {_0}")]
    ConfigMissing(#[error(not(source))] String),
    #[display("invalid config value: {_0}")]
    Invalid(#[error(not(source))] String),
}

/// Application configuration with security-aware field management.
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// 🔒 SENSITIVE: App secret used to sign every webhook callback
    pub app_secret: String,

    /// 🔒 SENSITIVE: Arbitrary token shared with the platform to validate
    /// the webhook subscription handshake
    pub validation_token: String,

    /// 🔒 SENSITIVE: Page access token for the send API
    pub page_access_token: String,

    /// Public URL where the relay is reachable, including protocol (NON-SENSITIVE)
    /// Used to build links to the static assets sent in templates.
    /// Example: "https://relay.example.com"
    pub server_url: String,

    /// Host address for web server binding (NON-SENSITIVE)
    #[envconfig(default = "0.0.0.0")]
    pub web_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(default = "5000")]
    pub web_server_port: u16,

    /// Base URL of the messaging platform Graph API (NON-SENSITIVE)
    #[envconfig(default = "https://graph.facebook.com/v2.6")]
    pub graph_api_url: String,

    /// Upper bound for a single outbound send call, in seconds
    #[envconfig(default = "15")]
    pub send_timeout_secs: u64,

    /// Reject callbacks without `x-hub-signature` header.
    /// Set to `false` to only log them.
    #[envconfig(default = "true")]
    pub reject_unsigned: bool,

    /// Directory served under `/assets`
    #[envconfig(default = "public/assets")]
    pub assets_dir: String,

    /// Path to SSL private key file (SENSITIVE PATH), production only
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE), production only
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// 🔒 SENSITIVE: Logfire write token, logs stay local when absent
    pub logfire_token: Option<String>,
}

impl AppConfig {
    /// Loads the configuration from the environment and validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let app_config = AppConfig::init_from_env().map_err(|e| match e {
            envconfig::Error::EnvVarMissing { name } => {
                ConfigError::ConfigMissing(name.to_string())
            }
            envconfig::Error::ParseError { name } => ConfigError::Invalid(name.to_string()),
        })?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Rejects required values that are present but empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("APP_SECRET", &self.app_secret),
            ("VALIDATION_TOKEN", &self.validation_token),
            ("PAGE_ACCESS_TOKEN", &self.page_access_token),
            ("SERVER_URL", &self.server_url),
        ];

        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::ConfigMissing(name.to_string()));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "SERVER_URL must include the protocol".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Public base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Send API endpoint for messages and sender actions
    pub fn send_api_endpoint(&self) -> String {
        format!("{}/me/messages", self.graph_api_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        env: "local".into(),
        app_secret: "test_secret".into(),
        validation_token: "test_validation_token".into(),
        page_access_token: "test_page_token".into(),
        server_url: "https://relay.example.com/".into(),
        web_server_host: "127.0.0.1".into(),
        web_server_port: 5000,
        graph_api_url: "https://graph.facebook.com/v2.6".into(),
        send_timeout_secs: 5,
        reject_unsigned: true,
        assets_dir: "public/assets".into(),
        private_key_path: "server.key".into(),
        certificate_path: "server.crt".into(),
        logfire_token: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut app_config = test_config();
        app_config.app_secret = "  ".into();

        let err = app_config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ConfigMissing(name) if name == "APP_SECRET"));
    }

    #[test]
    fn test_validate_rejects_server_url_without_protocol() {
        let mut app_config = test_config();
        app_config.server_url = "relay.example.com".into();

        assert!(matches!(
            app_config.validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let app_config = test_config();
        assert!(app_config.validate().is_ok());
        assert_eq!(app_config.base_url(), "https://relay.example.com");
        assert_eq!(
            app_config.send_api_endpoint(),
            "https://graph.facebook.com/v2.6/me/messages"
        );
    }
}
