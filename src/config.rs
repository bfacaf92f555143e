use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub smtp: SmtpConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Loads configuration from the environment, honoring a `.env` file when
    /// present. Missing required SMTP values are fatal: the process must
    /// refuse to start rather than accept requests it cannot deliver.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let smtp = SmtpConfig::load()?;

        let directory = env::var("PDF_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdf_output"));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            smtp,
            output: OutputConfig { directory },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Mail relay settings, loaded once at startup and read-only thereafter.
///
/// Authentication is attempted only when both `username` and `password` are
/// configured; otherwise messages are sent unauthenticated.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl SmtpConfig {
    fn load() -> Result<Self, ConfigError> {
        let host = require_var("SMTP_HOST")?;
        let from = require_var("FROM_EMAIL")?;

        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidSmtpPort)?;

        let username = optional_var("SMTP_USER");
        let password = optional_var("SMTP_PASS");

        Ok(Self {
            host,
            port,
            username,
            password,
            from,
        })
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Location of transient rendered artifacts.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar { name }),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar { name: &'static str },
    InvalidPort,
    InvalidSmtpPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar { name } => {
                write!(f, "required environment variable {} is not set", name)
            }
            ConfigError::InvalidPort => write!(f, "PORT must be a valid u16"),
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("SMTP_HOST");
        env::remove_var("SMTP_PORT");
        env::remove_var("SMTP_USER");
        env::remove_var("SMTP_PASS");
        env::remove_var("FROM_EMAIL");
        env::remove_var("PDF_OUTPUT_DIR");
    }

    fn set_required_smtp() {
        env::set_var("SMTP_HOST", "smtp.example.com");
        env::set_var("FROM_EMAIL", "reports@example.com");
    }

    #[test]
    fn load_fails_without_smtp_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FROM_EMAIL", "reports@example.com");
        let err = AppConfig::load().expect_err("missing SMTP_HOST must be fatal");
        assert!(matches!(err, ConfigError::MissingVar { name: "SMTP_HOST" }));
    }

    #[test]
    fn load_fails_without_from_address() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SMTP_HOST", "smtp.example.com");
        let err = AppConfig::load().expect_err("missing FROM_EMAIL must be fatal");
        assert!(matches!(err, ConfigError::MissingVar { name: "FROM_EMAIL" }));
    }

    #[test]
    fn load_uses_defaults_when_optional_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_smtp();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.credentials().is_none());
        assert_eq!(config.output.directory, PathBuf::from("pdf_output"));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn credentials_require_both_user_and_pass() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_smtp();
        env::set_var("SMTP_USER", "mailer");
        let config = AppConfig::load().expect("config loads");
        assert!(config.smtp.credentials().is_none());

        env::set_var("SMTP_PASS", "secret");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.smtp.credentials(), Some(("mailer", "secret")));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        set_required_smtp();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }
}
