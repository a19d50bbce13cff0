//! Application configuration.
//!
//! Configuration is merged from (lowest to highest precedence):
//!
//! 1. Built-in defaults
//! 2. A YAML file (default `config.yaml`, override with `-f`/`--config`)
//! 3. `MAILCAST_`-prefixed environment variables (nested keys separated
//!    with `__`, e.g. `MAILCAST_AUTH__NATIVE__ENABLED=true`)
//!
//! Duration fields accept humantime strings such as `1h` or `30m`.

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::MailingId;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "mailcast", about = "Email mailing-campaign manager")]
pub struct Args {
    /// Path to the configuration file
    #[arg(short = 'f', long, env = "MAILCAST_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit
    #[arg(long, default_value_t = false)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. With no subcommand the HTTP server is started.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Run the manual-send routine for one mailing and print the result
    Send {
        /// Identifier of the mailing to send
        mailing_id: MailingId,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub host: String,
    /// Port to bind the HTTP server to
    pub port: u16,
    /// SQLite database URL (e.g. `sqlite://mailcast.db?mode=rwc`)
    pub database_url: String,
    /// Email address for the bootstrap superuser account
    pub admin_email: String,
    /// Password for the bootstrap superuser account. If unset, the account
    /// is created without a usable password.
    pub admin_password: Option<String>,
    /// Secret key for signing JWT session tokens. Override the default in
    /// any real deployment.
    pub secret_key: String,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Outbound email configuration
    pub email: EmailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "sqlite://mailcast.db?mode=rwc".to_string(),
            admin_email: "admin@localhost".to_string(),
            admin_password: None,
            secret_key: "insecure-dev-secret".to_string(),
            auth: AuthConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Config {
    fn figment(args: &Args) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("MAILCAST_").split("__"))
    }

    /// Load configuration from file and environment.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        Self::figment(args).extract()
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Native username/password authentication
    pub native: NativeAuthConfig,
    /// Trusted proxy-header authentication (for SSO integration)
    pub proxy_header: ProxyHeaderAuthConfig,
    /// Security settings (JWT, CORS)
    pub security: SecurityConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            native: NativeAuthConfig::default(),
            proxy_header: ProxyHeaderAuthConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Native username/password authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeAuthConfig {
    /// Enable native authentication (login/registration)
    pub enabled: bool,
    /// Allow new users to self-register
    pub allow_registration: bool,
    /// Password validation rules
    pub password: PasswordConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
}

impl Default for NativeAuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_registration: true,
            password: PasswordConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Trusted proxy-header authentication.
///
/// Reads the authenticated user's email from an HTTP header set by an
/// upstream proxy. Only enable this behind a proxy that strips the header
/// from incoming requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyHeaderAuthConfig {
    /// Enable proxy header authentication
    pub enabled: bool,
    /// HTTP header name containing the user's email
    pub header_name: String,
}

impl Default for ProxyHeaderAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: "x-forwarded-user".to_string(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name for the session token
    pub cookie_name: String,
    /// Set the Secure flag on cookies (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "mailcast_session".to_string(),
            cookie_secure: false,
            cookie_same_site: "lax".to_string(),
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 iterations
    pub argon2_iterations: u32,
    /// Argon2 parallelism
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            argon2_memory_kib: 19456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

/// Security configuration for JWT and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// JWT session token expiry
    #[serde(with = "humantime_serde")]
    pub jwt_expiry: Duration,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_expiry: Duration::from_secs(24 * 3600),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests ("*" for any)
    pub allowed_origins: Vec<String>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
// Note: cannot use deny_unknown_fields here due to #[serde(flatten)] on transport
pub struct EmailConfig {
    /// Email transport method
    #[serde(flatten)]
    pub transport: EmailTransportConfig,
    /// Sender email address
    pub from_email: String,
    /// Sender display name
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportConfig::File {
                path: "./outbox".to_string(),
            },
            from_email: "noreply@localhost".to_string(),
            from_name: "Mailcast".to_string(),
        }
    }
}

/// Email transport configuration - either SMTP or file-based for testing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailTransportConfig {
    /// Send emails via SMTP server
    Smtp {
        /// SMTP server hostname
        host: String,
        /// SMTP server port
        port: u16,
        /// SMTP authentication username
        username: String,
        /// SMTP authentication password
        password: String,
        /// Use TLS encryption
        use_tls: bool,
    },
    /// Write emails to files (for development/testing)
    File {
        /// Directory path where email files will be written
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn default_args() -> Args {
        Args {
            config: "config.yaml".to_string(),
            validate: false,
            command: None,
        }
    }

    #[test]
    fn test_defaults_load_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&default_args()).expect("defaults should load");
            assert_eq!(config.port, 8080);
            assert_eq!(config.bind_address(), "0.0.0.0:8080");
            assert!(config.auth.native.enabled);
            assert!(!config.auth.proxy_header.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                port: 9000
                admin_email: root@example.com
                auth:
                  native:
                    allow_registration: false
                "#,
            )?;
            let config = Config::load(&default_args()).expect("config should load");
            assert_eq!(config.port, 9000);
            assert_eq!(config.admin_email, "root@example.com");
            assert!(!config.auth.native.allow_registration);
            // Untouched sections keep their defaults
            assert_eq!(config.auth.native.password.min_length, 8);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "port: 9000")?;
            jail.set_env("MAILCAST_PORT", "9001");
            jail.set_env("MAILCAST_AUTH__NATIVE__ENABLED", "false");
            let config = Config::load(&default_args()).expect("config should load");
            assert_eq!(config.port, 9001);
            assert!(!config.auth.native.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "not_a_real_key: true")?;
            assert!(Config::load(&default_args()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_smtp_transport_parses() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                email:
                  type: smtp
                  host: smtp.example.com
                  port: 587
                  username: mailer
                  password: hunter2
                  use_tls: true
                  from_email: robot@example.com
                "#,
            )?;
            let config = Config::load(&default_args()).expect("config should load");
            match config.email.transport {
                EmailTransportConfig::Smtp { ref host, port, use_tls, .. } => {
                    assert_eq!(host, "smtp.example.com");
                    assert_eq!(port, 587);
                    assert!(use_tls);
                }
                _ => panic!("expected SMTP transport"),
            }
            assert_eq!(config.email.from_email, "robot@example.com");
            Ok(())
        });
    }
}
