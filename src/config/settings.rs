//! Configuration settings for the provisioning tools.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProvisionError;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lumo/provision.toml";

/// Main configuration structure.
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub acme: AcmeConfig,
    #[serde(default)]
    pub php: PhpConfig,
    #[serde(default)]
    pub nginx: NginxConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding site configs.
    #[serde(default = "default_sites_available")]
    pub nginx_sites_available: PathBuf,
    /// Directory holding the enabled-site symlinks.
    #[serde(default = "default_sites_enabled")]
    pub nginx_sites_enabled: PathBuf,
    /// Parent directory of per-domain web roots.
    #[serde(default = "default_web_root_base")]
    pub web_root_base: PathBuf,
    /// Directory where PHP-FPM pools create their sockets.
    #[serde(default = "default_php_fpm_socket_dir")]
    pub php_fpm_socket_dir: PathBuf,
    /// Certbot's live certificate directory.
    #[serde(default = "default_letsencrypt_live_dir")]
    pub letsencrypt_live_dir: PathBuf,
    /// Optional directory of `.tera` files overriding the built-in templates.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

/// ACME client options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcmeConfig {
    /// Registration email; without one certbot registers anonymously.
    #[serde(default)]
    pub email: Option<String>,
    /// Use the Let's Encrypt staging server.
    #[serde(default)]
    pub staging: bool,
    #[serde(default = "default_certbot_binary")]
    pub certbot_binary: String,
}

/// PHP interpreter options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhpConfig {
    #[serde(default = "default_php_binary")]
    pub binary: String,
}

/// Nginx options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NginxConfig {
    /// Systemd unit reloaded after each config write.
    #[serde(default = "default_nginx_service")]
    pub service: String,
}

/// Time limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Timeout for short commands (php, systemctl, curl).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
    /// Timeout for the certbot request.
    #[serde(default = "default_certbot_timeout")]
    pub certbot_timeout_seconds: u64,
    /// Pause between the final reload and the reachability check.
    #[serde(default = "default_verify_delay")]
    pub verify_delay_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Run journal configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,
    #[serde(default = "default_journal_path")]
    pub log_path: PathBuf,
}

fn default_sites_available() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-available")
}

fn default_sites_enabled() -> PathBuf {
    PathBuf::from("/etc/nginx/sites-enabled")
}

fn default_web_root_base() -> PathBuf {
    PathBuf::from("/var/www")
}

fn default_php_fpm_socket_dir() -> PathBuf {
    PathBuf::from("/run/php")
}

fn default_letsencrypt_live_dir() -> PathBuf {
    PathBuf::from("/etc/letsencrypt/live")
}

fn default_certbot_binary() -> String {
    "certbot".to_string()
}

fn default_php_binary() -> String {
    "php".to_string()
}

fn default_nginx_service() -> String {
    "nginx".to_string()
}

fn default_command_timeout() -> u64 {
    60
}

fn default_certbot_timeout() -> u64 {
    300
}

fn default_verify_delay() -> u64 {
    5
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_journal_enabled() -> bool {
    true
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("/var/log/lumo/provision.log")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            nginx_sites_available: default_sites_available(),
            nginx_sites_enabled: default_sites_enabled(),
            web_root_base: default_web_root_base(),
            php_fpm_socket_dir: default_php_fpm_socket_dir(),
            letsencrypt_live_dir: default_letsencrypt_live_dir(),
            templates_dir: None,
        }
    }
}

impl Default for AcmeConfig {
    fn default() -> Self {
        Self {
            email: None,
            staging: false,
            certbot_binary: default_certbot_binary(),
        }
    }
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            binary: default_php_binary(),
        }
    }
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            service: default_nginx_service(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_timeout_seconds: default_command_timeout(),
            certbot_timeout_seconds: default_certbot_timeout(),
            verify_delay_seconds: default_verify_delay(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            log_path: default_journal_path(),
        }
    }
}

impl LimitsConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn certbot_timeout(&self) -> Duration {
        Duration::from_secs(self.certbot_timeout_seconds)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_secs(self.verify_delay_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProvisionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ProvisionError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ProvisionError::Config { message } => ProvisionError::Config {
                message: format!("{} ({})", message, path.display()),
            },
            other => other,
        })
    }

    /// Resolve settings for a CLI run.
    ///
    /// An explicitly requested file must exist. Without one, the default
    /// location is used if present, otherwise the built-in defaults apply.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ProvisionError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ProvisionError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ProvisionError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ProvisionError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(ProvisionError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.limits.command_timeout_seconds == 0 || self.limits.certbot_timeout_seconds == 0 {
            return Err(ProvisionError::Config {
                message: "Command timeouts must be greater than zero".to_string(),
            });
        }

        if let Some(email) = &self.acme.email {
            if !email.contains('@') {
                return Err(ProvisionError::Config {
                    message: format!("Invalid ACME email '{}'", email),
                });
            }
        }

        Ok(())
    }
}
