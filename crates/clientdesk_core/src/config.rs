//! Process configuration loaded from the environment.
//!
//! # Responsibility
//! - Read backend selection, credentials, sheet names and admin secret.
//! - Fail fast on missing credentials so the process never starts half
//!   configured.
//!
//! # Invariants
//! - The google backend always has a credentials source.
//! - The sqlite backend always has a database path.
//!
//! An optional `.env` file in the working directory is loaded first;
//! variables already set in the environment win.

use crate::logging::default_log_level;
use crate::store::SpreadsheetLocator;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_BACKEND: &str = "CLIENTDESK_BACKEND";
pub const ENV_CREDENTIALS_JSON: &str = "GOOGLE_CREDENTIALS_JSON";
pub const ENV_CREDENTIALS_FILE: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_SPREADSHEET_ID: &str = "CLIENTDESK_SPREADSHEET_ID";
pub const ENV_SPREADSHEET_NAME: &str = "CLIENTDESK_SPREADSHEET_NAME";
pub const ENV_DB_PATH: &str = "CLIENTDESK_DB_PATH";
pub const ENV_CLIENT_SHEET: &str = "CLIENTDESK_CLIENT_SHEET";
pub const ENV_SETTINGS_SHEET: &str = "CLIENTDESK_SETTINGS_SHEET";
pub const ENV_CUSTOM_FEES_SHEET: &str = "CLIENTDESK_CUSTOM_FEES_SHEET";
pub const ENV_ADMIN_SECRET: &str = "CLIENTDESK_ADMIN_SECRET";
pub const ENV_BIND: &str = "CLIENTDESK_BIND";
pub const ENV_LOG_LEVEL: &str = "CLIENTDESK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CLIENTDESK_LOG_DIR";

const DEFAULT_SPREADSHEET_NAME: &str = "Client_Management";
const DEFAULT_CLIENT_SHEET: &str = "Sheet1";
const DEFAULT_SETTINGS_SHEET: &str = "Settings";
const DEFAULT_CUSTOM_FEES_SHEET: &str = "CustomFees";
const DEFAULT_BIND: &str = "127.0.0.1:5000";
/// Used only when `CLIENTDESK_ADMIN_SECRET` is unset; startup logs a warning.
pub const INSECURE_DEFAULT_SECRET: &str = "change-me";

/// Configuration failure; always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    /// A `.env` file exists but could not be read or parsed.
    EnvFile(String),
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required environment variable {var}"),
            Self::EnvFile(message) => write!(f, "failed to load .env file: {message}"),
            Self::Invalid { var, value, reason } => {
                write!(f, "invalid value `{value}` for {var}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Where the service-account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Google {
        credentials: CredentialsSource,
        spreadsheet: SpreadsheetLocator,
    },
    Sqlite {
        path: PathBuf,
    },
    Memory,
}

impl BackendConfig {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Google { .. } => "google",
            Self::Sqlite { .. } => "sqlite",
            Self::Memory => "memory",
        }
    }
}

/// Titles of the three sheets the application uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub clients: String,
    pub settings: String,
    pub custom_fees: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            clients: DEFAULT_CLIENT_SHEET.to_string(),
            settings: DEFAULT_SETTINGS_SHEET.to_string(),
            custom_fees: DEFAULT_CUSTOM_FEES_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub sheets: SheetNames,
    admin_secret: Option<String>,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        env_file_loaded(dotenvy::dotenv())?;
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset. Values are trimmed, except the
    /// admin secret which is kept byte-exact.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend_name = get(ENV_BACKEND).unwrap_or_else(|| "google".to_string());
        let backend = match backend_name.to_ascii_lowercase().as_str() {
            "google" => {
                let credentials = match (get(ENV_CREDENTIALS_JSON), get(ENV_CREDENTIALS_FILE)) {
                    (Some(raw), _) => CredentialsSource::Inline(raw),
                    (None, Some(path)) => CredentialsSource::File(PathBuf::from(path)),
                    (None, None) => return Err(ConfigError::Missing(ENV_CREDENTIALS_JSON)),
                };
                let spreadsheet = match get(ENV_SPREADSHEET_ID) {
                    Some(id) => SpreadsheetLocator::Id(id),
                    None => SpreadsheetLocator::Title(
                        get(ENV_SPREADSHEET_NAME)
                            .unwrap_or_else(|| DEFAULT_SPREADSHEET_NAME.to_string()),
                    ),
                };
                BackendConfig::Google {
                    credentials,
                    spreadsheet,
                }
            }
            "sqlite" => BackendConfig::Sqlite {
                path: PathBuf::from(get(ENV_DB_PATH).ok_or(ConfigError::Missing(ENV_DB_PATH))?),
            },
            "memory" => BackendConfig::Memory,
            _ => {
                return Err(ConfigError::Invalid {
                    var: ENV_BACKEND,
                    value: backend_name,
                    reason: "expected google|sqlite|memory".to_string(),
                })
            }
        };

        let defaults = SheetNames::default();
        let sheets = SheetNames {
            clients: get(ENV_CLIENT_SHEET).unwrap_or(defaults.clients),
            settings: get(ENV_SETTINGS_SHEET).unwrap_or(defaults.settings),
            custom_fees: get(ENV_CUSTOM_FEES_SHEET).unwrap_or(defaults.custom_fees),
        };

        let bind_raw = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                var: ENV_BIND,
                value: bind_raw.clone(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            backend,
            sheets,
            admin_secret: lookup(ENV_ADMIN_SECRET).filter(|value| !value.trim().is_empty()),
            bind_addr,
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(ENV_LOG_DIR),
        })
    }

    /// Configured admin secret, or the insecure default when unset.
    pub fn admin_secret(&self) -> &str {
        self.admin_secret
            .as_deref()
            .unwrap_or(INSECURE_DEFAULT_SECRET)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.admin_secret.is_none()
    }
}

/// A missing `.env` is fine; an unreadable or malformed one is not.
fn env_file_loaded<T>(loaded: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match loaded {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::EnvFile(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        env_file_loaded, AppConfig, BackendConfig, ConfigError, CredentialsSource, ENV_ADMIN_SECRET,
        ENV_BACKEND, ENV_CREDENTIALS_JSON, ENV_DB_PATH, INSECURE_DEFAULT_SECRET,
    };
    use std::io::Write;
    use crate::store::SpreadsheetLocator;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn google_backend_requires_credentials() {
        assert_eq!(
            config_from(&[]).expect_err("no credentials"),
            ConfigError::Missing(ENV_CREDENTIALS_JSON)
        );
    }

    #[test]
    fn google_backend_defaults_to_spreadsheet_title() {
        let config = config_from(&[(ENV_CREDENTIALS_JSON, "{}")]).expect("valid config");
        assert_eq!(
            config.backend,
            BackendConfig::Google {
                credentials: CredentialsSource::Inline("{}".to_string()),
                spreadsheet: SpreadsheetLocator::Title("Client_Management".to_string()),
            }
        );
        assert_eq!(config.sheets.clients, "Sheet1");
        assert_eq!(config.bind_addr.port(), 5000);
    }

    #[test]
    fn sqlite_backend_requires_path() {
        assert_eq!(
            config_from(&[(ENV_BACKEND, "sqlite")]).expect_err("no path"),
            ConfigError::Missing(ENV_DB_PATH)
        );
        let config =
            config_from(&[(ENV_BACKEND, "SQLite"), (ENV_DB_PATH, "/tmp/desk.db")]).expect("ok");
        assert_eq!(config.backend.label(), "sqlite");
    }

    #[test]
    fn missing_secret_falls_back_to_insecure_default() {
        let config = config_from(&[(ENV_BACKEND, "memory")]).expect("valid config");
        assert!(config.uses_default_secret());
        assert_eq!(config.admin_secret(), INSECURE_DEFAULT_SECRET);

        let config = config_from(&[(ENV_BACKEND, "memory"), (ENV_ADMIN_SECRET, "   ")])
            .expect("valid config");
        assert!(config.uses_default_secret());
    }

    #[test]
    fn admin_secret_keeps_surrounding_whitespace() {
        let config = config_from(&[(ENV_BACKEND, "memory"), (ENV_ADMIN_SECRET, " s3cret ")])
            .expect("valid config");
        assert!(!config.uses_default_secret());
        assert_eq!(config.admin_secret(), " s3cret ");

        let gate = crate::AccessGate::new(config.admin_secret());
        assert!(gate.verify(" s3cret "));
        assert!(!gate.verify("s3cret"));
    }

    #[test]
    fn missing_env_file_is_ignored_but_malformed_one_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            env_file_loaded(dotenvy::from_path(dir.path().join("absent.env"))),
            Ok(())
        );

        let path = dir.path().join("broken.env");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "CLIENTDESK_BROKEN_KEY=\"unterminated").expect("write");
        assert!(matches!(
            env_file_loaded(dotenvy::from_path(&path)),
            Err(ConfigError::EnvFile(_))
        ));
    }

    #[test]
    fn unknown_backend_and_bad_bind_are_invalid() {
        assert!(matches!(
            config_from(&[(ENV_BACKEND, "excel")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config_from(&[(ENV_BACKEND, "memory"), ("CLIENTDESK_BIND", "nowhere")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
