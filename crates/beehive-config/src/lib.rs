use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BEEHIVE_CONFIG: &str = "BEEHIVE_CONFIG";
pub const ENV_BEEHIVE_API_URL: &str = "BEEHIVE_API_URL";
pub const ENV_BEEHIVE_TIMEZONE: &str = "BEEHIVE_TIMEZONE";

const DEFAULT_API_URL: &str = "https://api.beehive.example/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_MAX_WORK_DURATION_SECS: u64 = 3 * 60 * 60;
const DEFAULT_CLOCK_REFRESH_SECS: u64 = 60;
const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeehiveConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub session: SessionConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfigToml {
    #[serde(default = "default_max_work_duration_secs")]
    pub max_work_duration_secs: u64,
    #[serde(default = "default_clock_refresh_secs")]
    pub clock_refresh_secs: u64,
    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,
}

impl Default for SessionConfigToml {
    fn default() -> Self {
        Self {
            max_work_duration_secs: default_max_work_duration_secs(),
            clock_refresh_secs: default_clock_refresh_secs(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
        }
    }
}

impl Default for BeehiveConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            token_path: default_token_path(),
            timezone: default_timezone(),
            session: SessionConfigToml::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRuntimeConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRuntimeConfig {
    pub timezone: String,
    pub max_work_duration: Duration,
    pub clock_refresh: Duration,
    pub checkpoint_interval: Duration,
}

impl BeehiveConfig {
    pub fn api_runtime(&self) -> ApiRuntimeConfig {
        ApiRuntimeConfig {
            api_url: self.api_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            token_path: PathBuf::from(&self.token_path),
        }
    }

    pub fn session_runtime(&self) -> SessionRuntimeConfig {
        SessionRuntimeConfig {
            timezone: self.timezone.clone(),
            max_work_duration: Duration::from_secs(self.session.max_work_duration_secs),
            clock_refresh: Duration::from_secs(self.session.clock_refresh_secs),
            checkpoint_interval: Duration::from_secs(self.session.checkpoint_interval_secs),
        }
    }

    /// Directory holding the token file, also used for the log file.
    pub fn data_dir(&self) -> PathBuf {
        Path::new(&self.token_path)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn load_from_env() -> Result<BeehiveConfig, ConfigError> {
    let path = config_path_from_env()?;
    let mut config = load_from_path(path)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<BeehiveConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home.join(".config").join("beehive").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_BEEHIVE_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "BEEHIVE_CONFIG contained invalid UTF-8",
        )),
    }
}

fn apply_env_overrides(config: &mut BeehiveConfig) -> Result<(), ConfigError> {
    if let Some(api_url) = non_empty_env(ENV_BEEHIVE_API_URL)? {
        config.api_url = api_url;
    }
    if let Some(timezone) = non_empty_env(ENV_BEEHIVE_TIMEZONE)? {
        config.timezone = timezone;
    }
    Ok(())
}

fn non_empty_env(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => Ok(Some(raw.trim().to_owned()).filter(|value| !value.is_empty())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(_) => Err(ConfigError::configuration(format!(
            "{name} contained invalid UTF-8"
        ))),
    }
}

fn default_beehive_data_dir() -> PathBuf {
    resolve_data_local_dir().join("beehive")
}

fn resolve_data_local_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(path) = std::env::var("LOCALAPPDATA") {
            let path = path.trim();
            if !path.is_empty() {
                return absolutize_path(PathBuf::from(path));
            }
        }
        if let Some(home) = resolve_home_dir() {
            return home.join("AppData").join("Local");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = resolve_home_dir() {
            return home.join("Library").join("Application Support");
        }
    }

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    {
        if let Ok(path) = std::env::var("XDG_DATA_HOME") {
            let path = path.trim();
            if !path.is_empty() {
                return absolutize_path(PathBuf::from(path));
            }
        }
        if let Some(home) = resolve_home_dir() {
            return home.join(".local").join("share");
        }
    }

    std::env::temp_dir()
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn absolutize_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }

    if let Ok(current) = std::env::current_dir() {
        return current.join(path);
    }

    std::env::temp_dir().join(path)
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_token_path() -> String {
    default_beehive_data_dir()
        .join("tokens.json")
        .to_string_lossy()
        .to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_owned()
}

fn default_max_work_duration_secs() -> u64 {
    DEFAULT_MAX_WORK_DURATION_SECS
}

fn default_clock_refresh_secs() -> u64 {
    DEFAULT_CLOCK_REFRESH_SECS
}

fn default_checkpoint_interval_secs() -> u64 {
    DEFAULT_CHECKPOINT_INTERVAL_SECS
}

fn load_or_create_config(path: &Path) -> Result<BeehiveConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for BEEHIVE_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = BeehiveConfig::default();
            persist_config(path, &default_config)?;

            toml::to_string_pretty(&default_config).map_err(|err| {
                ConfigError::configuration(format!(
                    "Failed to serialize default BEEHIVE_CONFIG: {err}"
                ))
            })?
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read BEEHIVE_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: BeehiveConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse BEEHIVE_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    let changed = normalize_config(&mut config)?;
    if changed {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut BeehiveConfig) -> Result<bool, ConfigError> {
    let mut changed = false;

    let api_url = config.api_url.trim().trim_end_matches('/').to_owned();
    if api_url.is_empty() {
        config.api_url = default_api_url();
        changed = true;
    } else if api_url != config.api_url {
        config.api_url = api_url;
        changed = true;
    }
    if config.token_path.trim().is_empty() {
        config.token_path = default_token_path();
        changed = true;
    }
    if config.timezone.trim().is_empty() {
        config.timezone = default_timezone();
        changed = true;
    }
    if config.request_timeout_secs == 0 {
        config.request_timeout_secs = default_request_timeout_secs();
        changed = true;
    }
    if config.session.clock_refresh_secs == 0 {
        config.session.clock_refresh_secs = default_clock_refresh_secs();
        changed = true;
    }
    if config.session.checkpoint_interval_secs == 0 {
        config.session.checkpoint_interval_secs = default_checkpoint_interval_secs();
        changed = true;
    }
    if config.session.max_work_duration_secs == 0 {
        return Err(ConfigError::configuration(
            "session.max_work_duration_secs must be greater than zero.",
        ));
    }

    Ok(changed)
}

fn persist_config(path: &Path, config: &BeehiveConfig) -> Result<(), ConfigError> {
    let serialized = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!("Failed to serialize BEEHIVE_CONFIG: {err}"))
    })?;
    std::fs::write(path, serialized).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write BEEHIVE_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn with_env_vars<F>(vars: &[(&str, Option<&str>)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = env_lock().lock().expect("env lock");
        let backup = vars
            .iter()
            .map(|(name, _)| ((*name).to_owned(), std::env::var(name).ok()))
            .collect::<Vec<_>>();

        for (name, value) in vars {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }

        test();

        for (name, value) in backup {
            match value {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
    }

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("beehive-config-{prefix}-{nanos}"))
    }

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = unique_temp_dir("create");
        let path = dir.join("config.toml");

        let config = load_from_path(&path).expect("load missing config");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.session.clock_refresh_secs, 60);
        assert!(path.exists());

        let reloaded = load_from_path(&path).expect("reload config");
        assert_eq!(reloaded, config);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn blank_values_are_normalized_and_persisted() {
        let dir = unique_temp_dir("normalize");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "api_url = \"https://hive.test/api/\"\ntimezone = \" \"\n\n[session]\nclock_refresh_secs = 0\n",
        )
        .expect("write config");

        let config = load_from_path(&path).expect("load config");
        assert_eq!(config.api_url, "https://hive.test/api");
        assert_eq!(config.timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.session.clock_refresh_secs, DEFAULT_CLOCK_REFRESH_SECS);

        let persisted = std::fs::read_to_string(&path).expect("read persisted config");
        assert!(persisted.contains("https://hive.test/api\""));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn zero_max_duration_is_rejected() {
        let dir = unique_temp_dir("zero-duration");
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.toml");
        std::fs::write(&path, "[session]\nmax_work_duration_secs = 0\n").expect("write config");

        let error = load_from_path(&path).expect_err("zero duration is invalid");
        assert!(error.to_string().contains("max_work_duration_secs"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn env_overrides_apply_after_loading() {
        let dir = unique_temp_dir("env");
        let path = dir.join("config.toml");
        let path_string = path.to_string_lossy().to_string();

        with_env_vars(
            &[
                (ENV_BEEHIVE_CONFIG, Some(path_string.as_str())),
                (ENV_BEEHIVE_API_URL, Some("http://127.0.0.1:8080")),
                (ENV_BEEHIVE_TIMEZONE, Some("Europe/Berlin")),
            ],
            || {
                let config = load_from_env().expect("load from env");
                assert_eq!(config.api_url, "http://127.0.0.1:8080");
                assert_eq!(config.timezone, "Europe/Berlin");
                assert_eq!(
                    config.session_runtime().clock_refresh,
                    Duration::from_secs(60)
                );
            },
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn data_dir_is_token_parent() {
        let config = BeehiveConfig {
            token_path: "/var/lib/beehive/tokens.json".to_owned(),
            ..BeehiveConfig::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/beehive"));
        assert_eq!(
            config.api_runtime().token_path,
            PathBuf::from("/var/lib/beehive/tokens.json")
        );
    }
}
