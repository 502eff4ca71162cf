use crate::{types::ProtocolMode, view::DEFAULT_BUTTON_LABEL};
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "tunereel.log";
const ENV_CONFIG_PATH: &str = "TUNEREEL_CONFIG_PATH";
const ENV_SERVER_URL: &str = "TUNEREEL_SERVER_URL";
const ENV_MODE: &str = "TUNEREEL_MODE";
const ENV_BUTTON_LABEL: &str = "TUNEREEL_BUTTON_LABEL";
const ENV_REQUEST_TIMEOUT: &str = "TUNEREEL_REQUEST_TIMEOUT";

#[derive(Debug, Clone)]
pub struct AppConfig {
    server_url: Option<String>,
    mode: ProtocolMode,
    button_label: String,
    request_timeout_seconds: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if path.exists() {
            let partial = read_partial(&path)?;
            config.apply_partial(partial);
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    pub fn button_label(&self) -> &str {
        &self.button_label
    }

    /// Timeout for `POST /create`. Event streams are never timed out.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }

    pub fn set_server_url(&mut self, url: String) {
        self.server_url = Some(url);
    }

    pub fn set_mode(&mut self, mode: ProtocolMode) {
        self.mode = mode;
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn log_file_path() -> Result<PathBuf> {
        let dir = project_dirs()?.config_dir().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
        Ok(dir.join(LOG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.server_url {
            self.server_url = Some(url);
        }
        if let Some(mode) = partial.mode {
            self.mode = mode;
        }
        if let Some(label) = partial.button_label {
            self.button_label = label;
        }
        if let Some(timeout) = partial.request_timeout_seconds {
            self.request_timeout_seconds = Some(timeout);
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SERVER_URL) {
            if value.trim().is_empty() {
                self.server_url = None;
            } else {
                self.server_url = Some(value);
            }
        }
        if let Some(value) = lookup(ENV_MODE) {
            if !value.trim().is_empty() {
                self.mode = value
                    .parse::<ProtocolMode>()
                    .map_err(|err| anyhow!("{ENV_MODE}: {err}"))?;
            }
        }
        if let Some(value) = lookup(ENV_BUTTON_LABEL) {
            if !value.trim().is_empty() {
                self.button_label = value;
            }
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT) {
            if !value.trim().is_empty() {
                let parsed = value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| {
                        format!("{ENV_REQUEST_TIMEOUT} must be a whole number of seconds")
                    })?;
                self.request_timeout_seconds = Some(parsed);
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            mode: ProtocolMode::default(),
            button_label: DEFAULT_BUTTON_LABEL.into(),
            request_timeout_seconds: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "Tunereel", "Tunereel")
        .ok_or_else(|| anyhow!("unable to determine config directory"))
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(partial)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    server_url: Option<String>,
    mode: Option<ProtocolMode>,
    button_label: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_partial_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            concat!(
                "server_url = \"http://studio.local:8080\"\n",
                "mode = \"streaming\"\n",
                "request_timeout_seconds = 20\n",
            ),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.apply_partial(read_partial(&path).unwrap());
        assert_eq!(config.server_url(), Some("http://studio.local:8080"));
        assert_eq!(config.mode(), ProtocolMode::Streaming);
        assert_eq!(config.button_label(), DEFAULT_BUTTON_LABEL);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(20)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config.set_server_url("http://file.local".into());
        config
            .apply_env(lookup(&[
                (ENV_SERVER_URL, " "),
                (ENV_MODE, "sse"),
                (ENV_BUTTON_LABEL, "Render"),
            ]))
            .unwrap();
        assert_eq!(config.server_url(), None);
        assert_eq!(config.mode(), ProtocolMode::Streaming);
        assert_eq!(config.button_label(), "Render");
    }

    #[test]
    fn rejects_bad_env_values() {
        let mut config = AppConfig::default();
        assert!(config.apply_env(lookup(&[(ENV_MODE, "carrier-pigeon")])).is_err());
        assert!(config.apply_env(lookup(&[(ENV_REQUEST_TIMEOUT, "soon")])).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "mode = 42").unwrap();
        assert!(read_partial(&path).is_err());
    }
}
