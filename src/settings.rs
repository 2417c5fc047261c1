use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{FinError, Result};
use crate::hashing::{DigestAlgorithm, Salt};

pub const SALT_ENV: &str = "FINMODEL_SALT";
pub const CONFIG_DIR_ENV: &str = "FINMODEL_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
    #[serde(default)]
    pub digest: DigestAlgorithm,
}

fn default_output_dir() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("finmodel")
        .to_string_lossy()
        .to_string()
}

fn default_rules_path() -> String {
    config_dir().join("rules.json").to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            rules_path: default_rules_path(),
            digest: DigestAlgorithm::default(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("finmodel")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn secret_path() -> PathBuf {
    config_dir().join("secret.json")
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

/// Defaults when `path` is missing. An unreadable or invalid file is an error, never a silent reset.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| FinError::Settings(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| FinError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| FinError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

// ---------------------------------------------------------------------------
// Secret salt
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SecretFile {
    salt: String,
}

fn salt_from_file(path: &Path) -> Result<Option<Salt>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = Zeroizing::new(std::fs::read_to_string(path)?);
    let mut secret: SecretFile = serde_json::from_str(&content)
        .map_err(|e| FinError::Settings(format!("{}: {e}", path.display())))?;
    let salt = Salt::new(std::mem::take(&mut secret.salt));
    Ok(Some(salt))
}

fn non_empty(salt: Salt, source: &str) -> Result<Salt> {
    if salt.is_empty() {
        return Err(FinError::Settings(format!("salt from {source} is empty")));
    }
    Ok(salt)
}

/// Salt from `FINMODEL_SALT`, then `secret.json`, then an interactive prompt.
pub fn load_salt(allow_prompt: bool) -> Result<Salt> {
    if let Ok(value) = std::env::var(SALT_ENV) {
        debug!(source = SALT_ENV, "salt loaded");
        return non_empty(Salt::new(value), SALT_ENV);
    }
    let path = secret_path();
    if let Some(salt) = salt_from_file(&path)? {
        debug!(source = %path.display(), "salt loaded");
        return non_empty(salt, "secret.json");
    }
    if allow_prompt && std::io::stdin().is_terminal() {
        let value = rpassword::prompt_password("Hashing salt: ")?;
        return non_empty(Salt::new(value), "prompt");
    }
    Err(FinError::Settings(format!(
        "no hashing salt: set {SALT_ENV} or create {}",
        path.display()
    )))
}
