//! API key resolution for the provider set.
//!
//! Keys come from the process environment first, then from a local key file
//! at `~/.config/khoj/keys.env` (`KEY=value` lines). A provider without a
//! key is simply excluded from the active set; it is not an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment-variable names of every provider credential, in canonical
/// provider order.
pub const KEY_NAMES: [&str; 3] = ["OPENAI_API_KEY", "PERPLEXITY_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(String),
}

/// Default key-file location: `~/.config/khoj/keys.env` (Unix) or the
/// platform config dir elsewhere.
pub fn default_key_path() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("khoj").join("keys.env")
}

/// Resolved credential map. Environment variables override file entries at
/// lookup time, so a key exported for one run wins without touching the file.
pub struct KeyRing {
    file_entries: HashMap<String, String>,
}

impl KeyRing {
    /// Load from the default key file.
    pub fn load_default() -> Self {
        Self::load(&default_key_path())
    }

    /// Load from a specific key file; a missing file yields an empty ring.
    pub fn load(path: &Path) -> Self {
        let file_entries = match std::fs::read_to_string(path) {
            Ok(content) => parse_env_file(&content),
            Err(_) => HashMap::new(),
        };
        Self { file_entries }
    }

    /// A ring with fixed entries and no environment fallback beyond the
    /// process env. Mainly for tests and embedding.
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self {
            file_entries: entries,
        }
    }

    /// Look up a credential. Priority: environment > key file. Empty values
    /// count as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.file_entries.get(name).cloned())
            .filter(|v| !v.is_empty())
    }

    /// Key names from [`KEY_NAMES`] that currently resolve to a value.
    pub fn configured(&self) -> Vec<&'static str> {
        KEY_NAMES
            .iter()
            .copied()
            .filter(|name| self.get(name).is_some())
            .collect()
    }
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped; a
/// matching pair of single or double quotes around the value is stripped.
fn parse_env_file(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2 {
            let bytes = value.as_bytes();
            if (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
                value = &value[1..value.len() - 1];
            }
        }
        if !key.is_empty() && !value.is_empty() {
            entries.insert(key.to_string(), value.to_string());
        }
    }
    entries
}

/// Persist a key into the file at `path`, creating parent directories as
/// needed. Existing entries for other keys are preserved.
pub fn save_key(path: &Path, name: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = match std::fs::read_to_string(path) {
        Ok(content) => parse_env_file(&content),
        Err(_) => HashMap::new(),
    };
    entries.insert(name.to_string(), value.to_string());
    write_entries(path, &entries)
}

/// Remove a key from the file at `path`. Removing an absent key is a no-op.
pub fn remove_key(path: &Path, name: &str) -> Result<(), StoreError> {
    let mut entries = match std::fs::read_to_string(path) {
        Ok(content) => parse_env_file(&content),
        Err(_) => return Ok(()),
    };
    entries.remove(name);
    write_entries(path, &entries)
}

fn write_entries(path: &Path, entries: &HashMap<String, String>) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Persist(e.to_string()))?;
    }
    let mut lines: Vec<String> = entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    lines.sort();
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, &content).map_err(|e| StoreError::Persist(e.to_string()))?;

    // Set restrictive permissions on Unix (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .map_err(|e| StoreError::Persist(format!("chmod: {}", e)))?;
    }

    Ok(())
}
