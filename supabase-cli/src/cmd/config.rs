//! Profile configuration persistence.

use std::fs;
use std::path::{Path, PathBuf};

/// Base config directory for the CLI.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("supabase-cli")
}

/// Path of the profile file.
pub fn profile_path() -> PathBuf {
    config_dir().join("profile.conf")
}

/// Keys accepted by `config set`.
pub const KEYS: [&str; 5] = ["url", "key", "service_role_key", "schema", "timeout_secs"];

/// Persistent connection settings stored as `profile.conf` (`key=value` lines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub url: Option<String>,
    pub key: Option<String>,
    pub service_role_key: Option<String>,
    pub schema: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Profile {
    /// Load from the default location. A missing file is an empty profile.
    pub fn load() -> supabase::Result<Self> {
        Self::load_from(&profile_path())
    }

    /// Load from `path`. A missing file is an empty profile.
    pub fn load_from(path: &Path) -> supabase::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(supabase::Error::io(format!("load config {}", path.display()), e)),
        };

        let mut profile = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                // Unknown keys are ignored so older binaries can read newer files.
                let _ = profile.set(k.trim(), v.trim());
            }
        }
        Ok(profile)
    }

    /// Save to the default location.
    pub fn save(&self) -> supabase::Result<()> {
        self.save_to(&profile_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> supabase::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| supabase::Error::io(format!("mkdir {}", dir.display()), e))?;
        }
        let mut content = String::new();
        for key in KEYS {
            if let Some(v) = self.get(key) {
                content.push_str(&format!("{key}={v}\n"));
            }
        }
        fs::write(path, content)
            .map_err(|e| supabase::Error::io(format!("write config {}", path.display()), e))
    }

    /// Set one key. An empty value clears it.
    pub fn set(&mut self, key: &str, value: &str) -> supabase::Result<()> {
        let value = Some(value.trim().to_owned()).filter(|v| !v.is_empty());
        match key {
            "url" => self.url = value,
            "key" => self.key = value,
            "service_role_key" => self.service_role_key = value,
            "schema" => self.schema = value,
            "timeout_secs" => {
                self.timeout_secs = value
                    .map(|v| v.parse())
                    .transpose()
                    .map_err(|e| supabase::Error::InvalidArgument(format!("timeout_secs: {e}")))?;
            }
            _ => {
                return Err(supabase::Error::InvalidArgument(format!(
                    "unknown key: {key} (expected one of: {})",
                    KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Value of one key, as stored.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "url" => self.url.clone(),
            "key" => self.key.clone(),
            "service_role_key" => self.service_role_key.clone(),
            "schema" => self.schema.clone(),
            "timeout_secs" => self.timeout_secs.map(|t| t.to_string()),
            _ => None,
        }
    }
}

/// Show a secret by its last four characters only.
pub fn mask(secret: &str) -> String {
    let tail: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".into()
    } else {
        format!("****{tail}")
    }
}
