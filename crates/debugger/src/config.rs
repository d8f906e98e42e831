//! Client configuration, read from a JSON file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use transport::{DEFAULT_MAX_MESSAGE_SIZE, InitializeArguments};

use crate::shortcuts::ShortcutMap;

const DEFAULT_REPLY_TIMEOUT_MS: u64 = 30_000;

/// Settings for a debug session. Every field has a default, so a config
/// file only needs the keys it changes.
///
/// ```
/// use debugger::ClientConfig;
///
/// let config = ClientConfig::load(r#"{
///     "adapterId": "debugpy",
///     "replyTimeoutMs": null,
///     "launch": {"program": "main.py"}
/// }"#.as_bytes())?;
///
/// assert_eq!(config.client_id, "dap-client");
/// assert_eq!(config.reply_timeout(), None);
/// # Ok::<(), eyre::Report>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// The adapter's language or type, sent as `adapterID`
    pub adapter_id: String,
    pub client_id: String,
    pub client_name: String,
    pub locale: String,
    /// Deadline for each reply; `null` waits forever
    pub reply_timeout_ms: Option<u64>,
    pub max_message_size: usize,
    /// Passed to the adapter verbatim as the `launch` arguments
    pub launch: Value,
    pub shortcuts: ShortcutMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            adapter_id: "python".to_string(),
            client_id: "dap-client".to_string(),
            client_name: "DAP client".to_string(),
            locale: "en".to_string(),
            reply_timeout_ms: Some(DEFAULT_REPLY_TIMEOUT_MS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            launch: Value::Object(Default::default()),
            shortcuts: ShortcutMap::default(),
        }
    }
}

impl ClientConfig {
    pub fn load(reader: impl Read) -> eyre::Result<Self> {
        serde_json::from_reader(reader).wrap_err("parsing client configuration")
    }

    /// Read the configuration at `path`, where a leading `~` is the home directory.
    pub fn from_path(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = expand_home(path.as_ref());
        let f = File::open(&path)
            .wrap_err_with(|| format!("opening config file {}", path.display()))?;
        Self::load(f).wrap_err_with(|| format!("reading config file {}", path.display()))
    }

    /// `<config dir>/dap-client/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dap-client").join("config.json"))
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms.map(Duration::from_millis)
    }

    pub fn initialize_arguments(&self) -> InitializeArguments {
        InitializeArguments {
            client_id: self.client_id.clone(),
            client_name: self.client_name.clone(),
            locale: self.locale.clone(),
            ..InitializeArguments::new(self.adapter_id.clone())
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => {
            tracing::warn!(path = %path.display(), "cannot determine home directory");
            path.to_path_buf()
        }
    }
}
