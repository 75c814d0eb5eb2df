//! Device identity for license binding.
//!
//! The server binds a card to a stable per-install device key and limits
//! concurrent use through an "online mark" that changes on every login.
//!
//! [`HostDevice`] resolves its key in order:
//!
//! 1. the platform's machine id, hashed so the raw id never leaves the host
//! 2. a random key persisted in the application data directory
//! 3. a random key for this process only, when nothing can be persisted

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the file holding the persisted fallback key.
pub const DEVICE_KEY_FILE_NAME: &str = "device-key";

/// Mixed into the machine-id hash so other applications derive other keys.
const PLATFORM_KEY_CONTEXT: &[u8] = b"keygate-device-key:";

/// Supplies the identifiers sent with a card login.
pub trait DeviceIdentity: Send + Sync {
    /// Stable identifier of this installation.
    fn device_key(&self) -> String;

    /// Per-login marker used by the server for multi-instance control.
    fn online_mark(&self) -> String {
        format!("{}_{}", self.device_key(), chrono::Utc::now().timestamp())
    }
}

/// A fixed device key, for hosts that manage their own identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDevice {
    key: String,
}

impl StaticDevice {
    /// Wraps an existing device key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Generates a fresh random key (uppercase UUID).
    #[must_use]
    pub fn random() -> Self {
        Self::new(random_key())
    }
}

impl DeviceIdentity for StaticDevice {
    fn device_key(&self) -> String {
        self.key.clone()
    }
}

/// Where a [`HostDevice`] key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Derived from the platform machine id.
    Platform,
    /// Read from, or newly written to, the key file.
    Persisted,
    /// Random and lost when the process exits.
    Ephemeral,
}

/// The device key of the current host, as an uppercase UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDevice {
    key: String,
    source: KeySource,
}

impl HostDevice {
    /// Resolves the key for `app_name`, keeping any fallback key under the
    /// platform data directory.
    #[must_use]
    pub fn detect_for(app_name: &str) -> Self {
        match dirs::data_dir() {
            Some(base) => {
                Self::resolve(platform_id(), &base.join(app_name).join(DEVICE_KEY_FILE_NAME))
            }
            None => match platform_id() {
                Some(id) => Self::from_platform_id(&id),
                None => Self::ephemeral(),
            },
        }
    }

    /// Resolves the key from an optional platform id and a key file.
    ///
    /// The key file is only touched when `platform_id` is `None`.
    #[must_use]
    pub fn resolve(platform_id: Option<String>, key_file: &Path) -> Self {
        if let Some(id) = platform_id {
            return Self::from_platform_id(&id);
        }
        match load_or_create_key(key_file) {
            Ok(key) => Self {
                key,
                source: KeySource::Persisted,
            },
            Err(e) => {
                warn!(path = %key_file.display(), "Cannot persist device key: {e}");
                Self::ephemeral()
            }
        }
    }

    fn from_platform_id(id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(PLATFORM_KEY_CONTEXT);
        hasher.update(id.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self {
            key: Uuid::from_bytes(bytes).to_string().to_uppercase(),
            source: KeySource::Platform,
        }
    }

    fn ephemeral() -> Self {
        Self {
            key: random_key(),
            source: KeySource::Ephemeral,
        }
    }

    /// How the key was obtained.
    #[must_use]
    pub fn source(&self) -> KeySource {
        self.source
    }
}

impl DeviceIdentity for HostDevice {
    fn device_key(&self) -> String {
        self.key.clone()
    }
}

fn random_key() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

/// Reuses a valid key from `path`, or writes a new one there.
fn load_or_create_key(path: &Path) -> std::io::Result<String> {
    if let Ok(saved) = fs::read_to_string(path) {
        if let Ok(uuid) = Uuid::parse_str(saved.trim()) {
            debug!(path = %path.display(), "Using persisted device key");
            return Ok(uuid.to_string().to_uppercase());
        }
        warn!(path = %path.display(), "Replacing unreadable device key");
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let key = random_key();
    fs::write(path, &key)?;
    debug!(path = %path.display(), "Created device key");
    Ok(key)
}

/// The platform machine id, if this OS exposes one.
fn platform_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        ["/etc/machine-id", "/var/lib/dbus/machine-id"]
            .iter()
            .filter_map(|p| fs::read_to_string(p).ok())
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|out| ioreg_platform_uuid(&out))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Extracts the `IOPlatformUUID` value from `ioreg` output.
#[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
fn ioreg_platform_uuid(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, value) = line.split_once("\"IOPlatformUUID\"")?;
        let value = value.trim().strip_prefix('=')?.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}
