//! Client configuration: server endpoint and shared secrets.
//!
//! Nothing here is a module-level constant; a deployment's secrets are
//! loaded from JSON and injected into the client.

use crate::error::{LicenseError, LicenseResult};
use keygate_crypto::{PayloadCipher, SignTemplate, DEFAULT_IV, IV_SIZE, PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default network timeout per round trip.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings and secrets shared with the activation server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Full endpoint URL, including the `appid` and `m` query parameters.
    pub server_url: String,
    /// Mutual authentication key sent with every request.
    pub mutual_key: String,
    /// Password the payload cipher key is derived from.
    pub encrypt_password: String,
    /// CBC initialization vector (8 bytes of text).
    #[serde(default = "default_iv")]
    pub iv: String,
    /// Template for request signatures, e.g. `123[KEY]456`.
    pub input_sign_template: String,
    /// Template for response signatures.
    pub output_sign_template: String,
    /// Application hash; empty when the server does not check it.
    #[serde(default)]
    pub app_md5: String,
    /// Client version; must equal the server-reported version.
    pub app_version: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_iv() -> String {
    DEFAULT_IV.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ServerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> LicenseResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LicenseError::Config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Checks the settings the protocol cannot work without.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.server_url.trim().is_empty() {
            return Err(LicenseError::Config("server_url is empty".to_string()));
        }
        if self.iv.len() != IV_SIZE {
            return Err(LicenseError::Config(format!(
                "iv must be {IV_SIZE} bytes, got {}",
                self.iv.len()
            )));
        }
        for (name, template) in [
            ("input_sign_template", &self.input_sign_template),
            ("output_sign_template", &self.output_sign_template),
        ] {
            if !template.contains(PLACEHOLDER) {
                return Err(LicenseError::Config(format!(
                    "{name} must contain {PLACEHOLDER}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(LicenseError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn cipher(&self) -> LicenseResult<PayloadCipher> {
        PayloadCipher::new(&self.encrypt_password, &self.iv)
            .map_err(|e| LicenseError::Config(e.to_string()))
    }

    pub(crate) fn input_template(&self) -> LicenseResult<SignTemplate> {
        SignTemplate::new(self.input_sign_template.as_str())
            .map_err(|e| LicenseError::Config(format!("input_sign_template: {e}")))
    }

    pub(crate) fn output_template(&self) -> LicenseResult<SignTemplate> {
        SignTemplate::new(self.output_sign_template.as_str())
            .map_err(|e| LicenseError::Config(format!("output_sign_template: {e}")))
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("server_url", &self.server_url)
            .field("mutual_key", &"[REDACTED]")
            .field("encrypt_password", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .field("input_sign_template", &"[REDACTED]")
            .field("output_sign_template", &"[REDACTED]")
            .field("app_md5", &self.app_md5)
            .field("app_version", &self.app_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
