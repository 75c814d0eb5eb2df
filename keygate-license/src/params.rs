//! Request parameters and their canonical `k=v&k=v` form.
//!
//! The canonical string is the plaintext that gets encrypted, and through
//! the ciphertext it is also what gets signed. The server rebuilds it by
//! sorting keys by byte value, so [`RequestParams`] stores parameters in a
//! `BTreeMap` and never escapes values.

use crate::config::ServerConfig;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;

/// Parameter names as they appear on the wire.
pub mod keys {
    pub const API: &str = "api";
    pub const DATE: &str = "date";
    pub const APP_MD5: &str = "md5";
    pub const MUTUAL_KEY: &str = "mutualkey";
    pub const SESSION: &str = "BSphpSeSsL";
    pub const ANTI_HIJACK: &str = "appsafecode";
    pub const DEVICE_KEY: &str = "key";
    pub const ONLINE_MARK: &str = "maxoror";
    pub const CARD_NUMBER: &str = "icid";
    pub const CARD_PASSWORD: &str = "icpwd";
}

/// Timestamp layout for the `date` and `appsafecode` parameters.
///
/// Calendar year (`%Y`), slashes and a `#` between date and time.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d#%H:%M:%S";

/// Renders a timestamp in the server's request format.
#[must_use]
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The server endpoints this client speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCall {
    /// Acquire a session token.
    Session,
    /// Read the current application version.
    Version,
    /// Log in with a card number and password.
    LoginCard,
    /// Read the application announcement.
    Announcement,
}

impl ApiCall {
    /// The value of the `api` parameter.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Session => "BSphpSeSsL.in",
            Self::Version => "v.in",
            Self::LoginCard => "login.ic",
            Self::Announcement => "gg.in",
        }
    }
}

impl std::fmt::Display for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of request parameters with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    entries: BTreeMap<String, String>,
}

impl RequestParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request with the fixed per-call parameters: api name,
    /// timestamp, application hash and mutual key.
    #[must_use]
    pub fn for_api(api: ApiCall, config: &ServerConfig, now: &DateTime<Local>) -> Self {
        Self::new()
            .with(keys::API, api.name())
            .with(keys::DATE, format_timestamp(now))
            .with(keys::APP_MD5, config.app_md5.as_str())
            .with(keys::MUTUAL_KEY, config.mutual_key.as_str())
    }

    /// Sets a parameter, replacing any previous value under the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a parameter in place, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Adds the session token.
    #[must_use]
    pub fn session(self, token: &str) -> Self {
        self.with(keys::SESSION, token)
    }

    /// Adds the anti-hijack code the response must echo.
    #[must_use]
    pub fn anti_hijack_code(self, code: &str) -> Self {
        self.with(keys::ANTI_HIJACK, code)
    }

    /// Adds device binding: the stable device key and the online marker.
    #[must_use]
    pub fn device(self, device_key: &str, online_mark: &str) -> Self {
        self.with(keys::DEVICE_KEY, device_key)
            .with(keys::ONLINE_MARK, online_mark)
    }

    /// Adds the card credentials.
    #[must_use]
    pub fn card(self, number: &str, password: &str) -> Self {
        self.with(keys::CARD_NUMBER, number)
            .with(keys::CARD_PASSWORD, password)
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the api name, if set.
    #[must_use]
    pub fn api(&self) -> Option<&str> {
        self.get(keys::API)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders `k1=v1&k2=v2&...` with keys ascending by byte value.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
