//! The license record produced by a successful card login.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Layout of the server's expiry timestamp (server local time).
pub const EXPIRE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout used when showing the expiry to the user.
pub const EXPIRE_DISPLAY_FORMAT: &str = "%Y年%m月%d日 %H:%M";

/// Shown in place of an expiry the server sent in an unknown layout.
pub const UNKNOWN_EXPIRY: &str = "未知";

/// Device key characters shown in [`License::summary`].
const DEVICE_KEY_PREVIEW: usize = 8;

/// A verified card license. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    card_number: String,
    device_key: String,
    verify_data: String,
    expire_date: String,
    verified_at: DateTime<Utc>,
}

impl License {
    pub(crate) fn new(
        card_number: impl Into<String>,
        device_key: impl Into<String>,
        verify_data: impl Into<String>,
        expire_date: impl Into<String>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            card_number: card_number.into(),
            device_key: device_key.into(),
            verify_data: verify_data.into(),
            expire_date: expire_date.into(),
            verified_at,
        }
    }

    /// The card number the user entered.
    #[must_use]
    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    /// The device key the server bound the card to.
    #[must_use]
    pub fn device_key(&self) -> &str {
        &self.device_key
    }

    /// Opaque verification data returned by the server.
    #[must_use]
    pub fn verify_data(&self) -> &str {
        &self.verify_data
    }

    /// Expiry as sent by the server (`yyyy-MM-dd HH:mm:ss`).
    #[must_use]
    pub fn expire_date(&self) -> &str {
        &self.expire_date
    }

    /// When the card login succeeded.
    #[must_use]
    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }

    /// Parsed expiry, or `None` if the server sent something unparseable.
    #[must_use]
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.expire_date.trim(), EXPIRE_DATE_FORMAT).ok()
    }

    /// Whether the license has expired at `now` (local wall time).
    ///
    /// An unparseable expiry counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        self.expires_at().is_none_or(|exp| now > exp)
    }

    /// Whether the license has expired now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Local::now().naive_local())
    }

    /// Whole days left at `now`, never negative.
    #[must_use]
    pub fn remaining_days_at(&self, now: NaiveDateTime) -> i64 {
        self.expires_at()
            .map_or(0, |exp| (exp - now).num_days().max(0))
    }

    /// Whole days left now.
    #[must_use]
    pub fn remaining_days(&self) -> i64 {
        self.remaining_days_at(Local::now().naive_local())
    }

    /// Expiry for display, e.g. `2026年01月01日 00:00`, or `未知`.
    #[must_use]
    pub fn expire_date_formatted(&self) -> String {
        self.expires_at().map_or_else(
            || UNKNOWN_EXPIRY.to_string(),
            |exp| exp.format(EXPIRE_DISPLAY_FORMAT).to_string(),
        )
    }

    /// Multi-line overview at `now`, with the device key shortened.
    #[must_use]
    pub fn summary_at(&self, now: NaiveDateTime) -> String {
        let device: String = self.device_key.chars().take(DEVICE_KEY_PREVIEW).collect();
        format!(
            "卡号: {}\n到期: {}\n剩余: {} 天\n设备: {device}...",
            self.card_number,
            self.expire_date_formatted(),
            self.remaining_days_at(now),
        )
    }

    /// Multi-line overview now.
    #[must_use]
    pub fn summary(&self) -> String {
        self.summary_at(Local::now().naive_local())
    }
}
