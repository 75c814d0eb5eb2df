//! Card login request credentials and reply parsing.
//!
//! Replies are pipe-delimited:
//! - success: `01|1081|<deviceKey>|<verifyData>|<expireDate>|||||`
//! - failure: `<status>|<errorCode>|<serverMessage>|||||`

/// Leading status of an accepted login.
pub const SUCCESS_STATUS: &str = "01";

/// Server code of an accepted login.
pub const SUCCESS_CODE: &str = "1081";

/// Code reported when a rejection carries none.
pub const UNKNOWN_CODE: &str = "未知";

/// What the user typed in.
#[derive(Clone, PartialEq, Eq)]
pub struct CardCredentials {
    number: String,
    password: String,
}

impl CardCredentials {
    /// Card number with an empty password, the common case.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            password: String::new(),
        }
    }

    /// Sets the card password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// The card number.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// The card password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for CardCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardCredentials")
            .field("number", &self.number)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A parsed card login reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardReply {
    /// The card was accepted.
    Accepted {
        device_key: String,
        verify_data: String,
        expire_date: String,
    },
    /// The card was refused.
    Rejected { code: String, server_message: String },
}

impl CardReply {
    /// Parses the `data` field of a login reply.
    ///
    /// Acceptance requires at least five fields led by `01|1081`. Anything
    /// else is a rejection; a missing code becomes [`UNKNOWN_CODE`] and a
    /// missing message becomes the whole `data` text.
    #[must_use]
    pub fn parse(data: &str) -> Self {
        let parts: Vec<&str> = data.split('|').collect();

        if parts.len() >= 5 && parts[0] == SUCCESS_STATUS && parts[1] == SUCCESS_CODE {
            return Self::Accepted {
                device_key: parts[2].to_string(),
                verify_data: parts[3].to_string(),
                expire_date: parts[4].to_string(),
            };
        }

        Self::Rejected {
            code: parts.get(1).copied().unwrap_or(UNKNOWN_CODE).to_string(),
            server_message: parts.get(2).copied().unwrap_or(data).to_string(),
        }
    }
}

/// Extracts the server version from a version reply (`v1.0|...`).
#[must_use]
pub fn parse_server_version(data: &str) -> &str {
    data.split('|').next().unwrap_or_default()
}
