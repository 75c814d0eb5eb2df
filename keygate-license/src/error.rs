//! Error types for the activation handshake.

use keygate_crypto::CryptoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Activation-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Request parameters could not be encrypted.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Response payload could not be decrypted (bad key, IV, padding or data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Response bytes are not text, or the decrypted payload is not the
    /// expected JSON structure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Response signature does not match; the response is untrusted.
    #[error("response signature invalid")]
    SignatureInvalid,

    /// Response echoed a different anti-hijack code than the one sent.
    #[error("anti-hijack code mismatch (sent {sent}, received {received})")]
    HijackSuspected { sent: String, received: String },

    /// Server and client versions differ.
    #[error("version mismatch: client {expected}, server {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// Server refused the card.
    #[error("server rejected card ({code}): {message}")]
    ServerRejected { code: String, message: String },

    /// Transport failure, timeout or non-success HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// License persistence failed, including an unreadable license file.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Coarse classification of a failed attempt, one user-facing message each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EncryptionFailure,
    DecryptionFailure,
    MalformedResponse,
    SignatureInvalid,
    HijackSuspected,
    VersionMismatch,
    ServerRejected,
    NetworkError,
    Configuration,
    Storage,
    /// An attempt whose future was dropped before reaching a result.
    Interrupted,
}

impl ErrorKind {
    /// Returns true for failures of the transport or the protocol envelope,
    /// as opposed to a decision made by the server.
    #[must_use]
    pub fn is_network_or_protocol(&self) -> bool {
        matches!(
            self,
            Self::EncryptionFailure
                | Self::DecryptionFailure
                | Self::MalformedResponse
                | Self::SignatureInvalid
                | Self::HijackSuspected
                | Self::NetworkError
        )
    }

    /// The message shown to the end user for this kind of failure.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EncryptionFailure => "参数加密失败",
            Self::DecryptionFailure => "响应解密失败，请检查网络环境",
            Self::MalformedResponse => "服务器响应格式错误",
            Self::SignatureInvalid => "签名验证失败，请重新安装应用",
            Self::HijackSuspected => "检测到响应被篡改，请检查网络环境",
            Self::VersionMismatch => "版本不匹配，请更新应用",
            Self::ServerRejected => "验证失败，请检查卡密是否正确\n或联系客服获取帮助",
            Self::NetworkError => "网络连接失败，请检查网络后重试",
            Self::Configuration => "客户端配置错误",
            Self::Storage => "本地授权信息读写失败",
            Self::Interrupted => "验证已中断，请重新验证",
        }
    }
}

impl LicenseError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encryption(_) => ErrorKind::EncryptionFailure,
            Self::Decryption(_) => ErrorKind::DecryptionFailure,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::SignatureInvalid => ErrorKind::SignatureInvalid,
            Self::HijackSuspected { .. } => ErrorKind::HijackSuspected,
            Self::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            Self::ServerRejected { .. } => ErrorKind::ServerRejected,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// The single human-readable message for this error.
    ///
    /// Server rejections carry their already-translated message; every
    /// other error uses the message of its kind.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ServerRejected { message, .. } => message.clone(),
            other => other.kind().user_message().to_string(),
        }
    }

    /// The server's error code, for card rejections.
    #[must_use]
    pub fn server_code(&self) -> Option<&str> {
        match self {
            Self::ServerRejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub(crate) fn encryption(err: CryptoError) -> Self {
        Self::Encryption(err.to_string())
    }

    pub(crate) fn decryption(err: CryptoError) -> Self {
        Self::Decryption(err.to_string())
    }
}
