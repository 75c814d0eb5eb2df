//! Translation of server rejection codes into user-facing messages.
//!
//! Lookup order: the fixed code table, then keywords in the server message,
//! then a generic fallback. Raw server text is never shown to the user.

use serde::{Deserialize, Serialize};

/// Why the server refused a card, as far as the client can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    CardNotFound,
    CardExpired,
    CardBanned,
    DeviceLimitReached,
    DeviceNotAuthorized,
    CardFormatInvalid,
    Timeout,
    ServerBusy,
    InvalidParameters,
    SignatureFailure,
    DeviceCheckFailed,
    NetworkFailure,
    Unknown,
}

/// Keyword groups checked against the lowercased server message, in order.
const KEYWORDS: &[(&[&str], RejectReason)] = &[
    (&["不存在", "invalid"], RejectReason::CardNotFound),
    (&["过期", "expired"], RejectReason::CardExpired),
    (&["封禁", "banned"], RejectReason::CardBanned),
    (&["设备", "device"], RejectReason::DeviceCheckFailed),
    (&["网络", "network"], RejectReason::NetworkFailure),
];

impl RejectReason {
    /// Maps a documented server error code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "1001" => Self::CardNotFound,
            "1002" => Self::CardExpired,
            "1003" => Self::CardBanned,
            "1004" => Self::DeviceLimitReached,
            "1005" => Self::DeviceNotAuthorized,
            "1006" => Self::CardFormatInvalid,
            "1007" => Self::Timeout,
            "1008" => Self::ServerBusy,
            "1009" => Self::InvalidParameters,
            "1010" => Self::SignatureFailure,
            _ => return None,
        })
    }

    /// Guesses a reason from keywords in the server's message.
    #[must_use]
    pub fn from_message(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
            .map(|(_, reason)| *reason)
    }

    /// Classifies a rejection: code table, then keywords, then `Unknown`.
    #[must_use]
    pub fn classify(code: &str, server_message: &str) -> Self {
        Self::from_code(code)
            .or_else(|| Self::from_message(server_message))
            .unwrap_or(Self::Unknown)
    }

    /// The message shown to the end user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CardNotFound => "卡密不存在，请检查是否输入正确",
            Self::CardExpired => "卡密已过期，请续费或购买新卡密",
            Self::CardBanned => "卡密已被封禁，请联系客服",
            Self::DeviceLimitReached => "设备数量已达上限，请先解绑其他设备",
            Self::DeviceNotAuthorized => "设备未授权，请先在其他设备上解绑",
            Self::CardFormatInvalid => "卡密格式错误，请检查输入",
            Self::Timeout => "网络连接超时，请检查网络后重试",
            Self::ServerBusy => "服务器繁忙，请稍后重试",
            Self::InvalidParameters => "参数错误，请重新输入",
            Self::SignatureFailure => "签名验证失败，请重新安装应用",
            Self::DeviceCheckFailed => "设备验证失败，请联系客服处理",
            Self::NetworkFailure => "网络连接失败，请检查网络后重试",
            Self::Unknown => "验证失败，请检查卡密是否正确\n或联系客服获取帮助",
        }
    }
}

/// Shorthand for `RejectReason::classify(code, message).user_message()`.
#[must_use]
pub fn friendly_message(code: &str, server_message: &str) -> &'static str {
    RejectReason::classify(code, server_message).user_message()
}
