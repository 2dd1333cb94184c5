//! 账户发现错误类型
//!
//! 所有错误都只作用于当前发现会话，`reset()` 后清除

use serde::Serialize;
use thiserror::Error;

use crate::error_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryErrorCode {
    // 连接错误码
    DeviceUnreachable,
    UserRejected,
    UnsupportedNetwork,
    ConnectTimeout,

    // 扫描错误码
    ScanFailed,
    DeviceUnavailable,
    ScanTimeout,

    // 流程错误码
    NotConnected,
    AlreadyConnected,
    InvalidTransition,
    ScanInFlight,
    InvalidPath,
    InvalidConfig,
}

impl DiscoveryErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryErrorCode::DeviceUnreachable => "device_unreachable",
            DiscoveryErrorCode::UserRejected => "user_rejected",
            DiscoveryErrorCode::UnsupportedNetwork => "unsupported_network",
            DiscoveryErrorCode::ConnectTimeout => "connect_timeout",
            DiscoveryErrorCode::ScanFailed => "scan_failed",
            DiscoveryErrorCode::DeviceUnavailable => "device_unavailable",
            DiscoveryErrorCode::ScanTimeout => "scan_timeout",
            DiscoveryErrorCode::NotConnected => "not_connected",
            DiscoveryErrorCode::AlreadyConnected => "already_connected",
            DiscoveryErrorCode::InvalidTransition => "invalid_transition",
            DiscoveryErrorCode::ScanInFlight => "scan_in_flight",
            DiscoveryErrorCode::InvalidPath => "invalid_path",
            DiscoveryErrorCode::InvalidConfig => "invalid_config",
        }
    }
}

/// 连接失败（可恢复，由用户重新发起连接）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Device unreachable: {0}")]
    Unreachable(String),
    #[error("Connection rejected by user: {0}")]
    Rejected(String),
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Connection timed out after {0}s")]
    Timeout(u64),
}

/// 扫描请求失败（已扫描的账户保留，可恢复）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Account query failed: {0}")]
    QueryFailed(String),
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Account query timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Connection(#[from] ConnectError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Wallet session is not connected")]
    NotConnected,
    #[error("Wallet session is already connected")]
    AlreadyConnected,
    #[error("Invalid discovery transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("A scan for {0} is already in flight")]
    ScanInFlight(String),
    #[error("Invalid derivation path: {0}")]
    InvalidPath(String),
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// 面向 UI 的错误体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// 面向用户的提示文案
    pub user_message: String,
}

impl DiscoveryError {
    pub fn code(&self) -> DiscoveryErrorCode {
        match self {
            DiscoveryError::Connection(e) => match e {
                ConnectError::Unreachable(_) => DiscoveryErrorCode::DeviceUnreachable,
                ConnectError::Rejected(_) => DiscoveryErrorCode::UserRejected,
                ConnectError::UnsupportedNetwork(_) => DiscoveryErrorCode::UnsupportedNetwork,
                ConnectError::Timeout(_) => DiscoveryErrorCode::ConnectTimeout,
            },
            DiscoveryError::Scan(e) => match e {
                ScanError::QueryFailed(_) => DiscoveryErrorCode::ScanFailed,
                ScanError::DeviceUnavailable(_) => DiscoveryErrorCode::DeviceUnavailable,
                ScanError::Timeout(_) => DiscoveryErrorCode::ScanTimeout,
            },
            DiscoveryError::NotConnected => DiscoveryErrorCode::NotConnected,
            DiscoveryError::AlreadyConnected => DiscoveryErrorCode::AlreadyConnected,
            DiscoveryError::InvalidTransition { .. } => DiscoveryErrorCode::InvalidTransition,
            DiscoveryError::ScanInFlight(_) => DiscoveryErrorCode::ScanInFlight,
            DiscoveryError::InvalidPath(_) => DiscoveryErrorCode::InvalidPath,
            DiscoveryError::UnsupportedNetwork(_) => DiscoveryErrorCode::UnsupportedNetwork,
            DiscoveryError::InvalidConfig(_) => DiscoveryErrorCode::InvalidConfig,
        }
    }

    /// 连接或扫描类错误，用户可以重试
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DiscoveryError::Connection(_) | DiscoveryError::Scan(_))
    }

    /// 将错误码转换为用户友好的提示
    pub fn user_message(&self) -> String {
        error_map::user_message(self.code().as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().as_str().to_string(),
            message: self.to_string(),
            user_message: self.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: DiscoveryError = ConnectError::Rejected("cancelled on device".into()).into();
        assert_eq!(err.code(), DiscoveryErrorCode::UserRejected);
        assert!(err.is_recoverable());

        let err: DiscoveryError = ScanError::Timeout(30).into();
        assert_eq!(err.code().as_str(), "scan_timeout");
        assert_eq!(err.to_string(), "Account query timed out after 30s");

        assert!(!DiscoveryError::NotConnected.is_recoverable());
    }

    #[test]
    fn test_error_body() {
        let err: DiscoveryError = ConnectError::Unreachable("usb".into()).into();
        let body = err.to_body();
        assert_eq!(body.code, "device_unreachable");
        assert_eq!(body.message, "Device unreachable: usb");
        assert_ne!(body.user_message, body.message);
    }
}
