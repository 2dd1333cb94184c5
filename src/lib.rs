//! IronScan - HD 钱包账户发现引擎
//!
//! 按缺口规则扫描派生路径，合并用户自定义路径，直到没有新的已使用地址

pub mod config;
pub mod domain;
pub mod error;
pub mod error_map;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use error::{ConnectError, DiscoveryError, DiscoveryErrorCode, ScanError};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        domain::{
            Asset, DerivationPathTemplate, DiscoveryPhase, ExtendedDerivationPath, Network,
            NetworkRegistry, PathItem, ScannedAccount, WalletKind,
        },
        error::{ConnectError, DiscoveryError, ScanError},
        service::{
            AccountFetcher, AccountScanner, ConnectionSession, DiscoveryRunner,
            DiscoverySessionController, DiscoverySnapshot, NextAction, PathSetManager,
            WalletConnector,
        },
    };
}
