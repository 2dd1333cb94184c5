//! Domain 模块
//!
//! 派生路径、网络与资产、扫描结果和发现阶段

pub mod chain_config;
pub mod derivation_path;
pub mod discovery_phase;
pub mod scanned_account;

// 重新导出常用类型
pub use chain_config::{Asset, Network, NetworkRegistry, WalletKind};
pub use derivation_path::{DerivationPathTemplate, ExtendedDerivationPath, PathItem};
pub use discovery_phase::{DiscoveryPhase, DiscoveryStateMachine, PhaseTransition};
pub use scanned_account::ScannedAccount;
