pub mod account_scanner; // 缺口规则与下一步决策
pub mod discovery_controller;
pub mod discovery_runner;
pub mod discovery_state;
pub mod path_set_manager;
pub mod session;

pub use account_scanner::{AccountScanner, NextAction, ScanBatch};
pub use discovery_controller::DiscoverySessionController;
pub use discovery_runner::DiscoveryRunner;
pub use discovery_state::{DiscoverySnapshot, DiscoveryState};
pub use path_set_manager::{CustomPathSet, MergedPath, PathOrigin, PathSetManager};
pub use session::{
    AccountFetcher, ConnectRequest, ConnectionSession, DiscoveryCommand, RequestTicket,
    ScanBatchRequest, WalletConnector,
};
