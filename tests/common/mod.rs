//! 测试辅助模块
//! 提供内存钱包和发现流程的构造函数

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ironscan::domain::{
    Asset, DerivationPathTemplate, ExtendedDerivationPath, Network, NetworkRegistry, WalletKind,
};
use ironscan::infrastructure::memory_wallet::MemoryWallet;
use ironscan::service::{DiscoveryRunner, DiscoverySessionController};

pub const GAP: u32 = 20;
pub const ETH_DEFAULT: &str = "m/44'/60'/0'/0/<addr>";

pub type MemoryRunner = DiscoveryRunner<MemoryWallet, MemoryWallet>;

pub fn network(id: &str) -> Network {
    NetworkRegistry::new()
        .get(id)
        .cloned()
        .expect("network is registered")
}

pub fn native(network: &Network) -> Asset {
    Asset::native(network)
}

pub fn custom(path: &str, gap: u32) -> ExtendedDerivationPath {
    ExtendedDerivationPath::initial(
        DerivationPathTemplate::new("Custom", path).expect("valid template"),
        gap,
    )
}

/// 只含默认 ETH 路径的发现流程
pub fn default_runner(wallet: MemoryWallet) -> (MemoryRunner, Arc<MemoryWallet>) {
    let template = DerivationPathTemplate::new("Default (ETH)", ETH_DEFAULT).expect("valid template");
    runner_with(wallet, WalletKind::Mnemonic, vec![template])
}

/// 注册表中某钱包类型的全部基础路径
pub fn registry_runner(
    wallet: MemoryWallet,
    wallet_kind: WalletKind,
    network_id: &str,
) -> (MemoryRunner, Arc<MemoryWallet>) {
    let templates = NetworkRegistry::new()
        .base_paths(wallet_kind, network_id)
        .expect("network is registered");
    runner_with(wallet, wallet_kind, templates)
}

pub fn runner_with(
    wallet: MemoryWallet,
    wallet_kind: WalletKind,
    templates: Vec<DerivationPathTemplate>,
) -> (MemoryRunner, Arc<MemoryWallet>) {
    let wallet = Arc::new(wallet);
    let controller = DiscoverySessionController::new(wallet_kind, templates, GAP);
    let runner = DiscoveryRunner::new(
        controller,
        wallet.clone(),
        wallet.clone(),
        Duration::from_secs(5),
    );
    (runner, wallet)
}
