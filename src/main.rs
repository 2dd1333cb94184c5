//! IronScan 主入口
//! 使用内存钱包模拟一次完整的账户发现

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ironscan::{
    config::Config,
    domain::{Asset, DerivationPathTemplate, ExtendedDerivationPath, NetworkRegistry, WalletKind},
    infrastructure::{logging, memory_wallet::MemoryWallet},
    service::{DiscoveryRunner, DiscoverySessionController},
};

/// 逗号分隔的环境变量列表
fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量与配置文件
    dotenvy::dotenv().ok();
    let config = Config::from_env_and_file(std::env::var("CONFIG_PATH").ok())?;

    // ✅ 2. 初始化日志
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    config.validate()?;

    tracing::info!("🚀 Starting IronScan account discovery");

    // ✅ 3. 网络、钱包类型与基础路径
    let wallet_kind: WalletKind = config.discovery.wallet_kind.parse()?;
    let registry = NetworkRegistry::new();
    let network = registry
        .get(&config.discovery.network)
        .cloned()
        .with_context(|| format!("Unknown network: {}", config.discovery.network))?;
    let templates = registry.base_paths(wallet_kind, &network.id)?;

    let custom_paths = env_list("HD_CUSTOM_PATHS")
        .into_iter()
        .map(|path| {
            DerivationPathTemplate::new("Custom", path)
                .map(|t| ExtendedDerivationPath::initial(t, config.discovery.gap_limit))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // ✅ 4. 内存钱包
    let seed = std::env::var("HD_SEED").unwrap_or_else(|_| "ironscan".into());
    let wallet = Arc::new(MemoryWallet::new(seed).with_used_paths(env_list("HD_USED_PATHS")));

    let controller =
        DiscoverySessionController::from_config(wallet_kind, templates, &config.discovery);
    let mut runner = DiscoveryRunner::new(
        controller,
        wallet.clone(),
        wallet.clone(),
        Duration::from_secs(config.discovery.scan_timeout_secs),
    );

    // ✅ 5. 连接并扫描
    let asset = Asset::native(&network);
    let mut snapshot = runner.connect(network, asset).await?;
    if !custom_paths.is_empty() && snapshot.is_connected {
        snapshot = runner.add_custom_paths(custom_paths).await?;
    }

    tracing::info!(
        phase = snapshot.phase.as_str(),
        scanned = snapshot.scanned_accounts.len(),
        used = snapshot.scanned_accounts.iter().filter(|a| a.is_used).count(),
        queried = wallet.queried_addresses().await,
        "Discovery finished"
    );

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
