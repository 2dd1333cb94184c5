//! 网络与派生路径配置
//!
//! 定义支持的网络、资产、钱包类型，以及每种钱包在各网络上的标准派生路径模板

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::derivation_path::DerivationPathTemplate;
use crate::error::DiscoveryError;

/// 钱包类型（决定可用的派生路径格式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    /// Ledger 硬件钱包
    Ledger,
    /// Trezor 硬件钱包
    Trezor,
    /// GridPlus Lattice
    GridPlus,
    /// 助记词（软件会话）
    Mnemonic,
}

impl WalletKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::Ledger => "ledger",
            WalletKind::Trezor => "trezor",
            WalletKind::GridPlus => "gridplus",
            WalletKind::Mnemonic => "mnemonic",
        }
    }

    /// 是否为硬件设备
    pub fn is_hardware(&self) -> bool {
        !matches!(self, WalletKind::Mnemonic)
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletKind {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ledger" => Ok(WalletKind::Ledger),
            "trezor" => Ok(WalletKind::Trezor),
            "gridplus" => Ok(WalletKind::GridPlus),
            "mnemonic" => Ok(WalletKind::Mnemonic),
            _ => Err(DiscoveryError::InvalidConfig(format!(
                "Unknown wallet kind: {}",
                s
            ))),
        }
    }
}

/// 网络
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// 网络标识，例如 "Ethereum"
    pub id: String,
    /// 展示名称
    pub name: String,
    /// EIP-155 chain id
    pub chain_id: u64,
    /// 原生资产符号
    pub symbol: String,
    pub is_testnet: bool,
}

/// 资产（决定扫描时查询哪种余额）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub uuid: Uuid,
    pub ticker: String,
    pub network_id: String,
    /// 代币合约地址（原生资产为 None）
    pub contract_address: Option<String>,
    pub decimals: u8,
}

impl Asset {
    /// 网络原生资产
    pub fn native(network: &Network) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            ticker: network.symbol.clone(),
            network_id: network.id.clone(),
            contract_address: None,
            decimals: 18,
        }
    }

    /// ERC20 等代币资产
    pub fn token(
        network: &Network,
        ticker: impl Into<String>,
        contract_address: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            ticker: ticker.into(),
            network_id: network.id.clone(),
            contract_address: Some(contract_address.into()),
            decimals,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 标准派生路径
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 标准派生路径条目
struct StandardPath {
    network_id: &'static str,
    label: &'static str,
    path: &'static str,
    wallets: &'static [WalletKind],
}

const ALL_WALLETS: &[WalletKind] = &[
    WalletKind::Ledger,
    WalletKind::Trezor,
    WalletKind::GridPlus,
    WalletKind::Mnemonic,
];

static STANDARD_PATHS: &[StandardPath] = &[
    // Ethereum (BIP44)
    StandardPath {
        network_id: "Ethereum",
        label: "Default (ETH)",
        path: "m/44'/60'/0'/0/<addr>",
        wallets: ALL_WALLETS,
    },
    // Ledger Live: 每个账户一个地址
    StandardPath {
        network_id: "Ethereum",
        label: "Ledger Live",
        path: "m/44'/60'/<account>'/0/0",
        wallets: &[WalletKind::Ledger],
    },
    // Ledger (legacy / MEW)
    StandardPath {
        network_id: "Ethereum",
        label: "Ledger Legacy",
        path: "m/44'/60'/0'/<account>",
        wallets: &[WalletKind::Ledger, WalletKind::Mnemonic],
    },
    // Ethereum Classic
    StandardPath {
        network_id: "EthereumClassic",
        label: "Ethereum Classic",
        path: "m/44'/61'/0'/0/<addr>",
        wallets: ALL_WALLETS,
    },
    StandardPath {
        network_id: "EthereumClassic",
        label: "Ledger (ETC)",
        path: "m/44'/60'/160720'/0'/<addr>",
        wallets: &[WalletKind::Ledger],
    },
    // Sepolia 测试网
    StandardPath {
        network_id: "Sepolia",
        label: "Testnet (ETH)",
        path: "m/44'/1'/0'/0/<addr>",
        wallets: ALL_WALLETS,
    },
    StandardPath {
        network_id: "Sepolia",
        label: "Default (ETH)",
        path: "m/44'/60'/0'/0/<addr>",
        wallets: ALL_WALLETS,
    },
];

/// 网络注册表
pub struct NetworkRegistry {
    networks: HashMap<String, Network>,
}

impl NetworkRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            networks: HashMap::new(),
        };

        registry.register(Network {
            id: "Ethereum".to_string(),
            name: "Ethereum".to_string(),
            chain_id: 1,
            symbol: "ETH".to_string(),
            is_testnet: false,
        });

        registry.register(Network {
            id: "EthereumClassic".to_string(),
            name: "Ethereum Classic".to_string(),
            chain_id: 61,
            symbol: "ETC".to_string(),
            is_testnet: false,
        });

        registry.register(Network {
            id: "Sepolia".to_string(),
            name: "Ethereum Sepolia".to_string(),
            chain_id: 11155111,
            symbol: "ETH".to_string(),
            is_testnet: true,
        });

        registry
    }

    /// 注册网络
    pub fn register(&mut self, network: Network) {
        self.networks.insert(network.id.clone(), network);
    }

    /// 通过网络标识查找
    pub fn get(&self, network_id: &str) -> Option<&Network> {
        self.networks.get(network_id)
    }

    /// 通过 chain id 查找
    pub fn get_by_chain_id(&self, chain_id: u64) -> Option<&Network> {
        self.networks.values().find(|n| n.chain_id == chain_id)
    }

    /// 获取所有网络
    pub fn all(&self) -> Vec<&Network> {
        self.networks.values().collect()
    }

    /// 某种钱包在某个网络上的基础派生路径（按注册顺序）
    pub fn base_paths(
        &self,
        wallet_kind: WalletKind,
        network_id: &str,
    ) -> Result<Vec<DerivationPathTemplate>, DiscoveryError> {
        if !self.networks.contains_key(network_id) {
            return Err(DiscoveryError::UnsupportedNetwork(network_id.to_string()));
        }

        Ok(STANDARD_PATHS
            .iter()
            .filter(|p| p.network_id == network_id && p.wallets.contains(&wallet_kind))
            .map(|p| DerivationPathTemplate {
                label: p.label.to_string(),
                path: p.path.to_string(),
            })
            .collect())
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_registry() {
        let registry = NetworkRegistry::new();

        let eth = registry.get("Ethereum").unwrap();
        assert_eq!(eth.chain_id, 1);
        assert_eq!(eth.symbol, "ETH");

        let etc = registry.get_by_chain_id(61).unwrap();
        assert_eq!(etc.id, "EthereumClassic");

        assert!(registry.get("Dogecoin").is_none());
    }

    #[test]
    fn test_standard_paths_are_valid() {
        for standard in STANDARD_PATHS.iter() {
            let template = DerivationPathTemplate {
                label: standard.label.to_string(),
                path: standard.path.to_string(),
            };
            assert!(
                template.validate().is_ok(),
                "invalid standard path: {}",
                standard.path
            );
        }
    }

    #[test]
    fn test_base_paths_by_wallet_kind() {
        let registry = NetworkRegistry::new();

        let ledger = registry.base_paths(WalletKind::Ledger, "Ethereum").unwrap();
        let labels: Vec<&str> = ledger.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Default (ETH)", "Ledger Live", "Ledger Legacy"]);

        let trezor = registry.base_paths(WalletKind::Trezor, "Ethereum").unwrap();
        assert_eq!(trezor.len(), 1);
        assert_eq!(trezor[0].path, "m/44'/60'/0'/0/<addr>");
    }

    #[test]
    fn test_unsupported_network() {
        let registry = NetworkRegistry::new();
        let err = registry
            .base_paths(WalletKind::Mnemonic, "Dogecoin")
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::UnsupportedNetwork(_)));
    }

    #[test]
    fn test_wallet_kind_parse() {
        assert_eq!("Ledger".parse::<WalletKind>().unwrap(), WalletKind::Ledger);
        assert_eq!("mnemonic".parse::<WalletKind>().unwrap(), WalletKind::Mnemonic);
        assert!("keepkey".parse::<WalletKind>().is_err());
        assert!(WalletKind::Trezor.is_hardware());
        assert!(!WalletKind::Mnemonic.is_hardware());
    }
}
