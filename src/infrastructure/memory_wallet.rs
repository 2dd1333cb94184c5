//! 内存钱包
//!
//! 确定性的设备/余额查询替身：地址由 seed 与具体路径的 SHA-256 派生，
//! 已使用的路径和余额由调用方预置。用于测试、基准和命令行模拟。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::chain_config::NetworkRegistry;
use crate::domain::derivation_path::ExtendedDerivationPath;
use crate::domain::scanned_account::ScannedAccount;
use crate::error::{ConnectError, ScanError};
use crate::service::path_set_manager::PathSetManager;
use crate::service::session::{
    AccountFetcher, ConnectRequest, ConnectionSession, ScanBatchRequest, WalletConnector,
};

/// 内存钱包会话句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySessionHandle {
    pub wallet_id: Uuid,
    pub network_id: String,
}

pub struct MemoryWallet {
    id: Uuid,
    seed: String,
    networks: HashSet<String>,
    /// 具体路径 -> 余额
    used: HashMap<String, Decimal>,
    reject_with: Option<ConnectError>,
    /// 接下来若干次扫描返回失败
    failing_scans: AtomicU32,
    latency: Duration,
    requests: Mutex<Vec<Vec<ExtendedDerivationPath>>>,
}

impl MemoryWallet {
    /// 支持注册表中全部网络的钱包
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed: seed.into(),
            networks: NetworkRegistry::new()
                .all()
                .into_iter()
                .map(|n| n.id.clone())
                .collect(),
            used: HashMap::new(),
            reject_with: None,
            failing_scans: AtomicU32::new(0),
            latency: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 只支持指定网络
    pub fn with_networks<I, S>(mut self, networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.networks = networks.into_iter().map(Into::into).collect();
        self
    }

    /// 预置已使用的具体路径
    pub fn with_used(mut self, path: impl Into<String>, balance: Decimal) -> Self {
        self.used.insert(path.into(), balance);
        self
    }

    pub fn with_used_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for path in paths {
            self.used.insert(path.into(), Decimal::ONE);
        }
        self
    }

    /// 连接时返回指定错误
    pub fn rejecting(mut self, err: ConnectError) -> Self {
        self.reject_with = Some(err);
        self
    }

    /// 接下来 `count` 次扫描失败
    pub fn failing_scans(self, count: u32) -> Self {
        self.failing_scans.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 确定性伪地址：`0x` + SHA-256(seed | path) 前 20 字节
    pub fn derive_address(&self, path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(b"|");
        hasher.update(path.as_bytes());
        let digest = hasher.finalize();
        format!("0x{}", hex::encode(&digest[..20]))
    }

    /// 已收到的扫描请求（按到达顺序）
    pub async fn requests(&self) -> Vec<Vec<ExtendedDerivationPath>> {
        self.requests.lock().await.clone()
    }

    /// 已查询过的具体地址数量
    pub async fn queried_addresses(&self) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .flatten()
            .map(|p| p.num_addresses as usize)
            .sum()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn take_failure(&self) -> bool {
        self.failing_scans
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl WalletConnector for MemoryWallet {
    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectionSession, ConnectError> {
        self.simulate_latency().await;

        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        if !self.networks.contains(&request.network.id) {
            return Err(ConnectError::UnsupportedNetwork(request.network.id.clone()));
        }

        Ok(ConnectionSession::new(
            request.wallet_kind,
            request.network.id.clone(),
            MemorySessionHandle {
                wallet_id: self.id,
                network_id: request.network.id.clone(),
            },
        ))
    }
}

#[async_trait]
impl AccountFetcher for MemoryWallet {
    async fn fetch_accounts(
        &self,
        request: &ScanBatchRequest,
    ) -> Result<Vec<ScannedAccount>, ScanError> {
        self.simulate_latency().await;

        let handle = request
            .session
            .handle::<MemorySessionHandle>()
            .filter(|h| h.wallet_id == self.id)
            .ok_or_else(|| ScanError::DeviceUnavailable("session belongs to another wallet".into()))?;

        self.requests.lock().await.push(request.paths.clone());

        if self.take_failure() {
            return Err(ScanError::QueryFailed(format!(
                "simulated failure on {}",
                handle.network_id
            )));
        }

        let mut accounts = Vec::new();
        for path in &request.paths {
            let items =
                PathSetManager::expand(path).map_err(|e| ScanError::QueryFailed(e.to_string()))?;
            for item in items {
                let address = self.derive_address(&item.path);
                let account = match self.used.get(&item.path) {
                    Some(balance) => ScannedAccount::new(item, address)
                        .with_balance(*balance)
                        .mark_used(),
                    None => ScannedAccount::new(item, address).with_balance(Decimal::ZERO),
                };
                accounts.push(account);
            }
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain_config::{Asset, WalletKind};
    use crate::domain::derivation_path::DerivationPathTemplate;
    use crate::service::session::RequestTicket;

    const TICKET: RequestTicket = RequestTicket {
        generation: 0,
        request_id: 1,
    };

    fn connect_request(network_id: &str) -> ConnectRequest {
        let network = NetworkRegistry::new().get(network_id).unwrap().clone();
        ConnectRequest {
            ticket: TICKET,
            wallet_kind: WalletKind::Mnemonic,
            asset: Asset::native(&network),
            network,
            paths: Vec::new(),
        }
    }

    fn window(offset: u32, num: u32) -> ExtendedDerivationPath {
        ExtendedDerivationPath::new(
            DerivationPathTemplate::new("Default (ETH)", "m/44'/60'/0'/0/<addr>").unwrap(),
            offset,
            num,
        )
    }

    #[test]
    fn test_derive_address_is_deterministic() {
        let a = MemoryWallet::new("seed");
        let b = MemoryWallet::new("seed");
        let c = MemoryWallet::new("other");

        let address = a.derive_address("m/44'/60'/0'/0/0");
        assert_eq!(address, b.derive_address("m/44'/60'/0'/0/0"));
        assert_ne!(address, c.derive_address("m/44'/60'/0'/0/0"));
        assert_ne!(address, a.derive_address("m/44'/60'/0'/0/1"));
        assert_eq!(address.len(), 42);
        assert!(address.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_connect_and_fetch() {
        let wallet = MemoryWallet::new("seed").with_used("m/44'/60'/0'/0/1", Decimal::new(15, 1));
        let request = connect_request("Ethereum");
        let session = wallet.connect(&request).await.unwrap();

        let accounts = wallet
            .fetch_accounts(&ScanBatchRequest {
                ticket: TICKET,
                session,
                asset: request.asset.clone(),
                paths: vec![window(0, 3)],
            })
            .await
            .unwrap();

        assert_eq!(accounts.len(), 3);
        assert!(!accounts[0].is_used);
        assert!(accounts[1].is_used);
        assert_eq!(accounts[1].balance, Some(Decimal::new(15, 1)));
        assert_eq!(wallet.queried_addresses().await, 3);
    }

    #[test]
    fn test_requests_start_empty() {
        let wallet = MemoryWallet::new("seed");
        assert!(tokio_test::block_on(wallet.requests()).is_empty());
        assert_eq!(tokio_test::block_on(wallet.queried_addresses()), 0);
    }

    #[tokio::test]
    async fn test_unsupported_network_and_rejection() {
        let wallet = MemoryWallet::new("seed").with_networks(["Ethereum"]);
        let err = wallet.connect(&connect_request("Sepolia")).await.unwrap_err();
        assert_eq!(err, ConnectError::UnsupportedNetwork("Sepolia".into()));

        let wallet = MemoryWallet::new("seed").rejecting(ConnectError::Rejected("denied".into()));
        assert!(wallet.connect(&connect_request("Ethereum")).await.is_err());
    }

    #[tokio::test]
    async fn test_failing_scans_then_recover() {
        let wallet = MemoryWallet::new("seed").failing_scans(1);
        let request = connect_request("Ethereum");
        let session = wallet.connect(&request).await.unwrap();
        let scan = ScanBatchRequest {
            ticket: TICKET,
            session,
            asset: request.asset.clone(),
            paths: vec![window(0, 2)],
        };

        assert!(matches!(
            wallet.fetch_accounts(&scan).await,
            Err(ScanError::QueryFailed(_))
        ));
        assert_eq!(wallet.fetch_accounts(&scan).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_foreign_session_rejected() {
        let wallet = MemoryWallet::new("seed");
        let request = connect_request("Ethereum");
        let foreign = ConnectionSession::new(WalletKind::Ledger, "Ethereum", ());

        let err = wallet
            .fetch_accounts(&ScanBatchRequest {
                ticket: TICKET,
                session: foreign,
                asset: request.asset,
                paths: vec![window(0, 1)],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::DeviceUnavailable(_)));
    }
}
