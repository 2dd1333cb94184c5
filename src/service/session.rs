//! 设备会话与外部协作方接口
//!
//! 引擎从不检查会话内部，只把它原样交给扫描请求。
//! 所有请求都带 `RequestTicket`，用于丢弃 `reset()` 之后迟到的结果。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::chain_config::{Asset, Network, WalletKind};
use crate::domain::derivation_path::ExtendedDerivationPath;
use crate::domain::scanned_account::ScannedAccount;
use crate::error::{ConnectError, ScanError};

/// 已认证的设备/软件会话句柄
#[derive(Clone)]
pub struct ConnectionSession {
    id: Uuid,
    wallet_kind: WalletKind,
    network_id: String,
    connected_at: chrono::DateTime<chrono::Utc>,
    handle: Arc<dyn Any + Send + Sync>,
}

impl ConnectionSession {
    /// 包装协作方自己的会话对象
    pub fn new<T: Any + Send + Sync>(
        wallet_kind: WalletKind,
        network_id: impl Into<String>,
        handle: T,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_kind,
            network_id: network_id.into(),
            connected_at: chrono::Utc::now(),
            handle: Arc::new(handle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn wallet_kind(&self) -> WalletKind {
        self.wallet_kind
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn connected_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.connected_at
    }

    /// 协作方取回自己的会话对象
    pub fn handle<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl fmt::Debug for ConnectionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSession")
            .field("id", &self.id)
            .field("wallet_kind", &self.wallet_kind)
            .field("network_id", &self.network_id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ConnectionSession {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// 请求凭据
///
/// `generation` 在 `reset()`（以及切换资产）时递增，旧代的结果一律丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestTicket {
    pub generation: u64,
    pub request_id: u64,
}

/// 连接请求
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub ticket: RequestTicket,
    pub wallet_kind: WalletKind,
    pub network: Network,
    pub asset: Asset,
    /// 合并后的派生路径（基础 + 自定义）
    pub paths: Vec<ExtendedDerivationPath>,
}

/// 扫描批次请求
#[derive(Debug, Clone)]
pub struct ScanBatchRequest {
    pub ticket: RequestTicket,
    pub session: ConnectionSession,
    pub asset: Asset,
    /// 本批要查询的窗口，身份互不重复
    pub paths: Vec<ExtendedDerivationPath>,
}

/// 控制器交给外部执行方的命令
#[derive(Debug, Clone)]
pub enum DiscoveryCommand {
    Connect(ConnectRequest),
    FetchAccounts(ScanBatchRequest),
}

impl DiscoveryCommand {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            DiscoveryCommand::Connect(request) => request.ticket,
            DiscoveryCommand::FetchAccounts(request) => request.ticket,
        }
    }
}

/// 建立设备会话的能力
#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectionSession, ConnectError>;
}

/// 派生地址并查询使用情况的能力
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn fetch_accounts(
        &self,
        request: &ScanBatchRequest,
    ) -> Result<Vec<ScannedAccount>, ScanError>;
}
