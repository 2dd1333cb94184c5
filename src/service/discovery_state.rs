//! 发现会话状态
//!
//! 由控制器独占写入；对外只暴露只读快照

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::chain_config::{Asset, Network};
use crate::domain::derivation_path::ExtendedDerivationPath;
use crate::domain::discovery_phase::{DiscoveryPhase, PhaseTransition};
use crate::domain::scanned_account::ScannedAccount;
use crate::error::{DiscoveryError, ErrorBody};
use crate::service::path_set_manager::{CustomPathSet, MergedPath};
use crate::service::session::{ConnectionSession, RequestTicket};

/// 扫描请求来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// 连接后的初始扫描
    Initial,
    /// 缺口扩展
    Gap,
    /// 自定义路径
    Custom,
    /// 用户手动追加的单路径扫描
    AdHoc,
}

/// 在途扫描请求
#[derive(Debug, Clone)]
pub struct PendingScan {
    pub ticket: RequestTicket,
    pub kind: ScanKind,
    pub paths: Vec<ExtendedDerivationPath>,
}

/// 发现会话状态
#[derive(Debug, Default)]
pub struct DiscoveryState {
    pub(crate) phase: DiscoveryPhase,
    pub(crate) network: Option<Network>,
    pub(crate) asset: Option<Asset>,
    pub(crate) session: Option<ConnectionSession>,
    /// 等待中的连接请求
    pub(crate) pending_connect: Option<RequestTicket>,
    /// 累计扫描结果（会话内只追加，按具体路径去重）
    pub(crate) scanned_accounts: Vec<ScannedAccount>,
    pub(crate) custom_paths: CustomPathSet,
    pub(crate) pending: Vec<PendingScan>,
    /// 请求已返回过的路径身份
    pub(crate) answered: HashSet<String>,
    /// 最近一次失败的扫描请求，供 `resume()` 重发
    pub(crate) failed_scan: Option<PendingScan>,
    pub(crate) last_error: Option<DiscoveryError>,
    pub(crate) transitions: Vec<PhaseTransition>,
}

impl DiscoveryState {
    pub fn phase(&self) -> DiscoveryPhase {
        self.phase
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    pub fn asset(&self) -> Option<&Asset> {
        self.asset.as_ref()
    }

    pub fn session(&self) -> Option<&ConnectionSession> {
        self.session.as_ref()
    }

    pub fn scanned_accounts(&self) -> &[ScannedAccount] {
        &self.scanned_accounts
    }

    pub fn custom_paths(&self) -> &CustomPathSet {
        &self.custom_paths
    }

    pub fn pending(&self) -> &[PendingScan] {
        &self.pending
    }

    pub fn last_error(&self) -> Option<&DiscoveryError> {
        self.last_error.as_ref()
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// 是否有扫描请求在途
    pub fn is_in_flight(&self) -> bool {
        !self.pending.is_empty()
    }

    /// 在途请求涉及的路径身份
    pub fn in_flight_identities(&self) -> HashSet<String> {
        self.pending
            .iter()
            .flat_map(|p| p.paths.iter())
            .map(|p| p.identity().to_string())
            .collect()
    }

    /// 追加扫描结果；同一模板下已存在的具体路径忽略，返回新增数量
    ///
    /// 不同模板可能展开成同一个具体路径（例如默认路径索引 0 与
    /// Ledger Live 账户 0），两者各自保留。
    pub(crate) fn append_accounts(&mut self, accounts: Vec<ScannedAccount>) -> usize {
        let mut known: HashSet<(String, String)> = self
            .scanned_accounts
            .iter()
            .map(Self::account_key)
            .collect();

        let before = self.scanned_accounts.len();
        for account in accounts {
            if known.insert(Self::account_key(&account)) {
                self.scanned_accounts.push(account);
            }
        }
        self.scanned_accounts.len() - before
    }

    /// 记录请求已返回的路径身份
    pub(crate) fn mark_answered(&mut self, paths: &[ExtendedDerivationPath]) {
        self.answered
            .extend(paths.iter().map(|p| p.identity().to_string()));
    }

    pub fn answered(&self) -> &HashSet<String> {
        &self.answered
    }

    fn account_key(account: &ScannedAccount) -> (String, String) {
        (
            account.identity().to_string(),
            account.resolved_path().to_string(),
        )
    }

    /// 已使用的账户
    pub fn used_accounts(&self) -> impl Iterator<Item = &ScannedAccount> {
        self.scanned_accounts.iter().filter(|a| a.is_used)
    }
}

/// 只读快照，供 UI 渲染
#[derive(Debug, Clone, Serialize)]
pub struct DiscoverySnapshot {
    pub phase: DiscoveryPhase,
    pub scanned_accounts: Vec<ScannedAccount>,
    pub is_completed: bool,
    pub is_connecting: bool,
    pub is_connected: bool,
    /// 等待结果的扫描窗口
    pub account_queue: Vec<ExtendedDerivationPath>,
    pub connection_error: Option<ErrorBody>,
    pub merged_dpaths: Vec<MergedPath>,
    pub selected_asset: Option<Asset>,
    pub network: Option<Network>,
    pub generation: u64,
}
