//! 发现会话控制器
//!
//! 连接 → 扫描 → 完成/错误 的编排。每个外部事件（连接结果、扫描结果、
//! 新增自定义路径、切换资产）对应一次显式转换，控制器只返回命令，
//! 由外部执行方负责真正的 I/O。

use crate::config::DiscoveryConfig;
use crate::domain::chain_config::{Asset, Network, WalletKind};
use crate::domain::derivation_path::{DerivationPathTemplate, ExtendedDerivationPath};
use crate::domain::discovery_phase::{DiscoveryPhase, DiscoveryStateMachine};
use crate::domain::scanned_account::ScannedAccount;
use crate::error::{ConnectError, DiscoveryError, ScanError};
use crate::service::account_scanner::{AccountScanner, NextAction, ScanBatch};
use crate::service::discovery_state::{DiscoverySnapshot, DiscoveryState, PendingScan, ScanKind};
use crate::service::path_set_manager::{MergedPath, PathSetManager};
use crate::service::session::{
    ConnectRequest, ConnectionSession, DiscoveryCommand, RequestTicket, ScanBatchRequest,
};

/// 发现会话控制器（`DiscoveryState` 的唯一写入方）
#[derive(Debug)]
pub struct DiscoverySessionController {
    wallet_kind: WalletKind,
    base_paths: Vec<ExtendedDerivationPath>,
    scanner: AccountScanner,
    state: DiscoveryState,
    generation: u64,
    next_request_id: u64,
}

impl DiscoverySessionController {
    /// 创建控制器
    ///
    /// 基础模板按身份去重，初始窗口为 `[0, gap)`。
    pub fn new(wallet_kind: WalletKind, base_templates: Vec<DerivationPathTemplate>, gap: u32) -> Self {
        let scanner = AccountScanner::new(gap);
        let base_paths = PathSetManager::dedup_by_identity(
            base_templates
                .into_iter()
                .map(|t| ExtendedDerivationPath::initial(t, scanner.gap()))
                .collect(),
        );

        Self {
            wallet_kind,
            base_paths,
            scanner,
            state: DiscoveryState::default(),
            generation: 0,
            next_request_id: 0,
        }
    }

    pub fn from_config(
        wallet_kind: WalletKind,
        base_templates: Vec<DerivationPathTemplate>,
        config: &DiscoveryConfig,
    ) -> Self {
        Self::new(wallet_kind, base_templates, config.gap_limit)
    }

    pub fn wallet_kind(&self) -> WalletKind {
        self.wallet_kind
    }

    pub fn phase(&self) -> DiscoveryPhase {
        self.state.phase
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    pub fn gap(&self) -> u32 {
        self.scanner.gap()
    }

    /// 当前会话代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_connected(&self) -> bool {
        self.state.session.is_some()
    }

    /// 基础路径 ∪ 自定义路径
    pub fn merged_paths(&self) -> Vec<MergedPath> {
        PathSetManager::merge_paths(&self.base_paths, self.state.custom_paths.as_slice())
    }

    /// 只读快照
    pub fn snapshot(&self) -> DiscoverySnapshot {
        let phase = self.state.phase;
        DiscoverySnapshot {
            phase,
            scanned_accounts: self.state.scanned_accounts.clone(),
            is_completed: phase == DiscoveryPhase::Completed,
            is_connecting: phase == DiscoveryPhase::Connecting,
            is_connected: self.is_connected(),
            account_queue: self
                .state
                .pending
                .iter()
                .flat_map(|p| p.paths.iter().cloned())
                .collect(),
            connection_error: self.state.last_error.as_ref().map(DiscoveryError::to_body),
            merged_dpaths: self.merged_paths(),
            selected_asset: self.state.asset.clone(),
            network: self.state.network.clone(),
            generation: self.generation,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 命令
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 请求连接
    ///
    /// 连接失败后可以再次调用；连接中或已连接时拒绝。
    pub fn request_connection(
        &mut self,
        network: Network,
        asset: Asset,
    ) -> Result<DiscoveryCommand, DiscoveryError> {
        if self.is_connected() {
            return Err(DiscoveryError::AlreadyConnected);
        }
        if self.state.phase == DiscoveryPhase::Connecting {
            return Err(DiscoveryError::InvalidTransition {
                from: DiscoveryPhase::Connecting.as_str(),
                to: DiscoveryPhase::Connecting.as_str(),
            });
        }

        self.transition(DiscoveryPhase::Connecting, "connection requested")?;
        self.state.last_error = None;
        self.state.network = Some(network.clone());
        self.state.asset = Some(asset.clone());

        let ticket = self.issue_ticket();
        self.state.pending_connect = Some(ticket);

        tracing::info!(
            wallet_kind = %self.wallet_kind,
            network = %network.id,
            asset = %asset.ticker,
            "Requesting wallet connection"
        );

        Ok(DiscoveryCommand::Connect(ConnectRequest {
            ticket,
            wallet_kind: self.wallet_kind,
            network,
            asset,
            paths: self.merged_paths().into_iter().map(|m| m.path).collect(),
        }))
    }

    /// 连接结果
    pub fn on_connected(
        &mut self,
        ticket: RequestTicket,
        result: Result<ConnectionSession, ConnectError>,
    ) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        if self.state.pending_connect != Some(ticket) {
            tracing::warn!(
                generation = ticket.generation,
                request_id = ticket.request_id,
                "Dropping stale connection result"
            );
            return Ok(Vec::new());
        }
        self.state.pending_connect = None;

        match result {
            Ok(session) => {
                tracing::info!(session_id = %session.id(), "Wallet session connected");
                self.state.session = Some(session);
                self.start_initial_scan("connected")
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection failed");
                self.state.last_error = Some(e.into());
                self.transition(DiscoveryPhase::Error, "connection failed")?;
                Ok(Vec::new())
            }
        }
    }

    /// 扫描结果
    ///
    /// 旧代或未知请求的结果直接丢弃；失败只记录错误，不丢弃已扫描的账户。
    pub fn on_accounts_scanned(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<ScannedAccount>, ScanError>,
    ) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                "Dropping scan result from previous session"
            );
            return Ok(Vec::new());
        }

        let Some(pos) = self.state.pending.iter().position(|p| p.ticket == ticket) else {
            tracing::warn!(request_id = ticket.request_id, "Dropping unknown scan result");
            return Ok(Vec::new());
        };
        let pending = self.state.pending.remove(pos);

        let accounts = match result {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(
                    request_id = ticket.request_id,
                    kind = ?pending.kind,
                    error = %e,
                    "Account scan failed"
                );
                self.state.last_error = Some(e.into());
                self.state.failed_scan = Some(pending);
                if self.state.phase == DiscoveryPhase::Scanning {
                    self.transition(DiscoveryPhase::Error, "scan failed")?;
                }
                return Ok(Vec::new());
            }
        };

        self.state.mark_answered(&pending.paths);

        if accounts.is_empty() {
            tracing::warn!(request_id = ticket.request_id, "Scan returned an empty batch");
            return Ok(Vec::new());
        }

        let added = self.state.append_accounts(accounts);
        tracing::debug!(
            request_id = ticket.request_id,
            kind = ?pending.kind,
            added,
            total = self.state.scanned_accounts.len(),
            "Scan batch received"
        );

        if self.state.phase != DiscoveryPhase::Scanning {
            return Ok(Vec::new());
        }
        self.advance()
    }

    /// 新增自定义路径
    ///
    /// 已完成时如有真正新增的路径，重新进入扫描。
    pub fn add_custom_paths(
        &mut self,
        paths: Vec<ExtendedDerivationPath>,
    ) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        if !self.is_connected() {
            return Err(DiscoveryError::NotConnected);
        }

        let added = self.state.custom_paths.extend_with(paths);
        if added.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(added = added.len(), "Custom derivation paths added");

        match self.state.phase {
            DiscoveryPhase::Completed => {
                self.transition(DiscoveryPhase::Scanning, "custom paths added")?;
                self.advance()
            }
            DiscoveryPhase::Scanning if !self.state.is_in_flight() => self.advance(),
            _ => Ok(Vec::new()),
        }
    }

    /// 手动追加单路径扫描
    ///
    /// 不改变阶段和其他模板的完成状态；同一模板已在途时拒绝。
    pub fn scan_more_addresses(
        &mut self,
        path: ExtendedDerivationPath,
    ) -> Result<DiscoveryCommand, DiscoveryError> {
        if !self.is_connected() {
            return Err(DiscoveryError::NotConnected);
        }
        if self.state.in_flight_identities().contains(path.identity()) {
            return Err(DiscoveryError::ScanInFlight(path.identity().to_string()));
        }

        self.issue_fetch(ScanKind::AdHoc, vec![path])
    }

    /// 切换资产
    ///
    /// 已连接时丢弃累计结果和在途请求，按新资产重新初始扫描。
    pub fn update_asset(&mut self, asset: Asset) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        tracing::info!(asset = %asset.ticker, "Selected asset updated");
        self.state.asset = Some(asset);

        if !self.is_connected() {
            return Ok(Vec::new());
        }

        self.generation += 1;
        self.state.pending.clear();
        self.state.failed_scan = None;
        self.state.scanned_accounts.clear();
        self.state.answered.clear();
        self.state.last_error = None;
        self.start_initial_scan("asset updated")
    }

    /// 扫描失败后恢复
    ///
    /// 有失败记录时重发该请求，否则按累计结果重新决策。
    pub fn resume(&mut self) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        if !self.is_connected() {
            return Err(DiscoveryError::NotConnected);
        }

        if self.state.phase == DiscoveryPhase::Error {
            self.transition(DiscoveryPhase::Scanning, "scan resumed")?;
        }

        if let Some(failed) = self.state.failed_scan.take() {
            self.state.last_error = None;
            return Ok(vec![self.issue_fetch(failed.kind, failed.paths)?]);
        }

        if self.state.phase == DiscoveryPhase::Scanning && !self.state.is_in_flight() {
            return self.advance();
        }
        Ok(Vec::new())
    }

    /// 重置（任何状态均可调用）
    ///
    /// 递增会话代数，之后到达的旧结果全部丢弃。
    pub fn reset(&mut self) {
        let from = self.state.phase;
        self.generation += 1;
        self.state = DiscoveryState::default();
        self.state
            .transitions
            .push(DiscoveryStateMachine::create_transition(
                from,
                DiscoveryPhase::Disconnected,
                Some("reset".to_string()),
            ));
        tracing::info!(generation = self.generation, "Discovery session reset");
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 内部
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn transition(&mut self, to: DiscoveryPhase, reason: &str) -> Result<(), DiscoveryError> {
        let from = self.state.phase;
        DiscoveryStateMachine::validate_transition(from, to)?;
        if from == to {
            return Ok(());
        }

        tracing::info!(from = from.as_str(), to = to.as_str(), reason, "Discovery phase changed");
        self.state.phase = to;
        self.state
            .transitions
            .push(DiscoveryStateMachine::create_transition(
                from,
                to,
                Some(reason.to_string()),
            ));
        Ok(())
    }

    fn issue_ticket(&mut self) -> RequestTicket {
        self.next_request_id += 1;
        RequestTicket {
            generation: self.generation,
            request_id: self.next_request_id,
        }
    }

    /// 初始扫描：合并后的全部路径，窗口从 0 开始
    fn start_initial_scan(&mut self, reason: &str) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        let paths: Vec<ExtendedDerivationPath> =
            self.merged_paths().into_iter().map(|m| m.path).collect();

        if paths.is_empty() {
            tracing::info!("No derivation paths to scan");
            self.transition(DiscoveryPhase::Completed, "nothing to scan")?;
            return Ok(Vec::new());
        }

        self.transition(DiscoveryPhase::Scanning, reason)?;
        Ok(vec![self.issue_fetch(ScanKind::Initial, paths)?])
    }

    fn issue_fetch(
        &mut self,
        kind: ScanKind,
        paths: Vec<ExtendedDerivationPath>,
    ) -> Result<DiscoveryCommand, DiscoveryError> {
        let session = self
            .state
            .session
            .clone()
            .ok_or(DiscoveryError::NotConnected)?;
        let asset = self
            .state
            .asset
            .clone()
            .ok_or(DiscoveryError::NotConnected)?;

        let paths = PathSetManager::dedup_by_identity(paths);
        let ticket = self.issue_ticket();

        tracing::debug!(
            request_id = ticket.request_id,
            kind = ?kind,
            paths = paths.len(),
            "Issuing account scan"
        );

        self.state.pending.push(PendingScan {
            ticket,
            kind,
            paths: paths.clone(),
        });

        Ok(DiscoveryCommand::FetchAccounts(ScanBatchRequest {
            ticket,
            session,
            asset,
            paths,
        }))
    }

    /// 运行扫描决策并执行结果
    fn advance(&mut self) -> Result<Vec<DiscoveryCommand>, DiscoveryError> {
        let in_flight = self.state.in_flight_identities();
        let action = self.scanner.on_scan_result(&ScanBatch {
            accounts: &self.state.scanned_accounts,
            custom_paths: &self.state.custom_paths,
            in_flight: &in_flight,
            answered: &self.state.answered,
            session_available: self.state.session.is_some(),
        });

        tracing::debug!(action = action.as_str(), in_flight = in_flight.len(), "Scan decision");

        match action {
            NextAction::ContinueGap(paths) => Ok(vec![self.issue_fetch(ScanKind::Gap, paths)?]),
            NextAction::ContinueCustom(paths) => {
                Ok(vec![self.issue_fetch(ScanKind::Custom, paths)?])
            }
            NextAction::Complete => {
                self.transition(DiscoveryPhase::Completed, "no more addresses to scan")?;
                tracing::info!(
                    scanned = self.state.scanned_accounts.len(),
                    used = self.state.used_accounts().count(),
                    "✅ Account discovery completed"
                );
                Ok(Vec::new())
            }
            NextAction::Idle => Ok(Vec::new()),
        }
    }
}
