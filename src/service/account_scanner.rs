//! 账户扫描决策
//!
//! 每收到一批扫描结果，决定下一步：继续扩展缺口窗口、扫描自定义路径、
//! 宣告完成，或者什么都不做。本模块不做任何 I/O。
//!
//! # 缺口规则
//! 对每个路径模板，设 `h` 为已扫描的最高索引，`k` 为已使用的最高索引
//! （从未使用时为 -1）。末尾连续未使用数量为 `h - k`：
//! - `h - k < G`：请求下一个窗口 `[h+1 .. h+G]`
//! - `h - k >= G`：该模板扫描结束
//!
//! 例：G = 20，已扫描 0..=19，索引 0 已使用 → 请求 20..=39。

use std::collections::{HashMap, HashSet};

use crate::domain::derivation_path::{DerivationPathTemplate, ExtendedDerivationPath};
use crate::domain::scanned_account::ScannedAccount;
use crate::service::path_set_manager::{CustomPathSet, PathSetManager};

/// 扫描决策结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// 继续扩展缺口窗口（每个模板一个窗口）
    ContinueGap(Vec<ExtendedDerivationPath>),
    /// 缺口已稳定，扫描尚未出现在结果中的自定义路径
    ContinueCustom(Vec<ExtendedDerivationPath>),
    /// 无缺口、无待扫自定义路径、无在途请求
    Complete,
    /// 无需动作（尚无结果、无会话，或有在途请求待返回）
    Idle,
}

impl NextAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::ContinueGap(_) => "continue_gap",
            NextAction::ContinueCustom(_) => "continue_custom",
            NextAction::Complete => "complete",
            NextAction::Idle => "idle",
        }
    }

    /// 需要请求的路径
    pub fn paths(&self) -> &[ExtendedDerivationPath] {
        match self {
            NextAction::ContinueGap(paths) | NextAction::ContinueCustom(paths) => paths,
            NextAction::Complete | NextAction::Idle => &[],
        }
    }
}

/// 一次决策的输入
#[derive(Debug, Clone, Copy)]
pub struct ScanBatch<'a> {
    /// 当前会话累计的扫描结果
    pub accounts: &'a [ScannedAccount],
    pub custom_paths: &'a CustomPathSet,
    /// 在途请求涉及的路径身份
    pub in_flight: &'a HashSet<String>,
    /// 请求已返回过结果的路径身份（结果可能为空）
    pub answered: &'a HashSet<String>,
    pub session_available: bool,
}

/// 单个模板的扫描统计
#[derive(Debug, Clone)]
struct TemplateWindow<'a> {
    template: &'a DerivationPathTemplate,
    highest_scanned: u32,
    highest_used: Option<u32>,
}

impl TemplateWindow<'_> {
    /// 最后一个已使用地址之后连续未使用的数量
    fn trailing_unused(&self) -> u64 {
        let scanned = u64::from(self.highest_scanned);
        match self.highest_used {
            Some(used) => scanned - u64::from(used),
            None => scanned + 1,
        }
    }
}

/// 账户扫描器
#[derive(Debug, Clone)]
pub struct AccountScanner {
    gap: u32,
}

impl AccountScanner {
    /// 创建扫描器（gap 至少为 1）
    pub fn new(gap: u32) -> Self {
        Self { gap: gap.max(1) }
    }

    pub fn gap(&self) -> u32 {
        self.gap
    }

    /// 根据累计结果决定下一步
    ///
    /// 优先级：缺口扩展 > 自定义路径 > 完成。有在途请求时不会返回 `Complete`。
    pub fn on_scan_result(&self, batch: &ScanBatch<'_>) -> NextAction {
        if !batch.session_available || batch.accounts.is_empty() {
            return NextAction::Idle;
        }

        let gap_items = self.gap_items(batch.accounts, batch.in_flight);
        if !gap_items.is_empty() {
            return NextAction::ContinueGap(gap_items);
        }

        let custom_items = self.custom_items(
            batch.accounts,
            batch.custom_paths,
            batch.in_flight,
            batch.answered,
        );
        if !custom_items.is_empty() {
            return NextAction::ContinueCustom(custom_items);
        }

        if batch.in_flight.is_empty() {
            NextAction::Complete
        } else {
            NextAction::Idle
        }
    }

    /// 需要继续扩展的缺口窗口（按模板首次出现顺序）
    pub fn gap_items(
        &self,
        accounts: &[ScannedAccount],
        in_flight: &HashSet<String>,
    ) -> Vec<ExtendedDerivationPath> {
        Self::windows(accounts)
            .into_iter()
            .filter(|w| !in_flight.contains(w.template.path.as_str()))
            .filter(|w| w.trailing_unused() < u64::from(self.gap))
            .filter_map(|w| PathSetManager::next_window(w.template, w.highest_scanned, self.gap))
            .collect()
    }

    /// 仍需请求的自定义路径
    ///
    /// 跳过：已出现在扫描结果中、在途、请求已返回，
    /// 或窗口内每个具体路径都已被其他模板扫描过。
    pub fn custom_items(
        &self,
        accounts: &[ScannedAccount],
        custom_paths: &CustomPathSet,
        in_flight: &HashSet<String>,
        answered: &HashSet<String>,
    ) -> Vec<ExtendedDerivationPath> {
        let scanned: HashSet<&str> = accounts.iter().map(|a| a.identity()).collect();
        let resolved: HashSet<&str> = accounts.iter().map(|a| a.resolved_path()).collect();

        custom_paths
            .iter()
            .filter(|p| {
                !scanned.contains(p.identity())
                    && !in_flight.contains(p.identity())
                    && !answered.contains(p.identity())
            })
            .filter(|p| {
                let covered = PathSetManager::expand(p)
                    .map(|items| items.iter().all(|i| resolved.contains(i.path.as_str())))
                    .unwrap_or(false);
                !covered
            })
            .cloned()
            .collect()
    }

    /// 按模板汇总扫描结果
    fn windows(accounts: &[ScannedAccount]) -> Vec<TemplateWindow<'_>> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut windows: Vec<TemplateWindow<'_>> = Vec::new();

        for account in accounts {
            let index = account.index();
            let used = account.is_used.then_some(index);

            match positions.get(account.identity()) {
                Some(&pos) => {
                    let window = &mut windows[pos];
                    window.highest_scanned = window.highest_scanned.max(index);
                    window.highest_used = window.highest_used.max(used);
                }
                None => {
                    positions.insert(account.identity(), windows.len());
                    windows.push(TemplateWindow {
                        template: &account.path_item.base_path,
                        highest_scanned: index,
                        highest_used: used,
                    });
                }
            }
        }

        windows
    }
}
