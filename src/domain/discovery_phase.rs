//! 账户发现状态机
//!
//! 发现流程的阶段定义、合法转换和转换记录

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// 发现流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryPhase {
    #[default]
    Disconnected,
    Connecting,
    Scanning,
    Completed,
    Error,
}

impl DiscoveryPhase {
    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryPhase::Disconnected => "disconnected",
            DiscoveryPhase::Connecting => "connecting",
            DiscoveryPhase::Scanning => "scanning",
            DiscoveryPhase::Completed => "completed",
            DiscoveryPhase::Error => "error",
        }
    }

    /// 是否处于等待外部结果的阶段
    pub fn is_busy(&self) -> bool {
        matches!(self, DiscoveryPhase::Connecting | DiscoveryPhase::Scanning)
    }
}

/// 状态转换记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DiscoveryPhase,
    pub to: DiscoveryPhase,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub reason: Option<String>,
}

/// 发现流程状态机
pub struct DiscoveryStateMachine;

impl DiscoveryStateMachine {
    /// 验证状态转换是否合法
    ///
    /// # 状态转换规则
    /// ```text
    /// Disconnected -> Connecting   请求连接
    /// Connecting   -> Scanning     连接成功，开始初始扫描
    /// Connecting   -> Completed    连接成功但没有任何路径可扫
    /// Connecting   -> Error        连接失败
    /// Scanning     -> Completed    无缺口、无自定义路径、无在途请求
    /// Scanning     -> Error        扫描请求失败
    /// Completed    -> Scanning     新增自定义路径 / 切换资产
    /// Error        -> Connecting   重新请求连接（会话未建立）
    /// Error        -> Scanning     恢复扫描 / 切换资产（会话仍在）
    /// *            -> Disconnected 重置
    /// ```
    pub fn validate_transition(from: DiscoveryPhase, to: DiscoveryPhase) -> Result<(), DiscoveryError> {
        use DiscoveryPhase::*;

        // 相同状态：幂等
        if from == to {
            return Ok(());
        }

        let valid = matches!(
            (from, to),
            (_, Disconnected)
                | (Disconnected, Connecting)
                | (Connecting, Scanning)
                | (Connecting, Completed)
                | (Connecting, Error)
                | (Scanning, Completed)
                | (Scanning, Error)
                | (Completed, Scanning)
                | (Error, Connecting)
                | (Error, Scanning)
        );

        if valid {
            Ok(())
        } else {
            Err(DiscoveryError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// 获取下一个可能状态列表
    pub fn get_next_states(current: DiscoveryPhase) -> Vec<DiscoveryPhase> {
        use DiscoveryPhase::*;

        match current {
            Disconnected => vec![Connecting],
            Connecting => vec![Scanning, Completed, Error, Disconnected],
            Scanning => vec![Completed, Error, Disconnected],
            Completed => vec![Scanning, Disconnected],
            Error => vec![Connecting, Scanning, Disconnected],
        }
    }

    /// 创建状态转换记录
    pub fn create_transition(
        from: DiscoveryPhase,
        to: DiscoveryPhase,
        reason: Option<String>,
    ) -> PhaseTransition {
        PhaseTransition {
            from,
            to,
            timestamp: chrono::Utc::now(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Disconnected,
            DiscoveryPhase::Connecting
        )
        .is_ok());

        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Scanning,
            DiscoveryPhase::Completed
        )
        .is_ok());

        // 新增自定义路径后重新打开扫描
        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Completed,
            DiscoveryPhase::Scanning
        )
        .is_ok());
    }

    #[test]
    fn test_invalid_transitions() {
        // 未连接不能直接扫描
        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Disconnected,
            DiscoveryPhase::Scanning
        )
        .is_err());

        // 已完成不能回到连接中
        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Completed,
            DiscoveryPhase::Connecting
        )
        .is_err());

        assert!(DiscoveryStateMachine::validate_transition(
            DiscoveryPhase::Completed,
            DiscoveryPhase::Error
        )
        .is_err());
    }

    #[test]
    fn test_reset_always_allowed() {
        for phase in [
            DiscoveryPhase::Disconnected,
            DiscoveryPhase::Connecting,
            DiscoveryPhase::Scanning,
            DiscoveryPhase::Completed,
            DiscoveryPhase::Error,
        ] {
            assert!(
                DiscoveryStateMachine::validate_transition(phase, DiscoveryPhase::Disconnected)
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_next_states_match_rules() {
        for phase in [
            DiscoveryPhase::Disconnected,
            DiscoveryPhase::Connecting,
            DiscoveryPhase::Scanning,
            DiscoveryPhase::Completed,
            DiscoveryPhase::Error,
        ] {
            for next in DiscoveryStateMachine::get_next_states(phase) {
                assert!(DiscoveryStateMachine::validate_transition(phase, next).is_ok());
            }
        }
    }

    #[test]
    fn test_busy_phases() {
        assert!(DiscoveryPhase::Connecting.is_busy());
        assert!(DiscoveryPhase::Scanning.is_busy());
        assert!(!DiscoveryPhase::Completed.is_busy());
        assert!(!DiscoveryPhase::Error.is_busy());
    }
}
