//! 扫描结果领域模型
//!
//! 由外部查询方（设备会话 + 余额服务）产出，引擎只关心路径身份和是否已使用

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::derivation_path::PathItem;

/// 单个地址的扫描结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedAccount {
    /// 派生出的地址
    pub address: String,
    /// 地址所在的路径位置
    pub path_item: PathItem,
    /// 当前资产余额（查询方未返回时为 None）
    pub balance: Option<Decimal>,
    /// 是否已使用（有余额或有历史交易）
    pub is_used: bool,
}

impl ScannedAccount {
    /// 未使用的地址
    pub fn new(path_item: PathItem, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            path_item,
            balance: None,
            is_used: false,
        }
    }

    /// 附带余额；非零余额即视为已使用
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.is_used = self.is_used || !balance.is_zero();
        self.balance = Some(balance);
        self
    }

    /// 标记为已使用（例如有历史交易但余额为零）
    pub fn mark_used(mut self) -> Self {
        self.is_used = true;
        self
    }

    /// 所属模板的路径身份
    pub fn identity(&self) -> &str {
        &self.path_item.base_path.path
    }

    /// 展开后的具体路径
    pub fn resolved_path(&self) -> &str {
        &self.path_item.path
    }

    pub fn index(&self) -> u32 {
        self.path_item.index
    }
}
