//! HD 派生路径模型
//!
//! 路径模板（带一个索引占位符，例如 `m/44'/60'/0'/0/<addr>`）
//! 与扫描窗口（模板 + 起始索引 + 地址数量）

use coins_bip32::path::DerivationPath;
use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// 地址索引占位符
pub const ADDRESS_PLACEHOLDER: &str = "<addr>";
/// 账户索引占位符（Ledger Live 风格路径）
pub const ACCOUNT_PLACEHOLDER: &str = "<account>";
/// BIP32 非硬化索引上限 (2^31 - 1)
pub const MAX_NON_HARDENED_INDEX: u32 = 0x7FFF_FFFF;

/// 派生路径模板
///
/// 模板的 `path` 字符串即路径身份，用于去重和路由。
/// 不含占位符的模板是固定路径，只会展开成它自己。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivationPathTemplate {
    /// 展示名称，例如 "Ledger Live"
    pub label: String,
    /// 路径模板，例如 "m/44'/60'/0'/0/<addr>"
    pub path: String,
}

impl DerivationPathTemplate {
    /// 创建并校验模板
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Result<Self, DiscoveryError> {
        let template = Self {
            label: label.into(),
            path: path.into(),
        };
        template.validate()?;
        Ok(template)
    }

    /// 校验模板格式
    ///
    /// 1. 必须以 `m/` 开头
    /// 2. 最多一个占位符
    /// 3. 以索引 0 展开后必须是合法的 BIP32 路径
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if !self.path.starts_with("m/") {
            return Err(DiscoveryError::InvalidPath(format!(
                "Path must start with 'm/': {}",
                self.path
            )));
        }

        let placeholders = self.path.matches(ADDRESS_PLACEHOLDER).count()
            + self.path.matches(ACCOUNT_PLACEHOLDER).count();
        if placeholders > 1 {
            return Err(DiscoveryError::InvalidPath(format!(
                "Path must contain at most one index placeholder: {}",
                self.path
            )));
        }

        self.resolve(0).map(|_| ())
    }

    /// 模板中的占位符（固定路径返回 None）
    pub fn placeholder(&self) -> Option<&'static str> {
        if self.path.contains(ADDRESS_PLACEHOLDER) {
            Some(ADDRESS_PLACEHOLDER)
        } else if self.path.contains(ACCOUNT_PLACEHOLDER) {
            Some(ACCOUNT_PLACEHOLDER)
        } else {
            None
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.placeholder().is_none()
    }

    /// 用具体索引展开模板
    pub fn resolve(&self, index: u32) -> Result<String, DiscoveryError> {
        if index > MAX_NON_HARDENED_INDEX {
            return Err(DiscoveryError::InvalidPath(format!(
                "Index {} exceeds BIP32 non-hardened range",
                index
            )));
        }

        let resolved = match self.placeholder() {
            Some(token) => self.path.replace(token, &index.to_string()),
            None => self.path.clone(),
        };

        resolved
            .parse::<DerivationPath>()
            .map_err(|e| DiscoveryError::InvalidPath(format!("{}: {}", resolved, e)))?;

        Ok(resolved)
    }
}

/// 扫描窗口：模板 + 起始索引 + 地址数量
///
/// 身份即模板路径字符串。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedDerivationPath {
    pub template: DerivationPathTemplate,
    /// 窗口起始索引
    pub offset: u32,
    /// 窗口内地址数量
    pub num_addresses: u32,
}

impl ExtendedDerivationPath {
    /// 创建扫描窗口
    ///
    /// 固定路径始终是 offset 0、数量 1；其他窗口至少包含一个地址，
    /// 且不会越过 BIP32 非硬化索引上限。
    pub fn new(template: DerivationPathTemplate, offset: u32, num_addresses: u32) -> Self {
        if template.is_fixed() {
            return Self {
                template,
                offset: 0,
                num_addresses: 1,
            };
        }

        let offset = offset.min(MAX_NON_HARDENED_INDEX);
        let room = MAX_NON_HARDENED_INDEX - offset + 1;
        Self {
            template,
            offset,
            num_addresses: num_addresses.clamp(1, room),
        }
    }

    /// 从索引 0 开始、长度为一个 gap 的初始窗口
    pub fn initial(template: DerivationPathTemplate, gap: u32) -> Self {
        Self::new(template, 0, gap)
    }

    /// 路径身份
    pub fn identity(&self) -> &str {
        &self.template.path
    }

    /// 窗口内最后一个索引
    pub fn last_index(&self) -> u32 {
        self.offset + (self.num_addresses - 1)
    }

    /// 窗口覆盖的全部索引
    pub fn indices(&self) -> std::ops::RangeInclusive<u32> {
        self.offset..=self.last_index()
    }
}

/// 已展开的单个地址位置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathItem {
    /// 所属模板
    pub base_path: DerivationPathTemplate,
    /// 展开后的具体路径，例如 "m/44'/60'/0'/0/3"
    pub path: String,
    /// 占位符处的索引
    pub index: u32,
}

impl PathItem {
    /// 展开模板的某个索引
    pub fn resolve(base_path: &DerivationPathTemplate, index: u32) -> Result<Self, DiscoveryError> {
        Ok(Self {
            path: base_path.resolve(index)?,
            base_path: base_path.clone(),
            index,
        })
    }
}
