//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 最大缺口
pub const MAX_GAP_LIMIT: u32 = 1000;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 账户发现配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// 连续未使用地址数量，达到后停止该模板的扫描
    pub gap_limit: u32,
    /// 单个连接/扫描请求的超时
    pub scan_timeout_secs: u64,
    /// ledger / trezor / gridplus / mnemonic
    pub wallet_kind: String,
    pub network: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            gap_limit: std::env::var("HD_GAP_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            scan_timeout_secs: std::env::var("HD_SCAN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            wallet_kind: std::env::var("HD_WALLET_KIND").unwrap_or_else(|_| "mnemonic".into()),
            network: std::env::var("HD_NETWORK").unwrap_or_else(|_| "Ethereum".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            discovery: DiscoveryConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_GAP_LIMIT).contains(&self.discovery.gap_limit) {
            anyhow::bail!("HD_GAP_LIMIT must be between 1 and {}", MAX_GAP_LIMIT);
        }

        if self.discovery.scan_timeout_secs == 0 {
            anyhow::bail!("HD_SCAN_TIMEOUT_SECS must be greater than 0");
        }

        self.discovery
            .wallet_kind
            .parse::<crate::domain::chain_config::WalletKind>()
            .with_context(|| "HD_WALLET_KIND is invalid")?;

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn config(gap_limit: u32) -> Config {
        Config {
            discovery: DiscoveryConfig {
                gap_limit,
                scan_timeout_secs: 30,
                wallet_kind: "ledger".into(),
                network: "Ethereum".into(),
            },
            logging: LoggingConfig {
                level: "info".into(),
                format: "text".into(),
            },
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[discovery]
gap_limit = 5
scan_timeout_secs = 10
wallet_kind = "trezor"
network = "EthereumClassic"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.discovery.gap_limit, 5);
        assert_eq!(config.discovery.wallet_kind, "trezor");
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_and_missing_file() {
        let config =
            Config::from_env_and_file(Some("/nonexistent/ironscan-config.toml")).unwrap();
        assert!(config.discovery.gap_limit >= 1);
    }

    #[test]
    fn test_config_from_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[discovery]\ngap_limit = \"twenty\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(config(20).validate().is_ok());
        assert!(config(0).validate().is_err());
        assert!(config(MAX_GAP_LIMIT + 1).validate().is_err());

        let mut bad_kind = config(20);
        bad_kind.discovery.wallet_kind = "paper".into();
        assert!(bad_kind.validate().is_err());

        let mut bad_format = config(20);
        bad_format.logging.format = "xml".into();
        assert!(bad_format.validate().is_err());
    }
}
