use std::collections::HashMap;

use once_cell::sync::Lazy;

static ERROR_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(error_map);

pub fn error_map() -> HashMap<&'static str, &'static str> {
    // 与前端文案对齐的错误映射
    HashMap::from([
        ("device_unreachable", "无法连接钱包设备，请检查设备连接后重试"),
        ("user_rejected", "已在设备上取消连接"),
        ("unsupported_network", "当前钱包不支持该网络"),
        ("connect_timeout", "连接超时，请解锁设备后重试"),
        ("scan_failed", "查询账户失败，请稍后重试"),
        ("device_unavailable", "钱包设备已断开，请重新连接"),
        ("scan_timeout", "查询账户超时，请稍后重试"),
        ("not_connected", "请先连接钱包"),
        ("already_connected", "钱包已连接"),
        ("invalid_transition", "当前状态不允许该操作"),
        ("scan_in_flight", "该路径正在扫描中，请稍候"),
        ("invalid_path", "派生路径格式错误"),
        ("invalid_config", "配置错误"),
    ])
}

/// 查找错误码对应的用户提示
pub fn user_message(code: &str) -> Option<&'static str> {
    ERROR_MAP.get(code).copied()
}
