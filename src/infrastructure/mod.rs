pub mod logging;
pub mod memory_wallet; // 确定性内存钱包（测试/模拟）
