// ==========================================
// 用地适宜性评估 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 只有结构非法输入与标定发散会上抛, 其余问题走告警
// ==========================================

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 配置错误 =====
    #[error(transparent)]
    Config(#[from] ConfigError),

    // ===== 数据错误 =====
    #[error("判据 {key} 的数据文件不存在: {path}")]
    MissingDataFile { key: String, path: String },

    // ===== 标定错误 =====
    #[error("阈值标定发散: 达到比例 {achieved:.6}, 目标比例 {target:.6}")]
    CalibrationDivergence { achieved: f64, target: f64 },

    #[error("标定参数 {key} 试算得到无效比例: 区域无可用面积")]
    CalibrationEmptyRegion { key: String },

    #[error("标定参数 {key} 不在配置中或不可调整")]
    CalibrationParameterMissing { key: String },

    // ===== 技术错误 =====
    #[error("技术 {technology} 不支持操作 {operation}")]
    UnsupportedOperation {
        technology: String,
        operation: String,
    },

    // ===== 输出错误 =====
    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    /// 空间引擎原语失败
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
