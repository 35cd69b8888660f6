// ==========================================
// 用地适宜性评估 - 可恢复告警
// ==========================================
// 职责: 解析/执行/标定期间的非致命问题, 随报告返回
// 红线: 告警不中断管线; 致命问题走 EngineError
// ==========================================

use crate::domain::types::DataSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigWarning {
    /// 请求的数据源不在允许列表, 已回退到默认源
    UnsupportedSource {
        key: String,
        requested: String,
        fallback: DataSource,
    },
    /// 未实现的判据键, 不执行
    UnknownCriterionKey { key: String },
    /// 辅助判据数据文件不存在, 跳过该项
    MissingAuxiliaryDataFile { key: String, path: PathBuf },
    /// 辅助判据类型无法识别, 跳过该项
    UnrecognizedAuxiliaryType { key: String, declared: String },
    /// 栅格判据缺少 value, 不执行
    MissingRasterValue { key: String },
    /// 判据字段格式错误, 已忽略该字段
    InvalidCriterionField {
        key: String,
        field: String,
        message: String,
    },
    /// 标定结果在宽容差带内但超出请求容差
    CalibrationToleranceMiss {
        achieved: f64,
        target: f64,
        tolerance: f64,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnsupportedSource {
                key,
                requested,
                fallback,
            } => write!(
                f,
                "{} is not supported for {}! 已回退到默认数据源 {}",
                requested, key, fallback
            ),
            ConfigWarning::UnknownCriterionKey { key } => {
                write!(f, "判据 {} 未实现, 不执行排除", key)
            }
            ConfigWarning::MissingAuxiliaryDataFile { key, path } => write!(
                f,
                "无法打开辅助判据 {} 的数据文件 {}, 请给出完整路径或数据源目录内的相对路径",
                key,
                path.display()
            ),
            ConfigWarning::UnrecognizedAuxiliaryType { key, declared } => {
                write!(f, "辅助判据 {} 的数据类型无法识别: {}", key, declared)
            }
            ConfigWarning::MissingRasterValue { key } => {
                write!(f, "栅格判据 {} 缺少 value, 不执行排除", key)
            }
            ConfigWarning::InvalidCriterionField {
                key,
                field,
                message,
            } => write!(f, "判据 {} 字段 {} 无效: {}", key, field, message),
            ConfigWarning::CalibrationToleranceMiss {
                achieved,
                target,
                tolerance,
            } => write!(
                f,
                "标定结果 {:.6} 与目标 {:.6} 的偏差超出容差 {}, 返回最接近的配置",
                achieved, target, tolerance
            ),
        }
    }
}
