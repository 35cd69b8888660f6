// ==========================================
// 用地适宜性评估 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 结构错误 (致命) =====
    #[error("配置类型无效: 需要映射或预设名称, 实际为 {found}")]
    InvalidConfigurationType { found: String },

    #[error("字段值错误 (key={key}, field={field}): {message}")]
    InvalidField {
        key: String,
        field: String,
        message: String,
    },

    // ===== 预设错误 =====
    #[error("找不到预设配置 {name} ({path}), 请检查预设目录")]
    PresetNotFound { name: String, path: String },

    #[error("预设配置解析失败 ({name}): {source}")]
    PresetParse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    // ===== 通用错误 =====
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

/// JSON 值的类型名 (用于错误信息)
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
