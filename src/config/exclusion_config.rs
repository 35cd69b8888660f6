// ==========================================
// 用地适宜性评估 - 排除配置 (判据字典)
// ==========================================
// 职责: 判据字典的结构校验、预设合并、字段解析
// 红线: 结构非法 (非映射/非预设名) 立即报错; 字段级问题只告警
// ==========================================

use crate::config::error::{json_type_name, ConfigError, ConfigResult};
use crate::domain::criterion::AuxiliaryCriterion;
use crate::domain::types::ValueRange;
use crate::domain::warning::ConfigWarning;
use serde_json::{Map, Value};
use std::path::PathBuf;

// ==========================================
// 保留键 (非判据)
// ==========================================
pub mod reserved_keys {
    pub const REGION_EDGE: &str = "region_edge";
    pub const EXISTING: &str = "existing";
    pub const SOFT_EXCLUSION: &str = "soft_exclusion";
    pub const STATE: &str = "state";
    pub const AUXILIARY: &str = "auxiliary";
    pub const SIDE_STRIPES: &str = "available_side_stripes";

    pub const ALL: [&str; 6] = [
        REGION_EDGE,
        EXISTING,
        SOFT_EXCLUSION,
        STATE,
        AUXILIARY,
        SIDE_STRIPES,
    ];

    pub fn is_reserved(key: &str) -> bool {
        ALL.contains(&key)
    }
}

// ==========================================
// ConfigInput - 调用方提供的配置
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigInput {
    /// 使用技术默认预设
    Default,
    /// 命名预设
    Preset(String),
    /// 判据映射
    Mapping(Map<String, Value>),
}

impl ConfigInput {
    /// 从任意 JSON 值构造; 只接受 null / 字符串 / 对象
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Null => Ok(ConfigInput::Default),
            Value::String(name) => Ok(ConfigInput::Preset(name)),
            Value::Object(map) => Ok(ConfigInput::Mapping(map)),
            other => Err(ConfigError::InvalidConfigurationType {
                found: json_type_name(&other).to_string(),
            }),
        }
    }
}

// ==========================================
// ExclusionConfiguration - 判据字典
// ==========================================
// 键的处理顺序由判据表决定, 与字典顺序无关
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExclusionConfiguration {
    entries: Map<String, Value>,
}

impl ExclusionConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// 从 JSON 值构造, 非对象直接报错
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(ConfigError::InvalidConfigurationType {
                found: json_type_name(&other).to_string(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// 键存在且值非 null 才视为启用
    pub fn is_present(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(v) if !v.is_null())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 浅合并: 覆盖项逐键替换 (含 null)
    pub fn merge(&mut self, overrides: Map<String, Value>) {
        for (key, value) in overrides {
            self.entries.insert(key, value);
        }
    }

    /// 设置某判据的单个字段 (判据不存在或为 null 时新建对象)
    pub fn set_field(&mut self, key: &str, field: &str, value: Value) {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(field.to_string(), value);
        }
    }

    pub fn state(&self) -> Option<String> {
        self.entries
            .get(reserved_keys::STATE)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

// ==========================================
// CriterionParams - 命名判据的调用方参数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionParams {
    pub source: Option<String>,
    pub buffer: Option<f64>,
    pub value: Option<ValueRange>,
}

impl CriterionParams {
    /// 解析判据值
    ///
    /// # 规则
    /// - null: 判据未启用, 返回 None
    /// - 对象: 读取 source / buffer / value
    /// - 数字: 简写, 栅格判据视为 value, 矢量判据视为 buffer
    /// - 其他: 告警并视为未启用
    pub fn parse(
        key: &str,
        value: &Value,
        is_raster: bool,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => {
                let x = n.as_f64()?;
                let mut params = CriterionParams::default();
                if is_raster {
                    params.value = Some(ValueRange::upper(x));
                } else {
                    params.buffer = Some(x);
                }
                Some(params)
            }
            Value::Object(map) => {
                let mut params = CriterionParams::default();
                if let Some(source) = map.get("source") {
                    match source {
                        Value::String(s) => params.source = Some(s.clone()),
                        Value::Null => {}
                        other => warnings.push(invalid_field(key, "source", other)),
                    }
                }
                if let Some(buffer) = map.get("buffer") {
                    match buffer {
                        Value::Number(n) => params.buffer = n.as_f64(),
                        Value::Null => {}
                        other => warnings.push(invalid_field(key, "buffer", other)),
                    }
                }
                if let Some(raw) = map.get("value") {
                    if !raw.is_null() {
                        match parse_value_range(raw) {
                            Ok(range) => params.value = Some(range),
                            Err(message) => warnings.push(ConfigWarning::InvalidCriterionField {
                                key: key.to_string(),
                                field: "value".to_string(),
                                message,
                            }),
                        }
                    }
                }
                Some(params)
            }
            other => {
                warnings.push(ConfigWarning::InvalidCriterionField {
                    key: key.to_string(),
                    field: key.to_string(),
                    message: format!("需要对象或 null, 实际为 {}", json_type_name(other)),
                });
                None
            }
        }
    }
}

fn invalid_field(key: &str, field: &str, value: &Value) -> ConfigWarning {
    ConfigWarning::InvalidCriterionField {
        key: key.to_string(),
        field: field.to_string(),
        message: format!("类型不符: {}", json_type_name(value)),
    }
}

/// 值域归一化为二元组
///
/// # 规则
/// - 数字 x => (None, x)
/// - [lo, hi] (任一可为 null) => (lo, hi)
/// - [x] => (None, x)
pub fn parse_value_range(raw: &Value) -> Result<ValueRange, String> {
    let as_bound = |v: &Value| -> Result<Option<f64>, String> {
        match v {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            other => Err(format!("值域端点必须为数字或 null, 实际为 {}", json_type_name(other))),
        }
    };
    match raw {
        Value::Number(n) => n
            .as_f64()
            .map(ValueRange::upper)
            .ok_or_else(|| "无法解析的数字".to_string()),
        Value::Array(items) => match items.as_slice() {
            [single] => Ok(ValueRange::new(None, as_bound(single)?)),
            [low, high] => Ok(ValueRange::new(as_bound(low)?, as_bound(high)?)),
            _ => Err(format!("值域需要 1 或 2 个元素, 实际为 {}", items.len())),
        },
        other => Err(format!("值域类型不符: {}", json_type_name(other))),
    }
}

/// 解析 auxiliary 子映射, 保持键顺序; 缺少必填字段的条目告警跳过
pub fn parse_auxiliary(raw: &Value, warnings: &mut Vec<ConfigWarning>) -> Vec<AuxiliaryCriterion> {
    let Some(map) = raw.as_object() else {
        if !raw.is_null() {
            warnings.push(ConfigWarning::InvalidCriterionField {
                key: reserved_keys::AUXILIARY.to_string(),
                field: reserved_keys::AUXILIARY.to_string(),
                message: format!("需要对象, 实际为 {}", json_type_name(raw)),
            });
        }
        return Vec::new();
    };

    let mut items = Vec::with_capacity(map.len());
    for (key, entry) in map {
        let Some(fields) = entry.as_object() else {
            warnings.push(invalid_field(key, key, entry));
            continue;
        };
        let declared_type = fields.get("type").and_then(|v| v.as_str());
        let source_path = fields.get("source_path").and_then(|v| v.as_str());
        let (Some(declared_type), Some(source_path)) = (declared_type, source_path) else {
            warnings.push(ConfigWarning::InvalidCriterionField {
                key: key.clone(),
                field: "type/source_path".to_string(),
                message: "辅助判据必须声明 type 与 source_path".to_string(),
            });
            continue;
        };

        let value = match fields.get("value") {
            None | Some(Value::Null) => None,
            Some(raw) => match parse_value_range(raw) {
                Ok(range) => Some(range),
                Err(message) => {
                    warnings.push(ConfigWarning::InvalidCriterionField {
                        key: key.clone(),
                        field: "value".to_string(),
                        message,
                    });
                    None
                }
            },
        };

        items.push(AuxiliaryCriterion {
            key: key.clone(),
            declared_type: declared_type.to_string(),
            source_path: PathBuf::from(source_path),
            where_text: fields
                .get("where_text")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            value,
            buffer: fields.get("buffer").and_then(|v| v.as_f64()),
        });
    }
    items
}
