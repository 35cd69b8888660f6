// ==========================================
// 用地适宜性评估 - 排除判据领域模型
// ==========================================
// 职责: 解析后的判据指令、辅助判据、完整解析结果
// 红线: 只描述"做什么", 不调用空间引擎
// ==========================================

use crate::domain::types::{Category, DataSource, GeometryKind, ValueRange};
use crate::domain::warning::ConfigWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// VectorLayer - 矢量图层 (路径 + 属性过滤)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub path: PathBuf,
    /// SQL 风格属性谓词, None 表示取全部要素
    pub filter: Option<String>,
}

// ==========================================
// ExclusionInstruction - 引擎可执行的排除指令
// ==========================================
// 多图层矢量判据按并集依次排除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExclusionInstruction {
    Vector {
        layers: Vec<VectorLayer>,
        buffer: Option<f64>,
    },
    Raster {
        path: PathBuf,
        range: ValueRange,
        buffer: Option<f64>,
    },
}

impl ExclusionInstruction {
    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            ExclusionInstruction::Vector { .. } => GeometryKind::Vector,
            ExclusionInstruction::Raster { .. } => GeometryKind::Raster,
        }
    }

    pub fn buffer(&self) -> Option<f64> {
        match self {
            ExclusionInstruction::Vector { buffer, .. } => *buffer,
            ExclusionInstruction::Raster { buffer, .. } => *buffer,
        }
    }

    /// 中间文件名中的参数片段: 矢量取缓冲距离, 栅格取值域
    pub fn parameter_tag(&self) -> String {
        match self {
            ExclusionInstruction::Vector { buffer, .. } => format_buffer(*buffer),
            ExclusionInstruction::Raster { range, .. } => range.to_string(),
        }
    }
}

pub(crate) fn format_buffer(buffer: Option<f64>) -> String {
    buffer.map_or_else(|| "None".to_string(), |b| b.to_string())
}

// ==========================================
// ResolvedCriterion - 解析后的命名判据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCriterion {
    pub key: String,
    /// 报告标签 (如 "Motorways")
    pub label: String,
    /// border 不参与分类核算, 为 None
    pub category: Option<Category>,
    pub source: DataSource,
    pub instruction: ExclusionInstruction,
}

// ==========================================
// AuxiliaryCriterion - 区域辅助判据 (自描述)
// ==========================================
// source_path 在执行期才校验(绝对路径或相对数据源根目录)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryCriterion {
    pub key: String,
    /// 声明的类型 ("vector" / "raster"), 其他值在执行期告警跳过
    pub declared_type: String,
    pub source_path: PathBuf,
    #[serde(default)]
    pub where_text: Option<String>,
    #[serde(default)]
    pub value: Option<ValueRange>,
    #[serde(default)]
    pub buffer: Option<f64>,
}

// ==========================================
// ResolvedConfig - 解析结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// 命名判据, 已按固定规范顺序排列
    pub criteria: Vec<ResolvedCriterion>,
    /// 区域辅助判据, 保持配置中的顺序
    pub auxiliary: Vec<AuxiliaryCriterion>,
    /// 区域边缘缓冲距离 (最后执行, 不做面积核算)
    pub region_edge: Option<f64>,
    /// 既有装机排除参数 (技术相关, 原样保留)
    pub existing: Option<serde_json::Value>,
    /// 道路两侧可用条带宽度 (仅沿路光伏使用)
    pub side_stripes: Option<f64>,
    pub state: Option<String>,
    /// 未实现的键: 原样保留, 执行期告警且不执行
    pub unknown_keys: Vec<String>,
    /// 解析期产生的告警
    pub warnings: Vec<ConfigWarning>,
}

impl ResolvedConfig {
    pub fn criterion(&self, key: &str) -> Option<&ResolvedCriterion> {
        self.criteria.iter().find(|c| c.key == key)
    }

    pub fn criterion_mut(&mut self, key: &str) -> Option<&mut ResolvedCriterion> {
        self.criteria.iter_mut().find(|c| c.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty() && self.auxiliary.is_empty() && self.region_edge.is_none()
    }
}
