// ==========================================
// 用地适宜性评估 - 领域类型定义
// ==========================================
// 职责: 排除类别、几何类型、数据源、核算模式等基础枚举
// 红线: 纯值类型, 不依赖引擎与配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 排除类别 (Category)
// ==========================================
// 用于分组统计与流向图报告
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Social,         // 社会
    Infrastructure, // 基础设施
    Physical,       // 自然地物
    EcoTech,        // 经济与技术
    Protected,      // 保护区
    Other,          // 其他(区域辅助判据)
}

impl Category {
    /// 报告顺序 (流向图节点 1..=6)
    pub const ALL: [Category; 6] = [
        Category::Social,
        Category::Infrastructure,
        Category::Physical,
        Category::EcoTech,
        Category::Protected,
        Category::Other,
    ];

    /// 小面积归并时使用的类别名 ("<名称> others")
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Social => "Social",
            Category::Infrastructure => "Infrastructure",
            Category::Physical => "Physical",
            Category::EcoTech => "Eco & Tech",
            Category::Protected => "Protected",
            Category::Other => "Others",
        }
    }

    /// 流向图中的类别节点名
    pub fn flow_node_name(&self) -> &'static str {
        match self {
            Category::EcoTech => "Economical & Technical",
            other => other.display_name(),
        }
    }

    /// 在 ALL 中的序号
    pub fn index(&self) -> usize {
        match self {
            Category::Social => 0,
            Category::Infrastructure => 1,
            Category::Physical => 2,
            Category::EcoTech => 3,
            Category::Protected => 4,
            Category::Other => 5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Social => write!(f, "SOCIAL"),
            Category::Infrastructure => write!(f, "INFRASTRUCTURE"),
            Category::Physical => write!(f, "PHYSICAL"),
            Category::EcoTech => write!(f, "ECO_TECH"),
            Category::Protected => write!(f, "PROTECTED"),
            Category::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 几何类型 (Geometry Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeometryKind {
    Vector, // 矢量要素 + 属性过滤 + 缓冲
    Raster, // 栅格值域
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Vector => write!(f, "vector"),
            GeometryKind::Raster => write!(f, "raster"),
        }
    }
}

// ==========================================
// 数据源 (Data Source)
// ==========================================
// 序列化格式与配置文件中的 source 字段一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "basis-dlm")]
    BasisDlm,
    #[serde(rename = "dlm250")]
    Dlm250,
    #[serde(rename = "osm")]
    Osm,
    #[serde(rename = "osm_overpass")]
    OsmOverpass,
    #[serde(rename = "clc")]
    Clc,
    #[serde(rename = "wdpa")]
    Wdpa,
    #[serde(rename = "hu")]
    Hu,
    #[serde(rename = "inner_areas")]
    InnerAreas,
    #[serde(rename = "bgr")]
    Bgr,
    #[serde(rename = "vg250")]
    Vg250,
    #[serde(rename = "bfn")]
    Bfn,
    #[serde(rename = "copernicus")]
    Copernicus,
    #[serde(rename = "gwa")]
    Gwa,
}

impl DataSource {
    /// 配置中的字符串名
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::BasisDlm => "basis-dlm",
            DataSource::Dlm250 => "dlm250",
            DataSource::Osm => "osm",
            DataSource::OsmOverpass => "osm_overpass",
            DataSource::Clc => "clc",
            DataSource::Wdpa => "wdpa",
            DataSource::Hu => "hu",
            DataSource::InnerAreas => "inner_areas",
            DataSource::Bgr => "bgr",
            DataSource::Vg250 => "vg250",
            DataSource::Bfn => "bfn",
            DataSource::Copernicus => "copernicus",
            DataSource::Gwa => "gwa",
        }
    }

    /// 从配置字符串解析, 未知名称返回 None
    pub fn parse(name: &str) -> Option<Self> {
        let source = match name.trim() {
            "basis-dlm" => DataSource::BasisDlm,
            "dlm250" => DataSource::Dlm250,
            "osm" => DataSource::Osm,
            "osm_overpass" => DataSource::OsmOverpass,
            "clc" => DataSource::Clc,
            "wdpa" => DataSource::Wdpa,
            "hu" => DataSource::Hu,
            "inner_areas" => DataSource::InnerAreas,
            "bgr" => DataSource::Bgr,
            "vg250" => DataSource::Vg250,
            "bfn" => DataSource::Bfn,
            "copernicus" => DataSource::Copernicus,
            "gwa" => DataSource::Gwa,
            _ => return None,
        };
        Some(source)
    }

    /// 数据源对应的几何类型
    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            DataSource::Copernicus | DataSource::Gwa => GeometryKind::Raster,
            _ => GeometryKind::Vector,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 面积核算模式 (Accounting Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountingMode {
    /// 净流量: 剩余面积的下降量(顺序相关)
    #[default]
    Net,
    /// 毛流量: 判据自身中间掩膜的排除面积(可重叠)
    Gross,
}

impl fmt::Display for AccountingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountingMode::Net => write!(f, "NET"),
            AccountingMode::Gross => write!(f, "GROSS"),
        }
    }
}

// ==========================================
// 点排除形状 (Point Shape)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointShape {
    Ellipse,   // 风机: 主风向椭圆
    Rectangle, // 光伏: 矩形
}

impl fmt::Display for PointShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointShape::Ellipse => write!(f, "ellipse"),
            PointShape::Rectangle => write!(f, "rectangle"),
        }
    }
}

// ==========================================
// 栅格值域 (Value Range)
// ==========================================
// 二元组 (下界, 上界), 任一端可缺省; JSON 形式为 [low, high]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(Option<f64>, Option<f64>)", into = "(Option<f64>, Option<f64>)")]
pub struct ValueRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl ValueRange {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    /// 单值视为上界
    pub fn upper(high: f64) -> Self {
        Self {
            low: None,
            high: Some(high),
        }
    }

    /// 值是否落在区间内(闭区间, 缺省端不限)
    pub fn contains(&self, v: f64) -> bool {
        self.low.map_or(true, |lo| v >= lo) && self.high.map_or(true, |hi| v <= hi)
    }
}

impl From<(Option<f64>, Option<f64>)> for ValueRange {
    fn from((low, high): (Option<f64>, Option<f64>)) -> Self {
        Self { low, high }
    }
}

impl From<ValueRange> for (Option<f64>, Option<f64>) {
    fn from(r: ValueRange) -> Self {
        (r.low, r.high)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f64>| v.map_or_else(|| "None".to_string(), |x| x.to_string());
        write!(f, "({}, {})", show(self.low), show(self.high))
    }
}
