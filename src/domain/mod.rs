// ==========================================
// 用地适宜性评估 - 领域模型层
// ==========================================
// 职责: 定义判据、面积流、报告与告警等值类型
// 红线: 不含空间计算逻辑, 不含配置读取逻辑
// ==========================================

pub mod criterion;
pub mod report;
pub mod types;
pub mod warning;

// 重导出核心类型
pub use criterion::{
    AuxiliaryCriterion, ExclusionInstruction, ResolvedConfig, ResolvedCriterion, VectorLayer,
};
pub use report::{AreaFlowRecord, CategoryBreakdown, EligibilityReport, FlowEntry};
pub use types::{AccountingMode, Category, DataSource, GeometryKind, PointShape, ValueRange};
pub use warning::ConfigWarning;
