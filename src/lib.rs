// ==========================================
// 用地适宜性评估 - 核心库
// ==========================================
// 系统定位: 可再生能源用地排除管线 (风电 / 地面光伏 / 屋顶光伏)
// 空间运算由外部引擎实现, 本库负责判据解析、面积核算与阈值标定
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 值类型
pub mod domain;

// 配置层 - 数据源上下文与预设
pub mod config;

// 引擎层 - 管线与标定
pub mod engine;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AccountingMode, Category, DataSource, GeometryKind, PointShape, ValueRange};

// 领域实体
pub use domain::{
    AreaFlowRecord, CategoryBreakdown, ConfigWarning, EligibilityReport, ResolvedConfig,
    ResolvedCriterion,
};

// 配置
pub use config::{ConfigError, ConfigInput, DatasourceContext, ExclusionConfiguration, PresetStore};

// 引擎
pub use engine::{
    CategoryAggregator, CriterionResolver, EligibilityOrchestrator, EngineError,
    ExclusionPipeline, FlowDiagram, SpatialExclusionEngine, Technology, ThresholdCalibrator,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "用地适宜性评估";
