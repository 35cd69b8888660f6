// ==========================================
// 用地适宜性评估 - 引擎层
// ==========================================
// 职责: 判据解析、排除管线、归并、流向图、阈值标定、技术编排
// 红线: 空间计算只经由 SpatialExclusionEngine; 引擎层不读写栅格文件
// ==========================================

pub mod aggregator;
pub mod calibrator;
pub mod criterion_table;
pub mod error;
pub mod flow_diagram;
pub mod orchestrator;
pub mod pipeline;
pub mod resolver;
pub mod spatial;
pub mod technology;

// 重导出核心引擎
pub use aggregator::CategoryAggregator;
pub use calibrator::{
    CalibrationOutcome, CalibrationParameter, CalibrationSettings, ParameterTarget,
    ThresholdCalibrator,
};
pub use error::{EngineError, EngineResult};
pub use flow_diagram::FlowDiagram;
pub use orchestrator::{
    AreaRestriction, EligibilityOrchestrator, PotentialEstimate, PotentialRequest,
};
pub use pipeline::{ExclusionPipeline, PipelineOutcome};
pub use resolver::CriterionResolver;
pub use spatial::{ScaledPoint, SpatialExclusionEngine};
pub use technology::{
    EstimatesPotential, ExistingAssets, ExistingPlant, ExistingTurbine, HasExistingAssets,
    RoadCorridor, Technology, WindSettings,
};
