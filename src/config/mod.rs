// ==========================================
// 用地适宜性评估 - 配置层
// ==========================================
// 职责: 数据源上下文、判据字典、命名预设
// 红线: 不执行任何空间运算
// ==========================================

pub mod context;
pub mod error;
pub mod exclusion_config;
pub mod preset;

// 重导出核心配置类型
pub use context::{DatasourceContext, PathRoot};
pub use error::{ConfigError, ConfigResult};
pub use exclusion_config::{reserved_keys, ConfigInput, CriterionParams, ExclusionConfiguration};
pub use preset::PresetStore;
