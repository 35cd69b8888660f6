// ==========================================
// 用地适宜性评估 - 评估编排器
// ==========================================
// 用途: 按技术类型串联 预设 → 解析 → 掩膜初始化 → 既有装机 → 排除管线 → 标定 → 报告
// 红线: 上下文显式传入, 技术对象不持有编排器引用
// ==========================================

use crate::config::{ConfigInput, DatasourceContext, PresetStore};
use crate::domain::criterion::ResolvedConfig;
use crate::domain::report::{AreaFlowRecord, CategoryBreakdown, EligibilityReport};
use crate::domain::types::AccountingMode;
use crate::engine::aggregator::CategoryAggregator;
use crate::engine::calibrator::{
    CalibrationOutcome, CalibrationParameter, CalibrationSettings, ThresholdCalibrator,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::flow_diagram::FlowDiagram;
use crate::engine::pipeline::{ExclusionPipeline, PipelineOutcome};
use crate::engine::resolver::CriterionResolver;
use crate::engine::spatial::SpatialExclusionEngine;
use crate::engine::technology::{
    EstimatesPotential, ExistingAssets, HasExistingAssets, MaskPreparation, Technology,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 面积限制使用的预设
pub const RESTRICT_AREAS_PRESET: &str = "restrict_areas";
/// 面积限制调整的判据
pub const RESTRICT_AREAS_PARAMETER: &str = "wind_100m";
pub const REPORT_FILE: &str = "report.json";

// ==========================================
// AreaRestriction - 可用面积比例限制
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaRestriction {
    /// 目标可用比例
    pub share: f64,
    pub tolerance: f64,
    /// 最细一级步长
    pub step: f64,
}

impl Default for AreaRestriction {
    fn default() -> Self {
        Self {
            share: 0.01,
            tolerance: 0.00001,
            step: 0.00001,
        }
    }
}

impl AreaRestriction {
    pub fn share(share: f64) -> Self {
        Self {
            share,
            ..Self::default()
        }
    }
}

// ==========================================
// PotentialRequest / PotentialEstimate
// ==========================================
#[derive(Debug, Clone)]
pub struct PotentialRequest {
    pub input: ConfigInput,
    /// 映射输入时是否覆盖在默认预设之上
    pub update: bool,
    pub existing: ExistingAssets,
    pub restrict_area: Option<AreaRestriction>,
}

impl Default for PotentialRequest {
    fn default() -> Self {
        Self {
            input: ConfigInput::Default,
            update: true,
            existing: ExistingAssets::default(),
            restrict_area: None,
        }
    }
}

impl PotentialRequest {
    pub fn with_input(mut self, input: ConfigInput) -> Self {
        self.input = input;
        self
    }

    pub fn replace_defaults(mut self) -> Self {
        self.update = false;
        self
    }

    pub fn with_existing(mut self, existing: ExistingAssets) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_restriction(mut self, restriction: AreaRestriction) -> Self {
        self.restrict_area = Some(restriction);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PotentialEstimate {
    pub report: EligibilityReport,
    pub records: Vec<AreaFlowRecord>,
    /// 小面积归并后的分类
    pub aggregated: Vec<CategoryBreakdown>,
    pub flow_diagram: Option<FlowDiagram>,
    pub calibration: Option<CalibrationOutcome>,
    /// 排除的既有装机点数
    pub existing_points: usize,
    /// 写出的文件
    pub written: Vec<PathBuf>,
}

// ==========================================
// EligibilityOrchestrator
// ==========================================
pub struct EligibilityOrchestrator<'a> {
    ctx: &'a DatasourceContext,
    presets: PresetStore,
    accounting: AccountingMode,
    aggregator: CategoryAggregator,
    result_dir: Option<PathBuf>,
}

impl<'a> EligibilityOrchestrator<'a> {
    pub fn new(ctx: &'a DatasourceContext) -> Self {
        Self {
            presets: PresetStore::new(&ctx.presets_dir),
            ctx,
            accounting: AccountingMode::Net,
            aggregator: CategoryAggregator::default(),
            result_dir: None,
        }
    }

    pub fn with_accounting(mut self, accounting: AccountingMode) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn with_presets(mut self, presets: PresetStore) -> Self {
        self.presets = presets;
        self
    }

    /// 设置后写出 report.json 与 sankey_config.json
    pub fn with_result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = Some(dir.into());
        self
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    fn pipeline(&self) -> ExclusionPipeline<'a> {
        ExclusionPipeline::new(self.ctx).with_accounting(self.accounting)
    }

    /// 物化并解析技术的判据字典
    pub fn resolve_config(
        &self,
        technology: &Technology,
        input: ConfigInput,
        update: bool,
    ) -> EngineResult<ResolvedConfig> {
        let state = self.ctx.state.as_deref();
        let default_preset = technology.default_preset(state);
        let config = self.presets.materialize(input, &default_preset, update, state)?;
        debug!(technology = %technology, preset = default_preset.as_str(), keys = config.len(), "判据字典已物化");
        Ok(CriterionResolver::new(self.ctx).resolve(&config))
    }

    /// 评估技术可用面积
    ///
    /// # 参数
    /// - engine: 区域掩膜引擎 (原地修改)
    /// - request: 配置输入、既有装机与可选面积限制
    pub fn estimate_potential<E: SpatialExclusionEngine>(
        &self,
        technology: &Technology,
        engine: &mut E,
        request: PotentialRequest,
    ) -> EngineResult<PotentialEstimate> {
        info!(
            technology = %technology,
            region = %self.ctx.region_id,
            case = %self.ctx.case_name,
            "开始评估可用面积"
        );

        // ==========================================
        // 步骤1: 物化并解析判据字典
        // ==========================================
        let resolved = self.resolve_config(technology, request.input, request.update)?;
        let pipeline = self.pipeline();

        // ==========================================
        // 步骤2: 掩膜初始化 (沿路光伏)
        // ==========================================
        if let MaskPreparation::NothingAvailable(message) =
            technology.prepare_mask(engine, self.ctx, &resolved)?
        {
            let outcome = PipelineOutcome {
                initial_available_area: engine.area_available(),
                remaining_area: engine.area_available(),
                border_excluded_area: 0.0,
                region_edge_excluded_area: 0.0,
                area_after_criteria: engine.area_available(),
                records: Vec::new(),
                warnings: resolved.warnings.clone(),
            };
            let mut report = pipeline.build_report(engine, &resolved, &outcome);
            report.info = Some(message);
            let written = self.write_outputs(technology, &report, None)?;
            return Ok(PotentialEstimate {
                report,
                records: Vec::new(),
                aggregated: Vec::new(),
                flow_diagram: None,
                calibration: None,
                existing_points: 0,
                written,
            });
        }

        // ==========================================
        // 步骤3: 既有装机 (管线前, 不计入核算)
        // ==========================================
        let mut existing_points = 0;
        let exclude_existing = resolved.existing.is_some();
        if exclude_existing && !technology.existing_after_pipeline() {
            existing_points +=
                technology.exclude_existing(engine, &request.existing, resolved.existing.as_ref())?;
        }

        // ==========================================
        // 步骤4: 排除管线 + 孤立斑块剔除
        // ==========================================
        let (mut report, records) =
            pipeline.run(engine, &resolved, Some(technology.min_patch_size()))?;

        // ==========================================
        // 步骤5: 既有装机 (管线后, 沿路光伏)
        // ==========================================
        if exclude_existing && technology.existing_after_pipeline() {
            existing_points +=
                technology.exclude_existing(engine, &request.existing, resolved.existing.as_ref())?;
            refresh_eligible(&mut report, engine);
        }

        // ==========================================
        // 步骤6: 可用面积比例限制 (风电)
        // ==========================================
        let calibration = match request.restrict_area {
            Some(restriction) => {
                let outcome = self.restrict_area(technology, engine, restriction)?;
                refresh_eligible(&mut report, engine);
                report.warnings.extend(outcome.warnings.iter().cloned());
                Some(outcome)
            }
            None => None,
        };

        // ==========================================
        // 步骤7: 归并与流向图
        // ==========================================
        let aggregated = self
            .aggregator
            .aggregate(&report.categories, report.initial_available_area);
        let flow_diagram = FlowDiagram::build(
            &aggregated,
            report.initial_available_area,
            report.remaining_area,
            self.accounting,
        );

        // ==========================================
        // 步骤8: 写出结果
        // ==========================================
        let written = self.write_outputs(technology, &report, Some(&flow_diagram))?;

        info!(
            technology = %technology,
            eligible_area = report.eligible_area,
            eligible_percentage = report.eligible_percentage,
            existing_points,
            warnings = report.warnings.len(),
            "可用面积评估完成"
        );

        Ok(PotentialEstimate {
            report,
            records,
            aggregated,
            flow_diagram: Some(flow_diagram),
            calibration,
            existing_points,
            written,
        })
    }

    /// 把可用面积比例限制到目标 (以引擎当前状态为基础)
    ///
    /// # 规则
    /// - 加载 restrict_areas 预设, 调整 wind_100m 的上界
    /// - 斑块阈值从技术最小斑块开始
    pub fn restrict_area<E: SpatialExclusionEngine>(
        &self,
        technology: &Technology,
        engine: &mut E,
        restriction: AreaRestriction,
    ) -> EngineResult<CalibrationOutcome> {
        if !technology.supports_area_restriction() {
            return Err(EngineError::UnsupportedOperation {
                technology: technology.to_string(),
                operation: "restrict_area".to_string(),
            });
        }

        let config = self
            .presets
            .load(RESTRICT_AREAS_PRESET, self.ctx.state.as_deref())?;
        let resolved = CriterionResolver::new(self.ctx).resolve(&config);
        let settings = CalibrationSettings::default()
            .with_base_step(restriction.step)
            .with_initial_patch_size(technology.min_patch_size());

        info!(
            share = restriction.share,
            tolerance = restriction.tolerance,
            step = restriction.step,
            "开始限制可用面积比例"
        );
        ThresholdCalibrator::new(ExclusionPipeline::new(self.ctx))
            .with_settings(settings)
            .calibrate(
                engine,
                &resolved,
                &CalibrationParameter::upper_bound(RESTRICT_AREAS_PARAMETER),
                restriction.share,
                restriction.tolerance,
            )
    }

    /// 结果子目录: <result_dir>/<技术>_<区域>
    pub fn result_path(&self, technology: &Technology) -> Option<PathBuf> {
        self.result_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}_{}", technology, self.ctx.region_id)))
    }

    fn write_outputs(
        &self,
        technology: &Technology,
        report: &EligibilityReport,
        flow_diagram: Option<&FlowDiagram>,
    ) -> EngineResult<Vec<PathBuf>> {
        let Some(dir) = self.result_path(technology) else {
            return Ok(Vec::new());
        };
        let mut written = vec![write_report(report, &dir)?];
        if let Some(diagram) = flow_diagram {
            written.push(diagram.write_to(&dir)?);
        }
        Ok(written)
    }
}

/// 按引擎当前状态刷新最终可用面积
fn refresh_eligible<E: SpatialExclusionEngine>(report: &mut EligibilityReport, engine: &E) {
    report.eligible_area = engine.area_available();
    report.eligible_percentage =
        EligibilityReport::percentage_of(report.eligible_area, report.initial_available_area);
}

/// 写出 report.json
pub fn write_report(report: &EligibilityReport, dir: &Path) -> EngineResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(REPORT_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!(path = %path.display(), "报告已写出");
    Ok(path)
}
