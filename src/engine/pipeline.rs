// ==========================================
// 用地适宜性评估 - 排除管线执行器
// ==========================================
// 职责: 按规范顺序驱动空间引擎执行判据, 维护面积核算
// 输入: ResolvedConfig + 可变空间引擎
// 输出: 面积流记录 + 适宜性报告
// 红线: 剩余面积单调不增; 未启用/未知判据不影响核算
// ==========================================

use crate::config::DatasourceContext;
use crate::domain::criterion::{
    format_buffer, AuxiliaryCriterion, ExclusionInstruction, ResolvedConfig, ResolvedCriterion,
};
use crate::domain::report::{group_by_category, AreaFlowRecord, EligibilityReport};
use crate::domain::types::{AccountingMode, Category};
use crate::domain::warning::ConfigWarning;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::spatial::SpatialExclusionEngine;
use crate::perf::{count_engine_call, PerfGuard};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PipelineOutcome - 判据执行结果 (剔除斑块前)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// 核算起点: 边界排除之后的可用面积
    pub initial_available_area: f64,
    /// 核算口径的剩余面积 (最后一条记录之后)
    pub remaining_area: f64,
    /// 边界判据排除面积 (在核算起点之前)
    pub border_excluded_area: f64,
    /// 区域边缘缓冲排除面积 (仅供参考, 不入核算)
    pub region_edge_excluded_area: f64,
    /// 全部判据 (含区域边缘) 执行后的引擎读数
    pub area_after_criteria: f64,
    pub records: Vec<AreaFlowRecord>,
    pub warnings: Vec<ConfigWarning>,
}

impl PipelineOutcome {
    pub fn total_recorded_exclusion(&self) -> f64 {
        self.records.iter().map(|r| r.excluded_area).sum()
    }
}

// ==========================================
// ExclusionPipeline
// ==========================================
pub struct ExclusionPipeline<'a> {
    ctx: &'a DatasourceContext,
    accounting: AccountingMode,
}

impl<'a> ExclusionPipeline<'a> {
    pub fn new(ctx: &'a DatasourceContext) -> Self {
        Self {
            ctx,
            accounting: AccountingMode::Net,
        }
    }

    pub fn with_accounting(mut self, accounting: AccountingMode) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn accounting(&self) -> AccountingMode {
        self.accounting
    }

    /// 是否写出中间掩膜: 上下文要求或毛流量核算
    fn writes_intermediates(&self) -> bool {
        self.ctx.use_intermediate || self.accounting == AccountingMode::Gross
    }

    /// 执行完整管线: 判据排除 + 孤立斑块剔除 + 报告
    ///
    /// # 参数
    /// - min_patch_size: 剔除斑块的最小面积, None 表示不剔除
    ///
    /// # 返回
    /// (报告, 面积流记录)
    pub fn run<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        resolved: &ResolvedConfig,
        min_patch_size: Option<f64>,
    ) -> EngineResult<(EligibilityReport, Vec<AreaFlowRecord>)> {
        let outcome = self.apply_criteria(engine, resolved)?;

        if let Some(min_size) = min_patch_size {
            if engine.area_available() > 0.0 {
                count_engine_call();
                engine.prune_isolated_areas(min_size)?;
                debug!(min_size, remaining = engine.area_available(), "孤立斑块已剔除");
            }
        }

        let report = self.build_report(engine, resolved, &outcome);
        Ok((report, outcome.records))
    }

    /// 依次执行全部判据 (不剔除斑块)
    #[instrument(skip_all, fields(region = %self.ctx.region_id, mode = %self.accounting))]
    pub fn apply_criteria<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        resolved: &ResolvedConfig,
    ) -> EngineResult<PipelineOutcome> {
        let _perf = PerfGuard::new("apply_criteria").with_detail(self.ctx.region_id.clone());
        let mut warnings = resolved.warnings.clone();

        // ==========================================
        // 步骤1: 未知键告警 (不执行)
        // ==========================================
        for key in &resolved.unknown_keys {
            warn!(key = key.as_str(), "判据 {} 未实现, 不执行排除", key);
            warnings.push(ConfigWarning::UnknownCriterionKey { key: key.clone() });
        }

        // ==========================================
        // 步骤2: 边界 (不进入分类流, 核算从边界之后开始)
        // ==========================================
        let (border, named): (Vec<_>, Vec<_>) =
            resolved.criteria.iter().partition(|c| c.category.is_none());
        let mut border_excluded_area = 0.0;
        for criterion in border {
            let before = engine.area_available();
            self.apply_named(engine, criterion)?;
            let excluded_area = (before - engine.area_available()).max(0.0);
            border_excluded_area += excluded_area;
            info!(
                key = criterion.key.as_str(),
                source = %criterion.source,
                excluded_area,
                "边界已排除"
            );
        }

        // ==========================================
        // 步骤3: 读取初始可用面积
        // ==========================================
        let initial_available_area = engine.area_available();
        let mut remaining_area = initial_available_area;
        let mut records = Vec::new();

        info!(
            initial_available_area,
            border_excluded_area,
            criteria = named.len(),
            auxiliary = resolved.auxiliary.len(),
            "开始执行排除管线"
        );

        // ==========================================
        // 步骤4: 命名判据 (规范顺序)
        // ==========================================
        for criterion in named {
            let Some(category) = criterion.category else {
                continue;
            };
            let gross = self.apply_named(engine, criterion)?;
            let after = engine.area_available();
            let net = (remaining_area - after).max(0.0);
            let excluded_area = self.excluded_area(net, gross);
            info!(
                key = criterion.key.as_str(),
                source = %criterion.source,
                param = %criterion.instruction.parameter_tag(),
                excluded_area,
                remaining = after,
                "判据排除完成"
            );
            records.push(AreaFlowRecord {
                category,
                label: criterion.label.clone(),
                key: criterion.key.clone(),
                excluded_area,
                remaining_before: remaining_area,
                remaining_after: after,
            });
            remaining_area = after;
        }

        // ==========================================
        // 步骤5: 区域辅助判据 (类别 Other)
        // ==========================================
        for aux in &resolved.auxiliary {
            let Some(gross) = self.apply_auxiliary(engine, aux, &mut warnings)? else {
                continue;
            };
            let after = engine.area_available();
            let net = (remaining_area - after).max(0.0);
            let excluded_area = self.excluded_area(net, gross);
            info!(key = aux.key.as_str(), excluded_area, remaining = after, "辅助判据排除完成");
            records.push(AreaFlowRecord {
                category: Category::Other,
                label: aux.key.clone(),
                key: aux.key.clone(),
                excluded_area,
                remaining_before: remaining_area,
                remaining_after: after,
            });
            remaining_area = after;
        }

        // ==========================================
        // 步骤6: 区域边缘缓冲 (最后执行, 不做核算)
        // ==========================================
        let mut region_edge_excluded_area = 0.0;
        if let Some(distance) = resolved.region_edge {
            let before = engine.area_available();
            count_engine_call();
            engine.exclude_region_edge(distance)?;
            region_edge_excluded_area = (before - engine.area_available()).max(0.0);
            info!(distance, excluded_area = region_edge_excluded_area, "区域边缘已排除");
        }

        let area_after_criteria = engine.area_available();
        info!(
            remaining_area,
            area_after_criteria,
            records = records.len(),
            warnings = warnings.len(),
            "排除管线执行完成"
        );

        Ok(PipelineOutcome {
            initial_available_area,
            remaining_area,
            border_excluded_area,
            region_edge_excluded_area,
            area_after_criteria,
            records,
            warnings,
        })
    }

    /// 按核算模式取排除面积
    fn excluded_area(&self, net: f64, gross: Option<f64>) -> f64 {
        match self.accounting {
            AccountingMode::Net => net,
            AccountingMode::Gross => gross.unwrap_or(0.0).max(0.0),
        }
    }

    /// 执行单个命名判据
    ///
    /// # 返回
    /// 毛流量面积 (仅在写出中间掩膜时可得)
    fn apply_named<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        criterion: &ResolvedCriterion,
    ) -> EngineResult<Option<f64>> {
        let _perf = PerfGuard::new("exclude_criterion").with_detail(criterion.key.clone());
        let region = &self.ctx.region_id;
        let source = criterion.source.as_str();
        let tag = criterion.instruction.parameter_tag();

        match &criterion.instruction {
            ExclusionInstruction::Vector { layers, buffer } => {
                let multi = layers.len() > 1;
                let mut gross: Option<f64> = None;
                for (n, layer) in layers.iter().enumerate() {
                    self.ensure_exists(&criterion.key, &layer.path)?;
                    let name = if multi {
                        format!("{}_{}_{}_{}_{}.tif", criterion.key, n, source, tag, region)
                    } else {
                        format!("{}_{}_{}_{}.tif", criterion.key, source, tag, region)
                    };
                    let intermediate = self.intermediate_for(&name);
                    count_engine_call();
                    engine.exclude_vector_type(
                        &layer.path,
                        layer.filter.as_deref(),
                        *buffer,
                        intermediate.as_deref(),
                    )?;
                    if let Some(path) = intermediate {
                        if let Some(area) = engine.intermediate_excluded_area(&path)? {
                            gross = Some(gross.unwrap_or(0.0) + area);
                        }
                    }
                }
                Ok(gross)
            }
            ExclusionInstruction::Raster {
                path,
                range,
                buffer,
            } => {
                self.ensure_exists(&criterion.key, path)?;
                let name = format!("{}_{}_{}_{}.tif", criterion.key, source, tag, region);
                let intermediate = self.intermediate_for(&name);
                count_engine_call();
                engine.exclude_raster_type(path, *range, *buffer, intermediate.as_deref())?;
                match intermediate {
                    Some(path) => Ok(engine.intermediate_excluded_area(&path)?),
                    None => Ok(None),
                }
            }
        }
    }

    /// 执行单个辅助判据
    ///
    /// # 返回
    /// - Ok(None): 已告警跳过
    /// - Ok(Some(gross)): 已执行
    fn apply_auxiliary<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        aux: &AuxiliaryCriterion,
        warnings: &mut Vec<ConfigWarning>,
    ) -> EngineResult<Option<Option<f64>>> {
        let Some(path) = self.ctx.locate_auxiliary(&aux.source_path) else {
            let attempted = self.ctx.datasource_root.join(&aux.source_path);
            warn!(key = aux.key.as_str(), path = %attempted.display(), "辅助判据数据文件不存在, 跳过");
            warnings.push(ConfigWarning::MissingAuxiliaryDataFile {
                key: aux.key.clone(),
                path: attempted,
            });
            return Ok(None);
        };

        let _perf = PerfGuard::new("exclude_auxiliary").with_detail(aux.key.clone());
        let region = &self.ctx.region_id;
        match aux.declared_type.as_str() {
            "vector" => {
                let name = format!("{}_{}_{}.tif", aux.key, format_buffer(aux.buffer), region);
                let intermediate = self.intermediate_for(&name);
                count_engine_call();
                engine.exclude_vector_type(
                    &path,
                    aux.where_text.as_deref(),
                    aux.buffer,
                    intermediate.as_deref(),
                )?;
                Ok(Some(self.read_intermediate(engine, intermediate.as_deref())?))
            }
            "raster" => {
                let Some(range) = aux.value else {
                    warn!(key = aux.key.as_str(), "栅格辅助判据缺少 value, 跳过");
                    warnings.push(ConfigWarning::MissingRasterValue {
                        key: aux.key.clone(),
                    });
                    return Ok(None);
                };
                let name = format!("{}_{}_{}.tif", aux.key, range, region);
                let intermediate = self.intermediate_for(&name);
                count_engine_call();
                engine.exclude_raster_type(&path, range, aux.buffer, intermediate.as_deref())?;
                Ok(Some(self.read_intermediate(engine, intermediate.as_deref())?))
            }
            other => {
                warn!(key = aux.key.as_str(), declared = other, "辅助判据数据类型无法识别, 跳过");
                warnings.push(ConfigWarning::UnrecognizedAuxiliaryType {
                    key: aux.key.clone(),
                    declared: other.to_string(),
                });
                Ok(None)
            }
        }
    }

    fn read_intermediate<E: SpatialExclusionEngine>(
        &self,
        engine: &E,
        intermediate: Option<&Path>,
    ) -> EngineResult<Option<f64>> {
        match intermediate {
            Some(path) => Ok(engine.intermediate_excluded_area(path)?),
            None => Ok(None),
        }
    }

    fn intermediate_for(&self, file_name: &str) -> Option<PathBuf> {
        self.writes_intermediates()
            .then(|| self.ctx.intermediate_path(file_name))
    }

    /// 命名判据的数据文件缺失为致命错误 (仅在上下文要求检查时)
    fn ensure_exists(&self, key: &str, path: &Path) -> EngineResult<()> {
        if self.ctx.check_paths && !path.exists() {
            return Err(EngineError::MissingDataFile {
                key: key.to_string(),
                path: path.display().to_string(),
            });
        }
        Ok(())
    }

    /// 组装报告 (读取引擎最终状态)
    pub fn build_report<E: SpatialExclusionEngine>(
        &self,
        engine: &E,
        resolved: &ResolvedConfig,
        outcome: &PipelineOutcome,
    ) -> EligibilityReport {
        let eligible_area = engine.area_available();
        EligibilityReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total_area: engine.total_region_area().max(0.0) as u64,
            eligible_area,
            eligible_percentage: EligibilityReport::percentage_of(
                eligible_area,
                outcome.initial_available_area,
            ),
            items_number: None,
            capacity: None,
            initial_available_area: outcome.initial_available_area,
            remaining_area: outcome.remaining_area,
            border_excluded_area: outcome.border_excluded_area,
            accounting_mode: self.accounting,
            categories: group_by_category(&outcome.records),
            exclusion_config: resolved.clone(),
            warnings: outcome.warnings.clone(),
            info: None,
        }
    }
}
