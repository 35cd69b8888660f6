// ==========================================
// 用地适宜性评估 - 阈值标定器
// ==========================================
// 职责: 调整单个连续排除参数, 使可用面积比例逼近目标
// 输入: 基础 ResolvedConfig + 引擎 (处于排除前状态)
// 输出: CalibrationOutcome (参数值、斑块阈值、达到比例)
// 红线: 每次试算都从基础快照恢复; 被拒绝的候选不得污染下一次试算
// ==========================================
// 前提: 参数增大时可用比例单调下降 (不做校验)
// 流程:
//   1. 分级搜索: 步长由粗到细, 每级递增参数直到比例不再高于目标, 回退一步
//   2. 细化 A: 递减参数, 把比例从目标下方推回
//   3. 宽带检查: 偏差超过 wide_band 视为发散 (致命)
//   4. 细化 B: 增大孤立斑块阈值, 把比例从目标上方压回
//   5. 在引擎上落地最终配置; 超出容差只告警
// ==========================================

use crate::domain::criterion::{ExclusionInstruction, ResolvedConfig};
use crate::domain::warning::ConfigWarning;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::pipeline::ExclusionPipeline;
use crate::engine::spatial::SpatialExclusionEngine;
use crate::perf::{count_engine_call, PerfGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ==========================================
// CalibrationSettings - 搜索参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// 最细一级的步长
    pub base_step: f64,
    /// 分级数 (最粗一级步长 = base_step × stage_ratio^(stage_count-1))
    pub stage_count: u32,
    /// 相邻两级的步长比
    pub stage_ratio: f64,
    /// 细化阶段的收敛带
    pub final_epsilon: f64,
    /// 分级搜索后允许的最大偏差, 超出即发散
    pub wide_band: f64,
    /// 孤立斑块剔除的初始阈值 (平方米)
    pub initial_patch_size: f64,
    /// 细化 B 每次增加的斑块阈值
    pub patch_size_step: f64,
    /// 试算次数上限
    pub max_evaluations: usize,
    /// 比例连续不变的次数上限
    pub stall_limit: usize,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            base_step: 0.00001,
            stage_count: 7,
            stage_ratio: 10.0,
            final_epsilon: 0.00004,
            wide_band: 0.002,
            initial_patch_size: 10000.0,
            patch_size_step: 100.0,
            max_evaluations: 20_000,
            stall_limit: 200,
        }
    }
}

impl CalibrationSettings {
    pub fn with_base_step(mut self, base_step: f64) -> Self {
        self.base_step = base_step;
        self
    }

    pub fn with_initial_patch_size(mut self, size: f64) -> Self {
        self.initial_patch_size = size;
        self
    }

    /// 第 stage 级 (0 为最粗) 的步长
    pub fn stage_step(&self, stage: u32) -> f64 {
        let exponent = self.stage_count.saturating_sub(1).saturating_sub(stage);
        self.base_step * self.stage_ratio.powi(exponent as i32)
    }

    /// 细化 A 的粗步长
    fn coarse_refine_step(&self) -> f64 {
        self.base_step * self.stage_ratio.powi(2)
    }
}

// ==========================================
// CalibrationParameter - 被调整的参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterTarget {
    /// 栅格判据值域上界
    UpperBound,
    /// 矢量或栅格判据的缓冲距离
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationParameter {
    pub key: String,
    pub target: ParameterTarget,
}

impl CalibrationParameter {
    pub fn upper_bound(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: ParameterTarget::UpperBound,
        }
    }

    pub fn buffer(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: ParameterTarget::Buffer,
        }
    }

    fn missing(&self) -> EngineError {
        EngineError::CalibrationParameterMissing {
            key: self.key.clone(),
        }
    }

    /// 读取当前参数值 (缓冲缺省视为 0)
    pub fn read(&self, config: &ResolvedConfig) -> EngineResult<f64> {
        let criterion = config.criterion(&self.key).ok_or_else(|| self.missing())?;
        match (self.target, &criterion.instruction) {
            (ParameterTarget::UpperBound, ExclusionInstruction::Raster { range, .. }) => {
                range.high.ok_or_else(|| self.missing())
            }
            (ParameterTarget::UpperBound, ExclusionInstruction::Vector { .. }) => {
                Err(self.missing())
            }
            (ParameterTarget::Buffer, instruction) => Ok(instruction.buffer().unwrap_or(0.0)),
        }
    }

    pub fn write(&self, config: &mut ResolvedConfig, value: f64) -> EngineResult<()> {
        let target = self.target;
        let criterion = config
            .criterion_mut(&self.key)
            .ok_or_else(|| self.missing())?;
        match (target, &mut criterion.instruction) {
            (ParameterTarget::UpperBound, ExclusionInstruction::Raster { range, .. }) => {
                range.high = Some(value);
            }
            (ParameterTarget::Buffer, ExclusionInstruction::Raster { buffer, .. })
            | (ParameterTarget::Buffer, ExclusionInstruction::Vector { buffer, .. }) => {
                *buffer = Some(value);
            }
            (ParameterTarget::UpperBound, ExclusionInstruction::Vector { .. }) => {
                return Err(self.missing());
            }
        }
        Ok(())
    }
}

// ==========================================
// CalibrationOutcome - 标定结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    /// 写入最终参数值后的配置
    pub config: ResolvedConfig,
    pub parameter_value: f64,
    /// 最终使用的孤立斑块阈值
    pub min_patch_size: f64,
    /// 最终可用比例 (0..=1)
    pub achieved_share: f64,
    pub target_share: f64,
    pub within_tolerance: bool,
    pub evaluations: usize,
    pub warnings: Vec<ConfigWarning>,
}

// ==========================================
// ThresholdCalibrator
// ==========================================
pub struct ThresholdCalibrator<'a> {
    pipeline: ExclusionPipeline<'a>,
    settings: CalibrationSettings,
}

/// 单次标定过程中的可变状态
struct SearchState<'c, S> {
    base: S,
    config: ResolvedConfig,
    parameter: &'c CalibrationParameter,
    value: f64,
    evaluations: usize,
}

impl<'c, S> SearchState<'c, S> {
    fn shift(&mut self, delta: f64) -> EngineResult<()> {
        self.value += delta;
        self.parameter.write(&mut self.config, self.value)
    }
}

impl<'a> ThresholdCalibrator<'a> {
    pub fn new(pipeline: ExclusionPipeline<'a>) -> Self {
        Self {
            pipeline,
            settings: CalibrationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CalibrationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// 标定
    ///
    /// # 参数
    /// - engine: 处于排除前状态, 该状态作为每次试算的基础快照
    /// - base: 基础配置, 必须包含被调整的判据
    /// - target_share: 目标可用比例 (0..=1)
    /// - tolerance: 请求容差
    ///
    /// # 返回
    /// - Err(CalibrationDivergence): 分级搜索后偏差超出宽带
    /// - Ok: 引擎停留在最终配置执行并剔除斑块后的状态
    pub fn calibrate<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        base: &ResolvedConfig,
        parameter: &CalibrationParameter,
        target_share: f64,
        tolerance: f64,
    ) -> EngineResult<CalibrationOutcome> {
        let _perf = PerfGuard::new("calibrate").with_detail(parameter.key.clone());
        let settings = self.settings;
        let eps = settings.final_epsilon;

        let mut state = SearchState {
            base: engine.snapshot(),
            config: base.clone(),
            parameter,
            value: parameter.read(base)?,
            evaluations: 0,
        };

        info!(
            key = parameter.key.as_str(),
            start = state.value,
            target_share,
            tolerance,
            "开始阈值标定"
        );

        // ==========================================
        // 步骤1: 分级搜索
        // ==========================================
        let mut share = self.evaluate(engine, &mut state, None)?;
        for stage in 0..settings.stage_count {
            let step = settings.stage_step(stage);
            while share > target_share && self.has_budget(&state) {
                state.shift(step)?;
                share = self.evaluate(engine, &mut state, None)?;
            }
            let finest = stage + 1 == settings.stage_count;
            if !finest {
                state.shift(-step)?;
                share = self.evaluate(engine, &mut state, None)?;
            }
            debug!(stage, step, value = state.value, share, "分级搜索完成一级");
        }

        // ==========================================
        // 步骤2: 细化 A (比例低于目标时降低参数)
        // ==========================================
        let mut patch_size = settings.initial_patch_size;
        share = self.evaluate(engine, &mut state, Some(patch_size))?;

        let coarse = settings.coarse_refine_step();
        share = self.refine_upwards(engine, &mut state, share, target_share, coarse, patch_size)?;
        state.shift(coarse)?;
        share = self.evaluate(engine, &mut state, Some(patch_size))?;
        share = self.refine_upwards(
            engine,
            &mut state,
            share,
            target_share - eps,
            settings.base_step,
            patch_size,
        )?;

        // ==========================================
        // 步骤3: 宽带检查
        // ==========================================
        let deviation = (share - target_share).abs();
        if deviation.is_nan() || deviation > settings.wide_band {
            warn!(
                key = parameter.key.as_str(),
                achieved = share,
                target_share,
                evaluations = state.evaluations,
                "阈值标定发散"
            );
            engine.restore(&state.base);
            return Err(EngineError::CalibrationDivergence {
                achieved: share,
                target: target_share,
            });
        }

        // ==========================================
        // 步骤4: 细化 B (比例高于目标时增大斑块阈值)
        // ==========================================
        if share > target_share + eps {
            engine.restore(&state.base);
            self.pipeline.apply_criteria(engine, &state.config)?;
            state.evaluations += 1;
            let post_pipeline = engine.snapshot();
            let mut stalled = 0usize;
            while share > target_share + eps
                && self.has_budget(&state)
                && stalled < settings.stall_limit
            {
                patch_size += settings.patch_size_step;
                engine.restore(&post_pipeline);
                let next = self.prune_and_read(engine, patch_size)?;
                state.evaluations += 1;
                stalled = if next == share { stalled + 1 } else { 0 };
                share = next;
            }
            debug!(patch_size, share, "斑块阈值细化完成");
        }

        // ==========================================
        // 步骤5: 落地最终配置
        // ==========================================
        engine.restore(&state.base);
        let outcome = self.pipeline.apply_criteria(engine, &state.config)?;
        let achieved_share = self.prune_and_read(engine, patch_size)?;
        state.evaluations += 1;

        let mut warnings = outcome.warnings;
        let within_tolerance = (achieved_share - target_share).abs() <= tolerance;
        if !within_tolerance {
            warn!(
                achieved = achieved_share,
                target_share, tolerance, "标定结果超出容差, 请使用更小的步长"
            );
            warnings.push(ConfigWarning::CalibrationToleranceMiss {
                achieved: achieved_share,
                target: target_share,
                tolerance,
            });
        }

        info!(
            key = parameter.key.as_str(),
            value = state.value,
            min_patch_size = patch_size,
            achieved_share,
            evaluations = state.evaluations,
            within_tolerance,
            "阈值标定完成"
        );

        Ok(CalibrationOutcome {
            config: state.config,
            parameter_value: state.value,
            min_patch_size: patch_size,
            achieved_share,
            target_share,
            within_tolerance,
            evaluations: state.evaluations,
            warnings,
        })
    }

    /// 递减参数直到比例达到 floor
    ///
    /// # 规则
    /// 比例达到 1、比例连续不变或试算次数用尽时提前结束
    fn refine_upwards<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        state: &mut SearchState<'_, E::Snapshot>,
        mut share: f64,
        floor: f64,
        step: f64,
        patch_size: f64,
    ) -> EngineResult<f64> {
        let mut stalled = 0usize;
        while share < floor {
            if share >= 1.0 || !self.has_budget(state) || stalled >= self.settings.stall_limit {
                debug!(share, floor, stalled, "细化提前结束");
                break;
            }
            state.shift(-step)?;
            let next = self.evaluate(engine, state, Some(patch_size))?;
            stalled = if next == share { stalled + 1 } else { 0 };
            share = next;
        }
        Ok(share)
    }

    /// 从基础快照试算一次
    fn evaluate<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        state: &mut SearchState<'_, E::Snapshot>,
        prune: Option<f64>,
    ) -> EngineResult<f64> {
        engine.restore(&state.base);
        self.pipeline.apply_criteria(engine, &state.config)?;
        state.evaluations += 1;
        let share = match prune {
            Some(size) => self.prune_and_read(engine, size)?,
            None => engine.percent_available() / 100.0,
        };
        debug!(value = state.value, share, evaluation = state.evaluations, "标定试算");
        if !share.is_finite() {
            warn!(key = state.parameter.key.as_str(), share, "标定试算比例无效, 终止标定");
            engine.restore(&state.base);
            return Err(EngineError::CalibrationEmptyRegion {
                key: state.parameter.key.clone(),
            });
        }
        Ok(share)
    }

    fn prune_and_read<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        min_size: f64,
    ) -> EngineResult<f64> {
        if engine.area_available() > 0.0 {
            count_engine_call();
            engine.prune_isolated_areas(min_size)?;
        }
        Ok(engine.percent_available() / 100.0)
    }

    fn has_budget<S>(&self, state: &SearchState<'_, S>) -> bool {
        state.evaluations < self.settings.max_evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criterion::{ResolvedCriterion, VectorLayer};
    use crate::domain::types::{Category, DataSource, ValueRange};

    fn config() -> ResolvedConfig {
        ResolvedConfig {
            criteria: vec![
                ResolvedCriterion {
                    key: "wind_100m".into(),
                    label: "Wind speed".into(),
                    category: Some(Category::EcoTech),
                    source: DataSource::Gwa,
                    instruction: ExclusionInstruction::Raster {
                        path: "/ds/gwa.tif".into(),
                        range: ValueRange::upper(4.5),
                        buffer: None,
                    },
                },
                ResolvedCriterion {
                    key: "forests".into(),
                    label: "Forests".into(),
                    category: Some(Category::Physical),
                    source: DataSource::BasisDlm,
                    instruction: ExclusionInstruction::Vector {
                        layers: vec![VectorLayer {
                            path: "/ds/veg02_f.shp".into(),
                            filter: None,
                        }],
                        buffer: None,
                    },
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_stage_steps_descend() {
        let s = CalibrationSettings::default();
        assert!((s.stage_step(0) - 10.0).abs() < 1e-9);
        assert!((s.stage_step(6) - 0.00001).abs() < 1e-12);
        assert!((s.coarse_refine_step() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_parameter_read_write_upper_bound() {
        let mut cfg = config();
        let p = CalibrationParameter::upper_bound("wind_100m");
        assert_eq!(p.read(&cfg).unwrap(), 4.5);
        p.write(&mut cfg, 5.25).unwrap();
        assert_eq!(p.read(&cfg).unwrap(), 5.25);
    }

    #[test]
    fn test_parameter_buffer_defaults_to_zero() {
        let mut cfg = config();
        let p = CalibrationParameter::buffer("forests");
        assert_eq!(p.read(&cfg).unwrap(), 0.0);
        p.write(&mut cfg, 30.0).unwrap();
        assert_eq!(cfg.criterion("forests").unwrap().instruction.buffer(), Some(30.0));
    }

    #[test]
    fn test_parameter_missing() {
        let cfg = config();
        assert!(matches!(
            CalibrationParameter::upper_bound("slope").read(&cfg),
            Err(EngineError::CalibrationParameterMissing { .. })
        ));
        assert!(matches!(
            CalibrationParameter::upper_bound("forests").read(&cfg),
            Err(EngineError::CalibrationParameterMissing { .. })
        ));
    }
}
