// ==========================================
// 用地适宜性评估 - 判据解析器
// ==========================================
// 职责: 判据字典 => 按数据源展开的可执行指令
// 输入: ExclusionConfiguration + DatasourceContext
// 输出: ResolvedConfig (规范顺序, 附带告警)
// 红线: 解析永不失败; 不支持的数据源回退默认并告警
// ==========================================

use crate::config::exclusion_config::{parse_auxiliary, reserved_keys, CriterionParams};
use crate::config::{DatasourceContext, ExclusionConfiguration};
use crate::domain::criterion::{ExclusionInstruction, ResolvedConfig, ResolvedCriterion, VectorLayer};
use crate::domain::types::{DataSource, GeometryKind, ValueRange};
use crate::domain::warning::ConfigWarning;
use crate::engine::criterion_table::{self, CriterionDef, ValueEncoding};
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// 坡度栅格的编码上限 (0° 对应值)
pub const SLOPE_ENCODING_MAX: f64 = 250.0;

// ==========================================
// CriterionResolver
// ==========================================
pub struct CriterionResolver<'a> {
    ctx: &'a DatasourceContext,
}

impl<'a> CriterionResolver<'a> {
    pub fn new(ctx: &'a DatasourceContext) -> Self {
        Self { ctx }
    }

    /// 解析整份判据字典
    ///
    /// # 规则
    /// - 命名判据按判据表顺序输出, 与字典顺序无关
    /// - 未知键保留在 unknown_keys, 由执行器告警跳过
    /// - 配置中的 state 优先于上下文中的 state
    pub fn resolve(&self, config: &ExclusionConfiguration) -> ResolvedConfig {
        let mut warnings = Vec::new();
        let state = config.state().or_else(|| self.ctx.state.clone());

        let ctx: Cow<'_, DatasourceContext> = match (&state, &self.ctx.state) {
            (Some(s), current) if current.as_deref() != Some(s.as_str()) => {
                Cow::Owned(self.ctx.clone().with_state(s.clone()))
            }
            _ => Cow::Borrowed(self.ctx),
        };

        let mut criteria = Vec::new();
        for def in criterion_table::all() {
            let Some(raw) = config.get(def.key) else {
                continue;
            };
            let is_raster = def.kind == GeometryKind::Raster;
            let Some(params) = CriterionParams::parse(def.key, raw, is_raster, &mut warnings) else {
                continue;
            };
            if let Some(resolved) = resolve_criterion(&ctx, def, &params, &mut warnings) {
                debug!(
                    key = resolved.key.as_str(),
                    source = %resolved.source,
                    param = %resolved.instruction.parameter_tag(),
                    "判据已解析"
                );
                criteria.push(resolved);
            }
        }

        let region_edge = number_entry(config, reserved_keys::REGION_EDGE, &mut warnings);
        let side_stripes = number_entry(config, reserved_keys::SIDE_STRIPES, &mut warnings);
        let existing = config
            .get(reserved_keys::EXISTING)
            .filter(|v| !v.is_null())
            .cloned();
        let auxiliary = config
            .get(reserved_keys::AUXILIARY)
            .map(|raw| parse_auxiliary(raw, &mut warnings))
            .unwrap_or_default();

        let unknown_keys: Vec<String> = config
            .keys()
            .filter(|k| !criterion_table::is_known_key(k) && config.is_present(k))
            .cloned()
            .collect();

        info!(
            criteria = criteria.len(),
            auxiliary = auxiliary.len(),
            unknown = unknown_keys.len(),
            warnings = warnings.len(),
            "判据字典解析完成"
        );

        ResolvedConfig {
            criteria,
            auxiliary,
            region_edge,
            existing,
            side_stripes,
            state,
            unknown_keys,
            warnings,
        }
    }
}

/// 解析单个命名判据
///
/// # 返回
/// - None: 栅格判据缺少 value (已告警)
pub fn resolve_criterion(
    ctx: &DatasourceContext,
    def: &CriterionDef,
    params: &CriterionParams,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<ResolvedCriterion> {
    let source = select_source(def, params.source.as_deref(), warnings);
    let rule = def.rule(source)?;

    let instruction = match def.kind {
        GeometryKind::Vector => ExclusionInstruction::Vector {
            layers: rule
                .layers
                .iter()
                .map(|layer| VectorLayer {
                    path: ctx.resolve(layer.root, layer.file),
                    filter: layer.filter.map(|f| f.to_string()),
                })
                .collect(),
            buffer: params.buffer,
        },
        GeometryKind::Raster => {
            let Some(range) = params.value else {
                warn!(key = def.key, "栅格判据缺少 value, 不执行排除");
                warnings.push(ConfigWarning::MissingRasterValue {
                    key: def.key.to_string(),
                });
                return None;
            };
            let layer = rule.layers.first()?;
            ExclusionInstruction::Raster {
                path: ctx.resolve(layer.root, layer.file),
                range: encode_range(def.encoding, range),
                buffer: params.buffer,
            }
        }
    };

    Some(ResolvedCriterion {
        key: def.key.to_string(),
        label: def.label.to_string(),
        category: def.category,
        source,
        instruction,
    })
}

/// 选择数据源: 请求的源在允许列表内则保留, 否则回退默认源并告警
fn select_source(
    def: &CriterionDef,
    requested: Option<&str>,
    warnings: &mut Vec<ConfigWarning>,
) -> DataSource {
    let Some(requested) = requested else {
        return def.default_source;
    };
    match DataSource::parse(requested) {
        Some(source) if def.allows(source) => source,
        _ => {
            warn!(
                key = def.key,
                requested,
                fallback = %def.default_source,
                "{} is not supported for {}!",
                requested,
                def.key
            );
            warnings.push(ConfigWarning::UnsupportedSource {
                key: def.key.to_string(),
                requested: requested.to_string(),
                fallback: def.default_source,
            });
            def.default_source
        }
    }
}

/// 值域编码
pub fn encode_range(encoding: ValueEncoding, range: ValueRange) -> ValueRange {
    match encoding {
        ValueEncoding::Identity => range,
        ValueEncoding::SlopeCosine => ValueRange {
            low: range.low,
            high: range.high.map(encode_slope_degrees),
        },
    }
}

/// 坡度 (度) => 栅格编码值 250·cos(π/180·度), 截断到 [0, 250]
pub fn encode_slope_degrees(degrees: f64) -> f64 {
    let encoded = SLOPE_ENCODING_MAX * (degrees.to_radians()).cos();
    encoded.clamp(0.0, SLOPE_ENCODING_MAX)
}

fn number_entry(
    config: &ExclusionConfiguration,
    key: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<f64> {
    match config.get(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        other => {
            warnings.push(ConfigWarning::InvalidCriterionField {
                key: key.to_string(),
                field: key.to_string(),
                message: format!("需要数字, 实际为 {}", other),
            });
            None
        }
    }
}
