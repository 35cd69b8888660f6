// ==========================================
// 用地适宜性评估 - 技术类型
// ==========================================
// 职责: 各技术的默认预设、最小斑块、掩膜初始化、既有装机排除
// 能力: EstimatesPotential (所有技术) / HasExistingAssets (风电与地面光伏)
// 红线: 管线不感知技术类型; 技术只提供参数与前后处理
// ==========================================

use crate::config::DatasourceContext;
use crate::domain::criterion::ResolvedConfig;
use crate::domain::types::PointShape;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::spatial::{ScaledPoint, SpatialExclusionEngine};
use crate::perf::count_engine_call;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// 风电最小斑块 (平方米)
pub const WIND_MIN_PATCH_SIZE: f64 = 10000.0;
/// 光伏最小斑块 (平方米)
pub const PV_MIN_PATCH_SIZE: f64 = 500.0;
/// 沿路光伏默认条带宽度 (米)
pub const DEFAULT_SIDE_STRIPES: f64 = 200.0;
/// 光伏单位装机占地 (平方米/kWp)
pub const PV_AREA_PER_KWP: f64 = 14.0;

pub const EXISTING_TURBINES: &str = "Existing Turbines";
pub const EXISTING_OPENFIELD: &str = "existing Openfield";

const ROADS_MOTORWAY_FILE: &str = "Autobahn_a.shp";
const ROADS_MOTORWAY_FILTER: &str = "(ZUS != '2100' OR ZUS is null) AND  HDU_X = 0";
const ROADS_RAILWAY_FILE: &str = "Bahn_Strecke_a.shp";
const ROADS_RAILWAY_FILTER: &str = "(ZUS != '2100' OR ZUS is null) AND HDU_X = 0 AND BKT='1100'";

// ==========================================
// 既有装机
// ==========================================

/// 既有风机
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExistingTurbine {
    pub x: f64,
    pub y: f64,
    /// 转子直径 (米)
    pub rotor_diameter: f64,
    /// 主风向 (度); None 取技术设置中的风向
    #[serde(default)]
    pub direction: Option<f64>,
}

/// 既有地面光伏电站
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExistingPlant {
    pub x: f64,
    pub y: f64,
    /// 装机容量 (kWp)
    pub capacity: f64,
}

/// 区域内的既有装机清单 (由调用方从外部登记库读取)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistingAssets {
    #[serde(default)]
    pub turbines: Vec<ExistingTurbine>,
    #[serde(default)]
    pub openfield_plants: Vec<ExistingPlant>,
}

impl ExistingAssets {
    pub fn is_empty(&self) -> bool {
        self.turbines.is_empty() && self.openfield_plants.is_empty()
    }
}

// ==========================================
// 技术参数
// ==========================================

/// 风电参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSettings {
    /// 目标机型转子直径 (米)
    pub target_diameter: f64,
    /// 主风向/横向的间距倍数 (单位: 转子直径)
    pub distance: (f64, f64),
    /// 主风向 (度, 0 为西, 90 为南)
    pub wind_dir: f64,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self {
            target_diameter: 101.0,
            distance: (8.0, 4.0),
            wind_dir: 0.0,
        }
    }
}

impl WindSettings {
    /// 用配置中 existing 条目的字段覆盖 (target_diameter / distance / wind_dir)
    pub fn with_overrides(mut self, params: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = params else {
            return self;
        };
        if let Some(d) = map.get("target_diameter").and_then(Value::as_f64) {
            self.target_diameter = d;
        }
        if let Some(Value::Array(pair)) = map.get("distance") {
            if let [Some(along), Some(across)] = [
                pair.first().and_then(Value::as_f64),
                pair.get(1).and_then(Value::as_f64),
            ] {
                self.distance = (along, across);
            }
        }
        match map.get("wind_dir") {
            Some(Value::Number(n)) => {
                if let Some(dir) = n.as_f64() {
                    self.wind_dir = dir;
                }
            }
            Some(other) if !other.is_null() => {
                warn!(wind_dir = %other, "风向只支持数值, 沿用默认风向");
            }
            _ => {}
        }
        self
    }
}

/// 沿路光伏的走廊类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoadCorridor {
    Roads,
    Railways,
    #[default]
    Both,
}

// ==========================================
// Technology - 技术变体
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "technology", content = "settings", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Technology {
    Wind(WindSettings),
    OpenfieldPv,
    OpenfieldPvRoads(RoadCorridor),
    RooftopPv,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Technology::Wind(_) => write!(f, "Wind"),
            Technology::OpenfieldPv => write!(f, "OpenfieldPV"),
            Technology::OpenfieldPvRoads(_) => write!(f, "OpenfieldPVRoads"),
            Technology::RooftopPv => write!(f, "RooftopPV"),
        }
    }
}

impl Technology {
    pub fn wind() -> Self {
        Technology::Wind(WindSettings::default())
    }

    /// 从命令行名称解析 (大小写不敏感)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "wind" => Some(Technology::wind()),
            "openfield_pv" | "openfieldpv" => Some(Technology::OpenfieldPv),
            "openfield_pv_roads" | "openfieldpvroads" => {
                Some(Technology::OpenfieldPvRoads(RoadCorridor::default()))
            }
            "rooftop_pv" | "rooftoppv" => Some(Technology::RooftopPv),
            _ => None,
        }
    }

    fn unsupported(&self, operation: &str) -> EngineError {
        EngineError::UnsupportedOperation {
            technology: self.to_string(),
            operation: operation.to_string(),
        }
    }

    /// 仅风电支持可用面积比例标定
    pub fn supports_area_restriction(&self) -> bool {
        matches!(self, Technology::Wind(_))
    }
}

// ==========================================
// EstimatesPotential - 潜力评估能力
// ==========================================

/// 掩膜初始化结果
#[derive(Debug, Clone, PartialEq)]
pub enum MaskPreparation {
    /// 可继续执行排除管线
    Ready,
    /// 无可用面积, 附说明
    NothingAvailable(String),
}

pub trait EstimatesPotential {
    /// 技术默认预设名
    fn default_preset(&self, state: Option<&str>) -> String;

    /// 孤立斑块剔除阈值
    fn min_patch_size(&self) -> f64;

    /// 既有装机排除是否放在管线之后
    fn existing_after_pipeline(&self) -> bool {
        false
    }

    /// 排除管线前的掩膜初始化
    fn prepare_mask<E: SpatialExclusionEngine>(
        &self,
        _engine: &mut E,
        _ctx: &DatasourceContext,
        _resolved: &ResolvedConfig,
    ) -> EngineResult<MaskPreparation> {
        Ok(MaskPreparation::Ready)
    }
}

impl EstimatesPotential for Technology {
    fn default_preset(&self, state: Option<&str>) -> String {
        match (self, state) {
            (Technology::Wind(_), Some(state)) => format!("wind_{}", state),
            (Technology::Wind(_), None) => "wind_basis".to_string(),
            (Technology::OpenfieldPv, Some(state)) => format!("openfield_PV_{}", state),
            (Technology::OpenfieldPv, None) => "openfield_PV_basis".to_string(),
            (Technology::OpenfieldPvRoads(_), Some(state)) => format!("openfield_roads_{}", state),
            (Technology::OpenfieldPvRoads(_), None) => "openfield_roads_basis".to_string(),
            (Technology::RooftopPv, _) => "rooftop_PV_basis".to_string(),
        }
    }

    fn min_patch_size(&self) -> f64 {
        match self {
            Technology::Wind(_) => WIND_MIN_PATCH_SIZE,
            Technology::OpenfieldPv | Technology::OpenfieldPvRoads(_) | Technology::RooftopPv => {
                PV_MIN_PATCH_SIZE
            }
        }
    }

    fn existing_after_pipeline(&self) -> bool {
        matches!(self, Technology::OpenfieldPvRoads(_))
    }

    /// 沿路光伏: 先全部排除, 再纳入道路/铁路两侧条带
    fn prepare_mask<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        ctx: &DatasourceContext,
        resolved: &ResolvedConfig,
    ) -> EngineResult<MaskPreparation> {
        let Technology::OpenfieldPvRoads(corridor) = self else {
            return Ok(MaskPreparation::Ready);
        };

        let stripes = resolved.side_stripes.unwrap_or(DEFAULT_SIDE_STRIPES);
        count_engine_call();
        engine.exclude_all()?;

        let ofpv_dir = ctx.basis_dlm_root.join("ofpv");
        let mut corridors: Vec<(PathBuf, &str)> = Vec::new();
        if matches!(corridor, RoadCorridor::Roads | RoadCorridor::Both) {
            corridors.push((ofpv_dir.join(ROADS_MOTORWAY_FILE), ROADS_MOTORWAY_FILTER));
        }
        if matches!(corridor, RoadCorridor::Railways | RoadCorridor::Both) {
            corridors.push((ofpv_dir.join(ROADS_RAILWAY_FILE), ROADS_RAILWAY_FILTER));
        }
        for (path, filter) in &corridors {
            count_engine_call();
            engine.include_vector_type(path, Some(*filter), Some(stripes))?;
        }

        let available = engine.percent_available();
        info!(corridor = ?corridor, stripes, available, "沿路条带已纳入");
        if available == 0.0 {
            warn!(corridor = ?corridor, "道路/铁路两侧无可用面积");
            return Ok(MaskPreparation::NothingAvailable(
                "There is no potential areas on sides of roads and railways".to_string(),
            ));
        }
        Ok(MaskPreparation::Ready)
    }
}

// ==========================================
// HasExistingAssets - 既有装机排除能力
// ==========================================

/// 一组同形状的排除点
#[derive(Debug, Clone, PartialEq)]
pub struct PointExclusion {
    pub points: Vec<ScaledPoint>,
    pub shape: PointShape,
    pub save_as: &'static str,
}

pub trait HasExistingAssets {
    /// 由既有装机生成排除点
    ///
    /// # 参数
    /// - params: 配置中 existing 条目 (风电可覆盖间距参数)
    fn existing_exclusions(
        &self,
        assets: &ExistingAssets,
        params: Option<&Value>,
    ) -> EngineResult<Vec<PointExclusion>>;

    /// 在引擎上排除既有装机, 返回排除点数
    fn exclude_existing<E: SpatialExclusionEngine>(
        &self,
        engine: &mut E,
        assets: &ExistingAssets,
        params: Option<&Value>,
    ) -> EngineResult<usize> {
        let mut count = 0;
        for exclusion in self.existing_exclusions(assets, params)? {
            if exclusion.points.is_empty() {
                continue;
            }
            count_engine_call();
            engine.exclude_points(&exclusion.points, exclusion.shape, Some(exclusion.save_as))?;
            info!(
                save_as = exclusion.save_as,
                shape = %exclusion.shape,
                points = exclusion.points.len(),
                "既有装机已排除"
            );
            count += exclusion.points.len();
        }
        Ok(count)
    }
}

/// 地面光伏: 边长 √(容量×14) 的正方形, 半边长为缩放
fn openfield_points(plants: &[ExistingPlant]) -> Vec<ScaledPoint> {
    plants
        .iter()
        .map(|p| {
            let half = (p.capacity.max(0.0) * PV_AREA_PER_KWP).sqrt() / 2.0;
            ScaledPoint {
                x: p.x,
                y: p.y,
                scale: (half, half),
                direction: 0.0,
            }
        })
        .collect()
}

fn turbine_points(turbines: &[ExistingTurbine], settings: &WindSettings) -> Vec<ScaledPoint> {
    turbines
        .iter()
        .map(|t| {
            let d = t.rotor_diameter.max(settings.target_diameter);
            ScaledPoint {
                x: t.x,
                y: t.y,
                scale: (settings.distance.0 * d, settings.distance.1 * d),
                direction: t.direction.unwrap_or(settings.wind_dir),
            }
        })
        .collect()
}

impl HasExistingAssets for Technology {
    fn existing_exclusions(
        &self,
        assets: &ExistingAssets,
        params: Option<&Value>,
    ) -> EngineResult<Vec<PointExclusion>> {
        let openfield = PointExclusion {
            points: openfield_points(&assets.openfield_plants),
            shape: PointShape::Rectangle,
            save_as: EXISTING_OPENFIELD,
        };
        match self {
            Technology::Wind(settings) => {
                let settings = settings.with_overrides(params);
                Ok(vec![
                    PointExclusion {
                        points: turbine_points(&assets.turbines, &settings),
                        shape: PointShape::Ellipse,
                        save_as: EXISTING_TURBINES,
                    },
                    openfield,
                ])
            }
            Technology::OpenfieldPv | Technology::OpenfieldPvRoads(_) => Ok(vec![openfield]),
            Technology::RooftopPv => Err(self.unsupported("exclude_existing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_presets() {
        assert_eq!(Technology::wind().default_preset(Some("th")), "wind_th");
        assert_eq!(Technology::OpenfieldPv.default_preset(None), "openfield_PV_basis");
        assert_eq!(
            Technology::OpenfieldPvRoads(RoadCorridor::Both).default_preset(Some("by")),
            "openfield_roads_by"
        );
        assert_eq!(Technology::RooftopPv.default_preset(Some("th")), "rooftop_PV_basis");
    }

    #[test]
    fn test_min_patch_sizes() {
        assert_eq!(Technology::wind().min_patch_size(), 10000.0);
        assert_eq!(Technology::OpenfieldPv.min_patch_size(), 500.0);
        assert_eq!(Technology::RooftopPv.min_patch_size(), 500.0);
    }

    #[test]
    fn test_turbine_scale_uses_larger_diameter() {
        let assets = ExistingAssets {
            turbines: vec![
                ExistingTurbine { x: 0.0, y: 0.0, rotor_diameter: 80.0, direction: None },
                ExistingTurbine { x: 1.0, y: 1.0, rotor_diameter: 120.0, direction: Some(45.0) },
            ],
            openfield_plants: Vec::new(),
        };
        let groups = Technology::wind().existing_exclusions(&assets, None).unwrap();
        let turbines = &groups[0];
        assert_eq!(turbines.shape, PointShape::Ellipse);
        assert_eq!(turbines.points[0].scale, (808.0, 404.0));
        assert_eq!(turbines.points[1].scale, (960.0, 480.0));
        assert_eq!(turbines.points[1].direction, 45.0);
    }

    #[test]
    fn test_wind_overrides_from_existing_params() {
        let params = json!({"target_diameter": 150, "distance": [5, 3], "wind_dir": 90});
        let settings = WindSettings::default().with_overrides(Some(&params));
        assert_eq!(settings.target_diameter, 150.0);
        assert_eq!(settings.distance, (5.0, 3.0));
        assert_eq!(settings.wind_dir, 90.0);

        let untouched = WindSettings::default().with_overrides(Some(&json!({"wind_dir": "from_era"})));
        assert_eq!(untouched, WindSettings::default());
    }

    #[test]
    fn test_openfield_rectangle_half_side() {
        let assets = ExistingAssets {
            turbines: Vec::new(),
            openfield_plants: vec![ExistingPlant { x: 0.0, y: 0.0, capacity: 1400.0 }],
        };
        let groups = Technology::OpenfieldPv.existing_exclusions(&assets, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].shape, PointShape::Rectangle);
        assert_eq!(groups[0].save_as, "existing Openfield");
        assert!((groups[0].points[0].scale.0 - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_rooftop_has_no_existing_exclusion() {
        let err = Technology::RooftopPv
            .existing_exclusions(&ExistingAssets::default(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Technology::parse("Wind"), Some(Technology::wind()));
        assert_eq!(Technology::parse("rooftop_pv"), Some(Technology::RooftopPv));
        assert_eq!(Technology::parse("hydro"), None);
    }
}
