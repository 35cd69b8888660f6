// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 内存网格空间引擎、单调曲线引擎、临时数据源/预设目录
// ==========================================

#![allow(dead_code)]

use land_eligibility::config::{DatasourceContext, ExclusionConfiguration};
use land_eligibility::domain::criterion::{ExclusionInstruction, ResolvedConfig};
use land_eligibility::domain::types::{PointShape, ValueRange};
use land_eligibility::engine::{CriterionResolver, ScaledPoint, SpatialExclusionEngine};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ==========================================
// GridEngine - 内存网格引擎
// ==========================================
// 每个像元一个可用标记; 矢量图层按 (文件, 过滤条件) 映射到像元集合, 缓冲忽略
// 以 None 过滤登记的图层匹配任意过滤条件
#[derive(Debug, Clone)]
pub struct GridEngine {
    pub width: usize,
    pub height: usize,
    pub cell_area: f64,
    region: Vec<bool>,
    available: Vec<bool>,
    vectors: HashMap<(PathBuf, Option<String>), Vec<usize>>,
    rasters: HashMap<PathBuf, Vec<f64>>,
    intermediates: HashMap<PathBuf, f64>,
    /// 调用日志, 用于断言执行顺序
    pub ops: Vec<String>,
    pub excluded_points: Vec<(ScaledPoint, PointShape, Option<String>)>,
}

impl GridEngine {
    /// 全部像元在区域内且可用
    pub fn new(width: usize, height: usize, cell_area: f64) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            cell_area,
            region: vec![true; n],
            available: vec![true; n],
            vectors: HashMap::new(),
            rasters: HashMap::new(),
            intermediates: HashMap::new(),
            ops: Vec::new(),
            excluded_points: Vec::new(),
        }
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn with_vector(mut self, path: impl Into<PathBuf>, cells: Vec<usize>) -> Self {
        self.vectors.insert((path.into(), None), cells);
        self
    }

    fn vector_cells(&self, path: &Path, filter: Option<&str>) -> Vec<usize> {
        self.vectors
            .get(&(path.to_path_buf(), filter.map(|f| f.to_string())))
            .or_else(|| self.vectors.get(&(path.to_path_buf(), None)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn with_raster(mut self, path: impl Into<PathBuf>, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), self.width * self.height);
        self.rasters.insert(path.into(), values);
        self
    }

    /// 为已解析判据的全部图层登记同一像元集合 (栅格判据登记像元值)
    pub fn with_criterion(mut self, resolved: &ResolvedConfig, key: &str, cells: Vec<usize>) -> Self {
        let criterion = resolved
            .criterion(key)
            .unwrap_or_else(|| panic!("判据 {} 未解析", key));
        match &criterion.instruction {
            ExclusionInstruction::Vector { layers, .. } => {
                for layer in layers {
                    self.vectors
                        .insert((layer.path.clone(), layer.filter.clone()), cells.clone());
                }
            }
            ExclusionInstruction::Raster { path, .. } => {
                let mut values = vec![f64::MAX; self.width * self.height];
                for c in cells {
                    values[c] = f64::MIN;
                }
                self.rasters.insert(path.clone(), values);
            }
        }
        self
    }

    /// 把区域外像元标为不可用
    pub fn with_region(mut self, inside: impl Fn(usize, usize) -> bool) -> Self {
        for y in 0..self.height {
            for x in 0..self.width {
                let i = self.idx(x, y);
                self.region[i] = inside(x, y);
                self.available[i] = self.region[i];
            }
        }
        self
    }

    pub fn available_cells(&self) -> usize {
        self.available.iter().filter(|a| **a).count()
    }

    pub fn is_available(&self, i: usize) -> bool {
        self.available[i]
    }

    /// 已登记的中间掩膜 (路径 => 该判据自身排除面积)
    pub fn intermediate_area(&self, path: &Path) -> Option<f64> {
        self.intermediates.get(path).copied()
    }

    fn region_cells(&self) -> usize {
        self.region.iter().filter(|r| **r).count()
    }

    fn label(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn exclude_cells(&mut self, cells: &[usize], intermediate: Option<&Path>) {
        if let Some(path) = intermediate {
            let own = cells.iter().filter(|c| self.region[**c]).count();
            self.intermediates
                .insert(path.to_path_buf(), own as f64 * self.cell_area);
        }
        for c in cells {
            self.available[*c] = false;
        }
    }

    fn neighbours(&self, i: usize) -> Vec<usize> {
        let (x, y) = (i % self.width, i / self.width);
        let mut out = Vec::with_capacity(4);
        if x > 0 {
            out.push(i - 1);
        }
        if x + 1 < self.width {
            out.push(i + 1);
        }
        if y > 0 {
            out.push(i - self.width);
        }
        if y + 1 < self.height {
            out.push(i + self.width);
        }
        out
    }
}

impl SpatialExclusionEngine for GridEngine {
    type Snapshot = Vec<bool>;

    fn exclude_vector_type(
        &mut self,
        path: &Path,
        filter: Option<&str>,
        _buffer: Option<f64>,
        intermediate: Option<&Path>,
    ) -> anyhow::Result<()> {
        self.ops.push(format!("vector:{}", Self::label(path)));
        let cells = self.vector_cells(path, filter);
        self.exclude_cells(&cells, intermediate);
        Ok(())
    }

    fn include_vector_type(
        &mut self,
        path: &Path,
        filter: Option<&str>,
        _buffer: Option<f64>,
    ) -> anyhow::Result<()> {
        self.ops.push(format!("include:{}", Self::label(path)));
        for c in self.vector_cells(path, filter) {
            if self.region[c] {
                self.available[c] = true;
            }
        }
        Ok(())
    }

    fn exclude_raster_type(
        &mut self,
        path: &Path,
        range: ValueRange,
        _buffer: Option<f64>,
        intermediate: Option<&Path>,
    ) -> anyhow::Result<()> {
        self.ops.push(format!("raster:{}", Self::label(path)));
        let Some(values) = self.rasters.get(path) else {
            anyhow::bail!("栅格不存在: {}", path.display());
        };
        let cells: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| range.contains(**v))
            .map(|(i, _)| i)
            .collect();
        self.exclude_cells(&cells, intermediate);
        Ok(())
    }

    fn exclude_points(
        &mut self,
        points: &[ScaledPoint],
        shape: PointShape,
        save_as: Option<&str>,
    ) -> anyhow::Result<()> {
        self.ops.push(format!("points:{}", save_as.unwrap_or("")));
        for p in points {
            let (x, y) = (p.x.max(0.0) as usize, p.y.max(0.0) as usize);
            if x < self.width && y < self.height {
                let i = self.idx(x, y);
                self.available[i] = false;
            }
            self.excluded_points
                .push((*p, shape, save_as.map(|s| s.to_string())));
        }
        Ok(())
    }

    fn exclude_region_edge(&mut self, _distance: f64) -> anyhow::Result<()> {
        self.ops.push("region_edge".to_string());
        for y in 0..self.height {
            for x in 0..self.width {
                if x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height {
                    let i = self.idx(x, y);
                    self.available[i] = false;
                }
            }
        }
        Ok(())
    }

    fn exclude_all(&mut self) -> anyhow::Result<()> {
        self.ops.push("exclude_all".to_string());
        self.available.iter_mut().for_each(|a| *a = false);
        Ok(())
    }

    fn prune_isolated_areas(&mut self, min_size: f64) -> anyhow::Result<()> {
        self.ops.push(format!("prune:{}", min_size));
        let mut seen = vec![false; self.available.len()];
        for start in 0..self.available.len() {
            if !self.available[start] || seen[start] {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(i) = queue.pop_front() {
                for n in self.neighbours(i) {
                    if self.available[n] && !seen[n] {
                        seen[n] = true;
                        component.push(n);
                        queue.push_back(n);
                    }
                }
            }
            if (component.len() as f64) * self.cell_area < min_size {
                for c in component {
                    self.available[c] = false;
                }
            }
        }
        Ok(())
    }

    fn area_available(&self) -> f64 {
        self.available_cells() as f64 * self.cell_area
    }

    fn percent_available(&self) -> f64 {
        let region = self.region_cells();
        if region == 0 {
            return 0.0;
        }
        self.available_cells() as f64 / region as f64 * 100.0
    }

    fn total_region_area(&self) -> f64 {
        self.region_cells() as f64 * self.cell_area
    }

    fn intermediate_excluded_area(&self, intermediate: &Path) -> anyhow::Result<Option<f64>> {
        Ok(self.intermediates.get(intermediate).copied())
    }

    fn snapshot(&self) -> Self::Snapshot {
        self.available.clone()
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) {
        self.available = snapshot.clone();
    }
}

// ==========================================
// CurveEngine - 单调曲线引擎 (标定测试)
// ==========================================
// 可用面积 = 初始面积 × clamp(1 - 上界/100, 0, 1)
#[derive(Debug, Clone)]
pub struct CurveEngine {
    pub initial_area: f64,
    available: f64,
    pub raster_calls: usize,
}

impl CurveEngine {
    pub fn new(initial_area: f64) -> Self {
        Self {
            initial_area,
            available: initial_area,
            raster_calls: 0,
        }
    }

    pub fn share(param: f64) -> f64 {
        (1.0 - param / 100.0).clamp(0.0, 1.0)
    }
}

impl SpatialExclusionEngine for CurveEngine {
    type Snapshot = f64;

    fn exclude_vector_type(
        &mut self,
        _path: &Path,
        _filter: Option<&str>,
        _buffer: Option<f64>,
        _intermediate: Option<&Path>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn include_vector_type(
        &mut self,
        _path: &Path,
        _filter: Option<&str>,
        _buffer: Option<f64>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn exclude_raster_type(
        &mut self,
        _path: &Path,
        range: ValueRange,
        _buffer: Option<f64>,
        _intermediate: Option<&Path>,
    ) -> anyhow::Result<()> {
        self.raster_calls += 1;
        let high = range.high.unwrap_or(0.0);
        self.available = self
            .available
            .min(self.initial_area * Self::share(high));
        Ok(())
    }

    fn exclude_points(
        &mut self,
        _points: &[ScaledPoint],
        _shape: PointShape,
        _save_as: Option<&str>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn exclude_region_edge(&mut self, _distance: f64) -> anyhow::Result<()> {
        Ok(())
    }

    fn exclude_all(&mut self) -> anyhow::Result<()> {
        self.available = 0.0;
        Ok(())
    }

    fn prune_isolated_areas(&mut self, _min_size: f64) -> anyhow::Result<()> {
        Ok(())
    }

    fn area_available(&self) -> f64 {
        self.available
    }

    fn percent_available(&self) -> f64 {
        self.available / self.initial_area * 100.0
    }

    fn total_region_area(&self) -> f64 {
        self.initial_area
    }

    fn intermediate_excluded_area(&self, _intermediate: &Path) -> anyhow::Result<Option<f64>> {
        Ok(None)
    }

    fn snapshot(&self) -> Self::Snapshot {
        self.available
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) {
        self.available = *snapshot;
    }
}

// ==========================================
// 上下文与配置
// ==========================================

/// 临时数据源根目录 + 预设目录
///
/// # 返回
/// (临时目录守卫, 上下文); 守卫需在测试期间保持存活
pub fn test_context() -> (TempDir, DatasourceContext) {
    land_eligibility::logging::init_test();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let presets = dir.path().join("presets");
    std::fs::create_dir_all(&presets).expect("Failed to create presets dir");
    let ctx = DatasourceContext::new(dir.path().join("ds"))
        .with_presets_dir(presets)
        .with_intermediate_dir(dir.path().join("intermediates"))
        .with_region("test_region");
    (dir, ctx)
}

pub fn write_preset(ctx: &DatasourceContext, name: &str, value: &Value) {
    std::fs::write(
        ctx.presets_dir.join(format!("{}.json", name)),
        serde_json::to_string_pretty(value).expect("Failed to serialize preset"),
    )
    .expect("Failed to write preset");
}

pub fn resolve(ctx: &DatasourceContext, value: Value) -> ResolvedConfig {
    let config = ExclusionConfiguration::from_value(value).expect("Failed to parse config");
    CriterionResolver::new(ctx).resolve(&config)
}

/// 第 row 行的全部像元
pub fn row(engine: &GridEngine, y: usize) -> Vec<usize> {
    (0..engine.width).map(|x| engine.idx(x, y)).collect()
}
