// ==========================================
// 用地适宜性评估 - 空间排除引擎接口
// ==========================================
// 职责: 定义管线所需的空间原语接口 (不包含实现)
// 红线: 可用性栅格归引擎所有; 管线只通过本接口读写
// ==========================================

use crate::domain::types::{PointShape, ValueRange};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ==========================================
// ScaledPoint - 带缩放与方向的点 (既有装机)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledPoint {
    pub x: f64,
    pub y: f64,
    /// 两个方向的缓冲半轴 (米)
    pub scale: (f64, f64),
    /// 主方向 (度)
    pub direction: f64,
}

// ==========================================
// SpatialExclusionEngine Trait
// ==========================================
// 实现者: 外部栅格/矢量排除计算器; 测试中为内存网格
pub trait SpatialExclusionEngine {
    /// 可用性栅格快照 (值语义, 恢复后互不影响)
    type Snapshot: Clone;

    // ===== 排除原语 =====

    /// 排除矢量要素 (可选属性过滤与缓冲)
    ///
    /// # 参数
    /// - intermediate: 若给出, 同时写出该判据自身的排除掩膜
    fn exclude_vector_type(
        &mut self,
        path: &Path,
        filter: Option<&str>,
        buffer: Option<f64>,
        intermediate: Option<&Path>,
    ) -> anyhow::Result<()>;

    /// 重新纳入矢量要素范围 (沿路光伏的两侧条带)
    fn include_vector_type(
        &mut self,
        path: &Path,
        filter: Option<&str>,
        buffer: Option<f64>,
    ) -> anyhow::Result<()>;

    /// 排除值落在区间内的栅格像元
    fn exclude_raster_type(
        &mut self,
        path: &Path,
        range: ValueRange,
        buffer: Option<f64>,
        intermediate: Option<&Path>,
    ) -> anyhow::Result<()>;

    /// 以点为中心按形状与缩放排除
    fn exclude_points(
        &mut self,
        points: &[ScaledPoint],
        shape: PointShape,
        save_as: Option<&str>,
    ) -> anyhow::Result<()>;

    /// 排除区域边缘缓冲带
    fn exclude_region_edge(&mut self, distance: f64) -> anyhow::Result<()>;

    /// 将全部像元置为不可用
    fn exclude_all(&mut self) -> anyhow::Result<()>;

    /// 剔除小于 min_size (平方米) 的孤立可用斑块
    fn prune_isolated_areas(&mut self, min_size: f64) -> anyhow::Result<()>;

    // ===== 读数 =====

    /// 当前可用面积 (平方米)
    fn area_available(&self) -> f64;

    /// 当前可用比例 (0..=100)
    fn percent_available(&self) -> f64;

    /// 区域掩膜总面积 (与排除无关)
    fn total_region_area(&self) -> f64;

    /// 中间掩膜中被排除的面积; 文件不存在时返回 None
    fn intermediate_excluded_area(&self, intermediate: &Path) -> anyhow::Result<Option<f64>>;

    // ===== 状态 =====

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: &Self::Snapshot);
}
