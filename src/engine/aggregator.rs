// ==========================================
// 用地适宜性评估 - 分类归并
// ==========================================
// 职责: 将占初始面积比例过小的判据归并为 "<类别> others"
// 红线: 结果只依赖输入; 大于等于阈值的条目原样保序通过
// ==========================================

use crate::domain::report::{CategoryBreakdown, FlowEntry};
use tracing::debug;

/// 归并阈值 (占初始可用面积的比例)
pub const DEFAULT_SHARE_THRESHOLD: f64 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryAggregator {
    threshold: f64,
}

impl Default for CategoryAggregator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SHARE_THRESHOLD,
        }
    }
}

impl CategoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 逐类别归并
    ///
    /// # 参数
    /// - categories: 每个类别的 (标签, 面积) 列表
    /// - initial_available_area: 初始可用面积; 为 0 时所有条目视为过小
    ///
    /// # 规则
    /// - 面积 / 初始面积 < 阈值 的条目累加为一条 "<类别> others", 追加在末尾
    /// - 累加和为 0 时不追加
    pub fn aggregate(
        &self,
        categories: &[CategoryBreakdown],
        initial_available_area: f64,
    ) -> Vec<CategoryBreakdown> {
        categories
            .iter()
            .map(|breakdown| self.aggregate_one(breakdown, initial_available_area))
            .collect()
    }

    fn aggregate_one(&self, breakdown: &CategoryBreakdown, initial: f64) -> CategoryBreakdown {
        let mut entries = Vec::with_capacity(breakdown.entries.len() + 1);
        let mut small_sum = 0.0;
        let mut merged = 0usize;

        for entry in &breakdown.entries {
            if self.is_material(entry.area, initial) {
                entries.push(entry.clone());
            } else {
                small_sum += entry.area;
                merged += 1;
            }
        }

        if small_sum != 0.0 {
            entries.push(FlowEntry {
                label: format!("{} others", breakdown.category.display_name()),
                area: small_sum,
            });
        }

        if merged > 0 {
            debug!(
                category = %breakdown.category,
                merged,
                small_sum,
                "小面积判据已归并"
            );
        }

        CategoryBreakdown {
            category: breakdown.category,
            entries,
        }
    }

    fn is_material(&self, area: f64, initial: f64) -> bool {
        initial > 0.0 && area / initial >= self.threshold
    }
}
