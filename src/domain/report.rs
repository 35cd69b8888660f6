// ==========================================
// 用地适宜性评估 - 面积流与报告
// ==========================================
// 职责: 单判据面积流记录、分类汇总、最终报告
// 红线: 报告是管线唯一对外产物, 字段必须完整填充
// ==========================================

use crate::domain::criterion::ResolvedConfig;
use crate::domain::types::{AccountingMode, Category};
use crate::domain::warning::ConfigWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// AreaFlowRecord - 单判据面积流
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaFlowRecord {
    pub category: Category,
    pub label: String,
    pub key: String,
    /// 排除面积 (>= 0)
    pub excluded_area: f64,
    /// 执行前剩余面积
    pub remaining_before: f64,
    /// 执行后剩余面积 (引擎读数)
    pub remaining_after: f64,
}

// ==========================================
// FlowEntry / CategoryBreakdown - 分类汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEntry {
    pub label: String,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub entries: Vec<FlowEntry>,
}

impl CategoryBreakdown {
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.area).sum()
    }
}

/// 按类别分组 (保持记录顺序, 六个类别全部出现)
pub fn group_by_category(records: &[AreaFlowRecord]) -> Vec<CategoryBreakdown> {
    Category::ALL
        .iter()
        .map(|category| CategoryBreakdown {
            category: *category,
            entries: records
                .iter()
                .filter(|r| r.category == *category)
                .map(|r| FlowEntry {
                    label: r.label.clone(),
                    area: r.excluded_area,
                })
                .collect(),
        })
        .collect()
}

// ==========================================
// EligibilityReport - 适宜性报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// 区域总面积 (区域掩膜像元数 × 像元面积, 与排除无关)
    #[serde(rename = "Total_Area")]
    pub total_area: u64,

    /// 最终可用面积 (含孤立斑块剔除)
    #[serde(rename = "Eligible_Area")]
    pub eligible_area: f64,

    /// 最终可用面积 / 初始可用面积 × 100
    #[serde(rename = "Eligible_Percentage")]
    pub eligible_percentage: f64,

    #[serde(rename = "Items_Number", default, skip_serializing_if = "Option::is_none")]
    pub items_number: Option<u64>,

    #[serde(rename = "Capacity", default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,

    /// 管线开始时的可用面积
    pub initial_available_area: f64,
    /// 判据全部执行后、剔除斑块前的剩余面积
    pub remaining_area: f64,
    /// 边界判据排除面积 (在核算起点之前, 不计入分类流)
    pub border_excluded_area: f64,
    pub accounting_mode: AccountingMode,
    pub categories: Vec<CategoryBreakdown>,
    pub exclusion_config: ResolvedConfig,
    pub warnings: Vec<ConfigWarning>,

    /// 说明信息 (如 "无可用面积")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl EligibilityReport {
    /// 剩余百分比 (初始面积为 0 时为 0)
    pub fn percentage_of(area: f64, initial: f64) -> f64 {
        if initial > 0.0 {
            area / initial * 100.0
        } else {
            0.0
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryBreakdown> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn categorized_excluded_area(&self) -> f64 {
        self.categories.iter().map(|c| c.total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: Category, label: &str, area: f64) -> AreaFlowRecord {
        AreaFlowRecord {
            category,
            label: label.to_string(),
            key: label.to_lowercase(),
            excluded_area: area,
            remaining_before: 0.0,
            remaining_after: 0.0,
        }
    }

    #[test]
    fn test_group_by_category_keeps_order_and_all_categories() {
        let records = vec![
            record(Category::Physical, "Lakes", 3.0),
            record(Category::Infrastructure, "Motorways", 1.0),
            record(Category::Physical, "Forests", 2.0),
        ];
        let groups = group_by_category(&records);
        assert_eq!(groups.len(), 6);
        let physical = &groups[Category::Physical.index()];
        assert_eq!(physical.entries[0].label, "Lakes");
        assert_eq!(physical.entries[1].label, "Forests");
        assert_eq!(physical.total(), 5.0);
        assert!(groups[Category::Social.index()].entries.is_empty());
    }

    #[test]
    fn test_percentage_of_zero_initial() {
        assert_eq!(EligibilityReport::percentage_of(10.0, 0.0), 0.0);
        assert_eq!(EligibilityReport::percentage_of(25.0, 100.0), 25.0);
    }
}
