// ==========================================
// 用地适宜性评估 - 面积流向图
// ==========================================
// 职责: 由归并后的分类记录生成 Sankey 节点/连线文档
// 输出: sankey_config.json (只生成结构化文档, 不负责绘制)
// ==========================================
// 节点布局 (n = 判据条目数, L = n + 11):
//   0           初始可用面积
//   1..=6       六个类别
//   7..7+n      各判据条目
//   L-4, L-3    剩余面积 (中转)
//   L-2         排除面积合计
//   L-1         剩余面积
// ==========================================

use crate::domain::report::CategoryBreakdown;
use crate::domain::types::{AccountingMode, Category};
use crate::engine::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const FLOW_DIAGRAM_FILE: &str = "sankey_config.json";

const ROOT_COLOR: (u8, u8, u8) = (0, 0, 0);
const REMAINING_COLOR: (u8, u8, u8) = (0, 240, 160);
const EXCLUSION_COLOR: (u8, u8, u8) = (128, 128, 128);

const NODE_ALPHA: f64 = 0.8;
const LINK_ALPHA: f64 = 0.4;

fn category_rgb(category: Category) -> (u8, u8, u8) {
    match category {
        Category::Social => (200, 0, 0),
        Category::Infrastructure => (200, 200, 0),
        Category::Physical => (0, 0, 200),
        Category::EcoTech => (0, 160, 240),
        Category::Protected => (0, 240, 0),
        Category::Other => (80, 80, 80),
    }
}

fn rgba((r, g, b): (u8, u8, u8), alpha: f64) -> String {
    format!("rgba({}, {}, {}, {})", r, g, b, alpha)
}

// ==========================================
// 文档结构
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLine {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNodes {
    pub pad: u32,
    pub thickness: u32,
    pub line: NodeLine,
    pub label: Vec<String>,
    pub color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowLinks {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
    pub value: Vec<i64>,
    pub color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDiagram {
    pub node: FlowNodes,
    pub link: FlowLinks,
}

impl FlowDiagram {
    /// 由归并后的分类记录构建
    ///
    /// # 参数
    /// - categories: 已归并的六个类别 (按 Category::ALL 顺序)
    /// - initial_available_area: 初始可用面积
    /// - remaining_area: 最终剩余面积 (引擎读数)
    /// - mode: 毛流量模式下类别节点不加百分比
    pub fn build(
        categories: &[CategoryBreakdown],
        initial_available_area: f64,
        remaining_area: f64,
        mode: AccountingMode,
    ) -> Self {
        let ordered: Vec<&CategoryBreakdown> = Category::ALL
            .iter()
            .filter_map(|c| categories.iter().find(|b| b.category == *c))
            .collect();

        let criteria: Vec<(Category, &str, f64)> = ordered
            .iter()
            .flat_map(|b| {
                b.entries
                    .iter()
                    .map(move |e| (b.category, e.label.as_str(), e.area))
            })
            .collect();
        let n = criteria.len();

        // 第一段数值: 类别合计 + 判据 + 剩余×2
        let mut values: Vec<f64> = Category::ALL
            .iter()
            .map(|c| {
                ordered
                    .iter()
                    .find(|b| b.category == *c)
                    .map_or(0.0, |b| b.total())
            })
            .collect();
        values.extend(criteria.iter().map(|(_, _, area)| *area));
        values.extend([remaining_area, remaining_area]);

        let mut labels: Vec<String> = vec!["Initial available area".to_string()];
        labels.extend(Category::ALL.iter().map(|c| c.flow_node_name().to_string()));
        labels.extend(criteria.iter().map(|(_, label, _)| label.to_string()));
        labels.extend(["Remaining Area".to_string(), "Remaining Area".to_string()]);

        for i in 1..labels.len() {
            if mode == AccountingMode::Gross && i <= 6 {
                continue;
            }
            let suffix = percent_suffix(values[i - 1], initial_available_area);
            labels[i] = format!("{} {}", labels[i], suffix);
        }

        // 第二段数值: 判据 => 排除合计, 剩余 => 剩余
        values.extend(criteria.iter().map(|(_, _, area)| *area));
        values.push(remaining_area);

        let remaining_pct = round1(ratio_percent(remaining_area, initial_available_area));
        labels.push(format!("Excluded Area {:.1}%", 100.0 - remaining_pct));
        labels.push(format!("Remaining Area {:.1}%", remaining_pct));

        let total = labels.len();
        debug_assert_eq!(total, n + 11);

        // 节点颜色
        let mut node_colors = vec![rgba(ROOT_COLOR, NODE_ALPHA)];
        node_colors.extend(Category::ALL.iter().map(|c| rgba(category_rgb(*c), NODE_ALPHA)));
        node_colors.extend(criteria.iter().map(|(c, _, _)| rgba(category_rgb(*c), NODE_ALPHA)));
        node_colors.extend([
            rgba(REMAINING_COLOR, NODE_ALPHA),
            rgba(REMAINING_COLOR, NODE_ALPHA),
            rgba(EXCLUSION_COLOR, NODE_ALPHA),
            rgba(REMAINING_COLOR, NODE_ALPHA),
        ]);

        // 连线
        let mut source = vec![0usize; 6];
        source.extend(criteria.iter().map(|(c, _, _)| c.index() + 1));
        source.extend([0, total - 4]);
        source.extend(7..7 + n);
        source.push(total - 3);

        let mut target: Vec<usize> = (1..total - 3).collect();
        target.push(total - 3);
        target.extend(std::iter::repeat(total - 2).take(n));
        target.push(total - 1);

        let mut link_colors: Vec<String> = Category::ALL
            .iter()
            .map(|c| rgba(category_rgb(*c), LINK_ALPHA))
            .collect();
        link_colors.extend(criteria.iter().map(|(c, _, _)| rgba(category_rgb(*c), LINK_ALPHA)));
        link_colors.extend([rgba(REMAINING_COLOR, LINK_ALPHA), rgba(REMAINING_COLOR, LINK_ALPHA)]);
        link_colors.extend(std::iter::repeat(rgba(EXCLUSION_COLOR, LINK_ALPHA)).take(n));
        link_colors.push(rgba(REMAINING_COLOR, LINK_ALPHA));

        FlowDiagram {
            node: FlowNodes {
                pad: 15,
                thickness: 10,
                line: NodeLine {
                    color: "black".to_string(),
                    width: 0.5,
                },
                label: labels,
                color: node_colors,
            },
            link: FlowLinks {
                source,
                target,
                value: values.into_iter().map(|v| v.round() as i64).collect(),
                color: link_colors,
            },
        }
    }

    /// 写出到结果目录
    pub fn write_to(&self, result_dir: &Path) -> EngineResult<PathBuf> {
        std::fs::create_dir_all(result_dir)?;
        let path = result_dir.join(FLOW_DIAGRAM_FILE);
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, text)?;
        info!(path = %path.display(), nodes = self.node.label.len(), "流向图文档已写出");
        Ok(path)
    }
}

fn ratio_percent(area: f64, initial: f64) -> f64 {
    if initial > 0.0 {
        area / initial * 100.0
    } else {
        0.0
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn percent_suffix(area: f64, initial: f64) -> String {
    let pct = ratio_percent(area, initial);
    if pct < 0.1 {
        "<0.1%".to_string()
    } else {
        format!("{:.1}%", round1(pct))
    }
}
