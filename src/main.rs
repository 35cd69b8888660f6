// ==========================================
// 用地适宜性评估 - 命令行入口
// ==========================================
// 用途: 物化并解析判据字典, 输出可执行指令 (不含空间运算)
// ==========================================

use anyhow::Context;
use clap::Parser;
use land_eligibility::config::{ConfigInput, DatasourceContext, PresetStore};
use land_eligibility::engine::{CriterionResolver, EstimatesPotential, Technology};
use std::path::PathBuf;

/// 解析排除判据字典并输出 JSON
#[derive(Parser, Debug)]
#[command(name = "land-eligibility", version, long_about = None)]
struct Args {
    /// 技术类型 (wind / openfield_pv / openfield_pv_roads / rooftop_pv)
    #[arg(short, long, default_value = "wind")]
    technology: String,

    /// 命名预设 (不含 .json)
    #[arg(short, long, conflicts_with = "config")]
    preset: Option<String>,

    /// 判据字典 JSON 文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 映射整体替换默认预设 (默认为逐键覆盖)
    #[arg(long, default_value_t = false)]
    replace: bool,

    /// 州缩写
    #[arg(long)]
    state: Option<String>,

    /// 区域标识
    #[arg(long, default_value = "region")]
    region: String,

    /// 数据源根目录 (缺省读取环境变量)
    #[arg(long)]
    datasources: Option<PathBuf>,

    /// 预设目录
    #[arg(long)]
    presets: Option<PathBuf>,

    /// 列出全部预设后退出
    #[arg(long, default_value_t = false)]
    list_presets: bool,

    /// JSON 行日志
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.json_logs {
        land_eligibility::logging::init_json();
    } else {
        land_eligibility::logging::init();
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", land_eligibility::APP_NAME, land_eligibility::VERSION);
    tracing::info!("==================================================");

    let mut ctx = match &args.datasources {
        Some(root) => DatasourceContext::new(root),
        None => DatasourceContext::from_env(),
    }
    .with_region(args.region.clone());
    if let Some(state) = &args.state {
        ctx = ctx.with_state(state.clone());
    }
    if let Some(dir) = &args.presets {
        ctx = ctx.with_presets_dir(dir.clone());
    }

    let store = PresetStore::new(&ctx.presets_dir);
    if args.list_presets {
        for name in store.list()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let technology = Technology::parse(&args.technology)
        .with_context(|| format!("未知技术类型: {}", args.technology))?;

    let input = match (&args.preset, &args.config) {
        (Some(name), _) => ConfigInput::Preset(name.clone()),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取判据字典: {}", path.display()))?;
            ConfigInput::from_value(serde_json::from_str(&text)?)?
        }
        (None, None) => ConfigInput::Default,
    };

    let default_preset = technology.default_preset(ctx.state.as_deref());
    let config = store.materialize(input, &default_preset, !args.replace, ctx.state.as_deref())?;
    let resolved = CriterionResolver::new(&ctx).resolve(&config);

    for warning in resolved.warnings.iter() {
        tracing::warn!("{}", warning);
    }
    for key in resolved.unknown_keys.iter() {
        tracing::warn!(key = key.as_str(), "判据未实现, 执行时将跳过");
    }

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
