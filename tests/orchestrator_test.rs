// ==========================================
// EligibilityOrchestrator 集成测试
// ==========================================
// 测试目标: 技术流程 (预设/既有装机/沿路条带/面积限制) 与结果文件
// ==========================================

mod test_helpers;

use land_eligibility::config::ConfigInput;
use land_eligibility::domain::report::EligibilityReport;
use land_eligibility::domain::types::Category;
use land_eligibility::engine::flow_diagram::FLOW_DIAGRAM_FILE;
use land_eligibility::engine::orchestrator::REPORT_FILE;
use land_eligibility::engine::{
    AreaRestriction, EligibilityOrchestrator, EngineError, ExistingAssets, ExistingPlant,
    ExistingTurbine, PotentialRequest, RoadCorridor, SpatialExclusionEngine, Technology,
};
use serde_json::json;
use test_helpers::{row, test_context, write_preset, GridEngine};

#[test]
fn test_wind_excludes_existing_turbines_before_pipeline() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "wind_basis", &json!({"forests": {}, "existing": {}}));

    let g = GridEngine::new(10, 10, 1000.0);
    let forests = row(&g, 4);
    let mut engine = g.with_vector(ctx.basis_dlm_root.join("veg02_f.shp"), forests);

    let request = PotentialRequest::default().with_existing(ExistingAssets {
        turbines: vec![ExistingTurbine {
            x: 2.0,
            y: 7.0,
            rotor_diameter: 120.0,
            direction: None,
        }],
        openfield_plants: Vec::new(),
    });
    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(&Technology::wind(), &mut engine, request)
        .expect("estimate failed");

    assert_eq!(
        engine.ops,
        vec!["points:Existing Turbines", "vector:veg02_f.shp", "prune:10000"]
    );
    assert_eq!(estimate.existing_points, 1);

    // 椭圆半轴按较大转子直径缩放
    let (point, _, save_as) = &engine.excluded_points[0];
    assert_eq!(point.scale, (960.0, 480.0));
    assert_eq!(save_as.as_deref(), Some("Existing Turbines"));

    // 既有装机不计入分类核算
    let report = &estimate.report;
    assert_eq!(report.initial_available_area, 99_000.0);
    assert_eq!(report.remaining_area, 89_000.0);
    assert_eq!(report.eligible_area, 89_000.0);
    assert_eq!(estimate.records.len(), 1);
    assert!(estimate.flow_diagram.is_some());
    assert!(estimate.calibration.is_none());
    assert!(estimate.written.is_empty());
}

#[test]
fn test_existing_skipped_without_config_entry() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "openfield_PV_basis", &json!({"forests": {}}));
    let mut engine = GridEngine::new(10, 10, 100.0);

    let request = PotentialRequest::default().with_existing(ExistingAssets {
        turbines: Vec::new(),
        openfield_plants: vec![ExistingPlant {
            x: 1.0,
            y: 1.0,
            capacity: 100.0,
        }],
    });
    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(&Technology::OpenfieldPv, &mut engine, request)
        .expect("estimate failed");

    assert_eq!(estimate.existing_points, 0);
    assert!(engine.excluded_points.is_empty());
    assert_eq!(engine.ops.last().map(String::as_str), Some("prune:500"));
}

#[test]
fn test_roads_variant_without_corridors_reports_nothing_available() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "openfield_roads_basis", &json!({"forests": {}}));
    let mut engine = GridEngine::new(10, 10, 100.0);

    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(
            &Technology::OpenfieldPvRoads(RoadCorridor::Both),
            &mut engine,
            PotentialRequest::default(),
        )
        .expect("estimate failed");

    assert_eq!(
        engine.ops,
        vec!["exclude_all", "include:Autobahn_a.shp", "include:Bahn_Strecke_a.shp"]
    );
    assert_eq!(
        estimate.report.info.as_deref(),
        Some("There is no potential areas on sides of roads and railways")
    );
    assert_eq!(estimate.report.eligible_area, 0.0);
    assert!(estimate.records.is_empty());
    assert!(estimate.flow_diagram.is_none());
}

#[test]
fn test_roads_variant_excludes_existing_after_pipeline() {
    let (_dir, ctx) = test_context();
    write_preset(
        &ctx,
        "openfield_roads_basis",
        &json!({"forests": {}, "existing": {}, "available_side_stripes": 100}),
    );

    let g = GridEngine::new(10, 10, 100.0);
    let corridor: Vec<usize> = row(&g, 0).into_iter().chain(row(&g, 1)).collect();
    let forests = row(&g, 1);
    let mut engine = g
        .with_vector(ctx.basis_dlm_root.join("ofpv").join("Autobahn_a.shp"), corridor)
        .with_vector(ctx.basis_dlm_root.join("veg02_f.shp"), forests);

    let request = PotentialRequest::default().with_existing(ExistingAssets {
        turbines: Vec::new(),
        openfield_plants: vec![ExistingPlant {
            x: 5.0,
            y: 0.0,
            capacity: 10.0,
        }],
    });
    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(&Technology::OpenfieldPvRoads(RoadCorridor::Roads), &mut engine, request)
        .expect("estimate failed");

    assert_eq!(
        engine.ops,
        vec![
            "exclude_all",
            "include:Autobahn_a.shp",
            "vector:veg02_f.shp",
            "prune:500",
            "points:existing Openfield",
        ]
    );
    assert_eq!(estimate.existing_points, 1);

    let report = &estimate.report;
    assert_eq!(report.initial_available_area, 2000.0);
    assert_eq!(report.remaining_area, 1000.0);
    // 管线后的既有装机刷新最终面积
    assert_eq!(report.eligible_area, 900.0);
    assert!((report.eligible_percentage - 45.0).abs() < 1e-9);
}

#[test]
fn test_result_files_written_per_technology_and_region() {
    let (dir, ctx) = test_context();
    write_preset(&ctx, "wind_basis", &json!({"forests": {}}));
    let g = GridEngine::new(10, 10, 1000.0);
    let forests = row(&g, 3);
    let mut engine = g.with_vector(ctx.basis_dlm_root.join("veg02_f.shp"), forests);

    let results = dir.path().join("results");
    let orchestrator = EligibilityOrchestrator::new(&ctx).with_result_dir(&results);
    let estimate = orchestrator
        .estimate_potential(&Technology::wind(), &mut engine, PotentialRequest::default())
        .expect("estimate failed");

    let expected_dir = results.join("Wind_test_region");
    assert_eq!(orchestrator.result_path(&Technology::wind()), Some(expected_dir.clone()));
    assert_eq!(
        estimate.written,
        vec![expected_dir.join(REPORT_FILE), expected_dir.join(FLOW_DIAGRAM_FILE)]
    );

    let text = std::fs::read_to_string(expected_dir.join(REPORT_FILE)).expect("report missing");
    let parsed: EligibilityReport = serde_json::from_str(&text).expect("report unreadable");
    assert_eq!(parsed.eligible_area, estimate.report.eligible_area);
    assert_eq!(parsed.total_area, 100_000);

    let raw: serde_json::Value = serde_json::from_str(&text).expect("report unreadable");
    assert!(raw.get("Eligible_Area").is_some());
    assert!(raw.get("Eligible_Percentage").is_some());
    assert!(expected_dir.join(FLOW_DIAGRAM_FILE).is_file());
}

#[test]
fn test_small_entries_aggregated_for_flow_diagram() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "openfield_PV_basis", &json!({"forests": {}, "grassland": {}}));

    // 2500 格, 单格占 0.04%
    let g = GridEngine::new(50, 50, 100.0);
    let forests = vec![g.idx(10, 10)];
    let grassland = vec![g.idx(20, 20)];
    let resolved = test_helpers::resolve(&ctx, json!({"forests": {}, "grassland": {}}));
    let mut engine = g
        .with_criterion(&resolved, "forests", forests)
        .with_criterion(&resolved, "grassland", grassland);

    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(&Technology::OpenfieldPv, &mut engine, PotentialRequest::default())
        .expect("estimate failed");

    let physical = estimate
        .aggregated
        .iter()
        .find(|c| c.category == Category::Physical)
        .expect("physical");
    assert_eq!(physical.entries.len(), 1);
    assert_eq!(physical.entries[0].label, "Physical others");
    assert_eq!(physical.entries[0].area, 200.0);

    // 报告中保留未归并的条目
    let raw = estimate.report.category(Category::Physical).expect("physical");
    assert_eq!(raw.entries.len(), 2);
}

#[test]
fn test_mapping_input_overrides_default_preset() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "wind_basis", &json!({"forests": {}, "motorway": {"buffer": 100}}));
    let orchestrator = EligibilityOrchestrator::new(&ctx);

    let input = ConfigInput::from_value(json!({"motorway": null, "birds": {}})).expect("input");
    let merged = orchestrator
        .resolve_config(&Technology::wind(), input.clone(), true)
        .expect("resolve failed");
    let keys: Vec<_> = merged.criteria.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["forests", "birds"]);

    let replaced = orchestrator
        .resolve_config(&Technology::wind(), input, false)
        .expect("resolve failed");
    let keys: Vec<_> = replaced.criteria.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, vec!["birds"]);
}

#[test]
fn test_missing_default_preset_is_config_error() {
    let (_dir, ctx) = test_context();
    let mut engine = GridEngine::new(4, 4, 100.0);

    let result = EligibilityOrchestrator::new(&ctx).estimate_potential(
        &Technology::wind(),
        &mut engine,
        PotentialRequest::default(),
    );

    assert!(matches!(result, Err(EngineError::Config(_))));
    assert!(engine.ops.is_empty());
}

#[test]
fn test_restrict_area_only_for_wind() {
    let (_dir, ctx) = test_context();
    let mut engine = GridEngine::new(4, 4, 100.0);

    let result = EligibilityOrchestrator::new(&ctx).restrict_area(
        &Technology::OpenfieldPv,
        &mut engine,
        AreaRestriction::default(),
    );

    match result {
        Err(EngineError::UnsupportedOperation { technology, operation }) => {
            assert_eq!(technology, "OpenfieldPV");
            assert_eq!(operation, "restrict_area");
        }
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
}

#[test]
fn test_rooftop_existing_exclusion_is_unsupported() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "rooftop_PV_basis", &json!({"existing": {}}));
    let mut engine = GridEngine::new(4, 4, 100.0);

    let result = EligibilityOrchestrator::new(&ctx).estimate_potential(
        &Technology::RooftopPv,
        &mut engine,
        PotentialRequest::default(),
    );

    assert!(matches!(result, Err(EngineError::UnsupportedOperation { .. })));
}

#[test]
fn test_wind_restriction_calibrates_wind_speed_bound() {
    let (_dir, ctx) = test_context();
    write_preset(&ctx, "wind_basis", &json!({"forests": {}}));
    write_preset(&ctx, "restrict_areas", &json!({"wind_100m": {"value": [null, 4.5]}}));

    // 风速 0.05 .. 9.95, 每格 10000 m² (单格不被斑块剔除)
    let g = GridEngine::new(10, 10, 10_000.0);
    let speeds: Vec<f64> = (0..100).map(|i| i as f64 * 0.1 + 0.05).collect();
    let mut engine = g.with_raster(ctx.datasource_root.join("gwa/DEU_wind-speed_100m.tif"), speeds);

    let restriction = AreaRestriction {
        share: 0.3,
        tolerance: 0.01,
        step: 0.001,
    };
    let estimate = EligibilityOrchestrator::new(&ctx)
        .estimate_potential(
            &Technology::wind(),
            &mut engine,
            PotentialRequest::default().with_restriction(restriction),
        )
        .expect("estimate failed");

    let calibration = estimate.calibration.expect("calibration missing");
    assert!(calibration.within_tolerance);
    assert!((calibration.achieved_share - 0.3).abs() <= 0.01);
    assert!(calibration.parameter_value > 6.5 && calibration.parameter_value < 7.5);

    // 报告按标定后的引擎状态刷新
    assert!((estimate.report.eligible_area - engine.area_available()).abs() < 1e-9);
    assert!((estimate.report.eligible_percentage - 30.0).abs() <= 1.0);
}
