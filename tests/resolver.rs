use industry_planner::calculator::{ResolveRequest, resolve_materials};
use industry_planner::catalog::{Catalog, MemoryCatalog};
use industry_planner::chains::build_chains;
use industry_planner::efficiency::batch_quantity;
use industry_planner::error::{GraphFault, PlanError};
use industry_planner::models::{Decision, TypeId};

const ROOT: TypeId = 1;
const PART_A: TypeId = 2;
const PART_B: TypeId = 3;
const MINERAL: TypeId = 34;
const GAS: TypeId = 35;
const DUST: TypeId = 36;

/// Root needs two parts that both consume the same mineral.
fn shared_grandchild() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    catalog
        .add_item(ROOT, "Cruiser", 10_000.0)
        .add_item(PART_A, "Armor Plate", 5.0)
        .add_item(PART_B, "Thruster", 2.0)
        .add_item(MINERAL, "Tritanium", 0.01)
        .add_item(GAS, "Pyerite", 0.01)
        .add_item(DUST, "Mexallon", 0.01);
    catalog.add_blueprint(PART_A, 1, &[(MINERAL, 10)]);
    catalog.add_blueprint(PART_B, 1, &[(MINERAL, 7), (GAS, 1)]);
    catalog.add_blueprint(ROOT, 1, &[(PART_A, 2), (PART_B, 3), (DUST, 40)]);
    catalog
}

fn build_both(runs: u64) -> ResolveRequest {
    ResolveRequest::new(ROOT, runs)
        .with_decision(PART_A, Decision::Build)
        .with_decision(PART_B, Decision::Build)
}

#[test]
fn shared_material_is_summed_not_duplicated() {
    let catalog = shared_grandchild();
    let resolution = resolve_materials(&catalog, &build_both(1)).unwrap();

    let minerals: Vec<_> = resolution
        .materials
        .iter()
        .filter(|m| m.item_id == MINERAL)
        .collect();
    assert_eq!(minerals.len(), 1);
    assert_eq!(minerals[0].quantity, 2 * 10 + 3 * 7);
    assert_eq!(resolution.material(GAS).unwrap().quantity, 3);
    assert_eq!(resolution.material(DUST).unwrap().quantity, 40);
    assert!(resolution.material(PART_A).is_none());
}

#[test]
fn quantities_scale_with_runs() {
    let catalog = shared_grandchild();
    let single = resolve_materials(&catalog, &build_both(1)).unwrap();

    for k in [2u64, 5, 17, 1_000] {
        let scaled = resolve_materials(&catalog, &build_both(k)).unwrap();
        assert_eq!(scaled.materials.len(), single.materials.len());
        for line in &single.materials {
            assert_eq!(
                scaled.material(line.item_id).unwrap().quantity,
                line.quantity * k,
                "material {} at {k} runs",
                line.item_id
            );
        }
        assert_eq!(scaled.product.output_total, k);
    }
}

#[test]
fn material_efficiency_never_increases_requirements() {
    let catalog = shared_grandchild();
    let me0 = resolve_materials(&catalog, &build_both(10)).unwrap();
    let me10 = resolve_materials(&catalog, &build_both(10).with_efficiency(10, 0)).unwrap();

    for line in &me0.materials {
        let reduced = me10.material(line.item_id).unwrap().quantity;
        assert!(reduced <= line.quantity, "material {}", line.item_id);
    }
    // 40 per run is a multiple of ten: exactly 90%
    assert_eq!(me10.material(DUST).unwrap().quantity, 360);
}

#[test]
fn tritanium_worked_example() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(MINERAL, "Tritanium", 0.01).add_item(ROOT, "Capital Hull", 1.0);
    catalog.add_blueprint(ROOT, 1, &[(MINERAL, 5_600_000)]);

    let me0 = resolve_materials(&catalog, &ResolveRequest::new(ROOT, 1)).unwrap();
    let me10 =
        resolve_materials(&catalog, &ResolveRequest::new(ROOT, 1).with_efficiency(10, 0)).unwrap();
    assert_eq!(me0.material(MINERAL).unwrap().quantity, 5_600_000);
    assert_eq!(me10.material(MINERAL).unwrap().quantity, 5_040_000);
}

#[test]
fn capital_scale_quantities_stay_exact() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(MINERAL, "Tritanium", 0.01).add_item(ROOT, "Titan", 1.0);
    catalog.add_blueprint(ROOT, 1, &[(MINERAL, 5_600_000)]);

    let request = ResolveRequest::new(ROOT, 200_000).with_efficiency(10, 0);
    let resolution = resolve_materials(&catalog, &request).unwrap();
    assert_eq!(resolution.material(MINERAL).unwrap().quantity, 1_008_000_000_000);
}

#[test]
fn overflow_fails_loudly() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(MINERAL, "Tritanium", 0.01).add_item(ROOT, "Titan", 1.0);
    catalog.add_blueprint(ROOT, 1, &[(MINERAL, u64::MAX / 4)]);

    let err = resolve_materials(&catalog, &ResolveRequest::new(ROOT, 8)).unwrap_err();
    assert!(matches!(err, PlanError::Overflow { .. }));
}

#[test]
fn buying_everything_collapses_to_direct_dependencies() {
    let catalog = shared_grandchild();
    let request = ResolveRequest::new(ROOT, 7)
        .with_efficiency(4, 0)
        .with_decision(PART_A, Decision::Buy)
        .with_decision(PART_B, Decision::Buy);
    let resolution = resolve_materials(&catalog, &request).unwrap();

    let direct = catalog.direct_dependencies(ROOT).unwrap();
    assert_eq!(resolution.materials.len(), direct.len());
    for edge in direct {
        let expected = batch_quantity(edge.base_quantity, 4, 7).unwrap();
        assert_eq!(resolution.material(edge.material_id).unwrap().quantity, expected);
    }
    assert!(resolution.nodes.iter().all(|n| n.depth <= 1));
}

#[test]
fn toggling_one_component_recomputes_from_scratch() {
    let catalog = shared_grandchild();
    let only_a = ResolveRequest::new(ROOT, 1).with_decision(PART_A, Decision::Build);
    let resolution = resolve_materials(&catalog, &only_a).unwrap();

    assert_eq!(resolution.material(MINERAL).unwrap().quantity, 20);
    assert_eq!(resolution.material(PART_B).unwrap().quantity, 3);
    let part_b = resolution
        .sub_components
        .iter()
        .find(|c| c.item_id == PART_B)
        .unwrap();
    assert_eq!(part_b.default_decision, Decision::Buy);
}

#[test]
fn cycles_are_rejected_as_malformed_graph() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(1, "Alpha", 1.0).add_item(2, "Beta", 1.0);
    catalog.add_blueprint(1, 1, &[(2, 1)]);
    catalog.add_blueprint(2, 1, &[(1, 1)]);

    let request = ResolveRequest::new(1, 1).with_default_decision(Decision::Build);
    let err = resolve_materials(&catalog, &request).unwrap_err();
    assert!(err.is_structural());
    assert!(matches!(
        err,
        PlanError::MalformedGraph {
            item: 1,
            fault: GraphFault::Cycle
        }
    ));
}

#[test]
fn cycle_closed_by_a_bought_edge_is_rejected() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_item(1, "Alpha", 1.0).add_item(2, "Beta", 1.0);
    catalog.add_blueprint(1, 1, &[(2, 1)]);
    catalog.add_blueprint(2, 1, &[(1, 1)]);

    // Beta is built, Alpha keeps the default Buy
    let request = ResolveRequest::new(1, 1).with_decision(2, Decision::Build);
    let err = resolve_materials(&catalog, &request).unwrap_err();
    assert!(matches!(
        err,
        PlanError::MalformedGraph {
            item: 1,
            fault: GraphFault::Cycle
        }
    ));

    let mut catalog = MemoryCatalog::new();
    catalog.add_item(1, "Alpha", 1.0);
    catalog.add_blueprint(1, 1, &[(1, 2)]);
    assert!(matches!(
        resolve_materials(&catalog, &ResolveRequest::new(1, 1)),
        Err(PlanError::MalformedGraph {
            fault: GraphFault::Cycle,
            ..
        })
    ));
}

#[test]
fn zero_output_blueprint_is_malformed() {
    let mut catalog = MemoryCatalog::new();
    catalog
        .add_item(ROOT, "Hull", 1.0)
        .add_item(PART_A, "Plate", 1.0)
        .add_item(MINERAL, "Tritanium", 0.01);
    catalog.add_blueprint(PART_A, 0, &[(MINERAL, 1)]);
    catalog.add_blueprint(ROOT, 1, &[(PART_A, 1)]);

    let request = ResolveRequest::new(ROOT, 1).with_decision(PART_A, Decision::Build);
    assert!(matches!(
        resolve_materials(&catalog, &request),
        Err(PlanError::MalformedGraph {
            fault: GraphFault::ZeroOutput,
            ..
        })
    ));
}

#[test]
fn range_checks_run_before_lookup() {
    let catalog = shared_grandchild();
    let bad_me = ResolveRequest::new(999, 1).with_efficiency(11, 0);
    assert!(matches!(
        resolve_materials(&catalog, &bad_me),
        Err(PlanError::OutOfRange { .. })
    ));
    let bad_te = ResolveRequest::new(ROOT, 1).with_efficiency(0, 25);
    assert!(matches!(
        resolve_materials(&catalog, &bad_te),
        Err(PlanError::OutOfRange { .. })
    ));
    assert!(matches!(
        resolve_materials(&catalog, &ResolveRequest::new(ROOT, 0)),
        Err(PlanError::InvalidRuns)
    ));
}

#[test]
fn chain_cache_agrees_with_resolver() {
    let catalog = shared_grandchild();
    let chains = build_chains(&catalog, ROOT).unwrap();
    let resolution = resolve_materials(
        &catalog,
        &ResolveRequest::new(ROOT, 1).with_default_decision(Decision::Build),
    )
    .unwrap();

    assert_eq!(chains.len(), resolution.materials.len());
    for entry in &chains {
        assert_eq!(
            entry.total_quantity,
            resolution.material(entry.material_id).unwrap().quantity
        );
    }
    let mineral = chains.iter().find(|c| c.material_id == MINERAL).unwrap();
    assert_eq!(mineral.max_depth, 2);
    assert_eq!(mineral.path, "Cruiser > Armor Plate > Tritanium");
}

#[test]
fn concurrent_requests_do_not_interfere() {
    let catalog = shared_grandchild();
    let results: Vec<u64> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=8u64)
            .map(|runs| {
                let catalog = &catalog;
                scope.spawn(move || {
                    resolve_materials(catalog, &build_both(runs))
                        .unwrap()
                        .material(MINERAL)
                        .unwrap()
                        .quantity
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, quantity) in results.into_iter().enumerate() {
        assert_eq!(quantity, 41 * (i as u64 + 1));
    }
}
