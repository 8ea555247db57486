//! Production chain resolver
//!
//! Expands a blueprint depth-first into a flat arena of resolution nodes,
//! honoring runs, material efficiency and per-component build/buy
//! decisions, and sums every leaf requirement into one line per material.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::efficiency::{
    adjusted_time, batch_quantity, runs_needed, validate_material_efficiency, validate_runs,
    validate_time_efficiency,
};
use crate::error::{GraphFault, PlanError, PlanWarning, Result};
use crate::models::{Blueprint, Decision, DecisionMap, MaterialLine, SubComponent, TypeId};

/// Deepest expansion allowed below the requested product.
pub const DEFAULT_MAX_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub item_id: TypeId,
    pub runs: u64,
    pub material_efficiency: u8,
    pub time_efficiency: u8,
    pub decisions: DecisionMap,
    /// Applied to producible components missing from `decisions`
    pub default_decision: Decision,
}

impl ResolveRequest {
    pub fn new(item_id: TypeId, runs: u64) -> Self {
        Self {
            item_id,
            runs,
            material_efficiency: 0,
            time_efficiency: 0,
            decisions: DecisionMap::new(),
            default_decision: Decision::Buy,
        }
    }

    pub fn with_efficiency(mut self, me: u8, te: u8) -> Self {
        self.material_efficiency = me;
        self.time_efficiency = te;
        self
    }

    pub fn with_decision(mut self, item_id: TypeId, decision: Decision) -> Self {
        self.decisions.insert(item_id, decision);
        self
    }

    pub fn with_default_decision(mut self, decision: Decision) -> Self {
        self.default_decision = decision;
        self
    }

    fn decision_for(&self, item_id: TypeId) -> Decision {
        self.decisions
            .get(&item_id)
            .copied()
            .unwrap_or(self.default_decision)
    }
}

/// One entry of the expansion arena. `parent` indexes into the same arena.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionNode {
    pub item_id: TypeId,
    pub quantity: u64,
    /// Set for the root and for every sub-build
    pub runs: Option<u64>,
    pub material_efficiency: u8,
    pub decision: Decision,
    /// No blueprint exists for the item
    pub raw: bool,
    pub parent: Option<usize>,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedProduct {
    pub item_id: TypeId,
    pub name: String,
    pub runs: u64,
    pub material_efficiency: u8,
    pub time_efficiency: u8,
    pub output_total: u64,
    pub build_time_s: f64,
    /// Root plus every sub-build, run back to back
    pub total_build_time_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub product: ResolvedProduct,
    pub materials: Vec<MaterialLine>,
    pub sub_components: Vec<SubComponent>,
    pub nodes: Vec<ResolutionNode>,
    pub warnings: Vec<PlanWarning>,
}

impl Resolution {
    pub fn material(&self, item_id: TypeId) -> Option<&MaterialLine> {
        self.materials.iter().find(|m| m.item_id == item_id)
    }

    /// Indices of the direct children of `index` in the arena.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.parent == Some(index))
            .map(|(i, _)| i)
    }
}

/// Resolve the full material requirement for a product.
pub fn resolve_materials(catalog: &dyn Catalog, request: &ResolveRequest) -> Result<Resolution> {
    resolve_with_depth_limit(catalog, request, DEFAULT_MAX_DEPTH)
}

pub fn resolve_with_depth_limit(
    catalog: &dyn Catalog,
    request: &ResolveRequest,
    max_depth: usize,
) -> Result<Resolution> {
    validate_runs(request.runs)?;
    validate_material_efficiency(request.material_efficiency)?;
    validate_time_efficiency(request.time_efficiency)?;

    let item = catalog
        .item(request.item_id)?
        .ok_or(PlanError::NotFound(request.item_id))?;
    let blueprint = catalog
        .blueprint(request.item_id)?
        .ok_or(PlanError::NoBlueprint(request.item_id))?;

    let output_total = request
        .runs
        .checked_mul(blueprint.output_per_run)
        .ok_or_else(|| PlanError::overflow("product output"))?;
    let build_time_s = adjusted_time(blueprint.base_time_s, request.time_efficiency, request.runs)?;

    let mut expansion = Expansion {
        catalog,
        request,
        max_depth,
        nodes: vec![ResolutionNode {
            item_id: request.item_id,
            quantity: output_total,
            runs: Some(request.runs),
            material_efficiency: request.material_efficiency,
            decision: Decision::Build,
            raw: false,
            parent: None,
            depth: 0,
        }],
        totals: BTreeMap::new(),
        build_time_s,
    };
    expansion.expand(0, &blueprint)?;

    let sub_components = collect_sub_components(catalog, request, &expansion.nodes)?;
    let (materials, warnings) = material_lines(catalog, &expansion.totals)?;

    debug!(
        item = request.item_id,
        nodes = expansion.nodes.len(),
        materials = materials.len(),
        "resolved production chain"
    );

    Ok(Resolution {
        product: ResolvedProduct {
            item_id: item.id,
            name: item.name,
            runs: request.runs,
            material_efficiency: request.material_efficiency,
            time_efficiency: request.time_efficiency,
            output_total,
            build_time_s,
            total_build_time_s: expansion.build_time_s,
        },
        materials,
        sub_components,
        nodes: expansion.nodes,
        warnings,
    })
}

struct Expansion<'a> {
    catalog: &'a dyn Catalog,
    request: &'a ResolveRequest,
    max_depth: usize,
    nodes: Vec<ResolutionNode>,
    totals: BTreeMap<TypeId, u64>,
    build_time_s: f64,
}

impl Expansion<'_> {
    fn expand(&mut self, index: usize, blueprint: &Blueprint) -> Result<()> {
        let runs = self.nodes[index].runs.unwrap_or(1);
        let depth = self.nodes[index].depth;
        let me = self.request.material_efficiency;

        for edge in &blueprint.materials {
            let required = batch_quantity(edge.base_quantity, me, runs)?;
            let sub_blueprint = self.catalog.blueprint(edge.material_id)?;
            let decision = self.request.decision_for(edge.material_id);

            // A bought edge back to an ancestor is still a malformed graph.
            if self.has_ancestor(index, edge.material_id) {
                return Err(PlanError::MalformedGraph {
                    item: edge.material_id,
                    fault: GraphFault::Cycle,
                });
            }

            match sub_blueprint {
                Some(sub) if decision == Decision::Build => {
                    if depth + 1 > self.max_depth {
                        return Err(PlanError::MalformedGraph {
                            item: edge.material_id,
                            fault: GraphFault::DepthLimit(self.max_depth),
                        });
                    }
                    let sub_runs = runs_needed(required, sub.output_per_run).ok_or(
                        PlanError::MalformedGraph {
                            item: edge.material_id,
                            fault: GraphFault::ZeroOutput,
                        },
                    )?;
                    debug!(
                        item = edge.material_id,
                        required, sub_runs, depth, "expanding sub-build"
                    );
                    self.build_time_s +=
                        adjusted_time(sub.base_time_s, self.request.time_efficiency, sub_runs)?;
                    let child = self.push(ResolutionNode {
                        item_id: edge.material_id,
                        quantity: required,
                        runs: Some(sub_runs),
                        material_efficiency: me,
                        decision: Decision::Build,
                        raw: false,
                        parent: Some(index),
                        depth: depth + 1,
                    });
                    self.expand(child, &sub)?;
                }
                other => {
                    self.push(ResolutionNode {
                        item_id: edge.material_id,
                        quantity: required,
                        runs: None,
                        material_efficiency: me,
                        decision: Decision::Buy,
                        raw: other.is_none(),
                        parent: Some(index),
                        depth: depth + 1,
                    });
                    let total = self.totals.entry(edge.material_id).or_insert(0);
                    *total = total.checked_add(required).ok_or_else(|| {
                        PlanError::overflow(format!("total for material {}", edge.material_id))
                    })?;
                }
            }
        }
        Ok(())
    }

    fn push(&mut self, node: ResolutionNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn has_ancestor(&self, mut index: usize, item_id: TypeId) -> bool {
        loop {
            let node = &self.nodes[index];
            if node.item_id == item_id {
                return true;
            }
            match node.parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }
}

fn collect_sub_components(
    catalog: &dyn Catalog,
    request: &ResolveRequest,
    nodes: &[ResolutionNode],
) -> Result<Vec<SubComponent>> {
    let mut quantities: BTreeMap<TypeId, u64> = BTreeMap::new();
    for node in nodes.iter().filter(|n| n.parent == Some(0) && !n.raw) {
        let total = quantities.entry(node.item_id).or_insert(0);
        *total = total
            .checked_add(node.quantity)
            .ok_or_else(|| PlanError::overflow("sub-component quantity"))?;
    }

    let mut components = Vec::with_capacity(quantities.len());
    for (item_id, quantity) in quantities {
        components.push(SubComponent {
            item_id,
            name: item_name(catalog, item_id)?,
            quantity,
            default_decision: request.decision_for(item_id),
        });
    }
    components.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(components)
}

/// Materials missing from the item table are kept with a placeholder name
/// and zero volume, and reported as warnings.
fn material_lines(
    catalog: &dyn Catalog,
    totals: &BTreeMap<TypeId, u64>,
) -> Result<(Vec<MaterialLine>, Vec<PlanWarning>)> {
    let mut lines = Vec::with_capacity(totals.len());
    let mut warnings = Vec::new();
    for (&item_id, &quantity) in totals {
        let (name, volume_m3) = match catalog.item(item_id)? {
            Some(item) => (item.name, item.volume_m3),
            None => {
                warn!(item = item_id, "material missing from item table");
                warnings.push(PlanWarning::UnknownItem { item_id });
                (format!("Type {item_id}"), 0.0)
            }
        };
        lines.push(MaterialLine {
            item_id,
            name,
            quantity,
            volume_m3,
        });
    }
    lines.sort_by(|a, b| a.name.cmp(&b.name).then(a.item_id.cmp(&b.item_id)));
    Ok((lines, warnings))
}

fn item_name(catalog: &dyn Catalog, item_id: TypeId) -> Result<String> {
    Ok(catalog
        .item(item_id)?
        .map(|item| item.name)
        .unwrap_or_else(|| format!("Type {item_id}")))
}

/// Format the expansion arena as an indented tree
pub fn format_resolution(catalog: &dyn Catalog, resolution: &Resolution) -> Result<String> {
    let mut output = String::new();
    format_node(catalog, resolution, 0, &mut output)?;
    Ok(output)
}

fn format_node(
    catalog: &dyn Catalog,
    resolution: &Resolution,
    index: usize,
    output: &mut String,
) -> Result<()> {
    let node = &resolution.nodes[index];
    let prefix = "  ".repeat(node.depth);
    let name = item_name(catalog, node.item_id)?;

    let detail = match (node.runs, node.raw) {
        (Some(runs), _) => format!("{runs} runs, build"),
        (None, true) => "raw".to_string(),
        (None, false) => "buy".to_string(),
    };
    output.push_str(&format!("{prefix}{} x {name} ({detail})\n", node.quantity));

    for child in resolution.children(index).collect::<Vec<_>>() {
        format_node(catalog, resolution, child, output)?;
    }
    Ok(())
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = &self.product;
        writeln!(f, "=== Material Summary ===")?;
        writeln!(
            f,
            "Target: {} x {} ({} runs, ME {}, TE {})",
            p.output_total, p.name, p.runs, p.material_efficiency, p.time_efficiency
        )?;
        writeln!(
            f,
            "Build time: {:.0}s (with sub-builds {:.0}s)",
            p.build_time_s, p.total_build_time_s
        )?;
        writeln!(f)?;

        writeln!(f, "Materials required:")?;
        for line in &self.materials {
            writeln!(f, "  {:>16}  {}", line.quantity, line.name)?;
        }

        if !self.sub_components.is_empty() {
            writeln!(f)?;
            writeln!(f, "Components:")?;
            for component in &self.sub_components {
                let decision = match component.default_decision {
                    Decision::Build => "build",
                    Decision::Buy => "buy",
                };
                writeln!(
                    f,
                    "  {:>16}  {} [{}]",
                    component.quantity, component.name, decision
                )?;
            }
        }
        Ok(())
    }
}
