//! Precomputed raw-material chains
//!
//! A chain entry summarizes every path from an item down to one raw
//! material at 1 run, ME 0, with every component built.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::calculator::{Resolution, ResolveRequest, resolve_materials};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{ChainEntry, Decision, TypeId};

pub fn build_chains(catalog: &dyn Catalog, item_id: TypeId) -> Result<Vec<ChainEntry>> {
    let request = ResolveRequest::new(item_id, 1).with_default_decision(Decision::Build);
    let resolution = resolve_materials(catalog, &request)?;
    chains_from_resolution(catalog, &resolution)
}

fn chains_from_resolution(catalog: &dyn Catalog, resolution: &Resolution) -> Result<Vec<ChainEntry>> {
    let mut entries: BTreeMap<TypeId, ChainEntry> = BTreeMap::new();

    for (index, node) in resolution.nodes.iter().enumerate() {
        if node.runs.is_some() {
            continue;
        }
        match entries.entry(node.item_id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.max_depth = entry.max_depth.max(node.depth);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ChainEntry {
                    item_id: resolution.product.item_id,
                    material_id: node.item_id,
                    total_quantity: 0,
                    max_depth: node.depth,
                    path: path_to(catalog, resolution, index)?,
                });
            }
        }
    }

    // Totals come from the aggregated lines so the cache always agrees
    // with the resolver's own sums.
    for line in &resolution.materials {
        if let Some(entry) = entries.get_mut(&line.item_id) {
            entry.total_quantity = line.quantity;
        }
    }
    Ok(entries.into_values().collect())
}

fn path_to(catalog: &dyn Catalog, resolution: &Resolution, mut index: usize) -> Result<String> {
    let mut names = Vec::new();
    loop {
        let node = &resolution.nodes[index];
        let name = catalog
            .item(node.item_id)?
            .map(|item| item.name)
            .unwrap_or_else(|| node.item_id.to_string());
        names.push(name);
        match node.parent {
            Some(parent) => index = parent,
            None => break,
        }
    }
    names.reverse();
    Ok(names.join(" > "))
}
