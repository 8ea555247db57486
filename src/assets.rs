//! Have-vs-need comparison against a character's assets

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::{AssetLine, MaterialLine, TypeId};

/// Asset snapshot for one character.
pub trait AssetSource {
    fn character_assets(&self, character_id: i64) -> Result<Vec<AssetLine>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetShortfall {
    pub item_id: TypeId,
    pub name: String,
    pub needed: u64,
    pub owned: u64,
    pub missing: u64,
}

/// Compare required materials with owned stock.
///
/// Asset lines for the same item are summed (stacks in several hangars).
pub fn compare_assets(materials: &[MaterialLine], assets: &[AssetLine]) -> Vec<AssetShortfall> {
    let mut owned: HashMap<TypeId, u64> = HashMap::new();
    for line in assets {
        let total = owned.entry(line.item_id).or_insert(0);
        *total = total.saturating_add(line.quantity);
    }

    materials
        .iter()
        .filter(|m| m.quantity > 0)
        .map(|m| {
            let have = owned.get(&m.item_id).copied().unwrap_or(0);
            AssetShortfall {
                item_id: m.item_id,
                name: m.name.clone(),
                needed: m.quantity,
                owned: have,
                missing: m.quantity.saturating_sub(have),
            }
        })
        .collect()
}

/// Materials still to be bought after using owned stock.
pub fn remaining_materials(materials: &[MaterialLine], shortfalls: &[AssetShortfall]) -> Vec<MaterialLine> {
    materials
        .iter()
        .filter_map(|m| {
            let missing = shortfalls
                .iter()
                .find(|s| s.item_id == m.item_id)
                .map_or(m.quantity, |s| s.missing);
            (missing > 0).then(|| MaterialLine {
                quantity: missing,
                ..m.clone()
            })
        })
        .collect()
}
