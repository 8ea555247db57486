//! Read-only access to items and blueprints

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{Activity, Blueprint, DependencyEdge, Item, TypeId};

/// Static data lookups consumed by the resolver.
///
/// Implementations must be side-effect free. Raw materials have no
/// blueprint and no dependencies.
pub trait Catalog {
    fn item(&self, id: TypeId) -> Result<Option<Item>>;

    fn blueprint(&self, product_id: TypeId) -> Result<Option<Blueprint>>;

    fn direct_dependencies(&self, product_id: TypeId) -> Result<Vec<DependencyEdge>> {
        Ok(self
            .blueprint(product_id)?
            .map(|bp| bp.materials)
            .unwrap_or_default())
    }
}

/// In-memory catalog, used for tests and small hand-built data sets.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    items: HashMap<TypeId, Item>,
    blueprints: HashMap<TypeId, Blueprint>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, id: TypeId, name: &str, volume_m3: f64) -> &mut Self {
        self.items.insert(
            id,
            Item {
                id,
                name: name.to_string(),
                volume_m3,
                base_price: None,
            },
        );
        self
    }

    /// Register a manufacturing blueprint for `product_id`.
    ///
    /// Materials are `(material, base quantity per run)`; a material is
    /// flagged raw when it has no blueprint of its own at insertion time.
    pub fn add_blueprint(
        &mut self,
        product_id: TypeId,
        output_per_run: u64,
        materials: &[(TypeId, u64)],
    ) -> &mut Self {
        let edges = materials
            .iter()
            .map(|&(material_id, base_quantity)| DependencyEdge {
                product_id,
                material_id,
                base_quantity,
                activity: Activity::Manufacturing,
                is_raw: !self.blueprints.contains_key(&material_id),
            })
            .collect();
        self.blueprints.insert(
            product_id,
            Blueprint {
                product_id,
                blueprint_type_id: product_id + 1_000_000,
                base_time_s: 3600,
                output_per_run,
                activity: Activity::Manufacturing,
                materials: edges,
            },
        );
        self
    }

    pub fn insert_blueprint(&mut self, blueprint: Blueprint) -> &mut Self {
        self.blueprints.insert(blueprint.product_id, blueprint);
        self
    }

    pub fn blueprints(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.values()
    }
}

impl Catalog for MemoryCatalog {
    fn item(&self, id: TypeId) -> Result<Option<Item>> {
        Ok(self.items.get(&id).cloned())
    }

    fn blueprint(&self, product_id: TypeId) -> Result<Option<Blueprint>> {
        Ok(self.blueprints.get(&product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_materials_have_no_dependencies() {
        let mut catalog = MemoryCatalog::new();
        catalog.add_item(34, "Tritanium", 0.01);
        catalog.add_blueprint(100, 1, &[(34, 10)]);

        assert!(catalog.blueprint(34).unwrap().is_none());
        assert!(catalog.direct_dependencies(34).unwrap().is_empty());
        let deps = catalog.direct_dependencies(100).unwrap();
        assert_eq!(deps.len(), 1);
        assert!(deps[0].is_raw);
    }
}
