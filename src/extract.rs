//! Static data import from an SDE CSV dump
//!
//! Reads the item table and the industry activity tables and loads
//! items, blueprints and material lists into the database.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{Activity, Blueprint, DependencyEdge, Item, TypeId};

const TYPES_FILE: &str = "invTypes.csv";
const ACTIVITY_FILE: &str = "industryActivity.csv";
const PRODUCTS_FILE: &str = "industryActivityProducts.csv";
const MATERIALS_FILE: &str = "industryActivityMaterials.csv";

/// Locations of the dump files needed for an import
#[derive(Debug)]
pub struct SdeFiles {
    pub types: PathBuf,
    pub activities: PathBuf,
    pub products: PathBuf,
    pub materials: PathBuf,
}

/// Find the dump files anywhere below `dir` (names compared case-insensitively)
pub fn find_sde_files(dir: &Path) -> Result<SdeFiles> {
    let mut found: HashMap<String, PathBuf> = HashMap::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
            continue;
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        found.entry(filename).or_insert_with(|| path.to_path_buf());
    }

    let mut take = |name: &str| {
        found
            .remove(&name.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("{} not found below {}", name, dir.display()))
    };

    Ok(SdeFiles {
        types: take(TYPES_FILE)?,
        activities: take(ACTIVITY_FILE)?,
        products: take(PRODUCTS_FILE)?,
        materials: take(MATERIALS_FILE)?,
    })
}

/// CSV table with a header row
struct CsvTable {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut records = parse_csv(&content)?;
        if records.is_empty() {
            return Err(anyhow!("{} is empty", path.display()));
        }
        let header = records.remove(0);
        let columns = header
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Ok(Self {
            columns,
            rows: records,
        })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("missing column {name}"))
    }
}

/// Split CSV text into records, honoring quoted fields with embedded
/// commas, doubled quotes and line breaks.
fn parse_csv(content: &str) -> Result<Vec<Vec<String>>> {
    let field_re = Regex::new(r#"(?s)"((?:[^"]|"")*)"|([^,\r\n]*)"#)?;
    let bytes = content.as_bytes();
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut pos = 0;

    while pos < content.len() {
        let caps = field_re
            .captures_at(content, pos)
            .filter(|c| c.get(0).is_some_and(|m| m.start() == pos))
            .ok_or_else(|| anyhow!("malformed CSV near byte {pos}"))?;
        let field = match caps.get(1) {
            Some(quoted) => quoted.as_str().replace("\"\"", "\""),
            None => caps.get(2).map_or("", |m| m.as_str()).to_string(),
        };
        record.push(field);
        pos = caps.get(0).map_or(pos, |m| m.end());

        match bytes.get(pos) {
            Some(b',') => pos += 1,
            Some(b'\r') => {
                pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
                records.push(std::mem::take(&mut record));
            }
            Some(b'\n') => {
                pos += 1;
                records.push(std::mem::take(&mut record));
            }
            None => records.push(std::mem::take(&mut record)),
            Some(_) => return Err(anyhow!("unexpected character after field at byte {pos}")),
        }
    }
    if content.ends_with(',') {
        record.push(String::new());
    }
    if !record.is_empty() {
        records.push(record);
    }
    records.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(records)
}

fn parse_field<T: std::str::FromStr>(row: &[String], index: usize) -> Option<T> {
    row.get(index)?.trim().parse().ok()
}

/// Import the dump found below `dir` and populate the database
pub fn import_sde(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let files = find_sde_files(dir)?;
    info!(dir = %dir.display(), "importing static data");

    let mut stats = ImportStats::default();
    let mut seen_products: HashSet<TypeId> = HashSet::new();
    let tx = conn.unchecked_transaction()?;

    let types = CsvTable::load(&files.types)?;
    let (id_col, name_col, volume_col) = (
        types.column("typeID")?,
        types.column("typeName")?,
        types.column("volume")?,
    );
    let price_col = types.column("basePrice").ok();
    for row in &types.rows {
        let (Some(id), Some(name)) = (parse_field::<TypeId>(row, id_col), row.get(name_col)) else {
            stats.errors += 1;
            continue;
        };
        let item = Item {
            id,
            name: name.clone(),
            volume_m3: parse_field(row, volume_col).unwrap_or(0.0),
            base_price: price_col.and_then(|c| parse_field(row, c)),
        };
        db::upsert_item(&tx, &item)?;
        stats.types += 1;
    }

    let times = load_activity_times(&files.activities)?;
    let materials = load_materials(&files.materials, &mut stats)?;

    let products = CsvTable::load(&files.products)?;
    let (bp_col, activity_col, product_col, quantity_col) = (
        products.column("typeID")?,
        products.column("activityID")?,
        products.column("productTypeID")?,
        products.column("quantity")?,
    );
    for row in &products.rows {
        let (Some(blueprint_type_id), Some(code), Some(product_id), Some(output)) = (
            parse_field::<TypeId>(row, bp_col),
            parse_field::<i64>(row, activity_col),
            parse_field::<TypeId>(row, product_col),
            parse_field::<u64>(row, quantity_col),
        ) else {
            stats.errors += 1;
            continue;
        };
        let Some(activity) = Activity::from_code(code) else {
            // invention and copying also list products
            stats.skipped += 1;
            continue;
        };
        if seen_products.contains(&product_id) {
            debug!(product = product_id, "second blueprint for product ignored");
            stats.skipped += 1;
            continue;
        }

        let edges = materials
            .get(&(blueprint_type_id, code))
            .map(|list| {
                list.iter()
                    .map(|&(material_id, base_quantity)| DependencyEdge {
                        product_id,
                        material_id,
                        base_quantity,
                        activity,
                        is_raw: false,
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let blueprint = Blueprint {
            product_id,
            blueprint_type_id,
            base_time_s: times.get(&(blueprint_type_id, code)).copied().unwrap_or(0),
            output_per_run: output,
            activity,
            materials: edges,
        };
        db::upsert_blueprint(&tx, &blueprint)?;
        stats.materials += blueprint.materials.len();
        stats.blueprints += 1;
        seen_products.insert(product_id);
    }

    db::refresh_raw_flags(&tx)?;
    tx.commit()?;

    if stats.errors > 0 {
        warn!(errors = stats.errors, "malformed rows skipped during import");
    }
    Ok(stats)
}

fn load_activity_times(path: &Path) -> Result<HashMap<(TypeId, i64), u64>> {
    let table = CsvTable::load(path)?;
    let (bp_col, activity_col, time_col) = (
        table.column("typeID")?,
        table.column("activityID")?,
        table.column("time")?,
    );
    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            Some((
                (
                    parse_field::<TypeId>(row, bp_col)?,
                    parse_field::<i64>(row, activity_col)?,
                ),
                parse_field::<u64>(row, time_col)?,
            ))
        })
        .collect())
}

fn load_materials(
    path: &Path,
    stats: &mut ImportStats,
) -> Result<HashMap<(TypeId, i64), Vec<(TypeId, u64)>>> {
    let table = CsvTable::load(path)?;
    let (bp_col, activity_col, material_col, quantity_col) = (
        table.column("typeID")?,
        table.column("activityID")?,
        table.column("materialTypeID")?,
        table.column("quantity")?,
    );

    let mut materials: HashMap<(TypeId, i64), Vec<(TypeId, u64)>> = HashMap::new();
    for row in &table.rows {
        match (
            parse_field::<TypeId>(row, bp_col),
            parse_field::<i64>(row, activity_col),
            parse_field::<TypeId>(row, material_col),
            parse_field::<u64>(row, quantity_col),
        ) {
            (Some(bp), Some(activity), Some(material), Some(quantity)) => {
                materials.entry((bp, activity)).or_default().push((material, quantity));
            }
            _ => stats.errors += 1,
        }
    }
    Ok(materials)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub types: usize,
    pub blueprints: usize,
    pub materials: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} types, {} blueprints ({} materials). Skipped: {}, Errors: {}",
            self.types, self.blueprints, self.materials, self.skipped, self.errors
        )
    }
}
