//! Database schema and operations

use rusqlite::{Connection, OptionalExtension, params};

use crate::assets::AssetSource;
use crate::cargo::{RiskScore, RouteDanger};
use crate::catalog::Catalog;
use crate::error::{PlanError, Result};
use crate::market::PriceSource;
use crate::models::{
    Activity, AssetLine, Blueprint, ChainEntry, DependencyEdge, Item, PriceQuote, RegionId,
    SystemId, TypeId,
};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Static item data
        CREATE TABLE IF NOT EXISTS types (
            type_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            volume REAL NOT NULL DEFAULT 0,
            base_price REAL
        );

        -- One blueprint per produced item
        CREATE TABLE IF NOT EXISTS blueprints (
            product_type_id INTEGER PRIMARY KEY,
            blueprint_type_id INTEGER NOT NULL,
            base_time_s INTEGER NOT NULL,
            output_quantity INTEGER NOT NULL,
            activity INTEGER NOT NULL
        );

        -- Direct material requirements per run at ME 0
        CREATE TABLE IF NOT EXISTS blueprint_materials (
            product_type_id INTEGER NOT NULL,
            material_type_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            activity INTEGER NOT NULL,
            is_raw INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (product_type_id, material_type_id, activity)
        );

        -- Optional acceleration cache: item -> raw material totals
        CREATE TABLE IF NOT EXISTS material_chains (
            item_type_id INTEGER NOT NULL,
            material_type_id INTEGER NOT NULL,
            total_quantity INTEGER NOT NULL,
            max_depth INTEGER NOT NULL,
            path TEXT NOT NULL,
            PRIMARY KEY (item_type_id, material_type_id)
        );

        -- Market snapshot, refreshed externally
        CREATE TABLE IF NOT EXISTS market_prices (
            type_id INTEGER NOT NULL,
            region_id INTEGER NOT NULL,
            lowest_sell REAL,
            highest_buy REAL,
            sell_volume INTEGER NOT NULL DEFAULT 0,
            buy_volume INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (type_id, region_id)
        );

        -- Danger rating per travel leg
        CREATE TABLE IF NOT EXISTS route_danger (
            from_system INTEGER NOT NULL,
            to_system INTEGER NOT NULL,
            risk REAL NOT NULL,
            PRIMARY KEY (from_system, to_system)
        );

        CREATE TABLE IF NOT EXISTS character_assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            character_id INTEGER NOT NULL,
            type_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_types_name ON types(name);
        CREATE INDEX IF NOT EXISTS idx_materials_material ON blueprint_materials(material_type_id);
        CREATE INDEX IF NOT EXISTS idx_assets_character ON character_assets(character_id);
        "#,
    )?;
    Ok(())
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| PlanError::overflow(format!("{what} {value} exceeds storage")))
}

fn to_u64(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| PlanError::overflow(format!("stored {what} {value} is negative")))
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO types (type_id, name, volume, base_price) VALUES (?1, ?2, ?3, ?4)",
        params![item.id, item.name, item.volume_m3, item.base_price],
    )?;
    Ok(())
}

/// Insert or replace a blueprint together with its material list
pub fn upsert_blueprint(conn: &Connection, blueprint: &Blueprint) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO blueprints
             (product_type_id, blueprint_type_id, base_time_s, output_quantity, activity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            blueprint.product_id,
            blueprint.blueprint_type_id,
            to_i64(blueprint.base_time_s, "base time")?,
            to_i64(blueprint.output_per_run, "output quantity")?,
            blueprint.activity.code(),
        ],
    )?;
    conn.execute(
        "DELETE FROM blueprint_materials WHERE product_type_id = ?1",
        [blueprint.product_id],
    )?;
    for edge in &blueprint.materials {
        insert_material(conn, edge)?;
    }
    Ok(())
}

/// Insert a single material requirement
pub fn insert_material(conn: &Connection, edge: &DependencyEdge) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO blueprint_materials
             (product_type_id, material_type_id, quantity, activity, is_raw)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            edge.product_id,
            edge.material_id,
            to_i64(edge.base_quantity, "material quantity")?,
            edge.activity.code(),
            edge.is_raw,
        ],
    )?;
    Ok(())
}

/// Recompute raw flags: a material is raw when nothing produces it
pub fn refresh_raw_flags(conn: &Connection) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE blueprint_materials
         SET is_raw = (material_type_id NOT IN (SELECT product_type_id FROM blueprints))",
        [],
    )?;
    Ok(changed)
}

pub fn upsert_quote(conn: &Connection, quote: &PriceQuote) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO market_prices
             (type_id, region_id, lowest_sell, highest_buy, sell_volume, buy_volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            quote.item_id,
            quote.region_id,
            quote.lowest_sell,
            quote.highest_buy,
            to_i64(quote.sell_volume, "sell volume")?,
            to_i64(quote.buy_volume, "buy volume")?,
        ],
    )?;
    Ok(())
}

pub fn upsert_route_danger(conn: &Connection, from: SystemId, to: SystemId, risk: RiskScore) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO route_danger (from_system, to_system, risk) VALUES (?1, ?2, ?3)",
        params![from, to, risk],
    )?;
    Ok(())
}

pub fn insert_asset(conn: &Connection, character_id: i64, line: &AssetLine) -> Result<()> {
    conn.execute(
        "INSERT INTO character_assets (character_id, type_id, quantity) VALUES (?1, ?2, ?3)",
        params![character_id, line.item_id, to_i64(line.quantity, "asset quantity")?],
    )?;
    Ok(())
}

/// Replace the cached chain entries of one item
pub fn replace_chains(conn: &Connection, item_id: TypeId, entries: &[ChainEntry]) -> Result<()> {
    conn.execute(
        "DELETE FROM material_chains WHERE item_type_id = ?1",
        [item_id],
    )?;
    for entry in entries {
        conn.execute(
            "INSERT INTO material_chains
                 (item_type_id, material_type_id, total_quantity, max_depth, path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.item_id,
                entry.material_id,
                to_i64(entry.total_quantity, "chain quantity")?,
                to_i64(entry.max_depth as u64, "chain depth")?,
                entry.path,
            ],
        )?;
    }
    Ok(())
}

pub fn get_chains(conn: &Connection, item_id: TypeId) -> Result<Vec<ChainEntry>> {
    let mut stmt = conn.prepare(
        "SELECT item_type_id, material_type_id, total_quantity, max_depth, path
         FROM material_chains
         WHERE item_type_id = ?1
         ORDER BY material_type_id",
    )?;

    let rows = stmt.query_map([item_id], |row| {
        Ok((
            row.get::<_, TypeId>(0)?,
            row.get::<_, TypeId>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (item_id, material_id, total, depth, path) = row?;
        results.push(ChainEntry {
            item_id,
            material_id,
            total_quantity: to_u64(total, "chain quantity")?,
            max_depth: to_u64(depth, "chain depth")? as usize,
            path,
        });
    }
    Ok(results)
}

/// Clear static data (for re-import)
pub fn clear_static_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM material_chains;
        DELETE FROM blueprint_materials;
        DELETE FROM blueprints;
        DELETE FROM types;
        "#,
    )?;
    Ok(())
}

/// Clear market, route and asset snapshots
pub fn clear_snapshots(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM market_prices;
        DELETE FROM route_danger;
        DELETE FROM character_assets;
        "#,
    )?;
    Ok(())
}

/// Find an item by numeric id or exact (case-insensitive) name
pub fn find_item(conn: &Connection, key: &str) -> Result<Option<Item>> {
    let query = "SELECT type_id, name, volume, base_price FROM types";
    let row_to_item = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
            volume_m3: row.get(2)?,
            base_price: row.get(3)?,
        })
    };

    let item = match key.trim().parse::<TypeId>() {
        Ok(id) => conn
            .query_row(&format!("{query} WHERE type_id = ?1"), [id], row_to_item)
            .optional()?,
        Err(_) => conn
            .query_row(
                &format!("{query} WHERE name = ?1 COLLATE NOCASE"),
                [key.trim()],
                row_to_item,
            )
            .optional()?,
    };
    Ok(item)
}

/// List every producible item with its blueprint output
pub fn list_blueprints(conn: &Connection) -> Result<Vec<(Item, u64)>> {
    let mut stmt = conn.prepare(
        "SELECT t.type_id, t.name, t.volume, t.base_price, b.output_quantity
         FROM blueprints b
         JOIN types t ON t.type_id = b.product_type_id
         ORDER BY t.name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            Item {
                id: row.get(0)?,
                name: row.get(1)?,
                volume_m3: row.get(2)?,
                base_price: row.get(3)?,
            },
            row.get::<_, i64>(4)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (item, output) = row?;
        results.push((item, to_u64(output, "output quantity")?));
    }
    Ok(results)
}

/// Items that use the given material directly
pub fn get_consumers(conn: &Connection, material_id: TypeId) -> Result<Vec<(TypeId, u64)>> {
    let mut stmt = conn.prepare(
        "SELECT product_type_id, quantity FROM blueprint_materials
         WHERE material_type_id = ?1
         ORDER BY product_type_id",
    )?;
    let rows = stmt.query_map([material_id], |row| {
        Ok((row.get::<_, TypeId>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (product, quantity) = row?;
        results.push((product, to_u64(quantity, "material quantity")?));
    }
    Ok(results)
}

/// Catalog, market, route and asset lookups backed by one SQLite snapshot
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn materials(&self, product_id: TypeId) -> Result<Vec<DependencyEdge>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT material_type_id, quantity, activity, is_raw
             FROM blueprint_materials
             WHERE product_type_id = ?1
             ORDER BY material_type_id",
        )?;
        let rows = stmt.query_map([product_id], |row| {
            Ok((
                row.get::<_, TypeId>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (material_id, quantity, activity, is_raw) = row?;
            results.push(DependencyEdge {
                product_id,
                material_id,
                base_quantity: to_u64(quantity, "material quantity")?,
                activity: Activity::from_code(activity).unwrap_or(Activity::Manufacturing),
                is_raw,
            });
        }
        Ok(results)
    }
}

impl Catalog for SqliteStore<'_> {
    fn item(&self, id: TypeId) -> Result<Option<Item>> {
        let item = self
            .conn
            .query_row(
                "SELECT type_id, name, volume, base_price FROM types WHERE type_id = ?1",
                [id],
                |row| {
                    Ok(Item {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        volume_m3: row.get(2)?,
                        base_price: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn blueprint(&self, product_id: TypeId) -> Result<Option<Blueprint>> {
        let header = self
            .conn
            .query_row(
                "SELECT blueprint_type_id, base_time_s, output_quantity, activity
                 FROM blueprints WHERE product_type_id = ?1",
                [product_id],
                |row| {
                    Ok((
                        row.get::<_, TypeId>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((blueprint_type_id, base_time, output, activity)) = header else {
            return Ok(None);
        };
        Ok(Some(Blueprint {
            product_id,
            blueprint_type_id,
            base_time_s: to_u64(base_time, "base time")?,
            output_per_run: to_u64(output, "output quantity")?,
            activity: Activity::from_code(activity).unwrap_or(Activity::Manufacturing),
            materials: self.materials(product_id)?,
        }))
    }

    fn direct_dependencies(&self, product_id: TypeId) -> Result<Vec<DependencyEdge>> {
        self.materials(product_id)
    }
}

impl PriceSource for SqliteStore<'_> {
    fn regional_price(&self, item_id: TypeId, region_id: RegionId) -> Result<Option<PriceQuote>> {
        let row = self
            .conn
            .query_row(
                "SELECT lowest_sell, highest_buy, sell_volume, buy_volume
                 FROM market_prices WHERE type_id = ?1 AND region_id = ?2",
                [item_id, region_id],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((lowest_sell, highest_buy, sell_volume, buy_volume)) = row else {
            return Ok(None);
        };
        Ok(Some(PriceQuote {
            item_id,
            region_id,
            lowest_sell,
            highest_buy,
            sell_volume: to_u64(sell_volume, "sell volume")?,
            buy_volume: to_u64(buy_volume, "buy volume")?,
        }))
    }
}

impl RouteDanger for SqliteStore<'_> {
    fn route_danger(&self, from: SystemId, to: SystemId) -> Result<Option<RiskScore>> {
        let risk = self
            .conn
            .query_row(
                "SELECT risk FROM route_danger
                 WHERE (from_system = ?1 AND to_system = ?2)
                    OR (from_system = ?2 AND to_system = ?1)
                 LIMIT 1",
                [from, to],
                |row| row.get::<_, f64>(0),
            )
            .optional()?;
        Ok(risk)
    }
}

impl AssetSource for SqliteStore<'_> {
    fn character_assets(&self, character_id: i64) -> Result<Vec<AssetLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT type_id, SUM(quantity) FROM character_assets
             WHERE character_id = ?1
             GROUP BY type_id
             ORDER BY type_id",
        )?;
        let rows = stmt.query_map([character_id], |row| {
            Ok((row.get::<_, TypeId>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (item_id, quantity) = row?;
            results.push(AssetLine {
                item_id,
                quantity: to_u64(quantity, "asset quantity")?,
            });
        }
        Ok(results)
    }
}
