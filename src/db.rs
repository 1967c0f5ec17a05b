//! Database schema and operations

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::catalogue::Catalogue;
use crate::models::{ItemRecord, MachineRecord, RecipeRecord, SlotRecord};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Items, in catalogue load order
        CREATE TABLE IF NOT EXISTS items (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            image TEXT NOT NULL,
            generator INTEGER NOT NULL,
            container INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS machines (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            image TEXT NOT NULL,
            input_slots INTEGER NOT NULL,
            output_slots INTEGER NOT NULL,
            pulls_items INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine TEXT NOT NULL,
            key TEXT NOT NULL,
            position INTEGER NOT NULL
        );

        -- Slots are stored as written; repeated items merge when the catalogue is assembled
        CREATE TABLE IF NOT EXISTS recipe_inputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL,
            item TEXT NOT NULL,
            amount REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL,
            item TEXT NOT NULL,
            amount REAL NOT NULL
        );

        -- Items offered as free starting stock by default
        CREATE TABLE IF NOT EXISTS starting_items (
            position INTEGER PRIMARY KEY,
            item TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_machine ON recipes(machine);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_recipe ON recipe_inputs(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_recipe ON recipe_outputs(recipe_id);
        "#,
    )?;
    Ok(())
}

/// Clear the stored catalogue (for re-import)
pub fn clear_catalogue(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM starting_items;
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM machines;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, position: usize, item: &ItemRecord) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (position, id, name, price, image, generator, container)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            position as i64,
            &item.id,
            &item.name,
            item.price,
            &item.image,
            item.generator,
            item.container,
        ),
    )?;
    Ok(())
}

/// Insert a machine together with its recipes and their slots
pub fn insert_machine(conn: &Connection, position: usize, machine: &MachineRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO machines (position, name, image, input_slots, output_slots, pulls_items)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            position as i64,
            &machine.name,
            &machine.image,
            machine.input_slots,
            machine.output_slots,
            machine.pulls_items,
        ),
    )?;

    for (i, recipe) in machine.recipes.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipes (machine, key, position) VALUES (?1, ?2, ?3)",
            (&machine.name, &recipe.id, i as i64),
        )?;
        let recipe_id = conn.last_insert_rowid();

        for slot in &recipe.inputs {
            conn.execute(
                "INSERT INTO recipe_inputs (recipe_id, item, amount) VALUES (?1, ?2, ?3)",
                (recipe_id, &slot.item, slot.amount),
            )?;
        }
        for slot in &recipe.outputs {
            conn.execute(
                "INSERT INTO recipe_outputs (recipe_id, item, amount) VALUES (?1, ?2, ?3)",
                (recipe_id, &slot.item, slot.amount),
            )?;
        }
    }
    Ok(())
}

/// Replace the default starting items
pub fn set_starting_items(conn: &Connection, items: &[String]) -> Result<()> {
    conn.execute("DELETE FROM starting_items", [])?;
    for (i, item) in items.iter().enumerate() {
        conn.execute(
            "INSERT INTO starting_items (position, item) VALUES (?1, ?2)",
            (i as i64, item),
        )?;
    }
    Ok(())
}

/// Load all item records in load order
pub fn load_items(conn: &Connection) -> Result<Vec<ItemRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, price, image, generator, container FROM items ORDER BY position",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ItemRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            image: row.get(3)?,
            generator: row.get(4)?,
            container: row.get(5)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load all machine records, with recipes, in load order
pub fn load_machines(conn: &Connection) -> Result<Vec<MachineRecord>> {
    let mut stmt = conn.prepare(
        "SELECT name, image, input_slots, output_slots, pulls_items FROM machines ORDER BY position",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(MachineRecord {
            name: row.get(0)?,
            image: row.get(1)?,
            input_slots: row.get(2)?,
            output_slots: row.get(3)?,
            pulls_items: row.get(4)?,
            recipes: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut machine = row?;
        machine.recipes = load_recipes(conn, &machine.name)?;
        results.push(machine);
    }
    Ok(results)
}

fn load_recipes(conn: &Connection, machine: &str) -> Result<Vec<RecipeRecord>> {
    let mut stmt =
        conn.prepare("SELECT id, key FROM recipes WHERE machine = ?1 ORDER BY position")?;

    let rows = stmt.query_map([machine], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (row_id, key) = row?;
        results.push(RecipeRecord {
            id: key,
            inputs: load_slots(conn, "recipe_inputs", row_id)?,
            outputs: load_slots(conn, "recipe_outputs", row_id)?,
        });
    }
    Ok(results)
}

fn load_slots(conn: &Connection, table: &str, recipe_id: i64) -> Result<Vec<SlotRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item, amount FROM {} WHERE recipe_id = ?1 ORDER BY id",
        table
    ))?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok(SlotRecord {
            item: row.get(0)?,
            amount: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Load the default starting item ids
pub fn load_starting_items(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT item FROM starting_items ORDER BY position")?;

    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Assemble the stored catalogue
pub fn load_catalogue(conn: &Connection) -> Result<Catalogue> {
    let items = load_items(conn)?;
    let machines = load_machines(conn)?;
    Catalogue::from_records(&items, &machines).context("stored catalogue is inconsistent")
}
