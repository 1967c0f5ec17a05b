//! Catalogue discovery and import
//!
//! A data directory holds `items.json`, any number of `machines*.json`
//! files (searched recursively, loaded in path order) and optionally a
//! `starting.json` array of item ids offered as free starting stock.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};
use regex::Regex;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::catalogue::Catalogue;
use crate::db;
use crate::models::{ItemRecord, MachineRecord};

/// Files making up one catalogue
#[derive(Debug, Default)]
pub struct CatalogueFiles {
    pub items: PathBuf,
    pub machines: Vec<PathBuf>,
    pub starting: Option<PathBuf>,
}

/// Parsed but not yet assembled catalogue records
#[derive(Debug, Default)]
pub struct CatalogueData {
    pub items: Vec<ItemRecord>,
    pub machines: Vec<MachineRecord>,
    pub starting: Vec<String>,
}

/// Find the catalogue files under `data_dir`
pub fn find_catalogue_files(data_dir: &Path) -> Result<CatalogueFiles> {
    let machines_re = Regex::new(r"^machines[\w.-]*\.json$")?;

    let mut items = Vec::new();
    let mut machines = Vec::new();
    let mut starting = Vec::new();

    for entry in WalkDir::new(data_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        if filename == "items.json" {
            items.push(path.to_path_buf());
        } else if filename == "starting.json" {
            starting.push(path.to_path_buf());
        } else if machines_re.is_match(filename) {
            machines.push(path.to_path_buf());
        }
    }

    let items = match items.as_slice() {
        [] => bail!("no items.json found in {}", data_dir.display()),
        [one] => one.clone(),
        [a, b, ..] => bail!("multiple items.json files: {} and {}", a.display(), b.display()),
    };
    if starting.len() > 1 {
        warn!(
            "multiple starting.json files, using {}",
            starting[0].display()
        );
    }

    Ok(CatalogueFiles {
        items,
        machines,
        starting: starting.into_iter().next(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse every file of a catalogue
pub fn read_catalogue(files: &CatalogueFiles) -> Result<CatalogueData> {
    let items: Vec<ItemRecord> = read_json(&files.items)?;

    let mut machines = Vec::new();
    for path in &files.machines {
        let mut batch: Vec<MachineRecord> = read_json(path)?;
        info!("  Parsed: {} ({} machines)", path.display(), batch.len());
        machines.append(&mut batch);
    }

    let starting = match &files.starting {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    Ok(CatalogueData {
        items,
        machines,
        starting,
    })
}

/// Read a catalogue from `data_dir` and replace the stored one with it.
///
/// The catalogue is assembled before anything is written, so a record
/// referencing an unknown item aborts the import.
pub fn extract_to_database(conn: &Connection, data_dir: &Path) -> Result<ExtractStats> {
    info!("Scanning {} for catalogue files...", data_dir.display());
    let files = find_catalogue_files(data_dir)?;
    info!("Found {} machine files", files.machines.len());

    let mut data = read_catalogue(&files)?;
    let catalogue = Catalogue::from_records(&data.items, &data.machines)
        .with_context(|| format!("Invalid catalogue in {}", data_dir.display()))?;

    data.starting.retain(|id| {
        let known = catalogue.item_id(id).is_some();
        if !known {
            warn!("starting item '{}' is not in the catalogue, skipped", id);
        }
        known
    });

    db::clear_catalogue(conn)?;
    for (i, item) in data.items.iter().enumerate() {
        db::upsert_item(conn, i, item)?;
    }
    for (i, machine) in data.machines.iter().enumerate() {
        db::insert_machine(conn, i, machine)?;
    }
    db::set_starting_items(conn, &data.starting)?;

    Ok(ExtractStats {
        items: catalogue.item_count(),
        machines: catalogue.machine_count(),
        recipes: catalogue.recipe_count(),
        starting: data.starting.len(),
    })
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub items: usize,
    pub machines: usize,
    pub recipes: usize,
    pub starting: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} machines ({} recipes). Starting items: {}",
            self.items, self.machines, self.recipes, self.starting
        )
    }
}
