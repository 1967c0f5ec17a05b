//! Data models for the crafting catalogue

use serde::{Deserialize, Serialize};

/// Index of an item in the catalogue. Ordered by load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u32);

/// Index of a machine in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineId(pub u32);

/// Index of a recipe in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeId(pub u32);

#[derive(Debug, Clone)]
pub struct Item {
    pub key: String,
    pub name: String,
    pub price: f64,
    pub image: String, // Opaque asset reference, never loaded here
    pub generator: bool,
    pub container: bool,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub name: String,
    pub image: String,
    pub input_slots: u32,
    pub output_slots: u32,
    pub pulls_items: bool,
    pub recipes: Vec<RecipeId>,
}

/// A recipe run at one machine. Inputs and outputs never repeat an item.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub key: String,
    pub machine: MachineId,
    pub inputs: Vec<(ItemId, f64)>,
    pub outputs: Vec<(ItemId, f64)>,
}

impl Recipe {
    /// Quantity of `item` produced by one run, 0 if it is not an output
    pub fn output_quantity(&self, item: ItemId) -> f64 {
        self.outputs
            .iter()
            .find(|(id, _)| *id == item)
            .map_or(0.0, |(_, amount)| *amount)
    }
}

// Ingestion records, as found in items.json / machines*.json

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub generator: bool,
    #[serde(default)]
    pub container: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineRecord {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub input_slots: u32,
    #[serde(default)]
    pub output_slots: u32,
    #[serde(default)]
    pub pulls_items: bool,
    #[serde(default)]
    pub recipes: Vec<RecipeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<SlotRecord>,
    #[serde(default)]
    pub outputs: Vec<SlotRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub item: String,
    pub amount: f64,
}

/// Format a price with a short magnitude suffix (1.5K, 2M, 3e15...)
pub fn format_price(num: f64) -> String {
    const UNITS: [(f64, &str); 6] = [
        (1e18, "e18"),
        (1e15, "e15"),
        (1e12, "T"),
        (1e9, "B"),
        (1e6, "M"),
        (1e3, "K"),
    ];

    for (value, suffix) in UNITS {
        if num >= value {
            let scaled = num / value;
            return if scaled.fract() == 0.0 {
                format!("{}{}", scaled, suffix)
            } else {
                format!("{:.1}{}", scaled, suffix)
            };
        }
    }

    if num.fract() == 0.0 {
        format!("{}", num)
    } else {
        format!("{:.1}", num)
    }
}
