//! The immutable item/machine/recipe catalogue
//!
//! Entities live in arenas indexed by [`ItemId`], [`MachineId`] and
//! [`RecipeId`]. Recipes refer to items and machines by id, and the
//! `used_in` / `produced_by` reverse indexes are built once during
//! assembly and never touched again.

use std::collections::HashMap;

use log::debug;

use crate::error::CatalogueError;
use crate::models::{
    Item, ItemId, ItemRecord, Machine, MachineId, MachineRecord, Recipe, RecipeId, SlotRecord,
};

#[derive(Debug, Default)]
pub struct Catalogue {
    items: Vec<Item>,
    machines: Vec<Machine>,
    recipes: Vec<Recipe>,
    item_index: HashMap<String, ItemId>,
    machine_index: HashMap<String, MachineId>,
    recipe_index: HashMap<String, RecipeId>,
    used_in: Vec<Vec<RecipeId>>,
    produced_by: Vec<Vec<RecipeId>>,
}

impl Catalogue {
    /// Assemble a catalogue. Items load first, then machines with their recipes.
    pub fn from_records(
        items: &[ItemRecord],
        machines: &[MachineRecord],
    ) -> Result<Self, CatalogueError> {
        let mut catalogue = Catalogue::default();

        for record in items {
            catalogue.add_item(record)?;
        }
        for record in machines {
            catalogue.add_machine(record)?;
        }

        debug!(
            "catalogue assembled: {} items, {} machines, {} recipes",
            catalogue.items.len(),
            catalogue.machines.len(),
            catalogue.recipes.len()
        );
        Ok(catalogue)
    }

    fn add_item(&mut self, record: &ItemRecord) -> Result<ItemId, CatalogueError> {
        if self.item_index.contains_key(&record.id) {
            return Err(CatalogueError::DuplicateItem(record.id.clone()));
        }

        let id = ItemId(self.items.len() as u32);
        self.items.push(Item {
            key: record.id.clone(),
            name: record.name.clone(),
            price: record.price,
            image: record.image.clone(),
            generator: record.generator,
            container: record.container,
        });
        self.item_index.insert(record.id.clone(), id);
        self.used_in.push(Vec::new());
        self.produced_by.push(Vec::new());
        Ok(id)
    }

    fn add_machine(&mut self, record: &MachineRecord) -> Result<MachineId, CatalogueError> {
        if self.machine_index.contains_key(&record.name) {
            return Err(CatalogueError::DuplicateMachine(record.name.clone()));
        }

        let machine_id = MachineId(self.machines.len() as u32);
        let mut recipe_ids = Vec::with_capacity(record.recipes.len());

        for rc in &record.recipes {
            if self.recipe_index.contains_key(&rc.id) {
                return Err(CatalogueError::DuplicateRecipe(rc.id.clone()));
            }
            let inputs = self.merge_slots(&rc.id, &rc.inputs)?;
            let outputs = self.merge_slots(&rc.id, &rc.outputs)?;

            let recipe_id = RecipeId(self.recipes.len() as u32);
            for (item, _) in &inputs {
                self.used_in[item.0 as usize].push(recipe_id);
            }
            for (item, _) in &outputs {
                self.produced_by[item.0 as usize].push(recipe_id);
            }

            self.recipes.push(Recipe {
                key: rc.id.clone(),
                machine: machine_id,
                inputs,
                outputs,
            });
            self.recipe_index.insert(rc.id.clone(), recipe_id);
            recipe_ids.push(recipe_id);
        }

        self.machines.push(Machine {
            name: record.name.clone(),
            image: record.image.clone(),
            input_slots: record.input_slots,
            output_slots: record.output_slots,
            pulls_items: record.pulls_items,
            recipes: recipe_ids,
        });
        self.machine_index.insert(record.name.clone(), machine_id);
        Ok(machine_id)
    }

    /// Resolve slot references and sum repeated items into one entry
    fn merge_slots(
        &self,
        recipe: &str,
        slots: &[SlotRecord],
    ) -> Result<Vec<(ItemId, f64)>, CatalogueError> {
        let mut merged: Vec<(ItemId, f64)> = Vec::with_capacity(slots.len());

        for slot in slots {
            let item = self
                .item_id(&slot.item)
                .ok_or_else(|| CatalogueError::UnknownItem {
                    recipe: recipe.to_string(),
                    item: slot.item.clone(),
                })?;

            match merged.iter_mut().find(|(id, _)| *id == item) {
                Some((_, amount)) => *amount += slot.amount,
                None => merged.push((item, slot.amount)),
            }
        }

        Ok(merged)
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }

    pub fn machine(&self, id: MachineId) -> &Machine {
        &self.machines[id.0 as usize]
    }

    pub fn recipe(&self, id: RecipeId) -> &Recipe {
        &self.recipes[id.0 as usize]
    }

    pub fn item_id(&self, key: &str) -> Option<ItemId> {
        self.item_index.get(key).copied()
    }

    pub fn recipe_id(&self, key: &str) -> Option<RecipeId> {
        self.recipe_index.get(key).copied()
    }

    pub fn machine_id(&self, name: &str) -> Option<MachineId> {
        self.machine_index.get(name).copied()
    }

    /// Recipes consuming `item`, in load order
    pub fn used_in(&self, item: ItemId) -> &[RecipeId] {
        &self.used_in[item.0 as usize]
    }

    /// Recipes producing `item`, in load order
    pub fn produced_by(&self, item: ItemId) -> &[RecipeId] {
        &self.produced_by[item.0 as usize]
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.items.len() as u32).map(ItemId)
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = MachineId> + '_ {
        (0..self.machines.len() as u32).map(MachineId)
    }

    pub fn recipe_ids(&self) -> impl Iterator<Item = RecipeId> + '_ {
        (0..self.recipes.len() as u32).map(RecipeId)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::RecipeRecord;

    pub(crate) fn item(id: &str) -> ItemRecord {
        ItemRecord {
            id: id.to_string(),
            name: id.to_string(),
            price: 1.0,
            image: format!("{id}.png"),
            generator: false,
            container: false,
        }
    }

    pub(crate) fn slot(item: &str, amount: f64) -> SlotRecord {
        SlotRecord {
            item: item.to_string(),
            amount,
        }
    }

    pub(crate) fn recipe(id: &str, inputs: Vec<SlotRecord>, outputs: Vec<SlotRecord>) -> RecipeRecord {
        RecipeRecord {
            id: id.to_string(),
            inputs,
            outputs,
        }
    }

    pub(crate) fn machine(name: &str, pulls_items: bool, recipes: Vec<RecipeRecord>) -> MachineRecord {
        MachineRecord {
            name: name.to_string(),
            image: String::new(),
            input_slots: 1,
            output_slots: 1,
            pulls_items,
            recipes,
        }
    }

    /// log (start) -> plank at Saw, plank -> stick at Bench
    pub(crate) fn sawmill() -> Catalogue {
        let items = vec![item("log"), item("plank"), item("stick")];
        let machines = vec![
            machine(
                "Saw",
                false,
                vec![recipe("R1", vec![slot("log", 1.0)], vec![slot("plank", 4.0)])],
            ),
            machine(
                "Bench",
                false,
                vec![recipe("R2", vec![slot("plank", 2.0)], vec![slot("stick", 4.0)])],
            ),
        ];
        Catalogue::from_records(&items, &machines).unwrap()
    }

    #[test]
    fn builds_reverse_indexes() {
        let cat = sawmill();
        let log = cat.item_id("log").unwrap();
        let plank = cat.item_id("plank").unwrap();

        assert_eq!(cat.used_in(log).len(), 1);
        assert_eq!(cat.produced_by(log).len(), 0);
        assert_eq!(cat.produced_by(plank).len(), 1);
        assert_eq!(cat.used_in(plank).len(), 1);

        let r1 = cat.produced_by(plank)[0];
        assert_eq!(cat.recipe(r1).key, "R1");
        assert_eq!(cat.machine(cat.recipe(r1).machine).name, "Saw");
        assert_eq!(cat.machine(cat.machine_id("Saw").unwrap()).recipes, vec![r1]);
    }

    #[test]
    fn duplicate_inputs_are_merged() {
        let items = vec![item("ore"), item("ingot")];
        let machines = vec![machine(
            "Furnace",
            false,
            vec![recipe(
                "smelt",
                vec![slot("ore", 1.0), slot("ore", 2.0)],
                vec![slot("ingot", 1.0)],
            )],
        )];
        let cat = Catalogue::from_records(&items, &machines).unwrap();
        let ore = cat.item_id("ore").unwrap();
        let smelt = cat.recipe(RecipeId(0));

        assert_eq!(smelt.inputs, vec![(ore, 3.0)]);
        // One back-reference, not two
        assert_eq!(cat.used_in(ore).len(), 1);
    }

    #[test]
    fn unknown_item_aborts_load() {
        let items = vec![item("log")];
        let machines = vec![machine(
            "Saw",
            false,
            vec![recipe("R1", vec![slot("log", 1.0)], vec![slot("plank", 4.0)])],
        )];
        let err = Catalogue::from_records(&items, &machines).unwrap_err();
        assert!(matches!(
            err,
            CatalogueError::UnknownItem { ref recipe, ref item } if recipe == "R1" && item == "plank"
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = Catalogue::from_records(&[item("log"), item("log")], &[]).unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateItem(_)));

        let machines = vec![machine("Saw", false, vec![]), machine("Saw", true, vec![])];
        let err = Catalogue::from_records(&[item("log")], &machines).unwrap_err();
        assert!(matches!(err, CatalogueError::DuplicateMachine(_)));

        // Recipe ids are unique across machines too
        let machines = vec![
            machine(
                "Saw",
                false,
                vec![recipe("cut", vec![slot("log", 1.0)], vec![slot("plank", 4.0)])],
            ),
            machine(
                "Axe",
                false,
                vec![recipe("cut", vec![slot("log", 1.0)], vec![slot("plank", 2.0)])],
            ),
        ];
        let err = Catalogue::from_records(&[item("log"), item("plank")], &machines).unwrap_err();
        assert_eq!(err.to_string(), "duplicate recipe id 'cut'");
    }
}
