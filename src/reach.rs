//! Reachability queries over the catalogue

use std::collections::{HashMap, HashSet, VecDeque};

use crate::catalogue::Catalogue;
use crate::models::{ItemId, MachineId};

/// Every item producible from `starting` using only `unlocked` machines.
///
/// Grows the set until a full pass over the unlocked recipes adds nothing.
/// The result always contains `starting`.
pub fn find_reachable(
    catalogue: &Catalogue,
    unlocked: &HashSet<MachineId>,
    starting: &HashSet<ItemId>,
) -> HashSet<ItemId> {
    let mut reachable = starting.clone();

    // Catalogue order keeps the pass structure stable between runs
    let machines: Vec<MachineId> = catalogue
        .machine_ids()
        .filter(|m| unlocked.contains(m))
        .collect();

    loop {
        let mut changed = false;
        for &machine in &machines {
            for &recipe_id in &catalogue.machine(machine).recipes {
                let recipe = catalogue.recipe(recipe_id);
                if !recipe.inputs.iter().all(|(item, _)| reachable.contains(item)) {
                    continue;
                }
                for (out, _) in &recipe.outputs {
                    changed |= reachable.insert(*out);
                }
            }
        }
        if !changed {
            break;
        }
    }

    reachable
}

/// The pass in which each reachable item first becomes producible.
///
/// Starting items sit at level 0. Every other reachable item sits one past
/// the highest input level of its earliest unlocked recipe, so it always has
/// a recipe whose inputs all sit on lower levels. Unreachable items are
/// absent, and the keys are exactly [`find_reachable`]'s set.
pub fn reach_levels(
    catalogue: &Catalogue,
    unlocked: &HashSet<MachineId>,
    starting: &HashSet<ItemId>,
) -> HashMap<ItemId, u32> {
    let mut levels: HashMap<ItemId, u32> = starting.iter().map(|&item| (item, 0)).collect();
    let recipes: Vec<_> = catalogue
        .recipe_ids()
        .map(|id| catalogue.recipe(id))
        .filter(|recipe| unlocked.contains(&recipe.machine))
        .collect();

    for level in 1.. {
        let mut found = Vec::new();
        for recipe in &recipes {
            if !recipe.inputs.iter().all(|(item, _)| levels.contains_key(item)) {
                continue;
            }
            found.extend(
                recipe
                    .outputs
                    .iter()
                    .map(|&(out, _)| out)
                    .filter(|out| !levels.contains_key(out)),
            );
        }
        if found.is_empty() {
            break;
        }
        // Items found in this pass only become inputs for the next one
        for item in found {
            levels.entry(item).or_insert(level);
        }
    }

    levels
}

/// Every item downstream of `source` through unlocked machines, `source` included
pub fn items_from(
    catalogue: &Catalogue,
    source: ItemId,
    unlocked: &HashSet<MachineId>,
) -> HashSet<ItemId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([source]);

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }

        for &recipe_id in catalogue.used_in(current) {
            let recipe = catalogue.recipe(recipe_id);
            if !unlocked.contains(&recipe.machine) {
                continue;
            }
            for (out, _) in &recipe.outputs {
                if !visited.contains(out) {
                    queue.push_back(*out);
                }
            }
        }
    }

    visited
}
