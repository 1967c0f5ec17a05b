//! Depth assignment and layout helpers for the graph view
//!
//! Depths only order items into columns. Inside a recipe loop an input only
//! counts when it became reachable on an earlier pass than the item it
//! feeds; any other loop input counts as depth 0. Depths there are lower
//! bounds rather than true longest paths.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalogue::Catalogue;
use crate::cycles::FeedOrder;
use crate::models::{ItemId, MachineId};
use crate::path::RecipePath;

/// A directed (input, output) pair drawn between two items
pub type Edge = (ItemId, ItemId);

/// Longest production-chain distance from a starting item, for every item.
///
/// Starting items sit at 0. Other items sit one past the deepest input of
/// their deepest unlocked recipe, or at 0 when nothing unlocked makes them.
pub fn compute_depths(
    catalogue: &Catalogue,
    starting: &HashSet<ItemId>,
    unlocked: &HashSet<MachineId>,
) -> HashMap<ItemId, u32> {
    let mut walker = DepthWalker {
        catalogue,
        starting,
        unlocked,
        order: FeedOrder::new(catalogue, unlocked, starting),
        memo: HashMap::new(),
    };

    catalogue
        .item_ids()
        .map(|item| (item, walker.depth_of(item)))
        .collect()
}

struct DepthWalker<'c> {
    catalogue: &'c Catalogue,
    starting: &'c HashSet<ItemId>,
    unlocked: &'c HashSet<MachineId>,
    order: FeedOrder,
    memo: HashMap<ItemId, u32>,
}

impl DepthWalker<'_> {
    fn depth_of(&mut self, item: ItemId) -> u32 {
        if self.starting.contains(&item) {
            return 0;
        }
        if let Some(&depth) = self.memo.get(&item) {
            return depth;
        }

        let catalogue = self.catalogue;
        let mut deepest = 0;

        for &recipe_id in catalogue.produced_by(item) {
            let recipe = catalogue.recipe(recipe_id);
            if !self.unlocked.contains(&recipe.machine) {
                continue;
            }
            let mut inputs_depth = 0;
            for &(input, _) in &recipe.inputs {
                if self.order.feeds(input, item) {
                    inputs_depth = inputs_depth.max(self.depth_of(input));
                }
            }
            deepest = deepest.max(inputs_depth + 1);
        }

        self.memo.insert(item, deepest);
        deepest
    }
}

/// Group reachable items into columns of ascending depth
pub fn layout_columns(
    depths: &HashMap<ItemId, u32>,
    reachable: &HashSet<ItemId>,
) -> Vec<Vec<ItemId>> {
    let mut columns: BTreeMap<u32, Vec<ItemId>> = BTreeMap::new();
    for (&item, &depth) in depths {
        if reachable.contains(&item) {
            columns.entry(depth).or_default().push(item);
        }
    }

    columns
        .into_values()
        .map(|mut column| {
            column.sort_unstable();
            column
        })
        .collect()
}

/// Every input-to-output edge of every step in `path`
pub fn path_edges(catalogue: &Catalogue, path: &RecipePath) -> HashSet<Edge> {
    let mut edges = HashSet::new();
    for step in &path.steps {
        let recipe = catalogue.recipe(step.recipe);
        for &(input, _) in &recipe.inputs {
            for &(output, _) in &recipe.outputs {
                edges.insert((input, output));
            }
        }
    }
    edges
}

/// Edges leaving `items` through recipes on unlocked machines
pub fn edges_from(
    catalogue: &Catalogue,
    items: &HashSet<ItemId>,
    unlocked: &HashSet<MachineId>,
) -> HashSet<Edge> {
    let mut edges = HashSet::new();
    for &item in items {
        for &recipe_id in catalogue.used_in(item) {
            let recipe = catalogue.recipe(recipe_id);
            if !unlocked.contains(&recipe.machine) {
                continue;
            }
            for &(output, _) in &recipe.outputs {
                edges.insert((item, output));
            }
        }
    }
    edges
}
