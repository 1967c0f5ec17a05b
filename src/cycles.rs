//! Recipe loops in the item graph
//!
//! Items are grouped by strongly connected component over the edges
//! input -> output of every unlocked recipe. Two items share a group
//! exactly when each can be crafted, directly or not, from the other.

use std::collections::{HashMap, HashSet};

use crate::catalogue::Catalogue;
use crate::models::{ItemId, MachineId};
use crate::reach::reach_levels;

const UNVISITED: u32 = u32::MAX;

/// Loop group of every item under one set of unlocked machines
#[derive(Debug, Clone)]
pub struct CycleGroups {
    group: Vec<u32>,
}

impl CycleGroups {
    pub fn new(catalogue: &Catalogue, unlocked: &HashSet<MachineId>) -> Self {
        let successors: Vec<Vec<usize>> = catalogue
            .item_ids()
            .map(|item| {
                catalogue
                    .used_in(item)
                    .iter()
                    .map(|&r| catalogue.recipe(r))
                    .filter(|recipe| unlocked.contains(&recipe.machine))
                    .flat_map(|recipe| recipe.outputs.iter().map(|(out, _)| out.0 as usize))
                    .collect()
            })
            .collect();

        let mut walk = Tarjan::new(successors.len());
        for root in 0..successors.len() {
            if walk.index[root] == UNVISITED {
                walk.run(root, &successors);
            }
        }

        Self { group: walk.group }
    }

    pub fn same_group(&self, a: ItemId, b: ItemId) -> bool {
        self.group[a.0 as usize] == self.group[b.0 as usize]
    }
}

/// Which inputs may feed which outputs without closing a loop.
///
/// Between loop groups the item graph is acyclic, so every edge counts.
/// Inside a group an input only feeds an output that became reachable on a
/// later pass. Following `feeds` from any item therefore always ends.
#[derive(Debug, Clone)]
pub struct FeedOrder {
    levels: HashMap<ItemId, u32>,
    groups: CycleGroups,
}

impl FeedOrder {
    pub fn new(
        catalogue: &Catalogue,
        unlocked: &HashSet<MachineId>,
        starting: &HashSet<ItemId>,
    ) -> Self {
        Self {
            levels: reach_levels(catalogue, unlocked, starting),
            groups: CycleGroups::new(catalogue, unlocked),
        }
    }

    /// Reach level of `item`, `None` when it is unreachable
    pub fn level(&self, item: ItemId) -> Option<u32> {
        self.levels.get(&item).copied()
    }

    pub fn reachable_count(&self) -> usize {
        self.levels.len()
    }

    pub fn feeds(&self, input: ItemId, output: ItemId) -> bool {
        if !self.groups.same_group(input, output) {
            return true;
        }
        match (self.level(input), self.level(output)) {
            (Some(input_level), Some(output_level)) => input_level < output_level,
            _ => false,
        }
    }
}

/// Iterative Tarjan walk, so long chains cannot exhaust the stack
struct Tarjan {
    index: Vec<u32>,
    low: Vec<u32>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    group: Vec<u32>,
    next_index: u32,
    groups: u32,
}

impl Tarjan {
    fn new(n: usize) -> Self {
        Self {
            index: vec![UNVISITED; n],
            low: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            group: vec![UNVISITED; n],
            next_index: 0,
            groups: 0,
        }
    }

    fn enter(&mut self, node: usize) {
        self.index[node] = self.next_index;
        self.low[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;
    }

    fn run(&mut self, root: usize, successors: &[Vec<usize>]) {
        // (node, position of the next successor to look at)
        let mut frames = vec![(root, 0usize)];
        self.enter(root);

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if let Some(&next) = successors[node].get(frame.1) {
                frame.1 += 1;
                if self.index[next] == UNVISITED {
                    self.enter(next);
                    frames.push((next, 0));
                } else if self.on_stack[next] {
                    self.low[node] = self.low[node].min(self.index[next]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.low[parent] = self.low[parent].min(self.low[node]);
            }
            if self.low[node] == self.index[node] {
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member] = false;
                    self.group[member] = self.groups;
                    if member == node {
                        break;
                    }
                }
                self.groups += 1;
            }
        }
    }
}
