//! Placement-cost estimate for a resolved plan

use std::collections::HashSet;

use crate::catalogue::Catalogue;
use crate::models::ItemId;
use crate::path::RecipePath;

/// Generators need this many slots per unit of a generated item
const GENERATOR_FACTOR: f64 = 5.0;

/// Slot counts for building a plan.
///
/// This over-estimates: machines shared between steps and generators
/// feeding several machines are counted once per use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaEstimate {
    pub machine_slots: u64,
    pub generator_slots: u64,
    pub generator_optimisation_slots: u64,
    pub total: i64,
}

pub fn estimate_area(
    catalogue: &Catalogue,
    path: &RecipePath,
    starting: &HashSet<ItemId>,
) -> AreaEstimate {
    let mut machine_slots = 0u64;
    let mut generator_slots = 0u64;
    let mut optimisation_slots = 0u64;

    for step in &path.steps {
        let recipe = catalogue.recipe(step.recipe);
        let machine = catalogue.machine(recipe.machine);

        let mut per_machine = 1.0;
        if machine.pulls_items {
            per_machine += recipe.inputs.len() as f64;
        }
        machine_slots += (per_machine * step.count.ceil()).ceil() as u64;

        let mut step_generators = 0.0;
        for &(input, quantity) in &recipe.inputs {
            if !starting.contains(&input) {
                continue;
            }
            let item = catalogue.item(input);
            let mut contribution = quantity;
            if item.generator && !item.container {
                contribution *= GENERATOR_FACTOR;
            }
            step_generators += contribution;

            if contribution > 0.0 && machine.pulls_items {
                optimisation_slots += 1;
            }
        }
        generator_slots += step_generators.ceil() as u64;
    }

    AreaEstimate {
        machine_slots,
        generator_slots,
        generator_optimisation_slots: optimisation_slots,
        total: machine_slots as i64 + generator_slots as i64 - optimisation_slots as i64,
    }
}

impl std::fmt::Display for AreaEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Estimated area (likely an overestimate: shared machines")?;
        writeln!(f, "and shared generators are not taken into account):")?;
        writeln!(f, "  Machine blocks:                {}", self.machine_slots)?;
        writeln!(f, "  Generator blocks:              {}", self.generator_slots)?;
        writeln!(
            f,
            "  Generator optimisation blocks: {}",
            self.generator_optimisation_slots
        )?;
        write!(
            f,
            "  Total: {} + {} - {} = {} blocks",
            self.machine_slots, self.generator_slots, self.generator_optimisation_slots, self.total
        )
    }
}
