//! Best-path resolution and requirement aggregation

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use log::{debug, warn};

use crate::catalogue::Catalogue;
use crate::cycles::FeedOrder;
use crate::error::ResolveError;
use crate::models::{ItemId, MachineId, RecipeId};
use crate::path::RecipePath;

/// Deepest recipe chain followed before giving up, to keep recursion off
/// the end of the stack
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    target: ItemId,
    unlocked: Rc<[MachineId]>,
    starting: Rc<[ItemId]>,
    amount: u64,
}

impl CacheKey {
    fn new(target: ItemId, unlocked: &Rc<[MachineId]>, starting: &Rc<[ItemId]>, amount: f64) -> Self {
        // -0.0 and 0.0 must share an entry
        let amount = if amount == 0.0 { 0.0f64 } else { amount };
        Self {
            target,
            unlocked: Rc::clone(unlocked),
            starting: Rc::clone(starting),
            amount: amount.to_bits(),
        }
    }
}

/// One top-level query: the constraint sets, their canonical key form, and
/// the ordering that keeps the recursion off recipe loops
struct Query<'q> {
    unlocked: &'q HashSet<MachineId>,
    starting: &'q HashSet<ItemId>,
    unlocked_key: Rc<[MachineId]>,
    starting_key: Rc<[ItemId]>,
    order: FeedOrder,
}

impl Query<'_> {
    fn key(&self, target: ItemId, amount: f64) -> CacheKey {
        CacheKey::new(target, &self.unlocked_key, &self.starting_key, amount)
    }
}

/// Memoizing fewest-steps planner.
///
/// Cached plans stay valid for as long as the borrowed catalogue is
/// unchanged, which the borrow guarantees.
pub struct Resolver<'a> {
    catalogue: &'a Catalogue,
    cache: HashMap<CacheKey, Option<RecipePath>>,
}

impl<'a> Resolver<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self {
            catalogue,
            cache: HashMap::new(),
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cheapest plan producing `amount` of `target`, or `None` if no chain exists.
    ///
    /// Items in `starting` are free and unlimited. The recipe for each item
    /// is picked by the per-run cost and then scaled to the requested amount;
    /// it is never re-evaluated for bulk quantities. Ties keep the recipe
    /// loaded first. Inside a recipe loop (craft and uncraft pairs, say) an
    /// item is only made from items that became reachable before it, so a
    /// plan never feeds an item back into its own production.
    pub fn find_best_path_to_item(
        &mut self,
        target: ItemId,
        unlocked: &HashSet<MachineId>,
        starting: &HashSet<ItemId>,
        amount: f64,
    ) -> Result<Option<RecipePath>, ResolveError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ResolveError::InvalidAmount(amount));
        }

        let unlocked_key = sorted(unlocked);
        let starting_key = sorted(starting);
        if let Some(hit) = self
            .cache
            .get(&CacheKey::new(target, &unlocked_key, &starting_key, amount))
        {
            return Ok(hit.clone());
        }

        let query = Query {
            unlocked,
            starting,
            unlocked_key,
            starting_key,
            order: FeedOrder::new(self.catalogue, unlocked, starting),
        };
        debug!(
            "resolving {} x '{}' with {} reachable items",
            amount,
            self.catalogue.item(target).key,
            query.order.reachable_count()
        );

        self.resolve(&query, target, amount, 0)
    }

    fn resolve(
        &mut self,
        query: &Query<'_>,
        target: ItemId,
        amount: f64,
        depth: usize,
    ) -> Result<Option<RecipePath>, ResolveError> {
        if query.starting.contains(&target) {
            return Ok(Some(RecipePath::new()));
        }

        let key = query.key(target, amount);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        if depth >= MAX_DEPTH {
            let item = self.catalogue.item(target).key.clone();
            warn!("recipe chain for '{}' is deeper than {} levels", item, MAX_DEPTH);
            return Err(ResolveError::TooDeep {
                item,
                depth: MAX_DEPTH,
            });
        }

        let path = self.best_unit_path(query, target, depth)?.map(|(mut unit, recipe_id)| {
            let per_run = self.catalogue.recipe(recipe_id).output_quantity(target);
            unit.scale(amount / per_run);
            unit
        });

        self.cache.insert(key, path.clone());
        Ok(path)
    }

    /// Cheapest single-run plan among the unlocked producers of `target`
    fn best_unit_path(
        &mut self,
        query: &Query<'_>,
        target: ItemId,
        depth: usize,
    ) -> Result<Option<(RecipePath, RecipeId)>, ResolveError> {
        if query.order.level(target).is_none() {
            return Ok(None);
        }

        let catalogue = self.catalogue;
        let mut best: Option<(RecipePath, RecipeId)> = None;

        'candidates: for &recipe_id in catalogue.produced_by(target) {
            let recipe = catalogue.recipe(recipe_id);
            if !query.unlocked.contains(&recipe.machine) || recipe.output_quantity(target) <= 0.0 {
                continue;
            }

            let mut unit = RecipePath::new();
            for &(input, quantity) in &recipe.inputs {
                if !query.order.feeds(input, target) {
                    continue 'candidates;
                }
                match self.resolve(query, input, quantity, depth + 1)? {
                    Some(path) => unit.merge(&path),
                    None => continue 'candidates,
                }
            }
            unit.add(recipe_id, 1.0);

            if best
                .as_ref()
                .is_none_or(|(current, _)| unit.total_steps() < current.total_steps())
            {
                best = Some((unit, recipe_id));
            }
        }

        Ok(best)
    }
}

fn sorted<T: Copy + Ord>(set: &HashSet<T>) -> Rc<[T]> {
    let mut values: Vec<T> = set.iter().copied().collect();
    values.sort_unstable();
    values.into()
}

/// Raw-material demand for producing `target_amount` of `target` with `path`.
///
/// Walks the steps last-produced-first, turning each output demand into
/// demand for that step's inputs. What is left are the leaves of the plan.
/// The target itself is not part of the result.
pub fn compute_requirements_from_path(
    catalogue: &Catalogue,
    path: &RecipePath,
    target: ItemId,
    target_amount: f64,
) -> BTreeMap<ItemId, f64> {
    let mut needed: BTreeMap<ItemId, f64> = BTreeMap::new();
    needed.insert(target, target_amount);

    for step in path.steps.iter().rev() {
        let recipe = catalogue.recipe(step.recipe);
        for &(out, produced) in &recipe.outputs {
            let demand = needed.get(&out).copied().unwrap_or(0.0);
            if demand == 0.0 {
                continue;
            }
            let times = demand / produced;
            needed.remove(&out);
            for &(input, amount) in &recipe.inputs {
                *needed.entry(input).or_default() += amount * times;
            }
        }
    }

    needed
}

/// One step of a plan, with totals per item for all of its runs
#[derive(Debug, Clone)]
pub struct StepLine {
    pub recipe: String,
    pub machine: String,
    pub count: f64,
    pub inputs: Vec<(String, f64)>,
    pub outputs: Vec<(String, f64)>,
}

/// Summary of a resolved plan
#[derive(Debug)]
pub struct PlanSummary {
    pub target: String,
    pub amount: f64,
    pub total_steps: f64,
    pub steps: Vec<StepLine>,
    pub raw_inputs: Vec<(String, f64)>,
}

/// Generate a summary of a plan
pub fn summarize_plan(
    catalogue: &Catalogue,
    path: &RecipePath,
    target: ItemId,
    amount: f64,
) -> PlanSummary {
    let name = |id: ItemId| catalogue.item(id).name.clone();

    let steps = path
        .steps
        .iter()
        .map(|step| {
            let recipe = catalogue.recipe(step.recipe);
            StepLine {
                recipe: recipe.key.clone(),
                machine: catalogue.machine(recipe.machine).name.clone(),
                count: step.count,
                inputs: recipe
                    .inputs
                    .iter()
                    .map(|&(id, q)| (name(id), q * step.count))
                    .collect(),
                outputs: recipe
                    .outputs
                    .iter()
                    .map(|&(id, q)| (name(id), q * step.count))
                    .collect(),
            }
        })
        .collect();

    let raw_inputs = compute_requirements_from_path(catalogue, path, target, amount)
        .into_iter()
        .filter(|&(_, demand)| demand > 0.0)
        .map(|(id, demand)| (name(id), demand))
        .collect();

    PlanSummary {
        target: name(target),
        amount,
        total_steps: path.total_steps(),
        steps,
        raw_inputs,
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Plan ===")?;
        writeln!(f, "Target: {:.2}x {}", self.amount, self.target)?;
        writeln!(f, "Total steps: {:.2}", self.total_steps)?;
        writeln!(f)?;

        if self.steps.is_empty() {
            writeln!(f, "Nothing to craft: target is a starting item.")?;
            return Ok(());
        }

        writeln!(f, "Steps:")?;
        for step in &self.steps {
            let fmt_side = |side: &[(String, f64)]| {
                side.iter()
                    .map(|(item, q)| format!("{:.2} {}", q, item))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(
                f,
                "  {:.2}x {} @ {}: {} -> {}",
                step.count,
                step.recipe,
                step.machine,
                fmt_side(&step.inputs),
                fmt_side(&step.outputs)
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (name, amount) in &self.raw_inputs {
            writeln!(f, "  {:.2}x {}", amount, name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::tests::{item, machine, recipe, sawmill, slot};

    fn all_machines(cat: &Catalogue) -> HashSet<MachineId> {
        cat.machine_ids().collect()
    }

    fn start(cat: &Catalogue, keys: &[&str]) -> HashSet<ItemId> {
        keys.iter().map(|k| cat.item_id(k).unwrap()).collect()
    }

    fn recipe_id(cat: &Catalogue, key: &str) -> RecipeId {
        cat.recipe_id(key).unwrap()
    }

    #[test]
    fn planks_from_logs() {
        let cat = sawmill();
        let plank = cat.item_id("plank").unwrap();
        let log = cat.item_id("log").unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(plank, &all_machines(&cat), &start(&cat, &["log"]), 8.0)
            .unwrap()
            .unwrap();

        assert_eq!(path.len(), 1);
        assert_eq!(path.get(recipe_id(&cat, "R1")), Some(2.0));

        let needs = compute_requirements_from_path(&cat, &path, plank, 8.0);
        assert_eq!(needs.len(), 1);
        assert_eq!(needs[&log], 2.0);
    }

    #[test]
    fn starting_target_is_free() {
        let cat = sawmill();
        let log = cat.item_id("log").unwrap();
        let mut resolver = Resolver::new(&cat);
        for amount in [0.0, 1.0, 1000.0] {
            let path = resolver
                .find_best_path_to_item(log, &HashSet::new(), &start(&cat, &["log"]), amount)
                .unwrap();
            assert_eq!(path, Some(RecipePath::new()));
        }
    }

    #[test]
    fn unreachable_target_is_none() {
        let cat = sawmill();
        let stick = cat.item_id("stick").unwrap();
        let saw: HashSet<_> = [cat.machine_id("Saw").unwrap()].into();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(stick, &saw, &start(&cat, &["log"]), 1.0)
            .unwrap();
        assert!(path.is_none());

        // No starting items at all
        let plank = cat.item_id("plank").unwrap();
        let path = resolver
            .find_best_path_to_item(plank, &all_machines(&cat), &HashSet::new(), 1.0)
            .unwrap();
        assert!(path.is_none());
    }

    #[test]
    fn two_level_chain_scales_inputs() {
        let cat = sawmill();
        let stick = cat.item_id("stick").unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(stick, &all_machines(&cat), &start(&cat, &["log"]), 4.0)
            .unwrap()
            .unwrap();

        // 4 sticks = 1 run of R2 = 2 planks = 0.5 runs of R1
        assert_eq!(path.get(recipe_id(&cat, "R2")), Some(1.0));
        assert_eq!(path.get(recipe_id(&cat, "R1")), Some(0.5));
        assert_eq!(path.steps[0].recipe, recipe_id(&cat, "R1"));
    }

    #[test]
    fn picks_fewest_steps_and_keeps_first_on_ties() {
        let items = vec![item("ore"), item("dust"), item("ingot")];
        let machines = vec![
            machine(
                "Grinder",
                false,
                vec![recipe("grind", vec![slot("ore", 1.0)], vec![slot("dust", 1.0)])],
            ),
            machine(
                "Furnace",
                false,
                vec![
                    recipe("smelt_dust", vec![slot("dust", 1.0)], vec![slot("ingot", 1.0)]),
                    recipe("smelt_ore", vec![slot("ore", 1.0)], vec![slot("ingot", 1.0)]),
                    recipe("smelt_ore_alt", vec![slot("ore", 2.0)], vec![slot("ingot", 1.0)]),
                ],
            ),
        ];
        let cat = Catalogue::from_records(&items, &machines).unwrap();
        let ingot = cat.item_id("ingot").unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(ingot, &all_machines(&cat), &start(&cat, &["ore"]), 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.get(recipe_id(&cat, "smelt_ore")), Some(1.0));
    }

    #[test]
    fn cycles_are_unresolvable_not_fatal() {
        let items = vec![item("egg"), item("chicken")];
        let machines = vec![machine(
            "Farm",
            false,
            vec![
                recipe("hatch", vec![slot("egg", 1.0)], vec![slot("chicken", 1.0)]),
                recipe("lay", vec![slot("chicken", 1.0)], vec![slot("egg", 2.0)]),
            ],
        )];
        let cat = Catalogue::from_records(&items, &machines).unwrap();
        let chicken = cat.item_id("chicken").unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(chicken, &all_machines(&cat), &HashSet::new(), 1.0)
            .unwrap();
        assert!(path.is_none());

        // Breaking the cycle with a starting egg makes it resolvable
        let path = resolver
            .find_best_path_to_item(chicken, &all_machines(&cat), &start(&cat, &["egg"]), 3.0)
            .unwrap()
            .unwrap();
        assert_eq!(path.get(recipe_id(&cat, "hatch")), Some(3.0));
    }

    #[test]
    fn loops_do_not_hide_direct_routes() {
        // a <- b <- a, but b also has a plain route from raw
        let items = vec![item("raw"), item("a"), item("b")];
        let machines = vec![machine(
            "M",
            false,
            vec![
                recipe("b_from_a", vec![slot("a", 1.0)], vec![slot("b", 1.0)]),
                recipe("a_from_b", vec![slot("b", 1.0)], vec![slot("a", 1.0)]),
                recipe("b_from_raw", vec![slot("raw", 1.0)], vec![slot("b", 1.0)]),
            ],
        )];
        let cat = Catalogue::from_records(&items, &machines).unwrap();
        let unlocked = all_machines(&cat);
        let starting = start(&cat, &["raw"]);
        let a = cat.item_id("a").unwrap();
        let b = cat.item_id("b").unwrap();
        let mut resolver = Resolver::new(&cat);

        let path_a = resolver
            .find_best_path_to_item(a, &unlocked, &starting, 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(path_a.total_steps(), 2.0);
        assert_eq!(path_a.get(recipe_id(&cat, "b_from_a")), None);

        let path_b = resolver
            .find_best_path_to_item(b, &unlocked, &starting, 1.0)
            .unwrap()
            .unwrap();
        assert_eq!(path_b.get(recipe_id(&cat, "b_from_raw")), Some(1.0));
        assert_eq!(path_b.len(), 1);
    }

    /// Tiers x_i / y_i, each craftable from either item one tier down, and
    /// each uncraftable back into its own lower tier.
    fn tiers(n: usize) -> Catalogue {
        let items: Vec<_> = (0..=n)
            .flat_map(|i| [item(&format!("x{i}")), item(&format!("y{i}"))])
            .collect();
        let mut recipes = Vec::new();
        for i in 1..=n {
            for out in ["x", "y"] {
                for src in ["x", "y"] {
                    recipes.push(recipe(
                        &format!("{out}{i}_from_{src}"),
                        vec![slot(&format!("{src}{}", i - 1), 1.0)],
                        vec![slot(&format!("{out}{i}"), 1.0)],
                    ));
                }
                recipes.push(recipe(
                    &format!("{out}{i}_uncraft"),
                    vec![slot(&format!("{out}{i}"), 1.0)],
                    vec![slot(&format!("{out}{}", i - 1), 1.0)],
                ));
            }
        }
        Catalogue::from_records(&items, &[machine("Bench", false, recipes)]).unwrap()
    }

    #[test]
    fn craft_and_uncraft_tiers_stay_cached() {
        let n = 60;
        let cat = tiers(n);
        let target = cat.item_id(&format!("x{n}")).unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(target, &all_machines(&cat), &start(&cat, &["x0"]), 1.0)
            .unwrap()
            .unwrap();

        // One craft per tier, never an uncraft
        assert_eq!(path.len(), n);
        assert_eq!(path.total_steps(), n as f64);
        for i in 1..=n {
            assert_eq!(path.get(recipe_id(&cat, &format!("x{i}_from_x"))), Some(1.0));
        }

        // Each item is resolved at most once per amount
        assert!(resolver.cache_len() > 0);
        assert!(resolver.cache_len() <= cat.item_count());

        // y0 is only made by uncrafting y1
        let y0 = cat.item_id("y0").unwrap();
        let path = resolver
            .find_best_path_to_item(y0, &all_machines(&cat), &start(&cat, &["x0"]), 2.0)
            .unwrap()
            .unwrap();
        assert_eq!(path.get(recipe_id(&cat, "y1_uncraft")), Some(2.0));
        assert_eq!(path.get(recipe_id(&cat, "y1_from_x")), Some(2.0));
        assert_eq!(path.len(), 2);
    }

    fn chain(n: usize) -> Catalogue {
        let items: Vec<_> = (0..=n).map(|i| item(&format!("i{i}"))).collect();
        let recipes = (0..n)
            .map(|i| {
                recipe(
                    &format!("r{i}"),
                    vec![slot(&format!("i{i}"), 1.0)],
                    vec![slot(&format!("i{}", i + 1), 1.0)],
                )
            })
            .collect();
        Catalogue::from_records(&items, &[machine("M", false, recipes)]).unwrap()
    }

    #[test]
    fn long_chains_resolve() {
        let n = 100;
        let cat = chain(n);
        let last = cat.item_id(&format!("i{n}")).unwrap();
        let mut resolver = Resolver::new(&cat);

        let path = resolver
            .find_best_path_to_item(last, &all_machines(&cat), &start(&cat, &["i0"]), 3.0)
            .unwrap()
            .unwrap();
        assert_eq!(path.len(), n);
        assert_eq!(path.total_steps(), 3.0 * n as f64);
    }

    #[test]
    fn chains_past_the_stack_guard_fail_cleanly() {
        let n = MAX_DEPTH + 2;
        let cat = chain(n);
        let last = cat.item_id(&format!("i{n}")).unwrap();
        let mut resolver = Resolver::new(&cat);

        let err = resolver
            .find_best_path_to_item(last, &all_machines(&cat), &start(&cat, &["i0"]), 1.0)
            .unwrap_err();
        assert!(matches!(err, ResolveError::TooDeep { depth: MAX_DEPTH, .. }));
        assert!(err.to_string().contains("deeper than"));
    }

    #[test]
    fn rejects_bad_amounts() {
        let cat = sawmill();
        let plank = cat.item_id("plank").unwrap();
        let mut resolver = Resolver::new(&cat);
        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolver.find_best_path_to_item(plank, &HashSet::new(), &HashSet::new(), amount),
                Err(ResolveError::InvalidAmount(_))
            ));
        }

        let err = resolver
            .find_best_path_to_item(plank, &HashSet::new(), &HashSet::new(), -2.0)
            .unwrap_err();
        assert_eq!(err.to_string(), "requested amount -2 must be finite and non-negative");

        // Zero is a valid request
        let path = resolver
            .find_best_path_to_item(plank, &all_machines(&cat), &start(&cat, &["log"]), 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(path.get(recipe_id(&cat, "R1")), Some(0.0));
    }

    #[test]
    fn cache_is_keyed_by_constraints_and_amount() {
        let cat = sawmill();
        let stick = cat.item_id("stick").unwrap();
        let unlocked = all_machines(&cat);
        let starting = start(&cat, &["log"]);
        let mut resolver = Resolver::new(&cat);

        let first = resolver
            .find_best_path_to_item(stick, &unlocked, &starting, 4.0)
            .unwrap();
        let cached = resolver.cache_len();
        assert!(cached > 0);

        let again = resolver
            .find_best_path_to_item(stick, &unlocked, &starting, 4.0)
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(resolver.cache_len(), cached);

        resolver
            .find_best_path_to_item(stick, &unlocked, &starting, 8.0)
            .unwrap();
        assert!(resolver.cache_len() > cached);

        resolver.clear_cache();
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn summary_lists_steps_and_raw_inputs() {
        let cat = sawmill();
        let stick = cat.item_id("stick").unwrap();
        let mut resolver = Resolver::new(&cat);
        let path = resolver
            .find_best_path_to_item(stick, &all_machines(&cat), &start(&cat, &["log"]), 8.0)
            .unwrap()
            .unwrap();

        let summary = summarize_plan(&cat, &path, stick, 8.0);
        assert_eq!(summary.steps.len(), 2);
        assert_eq!(summary.steps[1].machine, "Bench");
        assert_eq!(summary.steps[1].outputs, vec![("stick".to_string(), 8.0)]);
        assert_eq!(summary.raw_inputs, vec![("log".to_string(), 1.0)]);

        let text = summary.to_string();
        assert!(text.contains("2.00x R2 @ Bench"));
        assert!(text.contains("1.00x log"));
    }
}
