//! Recipe plans: ordered (recipe, run count) steps

use crate::models::RecipeId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub recipe: RecipeId,
    /// Runs needed; fractional runs are partial recipe utilisation
    pub count: f64,
}

/// A production plan. Holds at most one step per recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePath {
    pub steps: Vec<Step>,
}

impl RecipePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `recipe`, or add `count` to its existing step
    pub fn add(&mut self, recipe: RecipeId, count: f64) {
        match self.steps.iter_mut().find(|s| s.recipe == recipe) {
            Some(step) => step.count += count,
            None => self.steps.push(Step { recipe, count }),
        }
    }

    pub fn merge(&mut self, other: &RecipePath) {
        for step in &other.steps {
            self.add(step.recipe, step.count);
        }
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        for step in &mut self.steps {
            step.count *= factor;
        }
        self
    }

    /// Sum of all run counts; the cost used to compare plans
    pub fn total_steps(&self) -> f64 {
        self.steps.iter().map(|s| s.count).sum()
    }

    pub fn get(&self, recipe: RecipeId) -> Option<f64> {
        self.steps
            .iter()
            .find(|s| s.recipe == recipe)
            .map(|s| s.count)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}
