use tracing::debug;

use crate::config::Config;
use crate::copies::{CopyRounding, solve_copy_counts};
use crate::error::Result;
use crate::guillotine::Packer;
use crate::solution::{Solution, SolutionPattern};
use crate::types::ItemType;

/// Scores candidate solutions: pack, solve copy counts, price.
#[derive(Debug, Clone)]
pub struct Evaluator {
    packer: Packer,
    item_types: Vec<ItemType>,
    base_cost: f64,
    per_copy_cost: f64,
    rounding: CopyRounding,
    charge_unused_patterns: bool,
}

impl Evaluator {
    pub fn new(config: &Config) -> Self {
        let sheet = &config.sheet;
        Self {
            packer: Packer::new(sheet.rect(), sheet.max_pattern_count, sheet.allow_rotate),
            item_types: config.item_types(),
            base_cost: sheet.base_cost,
            per_copy_cost: sheet.per_copy_cost,
            rounding: sheet.copy_rounding,
            charge_unused_patterns: sheet.charge_unused_patterns,
        }
    }

    pub fn item_types(&self) -> &[ItemType] {
        &self.item_types
    }

    /// Re-scores `solution` in place. A candidate that cannot be packed within
    /// the pattern limit, or leaves demand uncovered, gets an infinite cost and
    /// its failure recorded; only run-level failures are returned as errors.
    pub fn evaluate(&self, solution: &mut Solution) -> Result<()> {
        solution.patterns.clear();
        match self.price(solution) {
            Ok(cost) => {
                solution.cost = cost;
                solution.failure = None;
                Ok(())
            }
            Err(e) if e.is_candidate_failure() => {
                debug!(error = %e, items = solution.items().len(), "candidate rejected");
                solution.patterns.clear();
                solution.cost = f64::INFINITY;
                solution.failure = Some(e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn price(&self, solution: &mut Solution) -> Result<f64> {
        let patterns = self.packer.pack(solution.items_mut(), &self.item_types)?;
        let mut patterns: Vec<SolutionPattern> =
            patterns.into_iter().map(SolutionPattern::new).collect();

        let copies = solve_copy_counts(&patterns, &self.item_types, self.rounding)?;
        for (pattern, copies) in patterns.iter_mut().zip(copies) {
            pattern.copies = copies;
        }

        let cost = self.cost_of(&patterns);
        solution.patterns = patterns;
        Ok(cost)
    }

    /// Base cost per pattern plus the per-copy cost of every copy.
    pub fn cost_of(&self, patterns: &[SolutionPattern]) -> f64 {
        patterns
            .iter()
            .filter(|p| self.charge_unused_patterns || p.copies > 0.0)
            .map(|p| self.base_cost + self.per_copy_cost * p.copies)
            .sum()
    }
}
