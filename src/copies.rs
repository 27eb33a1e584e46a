//! Copy counts per pattern via linear programming.
//!
//! One non-negative variable per pattern, minimising the total number of
//! copies, with one covering constraint per item type:
//! `sum(occurrence[p][t] * copies[p]) >= min_count[t]`.

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint,
    default_solver, variable,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::solution::SolutionPattern;
use crate::types::ItemType;

/// How LP values become copy counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopyRounding {
    /// Keep the continuous relaxation as is.
    #[default]
    Fractional,
    /// Round every value up. Coefficients are non-negative, so the result
    /// still covers every demand.
    Ceil,
}

/// Solves the copy counts for `patterns`, in pattern order.
pub fn solve_copy_counts(
    patterns: &[SolutionPattern],
    item_types: &[ItemType],
    rounding: CopyRounding,
) -> Result<Vec<f64>> {
    // An item type with demand that no pattern produces makes the program infeasible.
    for item_type in item_types {
        let produced = patterns.iter().any(|p| p.occurrence(item_type.id) > 0);
        if item_type.min_count > 0 && !produced {
            return Err(Error::InfeasibleDemand {
                item_type: item_type.id,
            });
        }
    }
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let mut vars = ProblemVariables::new();
    let copies: Vec<_> = (0..patterns.len())
        .map(|p| vars.add(variable().min(0.0).name(format!("P{p}"))))
        .collect();

    let objective: Expression = copies.iter().map(|&v| Expression::from(v)).sum();
    let mut problem = vars.minimise(objective).using(default_solver);

    for item_type in item_types {
        let produced: Expression = patterns
            .iter()
            .zip(&copies)
            .filter(|(pattern, _)| pattern.occurrence(item_type.id) > 0)
            .map(|(pattern, &v)| pattern.occurrence(item_type.id) as f64 * v)
            .sum();
        let min_count = item_type.min_count as f64;
        problem = problem.with(constraint!(produced >= min_count));
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => {
            // Coverage is checked above, so the solver cannot name the type.
            let item_type = item_types.first().map(|t| t.id).unwrap_or_default();
            Error::InfeasibleDemand { item_type }
        }
        other => Error::Solver(other.to_string()),
    })?;

    let counts: Vec<f64> = copies
        .iter()
        .map(|&v| {
            // Simplex output can land a hair below zero.
            let value = solution.value(v).max(0.0);
            match rounding {
                CopyRounding::Fractional => value,
                CopyRounding::Ceil => (value - 1e-9).ceil().max(0.0),
            }
        })
        .collect();
    debug!(patterns = patterns.len(), ?counts, "solved copy counts");
    Ok(counts)
}
