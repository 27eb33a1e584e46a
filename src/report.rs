use serde::Serialize;

use crate::solution::Solution;
use crate::solver::Outcome;
use crate::types::ItemType;

/// The chosen solution in the shape handed to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub cost: f64,
    pub per_item_type: Vec<ItemTypeReport>,
    pub patterns: Vec<PatternReport>,
    pub history: Vec<f64>,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeReport {
    pub id: usize,
    pub min_count: u32,
    /// Pieces cut over all copies of all patterns.
    pub total_produced_count: f64,
    /// Instances of this type in the chosen chromosome.
    pub instance_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub sheet_width: f64,
    pub sheet_height: f64,
    pub copy_count: f64,
    pub waste_percent: f64,
    pub items: Vec<ItemReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReport {
    pub item_type_id: usize,
    pub x: f64,
    pub y: f64,
    pub effective_width: f64,
    pub effective_height: f64,
    pub rotated: bool,
}

impl OptimizationReport {
    pub fn new(outcome: &Outcome, item_types: &[ItemType]) -> Self {
        Self {
            history: outcome.history.clone(),
            time_ms: outcome.elapsed.as_millis() as u64,
            ..Self::from_solution(&outcome.best, item_types)
        }
    }

    pub fn from_solution(solution: &Solution, item_types: &[ItemType]) -> Self {
        let per_item_type = item_types
            .iter()
            .map(|t| ItemTypeReport {
                id: t.id,
                min_count: t.min_count,
                total_produced_count: solution
                    .patterns
                    .iter()
                    .map(|p| p.occurrence(t.id) as f64 * p.copies)
                    .sum(),
                instance_count: solution.item_counts().get(t.id).copied().unwrap_or(0),
            })
            .collect();

        let patterns = solution
            .patterns
            .iter()
            .map(|p| PatternReport {
                sheet_width: p.pattern.sheet.w,
                sheet_height: p.pattern.sheet.h,
                copy_count: p.copies,
                waste_percent: p.pattern.waste_percent(),
                items: p
                    .pattern
                    .placements
                    .iter()
                    .map(|placement| ItemReport {
                        item_type_id: placement.item_type,
                        x: placement.x,
                        y: placement.y,
                        effective_width: placement.rect.w,
                        effective_height: placement.rect.h,
                        rotated: placement.rotated,
                    })
                    .collect(),
            })
            .collect();

        Self {
            cost: solution.cost,
            per_item_type,
            patterns,
            history: Vec::new(),
            time_ms: 0,
        }
    }
}
