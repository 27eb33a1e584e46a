use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, GeneticConfig};
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::solution::Solution;
use crate::types::ItemType;

/// Emitted after every generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub generation: usize,
    pub best_cost: f64,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub best: Solution,
    /// Best cost after each generation.
    pub history: Vec<f64>,
    pub elapsed: Duration,
}

/// Genetic search over item-quantity vectors.
pub struct Solver {
    genetic: GeneticConfig,
    evaluator: Evaluator,
    rng: SmallRng,
}

impl Solver {
    /// Validates `config` and seeds the generator from `genetic.seed`, or from
    /// OS entropy when no seed is given.
    pub fn new(config: &Config) -> Result<Self> {
        let seed = config.genetic.seed.unwrap_or_else(rand::random);
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: &Config, rng: SmallRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            genetic: config.genetic.clone(),
            evaluator: Evaluator::new(config),
            rng,
        })
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn solve(&mut self) -> Result<Outcome> {
        self.solve_with_progress(|_| {})
    }

    /// Runs every configured generation and returns the cheapest solution of
    /// the final population.
    pub fn solve_with_progress<F>(&mut self, mut on_progress: F) -> Result<Outcome>
    where
        F: FnMut(Progress),
    {
        let start = Instant::now();
        info!(
            item_types = self.evaluator.item_types().len(),
            population = self.genetic.population_size,
            generations = self.genetic.generation_count,
            "starting search"
        );

        let mut population = self.initial_population()?;
        let mut history = Vec::with_capacity(self.genetic.generation_count);

        for generation in 0..self.genetic.generation_count {
            population = self.next_generation(population, generation)?;
            let best_cost = best_of(&population).map_or(f64::INFINITY, |s| s.cost);
            history.push(best_cost);
            info!(generation, best_cost, population = population.len(), "generation complete");
            on_progress(Progress {
                generation,
                best_cost,
            });
        }

        let best = take_best(population).ok_or(Error::NoFeasibleSolution)?;
        if !best.is_feasible() {
            return Err(Error::NoFeasibleSolution);
        }
        let elapsed = start.elapsed();
        info!(cost = best.cost, patterns = best.patterns.len(), ?elapsed, "search finished");
        Ok(Outcome {
            best,
            history,
            elapsed,
        })
    }

    /// The evaluated starting solution: item counts proportional to demand.
    pub fn first_solution(&self) -> Result<Solution> {
        let mut solution = Solution::from_counts(&seed_counts(self.evaluator.item_types()));
        self.evaluator.evaluate(&mut solution)?;
        Ok(solution)
    }

    /// Same counts as `of`, one mutation step away, evaluated.
    fn neighbour(&mut self, of: &Solution) -> Result<Solution> {
        let mut solution = Solution::from_counts(of.item_counts());
        solution.mutate(&mut self.rng);
        self.evaluator.evaluate(&mut solution)?;
        Ok(solution)
    }

    /// A chain of neighbours starting from the first solution.
    pub fn initial_population(&mut self) -> Result<Vec<Solution>> {
        let size = self.genetic.population_size;
        let mut population = Vec::with_capacity(size);
        population.push(self.first_solution()?);
        while population.len() < size {
            let next = self.neighbour(&population[population.len() - 1])?;
            population.push(next);
        }
        Ok(population)
    }

    /// Selection, then crossover, then mutation.
    pub fn next_generation(
        &mut self,
        population: Vec<Solution>,
        generation: usize,
    ) -> Result<Vec<Solution>> {
        let selected = self.select(population, generation);
        let crossed = self.cross_over(selected)?;
        self.mutate_population(crossed)
    }

    /// Roulette-wheel selection without replacement. Survivors keep the order in
    /// which they were drawn and are tagged with `generation`.
    pub fn select(&mut self, population: Vec<Solution>, generation: usize) -> Vec<Solution> {
        if population.is_empty() {
            return population;
        }
        let target = ((population.len() as f64 * self.genetic.selection_fraction).round()
            as usize)
            .clamp(1, population.len());

        let mut wheel = RouletteWheel::new(&population);
        let order: Vec<usize> = (0..target)
            .filter_map(|_| wheel.spin(&mut self.rng))
            .collect();

        let mut slots: Vec<Option<Solution>> = population.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .map(|mut solution| {
                solution.selected_in = Some(generation);
                solution
            })
            .collect()
    }

    /// Breeds single-point crossover children from random pairs of distinct
    /// parents and appends them, evaluated, to the population.
    pub fn cross_over(&mut self, mut population: Vec<Solution>) -> Result<Vec<Solution>> {
        let parents = population.len();
        if parents < 2 {
            return Ok(population);
        }
        let fraction = self.genetic.selection_fraction;
        let pairs = (parents as f64 / fraction * (1.0 - fraction) / 2.0).round() as usize;
        let type_count = self.evaluator.item_types().len();
        let max_cut = type_count.saturating_sub(2).max(1);

        let mut children = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            let first = self.rng.random_range(0..parents);
            let second = loop {
                let index = self.rng.random_range(0..parents);
                if index != first {
                    break index;
                }
            };
            let cut = self.rng.random_range(1..=max_cut);
            let swap_before = self.rng.random_bool(0.5);
            let (a, b) = crossover_counts(
                population[first].item_counts(),
                population[second].item_counts(),
                cut,
                swap_before,
            );
            children.push(Solution::from_counts(&a));
            children.push(Solution::from_counts(&b));
        }

        for child in &mut children {
            self.evaluator.evaluate(child)?;
        }
        debug!(parents, children = children.len(), "crossover done");
        population.extend(children);
        Ok(population)
    }

    /// Mutates each solution with the configured probability and re-scores it.
    pub fn mutate_population(&mut self, mut population: Vec<Solution>) -> Result<Vec<Solution>> {
        for solution in &mut population {
            if self.rng.random::<f64>() < self.genetic.mutation_probability {
                solution.mutate(&mut self.rng);
                self.evaluator.evaluate(solution)?;
            }
        }
        Ok(population)
    }
}

/// Initial count per type: twice the type's share of total demand, scaled by
/// the number of types, never below one.
pub fn seed_counts(item_types: &[ItemType]) -> Vec<u32> {
    let total: f64 = item_types.iter().map(|t| t.min_count as f64).sum();
    let type_count = item_types.len() as f64;
    item_types
        .iter()
        .map(|t| {
            if total == 0.0 {
                return 1;
            }
            let count = (t.min_count as f64 / total * type_count * 2.0).round();
            (count as u32).max(1)
        })
        .collect()
}

/// Swaps the counts before `cut` (or from `cut` on) between two parents.
pub fn crossover_counts(
    first: &[u32],
    second: &[u32],
    cut: usize,
    swap_before: bool,
) -> (Vec<u32>, Vec<u32>) {
    first
        .iter()
        .zip(second)
        .enumerate()
        .map(|(i, (&a, &b))| {
            if (i < cut) == swap_before {
                (b, a)
            } else {
                (a, b)
            }
        })
        .unzip()
}

/// Cheapest solution, first one on ties.
pub fn best_of(population: &[Solution]) -> Option<&Solution> {
    population
        .iter()
        .reduce(|best, s| if s.cost < best.cost { s } else { best })
}

fn take_best(population: Vec<Solution>) -> Option<Solution> {
    population
        .into_iter()
        .reduce(|best, s| if s.cost < best.cost { s } else { best })
}

/// Selection weights `max_cost - cost + 1`, so the most expensive feasible
/// solution still has weight 1. Rejected candidates weigh nothing.
struct RouletteWheel {
    weights: Vec<f64>,
    taken: Vec<bool>,
    pool: f64,
}

impl RouletteWheel {
    fn new(population: &[Solution]) -> Self {
        let max_cost = population
            .iter()
            .filter(|s| s.cost.is_finite())
            .map(|s| s.cost)
            .fold(0.0, f64::max);
        let weights: Vec<f64> = population
            .iter()
            .map(|s| {
                if s.cost.is_finite() {
                    max_cost - s.cost + 1.0
                } else {
                    0.0
                }
            })
            .collect();
        let pool = weights.iter().sum();
        Self {
            taken: vec![false; weights.len()],
            weights,
            pool,
        }
    }

    fn remaining_weight(&self) -> f64 {
        self.pool
    }

    /// Draws one index not taken yet, or `None` once everything is taken.
    fn spin<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let die = if self.pool > 0.0 {
            rng.random_range(0.0..self.pool)
        } else {
            0.0
        };

        let mut cumulative = 0.0;
        let mut pick = None;
        for (i, &weight) in self.weights.iter().enumerate() {
            if self.taken[i] {
                continue;
            }
            cumulative += weight;
            // Rounding can leave the die just past the last slice; the last
            // untaken index catches it.
            pick = Some(i);
            if cumulative >= die {
                break;
            }
        }

        let i = pick?;
        self.taken[i] = true;
        self.pool = (self.pool - self.weights[i]).max(0.0);
        Some(i)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::config::ItemTypeConfig;
    use crate::types::ItemInstance;

    fn config(sheet: (f64, f64), items: &[(f64, f64, u32)]) -> Config {
        let mut config = Config {
            item_types: items
                .iter()
                .map(|&(width, height, min_count)| ItemTypeConfig {
                    width,
                    height,
                    min_count,
                })
                .collect(),
            ..Config::default()
        };
        config.sheet.width = sheet.0;
        config.sheet.height = sheet.1;
        config.sheet.max_pattern_count = 10;
        config.sheet.base_cost = 10.0;
        config.sheet.per_copy_cost = 1.0;
        config.genetic.population_size = 20;
        config.genetic.generation_count = 10;
        config.genetic.seed = Some(17);
        config
    }

    fn mixed_config() -> Config {
        config(
            (100.0, 40.0),
            &[(10.0, 20.0, 40), (30.0, 15.0, 12), (45.0, 40.0, 5), (20.0, 20.0, 9)],
        )
    }

    fn with_cost(cost: f64) -> Solution {
        let mut solution = Solution::from_counts(&[1]);
        solution.cost = cost;
        solution
    }

    #[test]
    fn test_seed_counts() {
        let types = mixed_config().item_types();
        // Total demand 66 over 4 types: 40/66*8 = 4.85, 12/66*8 = 1.45, 5/66*8 = 0.61, 9/66*8 = 1.09.
        assert_eq!(seed_counts(&types), vec![5, 1, 1, 1]);

        let single = config((100.0, 40.0), &[(10.0, 20.0, 20)]).item_types();
        assert_eq!(seed_counts(&single), vec![2]);

        let zero = config((100.0, 40.0), &[(10.0, 20.0, 0), (5.0, 5.0, 0)]).item_types();
        assert_eq!(seed_counts(&zero), vec![1, 1]);
    }

    #[test]
    fn test_crossover_counts() {
        let a = [1, 2, 3, 4];
        let b = [10, 20, 30, 40];
        assert_eq!(
            crossover_counts(&a, &b, 2, true),
            (vec![10, 20, 3, 4], vec![1, 2, 30, 40])
        );
        assert_eq!(
            crossover_counts(&a, &b, 1, false),
            (vec![1, 20, 30, 40], vec![10, 2, 3, 4])
        );
    }

    #[test]
    fn test_best_of_prefers_first_on_ties() {
        let population = vec![with_cost(5.0), with_cost(3.0), with_cost(3.0)];
        let best = best_of(&population).unwrap();
        assert!(std::ptr::eq(best, &population[1]));
        assert!(best_of(&[]).is_none());
    }

    #[test]
    fn test_initial_population() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        let population = solver.initial_population().unwrap();
        assert_eq!(population.len(), 20);
        assert_eq!(population[0].item_counts(), &[5, 1, 1, 1]);
        for pair in population.windows(2) {
            let (prev, next) = (pair[0].item_counts(), pair[1].item_counts());
            let diff: u32 = prev.iter().zip(next).map(|(a, b)| a.abs_diff(*b)).sum();
            assert_eq!(diff, 1, "neighbours differ by exactly one instance");
        }
        for solution in &population {
            assert!(solution.counts_consistent());
            assert!(solution.is_feasible());
        }
    }

    #[test]
    fn test_selection_is_without_replacement() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        let population = solver.initial_population().unwrap();
        // Each solution owns its own instance buffer, so its address identifies it.
        let slots: HashSet<*const ItemInstance> =
            population.iter().map(|s| s.items().as_ptr()).collect();

        let selected = solver.select(population, 4);
        assert_eq!(selected.len(), 10);
        assert!(selected.iter().all(|s| s.selected_in == Some(4)));

        let picked: HashSet<*const ItemInstance> =
            selected.iter().map(|s| s.items().as_ptr()).collect();
        assert_eq!(picked.len(), 10, "a solution was selected twice");
        assert!(picked.is_subset(&slots));
    }

    #[test]
    fn test_selection_favours_cheap_solutions() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        let mut cheap_wins = 0;
        for generation in 0..200 {
            let population = vec![with_cost(100.0), with_cost(1.0)];
            let selected = solver.select(population, generation);
            assert_eq!(selected.len(), 1);
            if selected[0].cost == 1.0 {
                cheap_wins += 1;
            }
        }
        // Weights 1 and 100.
        assert!(cheap_wins > 180, "cheap solution won {cheap_wins} of 200");
    }

    #[test]
    fn test_rejected_candidates_are_never_preferred() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        for generation in 0..100 {
            let population = vec![with_cost(f64::INFINITY), with_cost(7.0)];
            let selected = solver.select(population, generation);
            assert_eq!(selected[0].cost, 7.0);
        }
    }

    #[test]
    fn test_weight_pool_is_conserved() {
        // Deliberate deviation: the pool shrinks by the drawn weight, not by
        // the drawn solution's cost, so it always equals the untaken weights.
        let population: Vec<Solution> = [4.0, 9.0, 2.0, 30.0, 11.0]
            .into_iter()
            .map(with_cost)
            .collect();
        let mut wheel = RouletteWheel::new(&population);
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(wheel.remaining_weight(), 27.0 + 22.0 + 29.0 + 1.0 + 20.0);
        for _ in 0..population.len() {
            wheel.spin(&mut rng).unwrap();
            let untaken: f64 = (0..population.len())
                .filter(|&i| !wheel.taken[i])
                .map(|i| wheel.weights[i])
                .sum();
            assert!((wheel.remaining_weight() - untaken).abs() < 1e-9);
        }
        assert_eq!(wheel.spin(&mut rng), None);
    }

    #[test]
    fn test_crossover_fills_population() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        let population = solver.initial_population().unwrap();
        let selected = solver.select(population, 0);
        assert_eq!(selected.len(), 10);
        let crossed = solver.cross_over(selected).unwrap();
        // round(10 / 0.5 * 0.5 / 2) = 5 pairs.
        assert_eq!(crossed.len(), 20);
        for child in &crossed[10..] {
            assert!(child.counts_consistent());
            assert!(child.item_counts().iter().all(|&c| c >= 1));
            assert!(child.is_feasible());
            assert_eq!(child.selected_in, None);
        }
    }

    #[test]
    fn test_crossover_needs_two_parents() {
        let mut solver = Solver::new(&mixed_config()).unwrap();
        let single = vec![solver.first_solution().unwrap()];
        assert_eq!(solver.cross_over(single).unwrap().len(), 1);
    }

    #[test]
    fn test_full_run_keeps_invariants() {
        let mut config = mixed_config();
        config.genetic.mutation_probability = 0.5;
        let mut solver = Solver::new(&config).unwrap();
        let mut progress = Vec::new();
        let outcome = solver.solve_with_progress(|p| progress.push(p)).unwrap();

        assert_eq!(progress.len(), 10);
        assert_eq!(outcome.history.len(), 10);
        for (i, p) in progress.iter().enumerate() {
            assert_eq!(p.generation, i);
            assert_eq!(p.best_cost, outcome.history[i]);
        }
        let best = &outcome.best;
        assert!(best.is_feasible());
        assert!(best.counts_consistent());
        assert_eq!(best.cost, *outcome.history.last().unwrap());
        assert_eq!(best.cost, solver.evaluator().cost_of(&best.patterns));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = mixed_config();
        let first = Solver::new(&config).unwrap().solve().unwrap();
        let second = Solver::new(&config).unwrap().solve().unwrap();
        assert_eq!(first.history, second.history);
        assert_eq!(first.best.item_counts(), second.best.item_counts());
    }

    #[test]
    fn test_single_type_sheet_scenario() {
        let mut config = config((100.0, 40.0), &[(10.0, 20.0, 20)]);
        config.genetic.generation_count = 15;
        let outcome = Solver::new(&config).unwrap().solve().unwrap();
        let best = &outcome.best;

        let expected: f64 = best.patterns.iter().map(|p| 10.0 + 1.0 * p.copies).sum();
        assert_eq!(best.cost, expected);
        let produced: f64 = best
            .patterns
            .iter()
            .map(|p| p.occurrence(0) as f64 * p.copies)
            .sum();
        assert!(produced + 1e-6 >= 20.0);
        // A full sheet holds 20 pieces, so at least one base cost and one copy.
        assert!(best.cost >= 11.0 - 1e-6);
    }

    #[test]
    fn test_degenerate_run_matches_seed() {
        let mut config = mixed_config();
        config.genetic.population_size = 1;
        config.genetic.generation_count = 1;
        config.genetic.mutation_probability = 0.0;
        config.genetic.selection_fraction = 0.1;

        let mut solver = Solver::new(&config).unwrap();
        let seeded = solver.first_solution().unwrap();
        let outcome = solver.solve().unwrap();
        assert_eq!(outcome.best.cost, seeded.cost);
        assert_eq!(outcome.best.item_counts(), seeded.item_counts());
        assert_eq!(outcome.best.selected_in, Some(0));
    }

    #[test]
    fn test_no_feasible_solution() {
        let mut config = config((60.0, 60.0), &[(60.0, 60.0, 5), (50.0, 50.0, 5)]);
        config.sheet.max_pattern_count = 1;
        config.genetic.population_size = 4;
        config.genetic.generation_count = 2;
        config.genetic.mutation_probability = 0.0;
        let err = Solver::new(&config).unwrap().solve().unwrap_err();
        assert_eq!(err, Error::NoFeasibleSolution);
    }

    #[test]
    fn test_invalid_geometry_aborts_before_search() {
        let config = config((100.0, 40.0), &[(10.0, 20.0, 3), (50.0, 120.0, 1)]);
        assert!(matches!(
            Solver::new(&config),
            Err(Error::InvalidItemGeometry { item_type: 1, .. })
        ));
    }
}
