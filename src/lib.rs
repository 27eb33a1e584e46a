//! Cutting-stock optimization with guillotine patterns.
//!
//! A genetic search over item-quantity vectors. Each candidate is packed into
//! sheet patterns by a guillotine heuristic, then a linear program picks how
//! many copies of each pattern to cut so that every item demand is met.

pub mod config;
pub mod copies;
pub mod error;
pub mod evaluator;
pub mod guillotine;
pub mod input;
pub mod render;
pub mod report;
pub mod solution;
pub mod solver;
pub mod types;

pub use error::{Error, Result};
