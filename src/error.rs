#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("packing needs more than {limit} patterns")]
    TooManyPatterns { limit: usize },

    #[error("item type {item_type} appears in no pattern but has a non-zero minimum")]
    InfeasibleDemand { item_type: usize },

    #[error("item type {item_type} ({width}x{height}) does not fit the sheet in any orientation")]
    InvalidItemGeometry {
        item_type: usize,
        width: f64,
        height: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("linear program solver failed: {0}")]
    Solver(String),

    #[error("no candidate in the final population could be packed and solved")]
    NoFeasibleSolution,

    #[error("line {line}: {message}")]
    Input { line: usize, message: String },
}

impl Error {
    /// Failures that only invalidate one candidate solution. The search keeps
    /// running and treats the candidate as maximally unfit.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            Error::TooManyPatterns { .. } | Error::InfeasibleDemand { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
