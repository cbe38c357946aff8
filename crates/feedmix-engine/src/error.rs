use feedmix_solver::{ProblemError, SolutionStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedMixError {
    #[error("Feed catalog is empty")]
    EmptyCatalog,
    #[error("Duplicate feed id: {0}")]
    DuplicateFeed(String),
    #[error("Feed id must not be blank")]
    InvalidFeedId,
    #[error("Invalid unit cost for feed {feed}: {value}")]
    InvalidCost { feed: String, value: f64 },
    #[error("Invalid {nutrient} value for feed {feed}: {value}")]
    InvalidNutrient {
        feed: String,
        nutrient: &'static str,
        value: f64,
    },
    #[error("Invalid {dimension} bound: {value}")]
    InvalidBound { dimension: &'static str, value: f64 },
    #[error("{dimension} minimum {min} exceeds maximum {max}")]
    InvertedBounds {
        dimension: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Invalid body weight: {0}")]
    InvalidWeight(f64),
    #[error("Invalid efficiency policy: {0}")]
    InvalidPolicy(String),
    #[error("Malformed record: {0}")]
    Malformed(String),
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown cattle type: {0}")]
    NotFound(String),
    #[error("Solver rejected the problem: {0}")]
    Solver(#[from] ProblemError),
    #[error("Solver stopped without a result: {0}")]
    SolverFailed(SolutionStatus),
}

impl FeedMixError {
    /// Errors caused by the caller's input rather than a data source or the solver
    pub fn is_invalid_input(&self) -> bool {
        !matches!(
            self,
            FeedMixError::Unavailable(_)
                | FeedMixError::NotFound(_)
                | FeedMixError::Solver(_)
                | FeedMixError::SolverFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedMixError>;
