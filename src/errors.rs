use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeatLoadError {
    #[error("Project input was considered invalid due to error: {0}")]
    InvalidInput(#[from] serde_json::Error),
    #[error("Requested reference table does not exist: {0}")]
    UnknownTable(String),
    #[error("Error identified during heat load calculation: {0}")]
    FailureInCalculation(#[from] CalculationError),
    #[error("Error while writing calculation results: {0}")]
    FailureInOutput(anyhow::Error),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct CalculationError {
    error: anyhow::Error,
}

impl CalculationError {
    pub(crate) fn new(error: anyhow::Error) -> Self {
        Self { error }
    }
}
