use nodesel_model::ModelError;
use nodesel_selector::{EvalError, ParseError};
use thiserror::Error;

/// Everything that can go wrong between selector text and a result.
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Selector parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Selector evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("Document error: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid selector options: {0}")]
    Options(#[from] serde_json::Error),
}
