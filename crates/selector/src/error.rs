use std::fmt;
use thiserror::Error;

/// Why the scanner could not produce a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFault {
    UnexpectedCharacter,
    UnterminatedLiteral,
}

impl fmt::Display for ScanFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFault::UnexpectedCharacter => write!(f, "unexpected character"),
            ScanFault::UnterminatedLiteral => write!(f, "unterminated string literal"),
        }
    }
}

/// Failure to turn selector text into an AST. Positions are byte offsets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Scan error at offset {position}: {fault} '{text}'")]
    Scan {
        position: usize,
        fault: ScanFault,
        text: String,
    },

    #[error("Syntax error at offset {position}: expected {expected}, found {found}")]
    Syntax {
        position: usize,
        expected: String,
        found: String,
    },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Scan { position, .. } | ParseError::Syntax { position, .. } => *position,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unknown axis '{axis}' in step '{step}'")]
    UnknownAxis { axis: String, step: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Evaluation exceeded the step budget of {limit}")]
    StepBudgetExceeded { limit: usize },
}

impl EvalError {
    pub fn function(function: &str, message: impl Into<String>) -> Self {
        EvalError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }
}
