use nodesel_selector::EvaluationOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectorOptions {
    /// Whether referencing a variable that was not bound is an error. When
    /// off, unbound variables read as the empty string.
    ///
    /// Defaults to `false`.
    pub strict_variables: bool,

    /// The maximum number of nodes axis traversal may produce in a single
    /// evaluation before it is aborted with `StepBudgetExceeded`.
    ///
    /// - **`None`**: no limit; evaluation cost is bounded by the tree size.
    /// - **`Some(n)`**: a guard for hosts evaluating untrusted selectors.
    ///
    /// Defaults to `None`.
    pub max_steps: Option<usize>,

    /// The maximum number of compiled selectors kept by a `SelectorEngine`.
    /// The cache is emptied when it grows past this size; `0` disables it.
    ///
    /// Defaults to `1024`.
    pub cache_capacity: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            strict_variables: false,
            max_steps: None,
            cache_capacity: 1024,
        }
    }
}

impl SelectorOptions {
    /// Reads options from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn evaluation_options(&self) -> EvaluationOptions {
        EvaluationOptions {
            strict: self.strict_variables,
            max_steps: self.max_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = SelectorOptions::from_json(r#"{ "maxSteps": 500 }"#).unwrap();
        assert_eq!(options.max_steps, Some(500));
        assert!(!options.strict_variables);
        assert_eq!(options.cache_capacity, 1024);
    }

    #[test]
    fn test_evaluation_options() {
        let options = SelectorOptions {
            strict_variables: true,
            ..Default::default()
        };
        let eval = options.evaluation_options();
        assert!(eval.strict);
        assert_eq!(eval.max_steps, None);
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(SelectorOptions::from_json(r#"{ "maxSteps": "lots" }"#).is_err());
    }
}
