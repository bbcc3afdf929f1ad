//! Job request building and validation
//!
//! Turns a strategy name and raw (textual) parameter values into
//! [`JobParameters`]. Purely local: nothing here touches the network.

use crate::error::ValidationError;
use crate::models::{JobParameters, DEFAULT_STRATEGY};
use std::collections::BTreeMap;

/// Default workload threshold offered by the optimization form
pub const DEFAULT_WORKLOAD_THRESHOLD: f64 = 50.0;

/// Default maximum number of blocks to consider
pub const DEFAULT_MAX_BLOCKS: f64 = 100.0;

/// Builder for validated optimization job parameters
#[derive(Debug, Clone, Default)]
pub struct JobRequestBuilder {
    strategy: Option<String>,
    /// Raw values in insertion order; a later entry for the same name wins
    raw: Vec<(String, String)>,
}

impl JobRequestBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder pre-filled with the standard strategy and parameters
    pub fn with_defaults() -> Self {
        Self::new()
            .strategy(DEFAULT_STRATEGY)
            .numeric_parameter("workload_threshold", DEFAULT_WORKLOAD_THRESHOLD)
            .numeric_parameter("max_blocks", DEFAULT_MAX_BLOCKS)
    }

    /// Set the strategy identifier
    pub fn strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Set a parameter from raw text input
    pub fn parameter(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        let name = name.into();
        self.raw.retain(|(existing, _)| *existing != name);
        self.raw.push((name, raw.into()));
        self
    }

    /// Set a parameter from an already-numeric value
    pub fn numeric_parameter(self, name: impl Into<String>, value: f64) -> Self {
        self.parameter(name, value.to_string())
    }

    /// Validate all inputs and produce the submission payload
    pub fn build(self) -> Result<JobParameters, ValidationError> {
        let strategy = self.strategy.unwrap_or_default();
        build(&strategy, self.raw)
    }
}

/// Validate a strategy and raw parameter values into [`JobParameters`]
///
/// The strategy is only checked for shape; membership in the backend's
/// strategy set is left to the backend.
pub fn build<I, K, V>(strategy: &str, raw_parameters: I) -> Result<JobParameters, ValidationError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<str>,
{
    let strategy = strategy.trim();
    if strategy.is_empty() {
        return Err(ValidationError::new("strategy", "must not be empty"));
    }

    let mut parameters = BTreeMap::new();
    for (name, raw) in raw_parameters {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::new("parameter", "name must not be empty"));
        }
        let value = parse_value(&name, raw.as_ref())?;
        parameters.insert(name, value);
    }

    Ok(JobParameters {
        strategy: strategy.to_string(),
        parameters,
    })
}

fn parse_value(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "value is empty"));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::new(field, format!("not a number: '{}'", trimmed)))?;

    if !value.is_finite() {
        return Err(ValidationError::new(field, "value must be finite"));
    }

    Ok(value)
}

/// Split a `NAME=VALUE` pair as given on the command line
pub fn split_assignment(pair: &str) -> Result<(String, String), ValidationError> {
    match pair.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(ValidationError::new(
            "parameter",
            format!("expected NAME=VALUE, got '{}'", pair),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = JobRequestBuilder::with_defaults().build().unwrap();
        assert_eq!(params.strategy, "cost_efficiency");
        assert_eq!(params.parameters["workload_threshold"], 50.0);
        assert_eq!(params.parameters["max_blocks"], 100.0);
    }

    #[test]
    fn test_build_parses_raw_text() {
        let params = build(
            "cost_efficiency",
            [("workload_threshold", " 75.5 "), ("max_blocks", "20")],
        )
        .unwrap();
        assert_eq!(params.parameters["workload_threshold"], 75.5);
        assert_eq!(params.parameters["max_blocks"], 20.0);
    }

    #[test]
    fn test_empty_value_rejected() {
        let err = build("cost_efficiency", [("max_blocks", "  ")]).unwrap_err();
        assert_eq!(err.field, "max_blocks");
        assert_eq!(err.reason, "value is empty");
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = build("cost_efficiency", [("workload_threshold", "fifty")]).unwrap_err();
        assert_eq!(err.field, "workload_threshold");
        assert!(err.reason.contains("fifty"));
    }

    #[test]
    fn test_non_finite_value_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err = build("cost_efficiency", [("max_blocks", raw)]).unwrap_err();
            assert_eq!(err.field, "max_blocks", "input {raw}");
            assert_eq!(err.reason, "value must be finite");
        }
    }

    #[test]
    fn test_empty_strategy_rejected() {
        let err = JobRequestBuilder::new()
            .parameter("max_blocks", "10")
            .build()
            .unwrap_err();
        assert_eq!(err.field, "strategy");
    }

    #[test]
    fn test_unknown_strategy_is_passed_through() {
        let params = build("latency_first", Vec::<(String, String)>::new()).unwrap();
        assert_eq!(params.strategy, "latency_first");
        assert!(params.parameters.is_empty());
    }

    #[test]
    fn test_later_parameter_overrides_earlier() {
        let params = JobRequestBuilder::with_defaults()
            .parameter("max_blocks", "250")
            .build()
            .unwrap();
        assert_eq!(params.parameters["max_blocks"], 250.0);
        assert_eq!(params.parameters.len(), 2);
    }

    #[test]
    fn test_first_invalid_field_reported() {
        let err = JobRequestBuilder::new()
            .strategy("cost_efficiency")
            .parameter("workload_threshold", "x")
            .parameter("max_blocks", "")
            .build()
            .unwrap_err();
        assert_eq!(err.field, "workload_threshold");
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(
            split_assignment("max_blocks=10").unwrap(),
            ("max_blocks".to_string(), "10".to_string())
        );
        assert!(split_assignment("max_blocks").is_err());
        assert!(split_assignment("=10").is_err());
    }
}
