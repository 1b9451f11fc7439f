#![deny(missing_docs)]

//! # Expression Evaluation
//!
//! The evaluator contract used to resolve `${...}` expressions in link
//! templates, conditions and bindings, plus a default implementation.
//!
//! - **parser**: splits composite expressions and builds expression trees.
//! - **eval**: [`DefaultEvaluator`], an EL-style interpreter over JSON values.

pub mod eval;
pub mod parser;

pub use eval::DefaultEvaluator;

use derive_more::Display;
use serde_json::Value;

/// Named values an expression may reference, e.g. `entity`, `instance`, `uri`.
pub trait Bindings {
    /// Returns the value bound to the top-level identifier `name`.
    fn get(&self, name: &str) -> Option<&Value>;
}

impl Bindings for serde_json::Map<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        serde_json::Map::get(self, name)
    }
}

/// The type an expression result is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedType {
    /// Coerced to `Value::Bool`.
    Boolean,
    /// Coerced to `Value::String`.
    String,
    /// Returned as evaluated.
    Object,
}

/// Failure to parse or evaluate an expression.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("Could not evaluate expression '{expression}': {message}")]
pub struct EvaluationError {
    expression: String,
    message: String,
}

impl EvaluationError {
    /// Creates an error for `expression`.
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        EvaluationError {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// The expression that failed.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// What went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for EvaluationError {}

/// Evaluates expressions against named bindings.
///
/// Implementations must be usable from several threads at once.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression` against `bindings`, coercing to `expected`.
    fn evaluate(
        &self,
        bindings: &dyn Bindings,
        expression: &str,
        expected: ExpectedType,
    ) -> Result<Value, EvaluationError>;
}
