//! # Error Handling
//!
//! Provides the unified `LinkError` enum used across the crate.
//!
//! Declaration problems surface once, when a type's injection plan is first
//! compiled. Evaluation and attribute access problems surface per injection call.

use crate::expression::EvaluationError;
use crate::resource::AccessError;
use derive_more::{Display, From};

/// The Global Error Enum.
///
/// Only the collaborator errors convert implicitly; every other variant is
/// constructed where the problem is detected.
#[derive(Debug, Display, From)]
pub enum LinkError {
    /// A declaration value or combination of values is illegal.
    #[display("Invalid declaration: {_0}")]
    InvalidDeclaration(String),

    /// The same rel was declared twice on one type.
    #[display("Duplicate rel found: '{rel}', on {owner}")]
    DuplicateRel {
        /// The duplicated rel.
        rel: String,
        /// The declaring type.
        owner: String,
    },

    /// Two curies of one root resource share a name.
    #[display("Duplicate curie name found: '{name}', on {owner}")]
    DuplicateCurie {
        /// The duplicated curie name.
        name: String,
        /// The declaring type.
        owner: String,
    },

    /// The default rel appeared after the first entry of a link group.
    #[display("self rel MUST be declared first when grouping links, on {owner}")]
    RelOrder {
        /// The declaring type.
        owner: String,
    },

    /// A rel used a curie prefix that has not been registered.
    #[display("No '{curie}' curie registered, cannot create Link for rel: {rel}")]
    MissingCurie {
        /// The missing curie name.
        curie: String,
        /// The offending rel.
        rel: String,
    },

    /// A specification was placed on an attribute of the wrong kind.
    #[display("Attribute '{attribute}' on {owner} must be of type: {expected}, got: {found}")]
    TypeMismatch {
        /// The attribute name.
        attribute: String,
        /// The declaring type.
        owner: String,
        /// The attribute kind the specification requires.
        expected: String,
        /// The attribute kind actually declared.
        found: String,
    },

    /// Template builder input was not a valid path.
    #[display("Not a valid path: {_0}")]
    InvalidPath(String),

    /// Template builder input was not a valid query parameter.
    #[display("Not a valid template query param: {_0}")]
    InvalidQueryParam(String),

    /// A resource reference could not be mapped to a route.
    #[display("Unknown resource: {_0}")]
    UnknownResource(String),

    /// A route table could not be decoded.
    #[display("Route table error: {_0}")]
    Routes(String),

    /// Expression evaluation failed.
    #[from]
    #[display("{_0}")]
    Evaluation(EvaluationError),

    /// Reading or writing an attribute failed.
    #[from]
    #[display("{_0}")]
    Access(AccessError),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for LinkError {}

/// Helper type alias for Result using LinkError.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_conversion() {
        let err: LinkError = EvaluationError::new("${x +}", "unexpected end").into();
        assert!(matches!(err, LinkError::Evaluation(_)));
    }

    #[test]
    fn test_missing_curie_message() {
        let err = LinkError::MissingCurie {
            curie: "docs".into(),
            rel: "docs:item".into(),
        };
        assert_eq!(
            err.to_string(),
            "No 'docs' curie registered, cannot create Link for rel: docs:item"
        );
    }

    #[test]
    fn test_duplicate_rel_message() {
        let err = LinkError::DuplicateRel {
            rel: "orders".into(),
            owner: "Customer".into(),
        };
        assert_eq!(err.to_string(), "Duplicate rel found: 'orders', on Customer");
    }
}
