#![deny(missing_docs)]

//! # HAL Links Core
//!
//! Declarative HAL link and curie resolution. Resource types declare which
//! attributes hold links, curies and embedded resources; a [`LinkInjector`]
//! compiles those declarations once per type and fills the attributes of each
//! instance, evaluating `${...}` expressions, expanding RFC 6570 URI Templates
//! and styling the resulting hrefs.

/// Shared error types.
pub mod error;

/// Link, curie and embedded resource values.
pub mod link;

/// URI Template grammar, expansion and building.
pub mod template;

/// Expression evaluation.
pub mod expression;

/// Evaluation context and href styling.
pub mod context;

/// Link and curie declarations.
pub mod declare;

/// Link template factories and route tables.
pub mod routes;

/// Compiled link and curie descriptors.
pub mod descriptor;

/// Resource type declarations and attribute access.
pub mod resource;

/// Link injection.
pub mod inject;

pub use context::{BaseUriStyler, LinkContext, LiteralStyler, Style, StylingResolver, UriParameters};
pub use declare::{Binding, BindingOption, CurieDef, CurieDefs, LinkRel, LinkRels};
pub use descriptor::{CurieDescriptor, CurieDescriptors, HrefTemplate, LinkDescriptor};
pub use error::{LinkError, LinkResult};
pub use expression::{DefaultEvaluator, ExpressionEvaluator};
pub use inject::{LinkInjector, LinkInjectorBuilder};
pub use link::{Curie, Embedded, Link};
pub use resource::{Attribute, AttributeKind, Resource, TypeDeclaration};
pub use routes::{LinkTemplateFactory, LiteralLinkTemplateFactory, RouteTemplateFactory};
pub use template::{UriTemplateBuilder, UriTemplateExpander, UriValueResolver, ValueKind};
