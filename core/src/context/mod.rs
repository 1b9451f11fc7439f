#![deny(missing_docs)]

//! # Link Context
//!
//! The evaluation context handed to descriptors while links are resolved.
//! It exposes the `entity`, `instance` and `uri` identifiers (plus any extra
//! ones) to the expression evaluator, expands URI Templates and styles hrefs.
//!
//! - **styler**: the [`StylingResolver`] contract and stock implementations.
//! - **uri**: request URI parameters exposed as the `uri` identifier.

pub mod styler;
pub mod uri;

pub use styler::{BaseUriStyler, LiteralStyler, StylingResolver};
pub use uri::UriParameters;

use crate::error::LinkResult;
use crate::expression::{Bindings, ExpectedType, ExpressionEvaluator};
use crate::template::UriTemplateExpander;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Identifier bound to the root resource.
pub const ENTITY: &str = "entity";

/// Identifier bound to the resource currently being resolved.
pub const INSTANCE: &str = "instance";

/// Identifier bound to the request URI parameters.
pub const URI: &str = "uri";

/// Returns the expression reading `parameter` from the current instance.
pub fn instance_expression(parameter: &str) -> String {
    format!("${{{}.{}}}", INSTANCE, parameter)
}

/// Returns the expression reading `parameter` from the request URI parameters.
pub fn uri_expression(parameter: &str) -> String {
    format!("${{{}.{}}}", URI, parameter)
}

/// How a resolved href is rendered when it is not already absolute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// Scheme, authority and path.
    Absolute,
    /// Path from the application root.
    #[default]
    AbsolutePath,
    /// Path relative to the current resource.
    RelativePath,
}

#[derive(Debug, Clone)]
struct Scope {
    identifiers: Arc<Map<String, Value>>,
    instance: Arc<Value>,
}

impl Bindings for Scope {
    fn get(&self, name: &str) -> Option<&Value> {
        if name == INSTANCE {
            Some(&self.instance)
        } else {
            self.identifiers.get(name)
        }
    }
}

/// Evaluation context for one injection call, scoped to one bean at a time.
#[derive(Clone)]
pub struct LinkContext<'a> {
    evaluator: &'a dyn ExpressionEvaluator,
    expander: &'a UriTemplateExpander,
    styler: &'a dyn StylingResolver,
    scope: Scope,
}

impl<'a> LinkContext<'a> {
    /// Creates a context rooted at `entity`, which is also the first instance.
    pub fn new(
        evaluator: &'a dyn ExpressionEvaluator,
        expander: &'a UriTemplateExpander,
        styler: &'a dyn StylingResolver,
        entity: Value,
    ) -> Self {
        let mut identifiers = Map::new();
        identifiers.insert(ENTITY.to_string(), entity.clone());
        identifiers.insert(URI.to_string(), Value::Object(Map::new()));
        LinkContext {
            evaluator,
            expander,
            styler,
            scope: Scope {
                identifiers: Arc::new(identifiers),
                instance: Arc::new(entity),
            },
        }
    }

    /// Binds the request URI parameters to `uri`.
    pub fn with_uri_parameters(self, parameters: &UriParameters) -> Self {
        self.with_identifier(URI, parameters.to_value())
    }

    /// Binds an extra identifier. `instance` is reserved and cannot be rebound;
    /// `entity` and `uri` are replaced.
    pub fn with_identifier(mut self, name: impl Into<String>, value: Value) -> Self {
        Arc::make_mut(&mut self.scope.identifiers).insert(name.into(), value);
        self
    }

    /// Returns a child context whose `instance` is `bean`.
    pub fn for_bean(&self, bean: Value) -> Self {
        LinkContext {
            scope: Scope {
                identifiers: Arc::clone(&self.scope.identifiers),
                instance: Arc::new(bean),
            },
            ..self.clone()
        }
    }

    /// The current instance snapshot.
    pub fn instance(&self) -> &Value {
        &self.scope.instance
    }

    /// Evaluates `expression` as a condition.
    pub fn evaluate_as_boolean(&self, expression: &str) -> LinkResult<bool> {
        let value = self.evaluate(expression, ExpectedType::Boolean)?;
        Ok(value.as_bool() == Some(true))
    }

    /// Evaluates `expression` as text.
    pub fn evaluate_as_string(&self, expression: &str) -> LinkResult<String> {
        match self.evaluate(expression, ExpectedType::String)? {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    /// Evaluates `expression` without coercion.
    pub fn evaluate_as_object(&self, expression: &str) -> LinkResult<Value> {
        self.evaluate(expression, ExpectedType::Object)
    }

    fn evaluate(&self, expression: &str, expected: ExpectedType) -> LinkResult<Value> {
        Ok(self.evaluator.evaluate(&self.scope, expression, expected)?)
    }

    /// Expands `template`, evaluating each binding expression for its variable.
    pub fn expand(
        &self,
        template: &str,
        bindings: &BTreeMap<String, String>,
        remove_unexpanded: bool,
    ) -> LinkResult<String> {
        let mut values = HashMap::with_capacity(bindings.len());
        for (name, expression) in bindings {
            values.insert(name.clone(), self.evaluate_as_object(expression)?);
        }
        Ok(self.expander.expand(template, &values, remove_unexpanded))
    }

    /// Renders `template` in `style` through the styling resolver.
    pub fn style(&self, style: Style, template: &str) -> String {
        match style {
            Style::Absolute => self.styler.resolve_absolute(template),
            Style::AbsolutePath => self.styler.resolve_absolute_path(template),
            Style::RelativePath => self.styler.resolve_relative_path(template),
        }
    }
}

impl std::fmt::Debug for LinkContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkContext")
            .field("identifiers", &self.scope.identifiers)
            .field("instance", &self.scope.instance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::DefaultEvaluator;
    use serde_json::json;

    fn with_context<R>(entity: Value, f: impl FnOnce(LinkContext<'_>) -> R) -> R {
        let evaluator = DefaultEvaluator::new();
        let expander = UriTemplateExpander::new();
        let styler = BaseUriStyler::parse("http://example.com/api/").unwrap();
        f(LinkContext::new(&evaluator, &expander, &styler, entity))
    }

    #[test]
    fn test_entity_and_instance_start_equal() {
        with_context(json!({ "id": 1 }), |ctx| {
            assert!(ctx.evaluate_as_boolean("${entity.id == instance.id}").unwrap());
        });
    }

    #[test]
    fn test_for_bean_keeps_entity() {
        with_context(json!({ "id": 1 }), |ctx| {
            let child = ctx.for_bean(json!({ "id": 2 }));
            assert_eq!(child.evaluate_as_string("${entity.id}-${instance.id}").unwrap(), "1-2");
            assert_eq!(ctx.evaluate_as_object("${instance.id}").unwrap(), json!(1));
        });
    }

    #[test]
    fn test_uri_parameters_and_identifiers() {
        with_context(json!({}), |ctx| {
            let params = UriParameters::new().with_query_param("page", "3");
            let ctx = ctx
                .with_uri_parameters(&params)
                .with_identifier("tenant", json!("acme"));
            assert_eq!(ctx.evaluate_as_string("${tenant}/${uri.page}").unwrap(), "acme/3");
        });
    }

    #[test]
    fn test_expand_evaluates_bindings() {
        with_context(json!({ "id": 42 }), |ctx| {
            let mut bindings = BTreeMap::new();
            bindings.insert("id".to_string(), instance_expression("id"));
            bindings.insert("page".to_string(), uri_expression("page"));
            assert_eq!(
                ctx.expand("/orders/{id}{?page}", &bindings, true).unwrap(),
                "/orders/42"
            );
            assert_eq!(
                ctx.expand("/orders/{id}{?page}", &bindings, false).unwrap(),
                "/orders/42{?page}"
            );
        });
    }

    #[test]
    fn test_style_dispatch() {
        with_context(json!({}), |ctx| {
            assert_eq!(ctx.style(Style::Absolute, "/orders"), "http://example.com/api/orders");
            assert_eq!(ctx.style(Style::AbsolutePath, "orders"), "/api/orders");
            assert_eq!(ctx.style(Style::RelativePath, "/orders"), "orders");
        });
    }

    #[test]
    fn test_binding_expressions() {
        assert_eq!(instance_expression("id"), "${instance.id}");
        assert_eq!(uri_expression("page"), "${uri.page}");
    }
}
