#![deny(missing_docs)]

//! # Descriptors
//!
//! Compiled, immutable resolution plans for links and curies.
//!
//! - **factory**: compiles declarations into descriptors.
//! - **provider**: resolves descriptors against a [`LinkContext`].

pub mod factory;
pub mod provider;

pub use factory::{DeclaringType, LinkDescriptorFactory};
pub use provider::LinkProvider;

use crate::context::{LinkContext, Style};
use crate::error::LinkResult;
use crate::link::{Curie, Link};
use crate::template::{contains_expressions, is_absolute, is_templated};
use std::collections::BTreeMap;
use tracing::trace;

/// A resolved href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href {
    /// The final href.
    pub value: String,
    /// Whether some template variable was left unexpanded.
    pub templated: bool,
}

/// An href template with its style, bindings and expansion policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HrefTemplate {
    value: String,
    style: Style,
    contains_expressions: bool,
    contains_variables: bool,
    bindings: BTreeMap<String, String>,
    remove_unexpanded: bool,
}

impl HrefTemplate {
    /// A template without bindings that keeps unexpanded variables.
    pub fn new(value: impl Into<String>, style: Style) -> Self {
        Self::with_bindings(value, style, BTreeMap::new(), false)
    }

    /// A template with variable bindings (name to expression).
    pub fn with_bindings(
        value: impl Into<String>,
        style: Style,
        bindings: BTreeMap<String, String>,
        remove_unexpanded: bool,
    ) -> Self {
        let value = value.into();
        HrefTemplate {
            contains_expressions: contains_expressions(&value),
            contains_variables: is_templated(&value),
            value,
            style,
            bindings,
            remove_unexpanded,
        }
    }

    /// The raw template.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The style applied to non-absolute results.
    pub fn style(&self) -> Style {
        self.style
    }

    /// Variable bindings, name to expression.
    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    /// Whether unexpanded variables are dropped.
    pub fn remove_unexpanded(&self) -> bool {
        self.remove_unexpanded
    }

    /// Resolves the template: evaluates `${...}` expressions, expands
    /// variables, then styles the result unless it is absolute.
    pub fn resolve(&self, context: &LinkContext<'_>) -> LinkResult<Href> {
        let mut template = if self.contains_expressions {
            context.evaluate_as_string(&self.value)?
        } else {
            self.value.clone()
        };

        let mut templated = false;
        if self.contains_variables || (self.contains_expressions && is_templated(&template)) {
            template = context.expand(&template, &self.bindings, self.remove_unexpanded)?;
            templated = is_templated(&template);
        }

        if !is_absolute(&template) {
            template = context.style(self.style, &template);
        }

        Ok(Href {
            value: template,
            templated,
        })
    }
}

/// Compiled plan for one [`Link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDescriptor {
    rel: String,
    href: HrefTemplate,
    media_type: Option<String>,
    deprecation: Option<String>,
    name: Option<String>,
    profile: Option<String>,
    title: Option<String>,
    hreflang: Option<String>,
    condition: Option<String>,
    curie: Option<String>,
}

impl LinkDescriptor {
    /// The rel.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The href template.
    pub fn href(&self) -> &HrefTemplate {
        &self.href
    }

    /// The condition expression, if any.
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    /// The curie prefix of the rel, if any.
    pub fn curie(&self) -> Option<&str> {
        self.curie.as_deref()
    }

    /// Resolves the link, or `None` when the condition is false.
    pub fn to_link(&self, context: &LinkContext<'_>) -> LinkResult<Option<Link>> {
        if let Some(condition) = &self.condition {
            if !context.evaluate_as_boolean(condition)? {
                trace!(rel = %self.rel, condition = %condition, "condition false, link skipped");
                return Ok(None);
            }
        }
        let href = self.href.resolve(context)?;
        trace!(rel = %self.rel, href = %href.value, templated = href.templated, "link resolved");
        Link::builder()
            .rel(self.rel.clone())
            .href(href.value)
            .templated(href.templated)
            .media_type(self.media_type.clone())
            .deprecation(self.deprecation.clone())
            .name(self.name.clone())
            .profile(self.profile.clone())
            .title(self.title.clone())
            .hreflang(self.hreflang.clone())
            .build()
            .map(Some)
    }
}

/// Compiled plan for one [`Curie`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurieDescriptor {
    name: String,
    href: HrefTemplate,
}

impl CurieDescriptor {
    /// Creates a curie descriptor.
    pub fn new(name: impl Into<String>, href: HrefTemplate) -> Self {
        CurieDescriptor {
            name: name.into(),
            href,
        }
    }

    /// The curie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The href template.
    pub fn href(&self) -> &HrefTemplate {
        &self.href
    }

    /// Resolves the curie.
    pub fn to_curie(&self, context: &LinkContext<'_>) -> LinkResult<Curie> {
        let href = self.href.resolve(context)?;
        Curie::new(self.name.clone(), href.value)
    }
}

/// Curie descriptors keyed by name.
///
/// Built from an ordered list where a later descriptor replaces an earlier one
/// of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CurieDescriptors {
    descriptors: BTreeMap<String, CurieDescriptor>,
}

impl CurieDescriptors {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a curie by name.
    pub fn get(&self, name: &str) -> Option<&CurieDescriptor> {
        self.descriptors.get(name)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Returns `true` if no curie is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The number of registered curies.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Iterates the descriptors in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CurieDescriptor> {
        self.descriptors.values()
    }
}

impl FromIterator<CurieDescriptor> for CurieDescriptors {
    fn from_iter<I: IntoIterator<Item = CurieDescriptor>>(iter: I) -> Self {
        CurieDescriptors {
            descriptors: iter
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BaseUriStyler, LiteralStyler, StylingResolver};
    use crate::expression::DefaultEvaluator;
    use crate::template::UriTemplateExpander;
    use serde_json::{json, Value};

    fn resolve(template: &HrefTemplate, styler: &dyn StylingResolver, entity: Value) -> Href {
        let evaluator = DefaultEvaluator::new();
        let expander = UriTemplateExpander::new();
        let context = LinkContext::new(&evaluator, &expander, styler, entity);
        template.resolve(&context).unwrap()
    }

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_template_only_styled() {
        let styler = BaseUriStyler::parse("http://example.com/api/").unwrap();
        let href = resolve(&HrefTemplate::new("/orders", Style::AbsolutePath), &styler, json!({}));
        assert_eq!(href, Href { value: "/api/orders".into(), templated: false });

        let href = resolve(
            &HrefTemplate::new("http://other.com/x", Style::AbsolutePath),
            &styler,
            json!({}),
        );
        assert_eq!(href.value, "http://other.com/x");
    }

    #[test]
    fn test_expressions_then_variables() {
        let template = HrefTemplate::with_bindings(
            "/customers/${instance.customer}/orders/{id}",
            Style::AbsolutePath,
            bindings(&[("id", "${instance.id}")]),
            true,
        );
        let href = resolve(&template, &LiteralStyler, json!({ "customer": "c1", "id": 5 }));
        assert_eq!(href, Href { value: "/customers/c1/orders/5".into(), templated: false });
    }

    #[test]
    fn test_retained_variable_stays_templated() {
        let template = HrefTemplate::with_bindings(
            "/orders{?page}",
            Style::AbsolutePath,
            bindings(&[("page", "${uri.page}")]),
            false,
        );
        let href = resolve(&template, &LiteralStyler, json!({}));
        assert_eq!(href, Href { value: "/orders{?page}".into(), templated: true });
    }

    #[test]
    fn test_removed_variable_is_not_templated() {
        let template = HrefTemplate::with_bindings(
            "/orders{?page}",
            Style::AbsolutePath,
            BTreeMap::new(),
            true,
        );
        let href = resolve(&template, &LiteralStyler, json!({}));
        assert_eq!(href, Href { value: "/orders".into(), templated: false });
    }

    #[test]
    fn test_condition_false_yields_none() {
        let evaluator = DefaultEvaluator::new();
        let expander = UriTemplateExpander::new();
        let context = LinkContext::new(&evaluator, &expander, &LiteralStyler, json!({ "open": false }));
        let descriptor = LinkDescriptor {
            rel: "close".into(),
            href: HrefTemplate::new("/close", Style::AbsolutePath),
            media_type: None,
            deprecation: None,
            name: None,
            profile: None,
            title: None,
            hreflang: None,
            condition: Some("${instance.open}".into()),
            curie: None,
        };
        assert_eq!(descriptor.to_link(&context).unwrap(), None);
    }

    #[test]
    fn test_curie_descriptors_last_wins() {
        let curies: CurieDescriptors = vec![
            CurieDescriptor::new("docs", HrefTemplate::new("/old/{rel}", Style::AbsolutePath)),
            CurieDescriptor::new("docs", HrefTemplate::new("/new/{rel}", Style::AbsolutePath)),
        ]
        .into_iter()
        .collect();
        assert_eq!(curies.len(), 1);
        assert_eq!(curies.get("docs").map(|c| c.href().value()), Some("/new/{rel}"));
    }

    #[test]
    fn test_curie_keeps_rel_placeholder() {
        let evaluator = DefaultEvaluator::new();
        let expander = UriTemplateExpander::new();
        let context = LinkContext::new(&evaluator, &expander, &LiteralStyler, json!({}));
        let curie = CurieDescriptor::new("docs", HrefTemplate::new("/docs/{rel}", Style::AbsolutePath))
            .to_curie(&context)
            .unwrap();
        assert_eq!(curie.href(), "/docs/{rel}");
    }
}
