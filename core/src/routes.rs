#![deny(missing_docs)]

//! # Link Template Factories
//!
//! Turns a validated link declaration into the raw template its descriptor
//! resolves. Literal declarations carry their template; routed declarations
//! name a resource (and method) looked up in a route table.
//!
//! A route table maps resource names to paths, methods to sub-paths and query
//! parameters:
//!
//! ```yaml
//! orders:
//!   path: /orders
//!   methods:
//!     list:
//!       query: [page, size]
//!     get:
//!       path: "{id: \\d+}"
//! ```

use crate::declare::LinkRelType;
use crate::error::{LinkError, LinkResult};
use crate::template::{is_absolute, UriTemplateBuilder};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Creates link templates from declarations.
pub trait LinkTemplateFactory: Send + Sync {
    /// Returns the template for `link_rel`.
    fn create_link_template(&self, link_rel: &LinkRelType) -> LinkResult<String>;
}

/// Uses the declared value as is. Routed declarations are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralLinkTemplateFactory;

impl LinkTemplateFactory for LiteralLinkTemplateFactory {
    fn create_link_template(&self, link_rel: &LinkRelType) -> LinkResult<String> {
        match (link_rel.href(), link_rel.resource()) {
            (Some(href), _) => Ok(href.to_string()),
            (None, Some(resource)) => Err(LinkError::InvalidDeclaration(format!(
                "rel '{}' targets resource '{}', which needs a route-aware link template factory",
                link_rel.rel(),
                resource.resource()
            ))),
            (None, None) => Err(LinkError::InvalidDeclaration(format!(
                "rel '{}' has neither a value nor a resource",
                link_rel.rel()
            ))),
        }
    }
}

/// A routed method: an optional sub-path and its query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodRoute {
    path: Option<String>,
    query: Vec<String>,
}

impl MethodRoute {
    /// Creates a method route without a sub-path or query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sub-path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>) -> Self {
        self.query.push(name.into());
        self
    }
}

/// A routed resource: its path and methods.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRoute {
    path: String,
    #[serde(default)]
    methods: IndexMap<String, MethodRoute>,
}

impl ResourceRoute {
    /// Creates a resource route at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        ResourceRoute {
            path: path.into(),
            methods: IndexMap::new(),
        }
    }

    /// Adds a method.
    pub fn method(mut self, name: impl Into<String>, route: MethodRoute) -> Self {
        self.methods.insert(name.into(), route);
        self
    }
}

/// Builds templates from a route table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RouteTemplateFactory {
    resources: IndexMap<String, ResourceRoute>,
}

impl RouteTemplateFactory {
    /// Creates a factory with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a route table from YAML.
    pub fn from_yaml(yaml: &str) -> LinkResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| LinkError::Routes(e.to_string()))
    }

    /// Registers a resource.
    pub fn route(mut self, name: impl Into<String>, route: ResourceRoute) -> Self {
        self.resources.insert(name.into(), route);
        self
    }
}

impl LinkTemplateFactory for RouteTemplateFactory {
    fn create_link_template(&self, link_rel: &LinkRelType) -> LinkResult<String> {
        if let Some(href) = link_rel.href() {
            if is_absolute(href) {
                return Ok(href.to_string());
            }
        }

        let mut builder = UriTemplateBuilder::new();
        if let Some(target) = link_rel.resource() {
            let resource = self
                .resources
                .get(target.resource())
                .ok_or_else(|| LinkError::UnknownResource(target.resource().to_string()))?;
            builder = builder.append_path(&strip_path_param_regex(&resource.path))?;

            if let Some(name) = target.method() {
                let method = resource.methods.get(name).ok_or_else(|| {
                    LinkError::UnknownResource(format!("{}.{}", target.resource(), name))
                })?;
                if let Some(path) = &method.path {
                    builder = builder.append_path(&strip_path_param_regex(path))?;
                }
                for param in &method.query {
                    builder = builder.append_templated_query_param(param)?;
                }
            }
        } else if let Some(href) = link_rel.href() {
            builder = builder.append_path(href)?;
        }
        Ok(builder.build())
    }
}

/// Rewrites `{id: \d+}` path parameters to `{id}`.
fn strip_path_param_regex(path: &str) -> String {
    static PARAM_REGEX_RE: OnceLock<Regex> = OnceLock::new();
    let re = PARAM_REGEX_RE
        .get_or_init(|| Regex::new(r"\{([^}:]+):[^/]+\}").expect("Invalid regex"));
    re.replace_all(path, |caps: &regex::Captures| format!("{{{}}}", caps[1].trim()))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::LinkRel;

    fn rel_type(rel: LinkRel) -> LinkRelType {
        LinkRelType::value_of(&rel).unwrap()
    }

    fn routes() -> RouteTemplateFactory {
        RouteTemplateFactory::from_yaml(
            r#"
orders:
  path: /orders/
  methods:
    list:
      query: [page, "{size}"]
    get:
      path: "{id: \\d+}"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_literal_factory() {
        let factory = LiteralLinkTemplateFactory;
        let template = factory
            .create_link_template(&rel_type(LinkRel::self_link("/orders/{id}")))
            .unwrap();
        assert_eq!(template, "/orders/{id}");
        assert!(factory
            .create_link_template(&rel_type(LinkRel::new("orders").resource("orders")))
            .is_err());
    }

    #[test]
    fn test_resource_path() {
        let template = routes()
            .create_link_template(&rel_type(LinkRel::new("orders").resource("orders")))
            .unwrap();
        assert_eq!(template, "/orders/");
    }

    #[test]
    fn test_method_path_strips_regex() {
        let template = routes()
            .create_link_template(&rel_type(
                LinkRel::new("order").resource("orders").method("get"),
            ))
            .unwrap();
        assert_eq!(template, "/orders/{id}");
    }

    #[test]
    fn test_method_query_params() {
        let template = routes()
            .create_link_template(&rel_type(
                LinkRel::new("orders").resource("orders").method("list"),
            ))
            .unwrap();
        assert_eq!(template, "/orders/{?page,size}");
    }

    #[test]
    fn test_absolute_and_relative_values() {
        let factory = RouteTemplateFactory::new();
        let absolute = factory
            .create_link_template(&rel_type(LinkRel::self_link("http://example.com/x")))
            .unwrap();
        assert_eq!(absolute, "http://example.com/x");
        let relative = factory
            .create_link_template(&rel_type(LinkRel::self_link("orders/{id}")))
            .unwrap();
        assert_eq!(relative, "/orders/{id}");
    }

    #[test]
    fn test_unknown_targets() {
        let factory = routes();
        assert!(matches!(
            factory.create_link_template(&rel_type(LinkRel::new("x").resource("customers"))),
            Err(LinkError::UnknownResource(name)) if name == "customers"
        ));
        assert!(matches!(
            factory.create_link_template(&rel_type(
                LinkRel::new("x").resource("orders").method("delete")
            )),
            Err(LinkError::UnknownResource(name)) if name == "orders.delete"
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            RouteTemplateFactory::from_yaml("orders: [1, 2]"),
            Err(LinkError::Routes(_))
        ));
    }

    #[test]
    fn test_builder_api() {
        let factory = RouteTemplateFactory::new().route(
            "customers",
            ResourceRoute::new("/customers")
                .method("get", MethodRoute::new().path("{id}").query("expand")),
        );
        let template = factory
            .create_link_template(&rel_type(
                LinkRel::new("customer").resource("customers").method("get"),
            ))
            .unwrap();
        assert_eq!(template, "/customers/{id}{?expand}");
    }
}
