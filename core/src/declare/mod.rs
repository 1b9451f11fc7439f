#![deny(missing_docs)]

//! # Declarations
//!
//! Plain records describing the links and curies a resource wants injected.
//! They are decoded from configuration or built in code, then validated into
//! [`LinkRelType`] / [`CurieType`] before compilation.
//!
//! ```
//! use hal_links_core::declare::{BindingOption, LinkRel};
//!
//! let rel = LinkRel::new("orders")
//!     .value("/customers/{id}/orders")
//!     .binding_option(BindingOption::InstanceParameters);
//! assert_eq!(rel.rel(), "orders");
//! ```

pub mod types;

pub use types::{CurieType, LinkRelType, ResourceRef};

use crate::context::Style;
use crate::link::rels;
use serde::Deserialize;

/// Binds a URI Template variable to an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    /// Template variable name.
    pub name: String,
    /// Expression whose value substitutes the variable.
    pub value: String,
}

impl Binding {
    /// Creates a binding.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Binding {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Policies that add implicit bindings or change expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingOption {
    /// Bind unbound variables to same-named instance properties.
    InstanceParameters,
    /// Like `InstanceParameters`, reading `snake_case` variables as camelCase properties.
    InstanceParametersSnakeCase,
    /// Bind still unbound variables to same-named request URI parameters.
    UriParameters,
    /// Keep unexpanded variables as template syntax instead of dropping them.
    RetainUnexpanded,
}

/// Declares one link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkRel {
    rel: String,
    value: String,
    #[serde(rename = "type")]
    media_type: String,
    deprecation: String,
    name: String,
    profile: String,
    title: String,
    hreflang: String,
    resource: Option<String>,
    method: Option<String>,
    condition: String,
    style: Style,
    bindings: Vec<Binding>,
    binding_options: Vec<BindingOption>,
}

impl Default for LinkRel {
    fn default() -> Self {
        LinkRel {
            rel: rels::SELF.to_string(),
            value: String::new(),
            media_type: String::new(),
            deprecation: String::new(),
            name: String::new(),
            profile: String::new(),
            title: String::new(),
            hreflang: String::new(),
            resource: None,
            method: None,
            condition: String::new(),
            style: Style::default(),
            bindings: Vec::new(),
            binding_options: Vec::new(),
        }
    }
}

impl LinkRel {
    /// Declares a link for `rel`.
    pub fn new(rel: impl Into<String>) -> Self {
        LinkRel {
            rel: rel.into(),
            ..Self::default()
        }
    }

    /// Declares a `self` link to `value`.
    pub fn self_link(value: impl Into<String>) -> Self {
        Self::new(rels::SELF).value(value)
    }

    /// The declared rel.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// Sets the href, URI Template or expression.
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Sets the media type hint.
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Sets the deprecation hint.
    pub fn deprecation(mut self, deprecation: impl Into<String>) -> Self {
        self.deprecation = deprecation.into();
        self
    }

    /// Sets the link name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the profile hint.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the target language.
    pub fn hreflang(mut self, hreflang: impl Into<String>) -> Self {
        self.hreflang = hreflang.into();
        self
    }

    /// Targets a routed resource instead of a literal value.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Targets a method of the routed resource.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Only emit the link when `condition` evaluates to `true`.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Sets the href style.
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Adds an explicit binding.
    pub fn binding(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.push(Binding::new(name, value));
        self
    }

    /// Enables a binding option.
    pub fn binding_option(mut self, option: BindingOption) -> Self {
        self.binding_options.push(option);
        self
    }
}

/// Declares several links on one link-list attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LinkRels(pub Vec<LinkRel>);

impl From<Vec<LinkRel>> for LinkRels {
    fn from(rels: Vec<LinkRel>) -> Self {
        LinkRels(rels)
    }
}

/// Declares one curie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurieDef {
    name: String,
    value: String,
    #[serde(default)]
    style: Style,
}

impl CurieDef {
    /// Declares curie `name` documenting rels at `value`, which should hold `{rel}`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        CurieDef {
            name: name.into(),
            value: value.into(),
            style: Style::default(),
        }
    }

    /// Sets the href style.
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// Declares several curies on one curie-list attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CurieDefs(pub Vec<CurieDef>);

impl From<Vec<CurieDef>> for CurieDefs {
    fn from(defs: Vec<CurieDef>) -> Self {
        CurieDefs(defs)
    }
}
