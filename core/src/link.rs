#![deny(missing_docs)]

//! # Link Values
//!
//! Immutable HAL link and curie values produced by injection, plus the
//! embedded-resource container and relation-name helpers.

use crate::error::{LinkError, LinkResult};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Relation-name constants and helpers.
pub mod rels {
    /// Relation whose target is the resource's URI.
    pub const SELF: &str = "self";

    /// Relation located on the root resource whose target is the set of curies.
    pub const CURIES: &str = "curies";

    /// Returns the curie prefix of a rel such as `docs:item`, if any.
    pub fn curie_prefix(rel: &str) -> Option<&str> {
        rel.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Returns the rel without its curie prefix.
    pub fn name(rel: &str) -> &str {
        rel.split_once(':').map_or(rel, |(_, name)| name)
    }
}

/// Returns `true` if `uri` contains an RFC 6570 expression.
pub fn is_uri_template(uri: &str) -> bool {
    static TEMPLATED_RE: OnceLock<Regex> = OnceLock::new();
    let re = TEMPLATED_RE.get_or_init(|| {
        Regex::new(r"\{[A-Za-z0-9_?+./&;#][-A-Za-z0-9_.*,:]*\}").expect("Invalid regex")
    });
    re.is_match(uri)
}

/// Validates that `value` contains at least one non-whitespace character.
pub(crate) fn has_text(value: &str, arg: &str) -> LinkResult<()> {
    if value.trim().is_empty() {
        return Err(LinkError::InvalidDeclaration(format!(
            "'{}' argument must contain text; cannot be empty or blank",
            arg
        )));
    }
    Ok(())
}

fn null_or_has_text(value: Option<&str>, arg: &str) -> LinkResult<()> {
    match value {
        Some(v) => has_text(v, arg),
        None => Ok(()),
    }
}

/// A HAL Link Object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    #[serde(skip)]
    rel: String,
    href: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    templated: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deprecation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hreflang: Option<String>,
}

impl Link {
    /// Creates a link with only the mandatory properties.
    ///
    /// `templated` is derived from `href`.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> LinkResult<Self> {
        let href = href.into();
        let templated = is_uri_template(&href);
        Link::builder().rel(rel).href(href).templated(templated).build()
    }

    /// Creates a `self` link.
    pub fn self_link(href: impl Into<String>) -> LinkResult<Self> {
        Link::new(rels::SELF, href)
    }

    /// Starts building a link with every optional hint available.
    pub fn builder() -> LinkBuilder {
        LinkBuilder::default()
    }

    /// Link relation name.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// URI or URI Template of the target resource.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Whether `href` is a URI Template.
    pub fn is_templated(&self) -> bool {
        self.templated
    }

    /// Media type hint.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Deprecation information URL.
    pub fn deprecation(&self) -> Option<&str> {
        self.deprecation.as_deref()
    }

    /// Secondary key among links sharing a rel.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Profile URI (RFC 6906).
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Human-readable label.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Language of the target resource.
    pub fn hreflang(&self) -> Option<&str> {
        self.hreflang.as_deref()
    }
}

/// Builder for [`Link`].
#[derive(Debug, Clone, Default)]
pub struct LinkBuilder {
    rel: Option<String>,
    href: Option<String>,
    templated: bool,
    media_type: Option<String>,
    deprecation: Option<String>,
    name: Option<String>,
    profile: Option<String>,
    title: Option<String>,
    hreflang: Option<String>,
}

impl LinkBuilder {
    /// Sets the relation name.
    pub fn rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    /// Sets the href.
    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Marks the href as templated. Defaults to `false`.
    pub fn templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Sets the media type hint.
    pub fn media_type(mut self, media_type: Option<String>) -> Self {
        self.media_type = media_type;
        self
    }

    /// Sets the deprecation URL.
    pub fn deprecation(mut self, deprecation: Option<String>) -> Self {
        self.deprecation = deprecation;
        self
    }

    /// Sets the link name.
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the profile URI.
    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Sets the target language.
    pub fn hreflang(mut self, hreflang: Option<String>) -> Self {
        self.hreflang = hreflang;
        self
    }

    /// Validates and builds the link.
    pub fn build(self) -> LinkResult<Link> {
        let rel = self.rel.unwrap_or_default();
        let href = self.href.unwrap_or_default();
        has_text(&rel, "rel")?;
        has_text(&href, "href")?;
        null_or_has_text(self.media_type.as_deref(), "type")?;
        null_or_has_text(self.deprecation.as_deref(), "deprecation")?;
        null_or_has_text(self.name.as_deref(), "name")?;
        null_or_has_text(self.profile.as_deref(), "profile")?;
        null_or_has_text(self.title.as_deref(), "title")?;
        null_or_has_text(self.hreflang.as_deref(), "hreflang")?;
        Ok(Link {
            rel,
            href,
            templated: self.templated,
            media_type: self.media_type,
            deprecation: self.deprecation,
            name: self.name,
            profile: self.profile,
            title: self.title,
            hreflang: self.hreflang,
        })
    }
}

/// A HAL curie: a named, templated link to relation documentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Curie {
    name: String,
    href: String,
}

impl Curie {
    /// Creates a curie. `href` should contain the `{rel}` token.
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> LinkResult<Self> {
        let name = name.into();
        let href = href.into();
        has_text(&name, "name")?;
        has_text(&href, "href")?;
        Ok(Curie { name, href })
    }

    /// The prefix used in rels such as `name:rel`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URI Template for relation documentation.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Always `true`: a curie href is templated by definition.
    pub fn is_templated(&self) -> bool {
        true
    }
}

/// A nested resource (or list of resources) embedded under a rel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedded<T> {
    #[serde(skip)]
    rel: String,
    resource: T,
}

impl<T> Embedded<T> {
    /// Embeds `resource` under `rel`.
    pub fn new(rel: impl Into<String>, resource: T) -> Self {
        Embedded {
            rel: rel.into(),
            resource,
        }
    }

    /// The embedding rel.
    pub fn rel(&self) -> &str {
        &self.rel
    }

    /// The embedded resource.
    pub fn resource(&self) -> &T {
        &self.resource
    }

    /// Mutable access to the embedded resource.
    pub fn resource_mut(&mut self) -> &mut T {
        &mut self.resource
    }

    /// Unwraps the embedded resource.
    pub fn into_resource(self) -> T {
        self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_templated() {
        let link = Link::new("orders", "/orders{?page}").unwrap();
        assert!(link.is_templated());
        let link = Link::new("orders", "/orders").unwrap();
        assert!(!link.is_templated());
    }

    #[test]
    fn test_self_link() {
        let link = Link::self_link("/orders/1").unwrap();
        assert_eq!(link.rel(), "self");
        assert_eq!(link.href(), "/orders/1");
    }

    #[test]
    fn test_blank_rel_rejected() {
        assert!(matches!(
            Link::new("  ", "/x"),
            Err(LinkError::InvalidDeclaration(_))
        ));
    }

    #[test]
    fn test_blank_hint_rejected() {
        let result = Link::builder()
            .rel("self")
            .href("/x")
            .title(Some(String::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_link_equality_covers_hints() {
        let a = Link::builder()
            .rel("self")
            .href("/x")
            .title(Some("X".into()))
            .build()
            .unwrap();
        let b = Link::builder().rel("self").href("/x").build().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_curie_always_templated() {
        let curie = Curie::new("docs", "/docs/{rel}").unwrap();
        assert!(curie.is_templated());
        assert!(Curie::new("", "/docs/{rel}").is_err());
    }

    #[test]
    fn test_rels_split() {
        assert_eq!(rels::curie_prefix("docs:item"), Some("docs"));
        assert_eq!(rels::curie_prefix("item"), None);
        assert_eq!(rels::name("docs:item"), "item");
        assert_eq!(rels::name("item"), "item");
    }

    #[test]
    fn test_link_serialization_skips_absent_hints() {
        let link = Link::new("self", "/orders/1").unwrap();
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json, serde_json::json!({ "href": "/orders/1" }));
    }
}
