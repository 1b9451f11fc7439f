//! Styling resolvers turn a resolved, non-absolute href into its final form.

use crate::error::{LinkError, LinkResult};
use crate::template::is_absolute;
use url::Url;

/// Renders hrefs as absolute URIs, absolute paths or relative paths.
///
/// Supplied by the embedding application, usually per request.
pub trait StylingResolver {
    /// Returns `template` as an absolute URI.
    fn resolve_absolute(&self, template: &str) -> String;

    /// Returns `template` as a path from the application root.
    fn resolve_absolute_path(&self, template: &str) -> String;

    /// Returns `template` as a relative path.
    fn resolve_relative_path(&self, template: &str) -> String;
}

/// Leaves every template untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralStyler;

impl StylingResolver for LiteralStyler {
    fn resolve_absolute(&self, template: &str) -> String {
        template.to_string()
    }

    fn resolve_absolute_path(&self, template: &str) -> String {
        template.to_string()
    }

    fn resolve_relative_path(&self, template: &str) -> String {
        template.to_string()
    }
}

/// Styles templates against the application's base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUriStyler {
    base: Url,
}

impl BaseUriStyler {
    /// Creates a styler for `base`.
    pub fn new(base: Url) -> Self {
        BaseUriStyler { base }
    }

    /// Parses `base` and creates a styler for it.
    pub fn parse(base: &str) -> LinkResult<Self> {
        Url::parse(base)
            .map(Self::new)
            .map_err(|e| LinkError::InvalidPath(format!("{}: {}", base, e)))
    }

    /// The base URI.
    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl StylingResolver for BaseUriStyler {
    fn resolve_absolute(&self, template: &str) -> String {
        let mut base = self.base.clone();
        base.set_query(None);
        base.set_fragment(None);
        join_path(base.as_str(), template)
    }

    fn resolve_absolute_path(&self, template: &str) -> String {
        if is_absolute(template) {
            return template.to_string();
        }
        join_path(self.base.path(), template)
    }

    fn resolve_relative_path(&self, template: &str) -> String {
        template.strip_prefix('/').unwrap_or(template).to_string()
    }
}

/// Joins two path fragments with exactly one `/`.
fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_styler() {
        let styler = LiteralStyler;
        assert_eq!(styler.resolve_absolute("/x"), "/x");
        assert_eq!(styler.resolve_absolute_path("/x"), "/x");
        assert_eq!(styler.resolve_relative_path("/x"), "/x");
    }

    #[test]
    fn test_absolute_keeps_template_syntax() {
        let styler = BaseUriStyler::parse("http://example.com/api").unwrap();
        assert_eq!(
            styler.resolve_absolute("/orders/{id}"),
            "http://example.com/api/orders/{id}"
        );
    }

    #[test]
    fn test_absolute_path() {
        let styler = BaseUriStyler::parse("http://example.com/api/").unwrap();
        assert_eq!(styler.resolve_absolute_path("/orders"), "/api/orders");
        assert_eq!(
            styler.resolve_absolute_path("http://other.com/x"),
            "http://other.com/x"
        );

        let root = BaseUriStyler::parse("http://example.com").unwrap();
        assert_eq!(root.resolve_absolute_path("/orders/"), "/orders/");
    }

    #[test]
    fn test_relative_path() {
        let styler = BaseUriStyler::parse("http://example.com/api/").unwrap();
        assert_eq!(styler.resolve_relative_path("/orders"), "orders");
        assert_eq!(styler.resolve_relative_path("orders"), "orders");
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            BaseUriStyler::parse("not a uri"),
            Err(LinkError::InvalidPath(_))
        ));
    }
}
