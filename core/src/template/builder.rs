//! # URI Template Builder
//!
//! Assembles a URI Template from route fragments: path segments first, then a
//! form-style query expression.

use crate::error::{LinkError, LinkResult};
use regex::Regex;
use std::sync::OnceLock;

fn path_re() -> &'static Regex {
    static PATH_RE: OnceLock<Regex> = OnceLock::new();
    PATH_RE.get_or_init(|| Regex::new(r"^((?:/.*)|(?:[^/].*?))(/)?$").expect("Invalid regex"))
}

fn query_param_re() -> &'static Regex {
    static QUERY_PARAM_RE: OnceLock<Regex> = OnceLock::new();
    QUERY_PARAM_RE.get_or_init(|| Regex::new(r"^\{?([^{}]+)\}?$").expect("Invalid regex"))
}

/// Incrementally builds a URI Template.
#[derive(Debug, Clone, Default)]
pub struct UriTemplateBuilder {
    path: String,
    query_params: Vec<String>,
}

impl UriTemplateBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the path, joining segments with exactly one `/`.
    ///
    /// A trailing `/` on `value` is preserved.
    pub fn append_path(mut self, value: &str) -> LinkResult<Self> {
        let trimmed = value.trim();
        let caps = path_re()
            .captures(trimmed)
            .ok_or_else(|| LinkError::InvalidPath(value.to_string()))?;
        let segment = caps.get(1).map_or("", |m| m.as_str());
        let ends_with_slash = self.path.ends_with('/');

        match segment.strip_prefix('/') {
            Some(rest) if ends_with_slash => self.path.push_str(rest),
            Some(_) => self.path.push_str(segment),
            None if ends_with_slash => self.path.push_str(segment),
            None => {
                self.path.push('/');
                self.path.push_str(segment);
            }
        }

        if caps.get(2).is_some() {
            self.path.push('/');
        }
        Ok(self)
    }

    /// Appends a query parameter name, given as `name` or `{name}`.
    pub fn append_templated_query_param(mut self, name: &str) -> LinkResult<Self> {
        let caps = query_param_re()
            .captures(name.trim())
            .ok_or_else(|| LinkError::InvalidQueryParam(name.to_string()))?;
        let param = caps.get(1).map_or("", |m| m.as_str().trim());
        if param.is_empty() {
            return Err(LinkError::InvalidQueryParam(name.to_string()));
        }
        self.query_params.push(param.to_string());
        Ok(self)
    }

    /// Returns the resulting template.
    pub fn build(&self) -> String {
        if self.query_params.is_empty() {
            self.path.clone()
        } else {
            format!("{}{{?{}}}", self.path, self.query_params.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_separator_between_segments() {
        let template = UriTemplateBuilder::new()
            .append_path("/orders/")
            .and_then(|b| b.append_path("/{id}"))
            .map(|b| b.build())
            .unwrap();
        assert_eq!(template, "/orders/{id}");
    }

    #[test]
    fn test_relative_segments_are_joined() {
        let template = UriTemplateBuilder::new()
            .append_path("orders")
            .and_then(|b| b.append_path("items/"))
            .map(|b| b.build())
            .unwrap();
        assert_eq!(template, "/orders/items/");
    }

    #[test]
    fn test_query_params() {
        let template = UriTemplateBuilder::new()
            .append_path("/orders")
            .and_then(|b| b.append_templated_query_param("page"))
            .and_then(|b| b.append_templated_query_param("{size}"))
            .map(|b| b.build())
            .unwrap();
        assert_eq!(template, "/orders{?page,size}");
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            UriTemplateBuilder::new().append_path("  "),
            Err(LinkError::InvalidPath(_))
        ));
        assert!(matches!(
            UriTemplateBuilder::new().append_templated_query_param(""),
            Err(LinkError::InvalidQueryParam(_))
        ));
    }
}
