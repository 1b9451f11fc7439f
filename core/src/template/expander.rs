//! # URI Template Expander
//!
//! Expands RFC 6570 templates (up to level 3) against a map of values.
//!
//! Variables without a value are either dropped or re-rendered as template
//! syntax, so that a partially expanded template can be expanded again later.

use super::expressions;
use indexmap::{IndexMap, IndexSet};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// RFC 3986 unreserved characters pass through, everything else is encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The shape of a substitution value, used to select a [`UriValueResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// Integer or floating point numbers.
    Number,
    /// Text.
    String,
    /// Lists.
    Array,
    /// Maps.
    Object,
}

impl ValueKind {
    /// Returns the kind of `value`, or `None` for null.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Number(_) => Some(ValueKind::Number),
            Value::String(_) => Some(ValueKind::String),
            Value::Array(_) => Some(ValueKind::Array),
            Value::Object(_) => Some(ValueKind::Object),
        }
    }
}

/// Overrides the default text conversion of one kind of value.
pub trait UriValueResolver: Send + Sync {
    /// The kind of value this resolver handles.
    fn kind(&self) -> ValueKind;

    /// Converts `value` to the text substituted into the template.
    fn resolve(&self, value: &Value) -> String;
}

/// Per-operator expansion grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParameters,
    FormQuery,
    FormQueryContinuation,
}

impl Operator {
    fn from_symbol(symbol: Option<char>) -> Self {
        match symbol {
            None => Operator::Simple,
            Some('+') => Operator::Reserved,
            Some('#') => Operator::Fragment,
            Some('.') => Operator::Label,
            Some('/') => Operator::Path,
            Some(';') => Operator::PathParameters,
            Some('?') => Operator::FormQuery,
            Some('&') => Operator::FormQueryContinuation,
            Some(other) => unreachable!("operator '{other}' is not recognized by the template pattern"),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Operator::Simple => "",
            Operator::Reserved => "+",
            Operator::Fragment => "#",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameters => ";",
            Operator::FormQuery => "?",
            Operator::FormQueryContinuation => "&",
        }
    }

    /// Prefix written before the first expanded value.
    fn expanded_prefix(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved => "",
            other => other.symbol(),
        }
    }

    /// Operator used when unexpanded names follow expanded ones.
    fn continuation_symbol(self) -> &'static str {
        match self {
            Operator::FormQuery => "&",
            other => other.symbol(),
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Operator::Simple | Operator::Reserved | Operator::Fragment => ",",
            Operator::Label => ".",
            Operator::Path => "/",
            Operator::PathParameters => ";",
            Operator::FormQuery | Operator::FormQueryContinuation => "&",
        }
    }

    fn is_named(self) -> bool {
        matches!(
            self,
            Operator::PathParameters | Operator::FormQuery | Operator::FormQueryContinuation
        )
    }

    fn expand(self, values: &IndexMap<&str, String>) -> String {
        let rendered: Vec<String> = values
            .iter()
            .map(|(name, value)| {
                if self.is_named() {
                    format!("{}={}", name, value)
                } else {
                    value.clone()
                }
            })
            .collect();
        format!("{}{}", self.expanded_prefix(), rendered.join(self.separator()))
    }

    fn template(self, names: &IndexSet<&str>, symbol: &str) -> String {
        let names: Vec<&str> = names.iter().copied().collect();
        format!("{{{}{}}}", symbol, names.join(","))
    }
}

/// Expands URI Templates, optionally using per-kind value resolvers.
#[derive(Clone, Default)]
pub struct UriTemplateExpander {
    resolvers: HashMap<ValueKind, Arc<dyn UriValueResolver>>,
}

impl std::fmt::Debug for UriTemplateExpander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriTemplateExpander")
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl UriTemplateExpander {
    /// Creates an expander that uses the default text conversion for every value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an expander with the given resolvers. A later resolver for the
    /// same kind replaces an earlier one.
    pub fn with_resolvers(resolvers: Vec<Arc<dyn UriValueResolver>>) -> Self {
        let resolvers = resolvers.into_iter().map(|r| (r.kind(), r)).collect();
        UriTemplateExpander { resolvers }
    }

    /// Expands `template` with `values`.
    ///
    /// A null or missing value leaves its variable unexpanded. With
    /// `remove_unexpanded` such variables are dropped, otherwise they are kept
    /// as template expressions after the expanded part.
    pub fn expand(
        &self,
        template: &str,
        values: &HashMap<String, Value>,
        remove_unexpanded: bool,
    ) -> String {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for expr in expressions(template) {
            out.push_str(&template[last..expr.span.start]);
            let operator = Operator::from_symbol(expr.operator);

            let mut expanded: IndexMap<&str, String> = IndexMap::new();
            let mut unexpanded: IndexSet<&str> = IndexSet::new();
            for name in expr.names {
                match values.get(name).filter(|v| !v.is_null()) {
                    Some(value) => {
                        expanded
                            .entry(name)
                            .or_insert_with(|| self.to_replacement_value(value));
                    }
                    None => {
                        unexpanded.insert(name);
                    }
                }
            }

            if !expanded.is_empty() {
                out.push_str(&operator.expand(&expanded));
            }
            if !remove_unexpanded && !unexpanded.is_empty() {
                let symbol = if expanded.is_empty() {
                    operator.symbol()
                } else {
                    operator.continuation_symbol()
                };
                out.push_str(&operator.template(&unexpanded, symbol));
            }

            last = expr.span.end;
        }

        out.push_str(&template[last..]);
        out
    }

    fn to_replacement_value(&self, value: &Value) -> String {
        let text = match ValueKind::of(value).and_then(|kind| self.resolvers.get(&kind)) {
            Some(resolver) => resolver.resolve(value),
            None => to_text(value),
        };
        if text.contains('/') {
            text
        } else {
            utf8_percent_encode(&text, UNRESERVED).to_string()
        }
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_query_retains_unexpanded() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("a", json!(1))]);
        assert_eq!(expander.expand("{?a,b}", &vals, false), "?a=1{&b}");
        assert_eq!(expander.expand("{?a,b}", &vals, true), "?a=1");
    }

    #[test]
    fn test_path_segments() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("a", json!("valueA")), ("b", json!("valueB"))]);
        assert_eq!(expander.expand("{/a,b}", &vals, true), "/valueA/valueB");
    }

    #[test]
    fn test_nothing_resolved() {
        let expander = UriTemplateExpander::new();
        let vals = HashMap::new();
        assert_eq!(expander.expand("/orders{?page,size}", &vals, true), "/orders");
        assert_eq!(
            expander.expand("/orders{?page,size}", &vals, false),
            "/orders{?page,size}"
        );
    }

    #[test]
    fn test_null_is_unexpanded() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("id", Value::Null)]);
        assert_eq!(expander.expand("/orders/{id}", &vals, false), "/orders/{id}");
    }

    #[test]
    fn test_operator_grammars() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("x", json!("1")), ("y", json!("2"))]);
        assert_eq!(expander.expand("{x,y}", &vals, true), "1,2");
        assert_eq!(expander.expand("{+x,y}", &vals, true), "1,2");
        assert_eq!(expander.expand("{#x,y}", &vals, true), "#1,2");
        assert_eq!(expander.expand("{.x,y}", &vals, true), ".1.2");
        assert_eq!(expander.expand("{;x,y}", &vals, true), ";x=1;y=2");
        assert_eq!(expander.expand("{&x,y}", &vals, true), "&x=1&y=2");
    }

    #[test]
    fn test_path_retains_unexpanded() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("a", json!("x"))]);
        assert_eq!(expander.expand("{/a,b}", &vals, false), "/x{/b}");
    }

    #[test]
    fn test_literal_text_copied() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("id", json!(7))]);
        assert_eq!(
            expander.expand("/orders/{id}/items", &vals, true),
            "/orders/7/items"
        );
    }

    #[test]
    fn test_percent_encoding() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("q", json!("a b")), ("p", json!("a/b c"))]);
        assert_eq!(expander.expand("{?q}", &vals, true), "?q=a%20b");
        assert_eq!(expander.expand("{p}", &vals, true), "a/b c");
    }

    struct YesNo;

    impl UriValueResolver for YesNo {
        fn kind(&self) -> ValueKind {
            ValueKind::Bool
        }

        fn resolve(&self, value: &Value) -> String {
            if value.as_bool() == Some(true) {
                "yes".into()
            } else {
                "no".into()
            }
        }
    }

    #[test]
    fn test_value_resolver_overrides_text() {
        let expander = UriTemplateExpander::with_resolvers(vec![Arc::new(YesNo)]);
        let vals = values(&[("active", json!(true)), ("n", json!(3))]);
        assert_eq!(
            expander.expand("{?active,n}", &vals, true),
            "?active=yes&n=3"
        );
    }

    #[test]
    fn test_list_values_join() {
        let expander = UriTemplateExpander::new();
        let vals = values(&[("ids", json!([1, 2]))]);
        assert_eq!(expander.expand("{?ids}", &vals, true), "?ids=1%2C2");
    }
}
