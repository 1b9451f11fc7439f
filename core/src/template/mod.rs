#![deny(missing_docs)]

//! # Template Grammar
//!
//! Recognizes the syntax features of a link template so that higher layers
//! only run the resolution steps a template actually needs.
//!
//! - **expander**: RFC 6570 (levels 1-3) expansion.
//! - **builder**: assembling templates from route fragments.

pub mod builder;
pub mod expander;

pub use builder::UriTemplateBuilder;
pub use expander::{UriTemplateExpander, UriValueResolver, ValueKind};

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use url::Url;

fn expression_language_re() -> &'static Regex {
    static EL_RE: OnceLock<Regex> = OnceLock::new();
    EL_RE.get_or_init(|| Regex::new(r"\$\{.*?\}").expect("Invalid regex"))
}

fn uri_template_re() -> &'static Regex {
    // The optional leading `$` lets callers skip `${...}` language expressions.
    // A `{...}` right after a literal `$` produced by an evaluated expression
    // is skipped too, e.g. `${instance.currency}{amount}` with currency `$`.
    static URI_RE: OnceLock<Regex> = OnceLock::new();
    URI_RE.get_or_init(|| {
        Regex::new(r"(\$)?\{([?.+&;/#])?([A-Za-z0-9_,]+)\}").expect("Invalid regex")
    })
}

/// One `{op names}` expression found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpression<'a> {
    /// Byte range of the whole expression, braces included.
    pub span: Range<usize>,
    /// The operator character, if any.
    pub operator: Option<char>,
    /// The comma separated variable names.
    pub names: Vec<&'a str>,
}

/// Iterates over the URI Template expressions of `template`, in order.
pub fn expressions(template: &str) -> impl Iterator<Item = TemplateExpression<'_>> {
    uri_template_re()
        .captures_iter(template)
        .filter(|caps| caps.get(1).is_none())
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let names = caps.get(3)?;
            Some(TemplateExpression {
                span: whole.range(),
                operator: caps.get(2).and_then(|m| m.as_str().chars().next()),
                names: names.as_str().split(',').filter(|n| !n.is_empty()).collect(),
            })
        })
}

/// Returns `true` if `template` contains `${...}` expressions.
pub fn contains_expressions(template: &str) -> bool {
    expression_language_re().is_match(template)
}

/// Returns the URI Template parameter names in `template`, in order of appearance.
pub fn extract_parameter_names(template: &str) -> Vec<String> {
    expressions(template)
        .flat_map(|expr| expr.names.into_iter().map(str::to_string))
        .collect()
}

/// Returns `true` if `template` still holds URI Template variables.
pub fn is_templated(template: &str) -> bool {
    expressions(template).next().is_some()
}

/// Returns `true` if `template` is an absolute URI once every expression is masked.
pub fn is_absolute(template: &str) -> bool {
    Url::parse(&mask_expressions(template)).is_ok()
}

fn mask_expressions(value: &str) -> String {
    let mut masked = String::with_capacity(value.len());
    let mut last = 0;
    for expr in expressions(value) {
        masked.push_str(&value[last..expr.span.start]);
        masked.push('?');
        last = expr.span.end;
    }
    masked.push_str(&value[last..]);
    expression_language_re().replace_all(&masked, "?").into_owned()
}
