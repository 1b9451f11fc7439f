//! Request URI parameters, exposed to expressions as the `uri` identifier.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use url::Url;

/// Path and query parameters of the current request.
///
/// Path parameters shadow query parameters of the same name. A parameter with
/// one value reads as that value, several values read as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriParameters {
    path: IndexMap<String, Vec<String>>,
    query: IndexMap<String, Vec<String>>,
}

impl UriParameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the query parameters of `url`.
    pub fn from_url(url: &Url) -> Self {
        url.query_pairs()
            .fold(Self::new(), |params, (name, value)| {
                params.with_query_param(name, value)
            })
    }

    /// Adds a path parameter value.
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Adds a query parameter value.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Returns the value of `name`, preferring path parameters.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.path
            .get(name)
            .or_else(|| self.query.get(name))
            .map(|values| to_value(values))
    }

    /// Returns `true` if there are no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.path.is_empty() && self.query.is_empty()
    }

    /// Renders every parameter into one object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (name, values) in self.query.iter().chain(self.path.iter()) {
            map.insert(name.clone(), to_value(values));
        }
        Value::Object(map)
    }
}

fn to_value(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_shadows_query() {
        let params = UriParameters::new()
            .with_query_param("id", "q")
            .with_path_param("id", "p");
        assert_eq!(params.get("id"), Some(json!("p")));
        assert_eq!(params.to_value(), json!({ "id": "p" }));
    }

    #[test]
    fn test_multiple_values_become_list() {
        let url = Url::parse("http://example.com/orders?tag=a&tag=b&page=2").unwrap();
        let params = UriParameters::from_url(&url);
        assert_eq!(params.get("tag"), Some(json!(["a", "b"])));
        assert_eq!(params.get("page"), Some(json!("2")));
        assert_eq!(params.get("missing"), None);
        assert!(!params.is_empty());
    }
}
