//! Query-parameter maps and their serialization.

use std::fmt;

use url::form_urlencoded;

/// A single query-parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Null and empty text are dropped from the query string.
    fn is_skipped(&self) -> bool {
        match self {
            ParamValue::Null => true,
            ParamValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Scalars render the way a JavaScript `String()` call would; nested lists
/// are comma-joined.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !matches!(item, ParamValue::Null) {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

macro_rules! param_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::Number(value.into())
            }
        })*
    };
}

param_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for ParamValue {
    /// Non-finite floats have no JSON number form and fall back to text.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(ParamValue::Number)
            .unwrap_or_else(|| ParamValue::Text(value.to_string()))
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ParamValue::Null,
            Value::String(s) => ParamValue::Text(s),
            Value::Number(n) => ParamValue::Number(n),
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Array(items) => ParamValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(_) => ParamValue::Text(value.to_string()),
        }
    }
}

/// Insertion-ordered map of query parameters. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style `insert`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds params from a JSON object, keeping the object's key order.
    /// Returns `None` for any other JSON value.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(map.into_iter().collect()),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Serializes `params` into an `application/x-www-form-urlencoded` query
/// string without a leading `?`.
pub fn convert_params(params: &Params) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        if value.is_skipped() {
            continue;
        }
        match value {
            ParamValue::List(items) => {
                for item in items.iter().filter(|item| !item.is_skipped()) {
                    query.append_pair(key, &item.to_string());
                }
            }
            other => {
                query.append_pair(key, &other.to_string());
            }
        }
    }
    query.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_map_yields_empty_string() {
        assert_eq!(convert_params(&Params::new()), "");
    }

    #[test]
    fn skips_null_and_empty_values() {
        let params = Params::new()
            .with("a", ParamValue::Null)
            .with("b", "")
            .with("c", "kept");
        assert_eq!(convert_params(&params), "c=kept");
    }

    #[test]
    fn lists_repeat_key_in_order() {
        let params = Params::from_json(json!({"a": "1", "b": [null, "2", 3]})).unwrap();
        assert_eq!(convert_params(&params), "a=1&b=2&b=3");
    }

    #[test]
    fn list_elements_follow_skip_rule() {
        let params = Params::new().with("tag", vec![Some("x"), None, Some(""), Some("y")]);
        assert_eq!(convert_params(&params), "tag=x&tag=y");
    }

    #[test]
    fn scalars_are_stringified() {
        let params = Params::new()
            .with("n", 0)
            .with("f", 1.5)
            .with("yes", true)
            .with("no", false);
        assert_eq!(convert_params(&params), "n=0&f=1.5&yes=true&no=false");
    }

    #[test]
    fn values_are_form_encoded() {
        let params = Params::new().with("q", "a b&c=d/é");
        assert_eq!(convert_params(&params), "q=a+b%26c%3Dd%2F%C3%A9");
    }

    #[test]
    fn insertion_order_is_preserved_and_insert_replaces() {
        let params = Params::new().with("z", "1").with("a", "2").with("z", "3");
        assert_eq!(convert_params(&params), "z=3&a=2");
    }

    #[test]
    fn nested_list_is_comma_joined() {
        let params = Params::from_json(json!({"m": [[1, 2], "x"]})).unwrap();
        assert_eq!(convert_params(&params), "m=1%2C2&m=x");
    }

    #[test]
    fn from_json_keeps_object_key_order() {
        let params = Params::from_json(json!({"z": "1", "a": "2", "m": [3, 4]})).unwrap();
        assert_eq!(convert_params(&params), "z=1&a=2&m=3&m=4");

        let parsed: serde_json::Value = serde_json::from_str(r#"{"page": 2, "limit": 10}"#).unwrap();
        let params = Params::from_json(parsed).unwrap();
        assert_eq!(convert_params(&params), "page=2&limit=10");
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert!(Params::from_json(json!([1, 2])).is_none());
    }
}
