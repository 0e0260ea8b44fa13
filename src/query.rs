//! Request parameter merging and URL assembly.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::models::GeoQuery;

/// Characters left unescaped, matching `encodeURIComponent`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parameters sent with every request unless the caller overrides them
pub const DEFAULT_PARAMS: &[(&str, &str)] = &[
    ("q", ""),
    ("limit", "1"),
    ("pretty", "0"),
    ("no_annotations", "1"),
];

const KEY_PARAM: &str = "key";

/// Insertion-ordered parameter map.
///
/// Re-inserting an existing name replaces its value but keeps its position, so
/// the serialized order is stable for a given set of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge defaults, the API key and the caller's query, later ones winning
    pub fn build(api_key: &str, query: &GeoQuery) -> Self {
        let mut params = Self::new();
        for (name, value) in DEFAULT_PARAMS {
            params.insert(*name, *value);
        }
        if !api_key.is_empty() {
            params.insert(KEY_PARAM, api_key);
        }
        for (name, value) in query.params() {
            params.insert(name, value);
        }
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `k1=v1&k2=v2...` with every name and value percent-encoded
    pub fn serialize(&self) -> String {
        encode_pairs(self.iter())
    }

    /// Same as [`Self::serialize`] with the API key value masked, for logging
    pub fn serialize_redacted(&self) -> String {
        encode_pairs(
            self.iter()
                .map(|(n, v)| if n == KEY_PARAM { (n, "***") } else { (n, v) }),
        )
    }
}

fn encode_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .map(|(n, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(n, COMPONENT),
                utf8_percent_encode(v, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Full request URL: `{api_url}?{params}`
pub fn request_url(api_url: &Url, params: &QueryParams) -> String {
    format!("{}?{}", api_url, params.serialize())
}

/// Request URL safe to write to logs
pub fn redacted_url(api_url: &Url, params: &QueryParams) -> String {
    format!("{}?{}", api_url, params.serialize_redacted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_then_key() {
        let params = QueryParams::build("secret", &GeoQuery::new("Paris"));
        assert_eq!(
            params.serialize(),
            "q=Paris&limit=1&pretty=0&no_annotations=1&key=secret"
        );
    }

    #[test]
    fn test_empty_key_is_omitted() {
        let params = QueryParams::build("", &GeoQuery::new("Paris"));
        assert_eq!(params.get("key"), None);
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_caller_overrides_keep_position() {
        let query = GeoQuery {
            pretty: Some(1),
            no_annotations: Some(0),
            ..GeoQuery::new("Rome")
        }
        .with_limit(5)
        .with_countrycode("it");
        let params = QueryParams::build("k", &query);

        assert_eq!(
            params.serialize(),
            "q=Rome&limit=5&pretty=1&no_annotations=0&key=k&countrycode=it"
        );
    }

    #[test]
    fn test_caller_key_overrides_client_key() {
        let query = GeoQuery {
            key: Some("per-request".into()),
            ..GeoQuery::new("Oslo")
        };
        let params = QueryParams::build("client", &query);
        assert_eq!(params.get("key"), Some("per-request"));
    }

    #[test]
    fn test_component_encoding() {
        let params =
            QueryParams::build("", &GeoQuery::new("Straße 1, München & co (it's *ok*!)~"));
        assert_eq!(
            params.serialize(),
            "q=Stra%C3%9Fe%201%2C%20M%C3%BCnchen%20%26%20co%20(it's%20*ok*!)~\
             &limit=1&pretty=0&no_annotations=1"
        );
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        let mut params = QueryParams::build("k/+=", &GeoQuery::new("a&b=c d+e/f"));
        params.insert("x y", "1");
        assert_eq!(
            params.serialize(),
            "q=a%26b%3Dc%20d%2Be%2Ff&limit=1&pretty=0&no_annotations=1&key=k%2F%2B%3D&x%20y=1"
        );
    }

    #[test]
    fn test_empty_query_is_serialized() {
        let params = QueryParams::build("", &GeoQuery::new(""));
        assert!(params.serialize().starts_with("q=&limit=1"));
    }

    #[test]
    fn test_redaction() {
        let api_url = Url::parse("https://api.example.com/geocode/v1/json").unwrap();
        let params = QueryParams::build("topsecret", &GeoQuery::new("Paris"));
        let logged = redacted_url(&api_url, &params);
        assert!(!logged.contains("topsecret"));
        assert!(logged.contains("key=***"));
        assert!(request_url(&api_url, &params).contains("key=topsecret"));
    }
}
