//! Forward geocoding query parameters.

use serde::{Deserialize, Serialize};

/// Structured forward geocoding request.
///
/// Only `q` is required. Every optional field left as `None` is omitted from
/// the request, so the client defaults (and the API's own defaults) apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoQuery {
    /// Free-text place description
    pub q: String,
    /// Overrides the client's API key for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbrv: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_request: Option<u8>,
    /// Bounding box hint: "min_lng,min_lat,max_lng,max_lat"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<String>,
    /// Comma-separated ISO 3166-1 alpha-2 codes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countrycode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Confidence threshold, 1 to 10
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_annotations: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_dedupe: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_record: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretty: Option<u8>,
    /// Proximity hint: "lat,lng"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roadinfo: Option<u8>,
}

impl GeoQuery {
    /// Create a query for the given place text with no other overrides
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn with_countrycode(mut self, countrycode: impl Into<String>) -> Self {
        self.countrycode = Some(countrycode.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_bounds(mut self, bounds: impl Into<String>) -> Self {
        self.bounds = Some(bounds.into());
        self
    }

    pub fn with_proximity(mut self, lat: f64, lng: f64) -> Self {
        self.proximity = Some(format!("{},{}", lat, lng));
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Caller-set parameters in field declaration order.
    ///
    /// `q` is always present; optional fields appear only when set.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("q", self.q.clone())];

        fn push<T: ToString>(
            out: &mut Vec<(&'static str, String)>,
            name: &'static str,
            value: &Option<T>,
        ) {
            if let Some(v) = value {
                out.push((name, v.to_string()));
            }
        }

        push(&mut out, "key", &self.key);
        push(&mut out, "abbrv", &self.abbrv);
        push(&mut out, "add_request", &self.add_request);
        push(&mut out, "bounds", &self.bounds);
        push(&mut out, "countrycode", &self.countrycode);
        push(&mut out, "language", &self.language);
        push(&mut out, "limit", &self.limit);
        push(&mut out, "min_confidence", &self.min_confidence);
        push(&mut out, "no_annotations", &self.no_annotations);
        push(&mut out, "no_dedupe", &self.no_dedupe);
        push(&mut out, "no_record", &self.no_record);
        push(&mut out, "pretty", &self.pretty);
        push(&mut out, "proximity", &self.proximity);
        push(&mut out, "roadinfo", &self.roadinfo);

        out
    }
}

/// Input accepted by [`crate::Geocoder::geocode`]: free text or a structured query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Text(String),
    Structured(GeoQuery),
}

impl Query {
    /// Resolve into a structured query. Free text is trimmed into `q`.
    pub fn into_geo_query(self) -> GeoQuery {
        match self {
            Query::Text(text) => GeoQuery::new(text.trim()),
            Query::Structured(query) => query,
        }
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::Text(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::Text(text)
    }
}

impl From<&String> for Query {
    fn from(text: &String) -> Self {
        Query::Text(text.clone())
    }
}

impl From<GeoQuery> for Query {
    fn from(query: GeoQuery) -> Self {
        Query::Structured(query)
    }
}
