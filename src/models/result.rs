//! Normalized geocoding results.
//!
//! The raw API body is deserialized into [`RawResponse`] (every field optional)
//! and then mapped field by field into [`GeoResult`]. Transport failures map
//! into the same shape with only a status set, so callers handle a single type.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Geographic point. Both coordinates absent means no location is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl GeoPoint {
    pub const UNKNOWN: GeoPoint = GeoPoint {
        lat: None,
        lng: None,
    };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }

    /// Both coordinates as a pair, if both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }

    pub fn is_known(&self) -> bool {
        self.coordinates().is_some()
    }
}

/// API status block, or the transport status for failures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub code: Option<u16>,
    pub message: Option<String>,
}

/// Bounding box of a candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub northeast: GeoPoint,
    pub southwest: GeoPoint,
}

/// One candidate match
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Candidate {
    pub geometry: GeoPoint,
    pub formatted: String,
    pub confidence: Option<u8>,
    pub bounds: Option<Bounds>,
    /// Opaque annotation block (timezone, currency, ...), present unless disabled
    pub annotations: Option<serde_json::Value>,
    /// Opaque address components
    pub components: Option<serde_json::Value>,
}

/// Account rate limit as reported by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    /// Unix seconds at which `remaining` resets
    pub reset: Option<i64>,
}

impl Rate {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timestamp {
    pub created_http: Option<String>,
    pub created_unix: Option<i64>,
}

impl Timestamp {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_unix
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StayInformed {
    pub blog: Option<String>,
    pub twitter: Option<String>,
}

/// A field of the wrong shape decodes as absent instead of failing the body
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// JSON body as sent by the API. Nothing is assumed present.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawResponse {
    #[serde(deserialize_with = "lenient")]
    pub status: Option<Status>,
    #[serde(deserialize_with = "lenient")]
    pub total_results: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub results: Option<Vec<RawCandidate>>,
    #[serde(deserialize_with = "lenient")]
    pub rate: Option<Rate>,
    #[serde(deserialize_with = "lenient")]
    pub licenses: Option<Vec<License>>,
    #[serde(deserialize_with = "lenient")]
    pub documentation: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub thanks: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<Timestamp>,
    #[serde(deserialize_with = "lenient")]
    pub stay_informed: Option<StayInformed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCandidate {
    #[serde(deserialize_with = "lenient")]
    geometry: Option<GeoPoint>,
    #[serde(deserialize_with = "lenient")]
    formatted: Option<String>,
    #[serde(deserialize_with = "lenient")]
    confidence: Option<u8>,
    #[serde(deserialize_with = "lenient")]
    bounds: Option<Bounds>,
    annotations: Option<serde_json::Value>,
    components: Option<serde_json::Value>,
}

impl From<RawCandidate> for Candidate {
    fn from(raw: RawCandidate) -> Self {
        Self {
            geometry: raw.geometry.unwrap_or(GeoPoint::UNKNOWN),
            formatted: raw.formatted.unwrap_or_default(),
            confidence: raw.confidence,
            bounds: raw.bounds,
            annotations: raw.annotations,
            components: raw.components,
        }
    }
}

/// Immutable snapshot of one geocoding outcome.
///
/// `ok`, `geo` and `address` are derived on every call and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoResult {
    pub status: Option<Status>,
    pub total_results: Option<u64>,
    pub results: Vec<Candidate>,
    pub rate: Option<Rate>,
    pub licenses: Vec<License>,
    pub documentation: Option<String>,
    pub thanks: Option<String>,
    pub timestamp: Option<Timestamp>,
    pub stay_informed: Option<StayInformed>,
}

impl GeoResult {
    /// Map a parsed API body into a result
    pub fn from_body(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            total_results: raw.total_results,
            results: raw
                .results
                .unwrap_or_default()
                .into_iter()
                .map(Candidate::from)
                .collect(),
            rate: raw.rate,
            licenses: raw.licenses.unwrap_or_default(),
            documentation: raw.documentation,
            thanks: raw.thanks,
            timestamp: raw.timestamp,
            stay_informed: raw.stay_informed,
        }
    }

    /// Result for a request that never produced a JSON body
    pub fn failure(code: Option<u16>, message: Option<String>) -> Self {
        Self {
            status: Some(Status { code, message }),
            ..Default::default()
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status.as_ref().and_then(|s| s.code)
    }

    pub fn ok(&self) -> bool {
        ok(self)
    }

    pub fn geo(&self) -> GeoPoint {
        geo(self)
    }

    pub fn address(&self) -> &str {
        address(self)
    }
}

/// Status 200 with at least one reported result
pub fn ok(result: &GeoResult) -> bool {
    result.status_code() == Some(200) && result.total_results.is_some_and(|n| n > 0)
}

fn best(result: &GeoResult) -> Option<&Candidate> {
    if ok(result) {
        result.results.first()
    } else {
        None
    }
}

/// Geometry of the best candidate, or [`GeoPoint::UNKNOWN`]
pub fn geo(result: &GeoResult) -> GeoPoint {
    best(result).map_or(GeoPoint::UNKNOWN, |c| c.geometry)
}

/// Formatted address of the best candidate, or an empty string
pub fn address(result: &GeoResult) -> &str {
    best(result).map_or("", |c| c.formatted.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> GeoResult {
        GeoResult::from_body(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_single_match() {
        let result = parse(
            r#"{
                "status": {"code": 200, "message": "OK"},
                "total_results": 1,
                "results": [{
                    "geometry": {"lat": 48.8, "lng": 2.3},
                    "formatted": "Paris, France",
                    "confidence": 1,
                    "bounds": {
                        "northeast": {"lat": 48.9, "lng": 2.5},
                        "southwest": {"lat": 48.8, "lng": 2.2}
                    }
                }],
                "rate": {"limit": 2500, "remaining": 2499, "reset": 1700000000},
                "licenses": [{"name": "see attribution guide", "url": "https://opencagedata.com/credits"}],
                "timestamp": {"created_http": "Tue, 14 Nov 2023 22:13:20 GMT", "created_unix": 1700000000}
            }"#,
        );

        assert!(result.ok());
        assert_eq!(result.geo(), GeoPoint::new(48.8, 2.3));
        assert_eq!(result.address(), "Paris, France");
        assert_eq!(result.results[0].confidence, Some(1));
        assert_eq!(result.licenses.len(), 1);
        assert_eq!(
            result.rate.and_then(|r| r.reset_at()).map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert!(result.timestamp.as_ref().and_then(Timestamp::created).is_some());
    }

    #[test]
    fn test_no_match() {
        let result = parse(
            r#"{"status": {"code": 200, "message": "OK"}, "total_results": 0, "results": []}"#,
        );
        assert!(!result.ok());
        assert_eq!(result.geo(), GeoPoint::UNKNOWN);
        assert_eq!(result.address(), "");
    }

    #[test]
    fn test_api_error_status() {
        let result = parse(
            r#"{"status": {"code": 401, "message": "invalid API key"}, "total_results": 0, "results": []}"#,
        );
        assert!(!result.ok());
        assert_eq!(result.status_code(), Some(401));
    }

    #[test]
    fn test_results_without_count_is_not_ok() {
        let result = parse(
            r#"{"status": {"code": 200}, "results": [{"geometry": {"lat": 1.0, "lng": 2.0}}]}"#,
        );
        assert!(!result.ok());
        assert!(!result.geo().is_known());
    }

    #[test]
    fn test_failure_shape() {
        let result = GeoResult::failure(Some(503), Some("Service Unavailable".into()));
        assert!(!result.ok());
        assert_eq!(result.total_results, None);
        assert!(result.results.is_empty());
        assert_eq!(result.status_code(), Some(503));

        let result = GeoResult::failure(None, None);
        assert!(!result.ok());
        assert_eq!(result.address(), "");
    }

    #[test]
    fn test_missing_candidate_fields_default() {
        let result = parse(r#"{"status": {"code": 200}, "total_results": 1, "results": [{}]}"#);
        assert!(result.ok());
        assert_eq!(result.geo(), GeoPoint::UNKNOWN);
        assert_eq!(result.address(), "");
    }

    #[test]
    fn test_malformed_optional_fields_are_dropped() {
        let result = parse(
            r#"{
                "status": {"code": 200, "message": "OK"},
                "total_results": 1,
                "results": [{
                    "geometry": {"lat": 59.9, "lng": 10.7},
                    "formatted": "Oslo, Norway",
                    "confidence": 7.5,
                    "bounds": "n/a"
                }],
                "rate": {"limit": "unlimited"},
                "thanks": null
            }"#,
        );

        assert!(result.ok());
        assert_eq!(result.geo(), GeoPoint::new(59.9, 10.7));
        assert_eq!(result.address(), "Oslo, Norway");
        assert_eq!(result.results[0].confidence, None);
        assert_eq!(result.results[0].bounds, None);
        assert_eq!(result.rate, None);
        assert_eq!(result.thanks, None);
    }
}
