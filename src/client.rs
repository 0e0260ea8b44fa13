//! Rate-limited, optionally cached forward geocoding client.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::ResponseCache;
use crate::config::{GeocoderOptions, ResolvedOptions};
use crate::error::{Error, Result};
use crate::models::{GeoResult, Query, RawResponse};
use crate::pacer::{PaceError, Pacer, PacerConfig};
use crate::query::{redacted_url, request_url, QueryParams};

/// Forward geocoding client.
///
/// Every call goes through one [`Pacer`], so concurrent calls on a shared
/// client are admitted in submission order. Successful responses are kept in a
/// [`ResponseCache`] when caching is enabled.
pub struct Geocoder {
    api_key: String,
    api_url: Url,
    http: Client,
    pacer: Pacer,
    cache: Option<ResponseCache>,
}

// The API key never shows up in debug output.
impl fmt::Debug for Geocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geocoder")
            .field("api_url", &self.api_url.as_str())
            .field("pacer", self.pacer.config())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Geocoder {
    /// Build a client from options, applying environment fallbacks
    pub fn new(options: GeocoderOptions) -> Result<Self> {
        GeocoderBuilder::new(options).build()
    }

    pub fn builder(options: GeocoderOptions) -> GeocoderBuilder {
        GeocoderBuilder::new(options)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Parameters that would be sent for `query`
    pub fn params(&self, query: impl Into<Query>) -> QueryParams {
        QueryParams::build(&self.api_key, &query.into().into_geo_query())
    }

    /// Forward geocode free text or a structured query.
    ///
    /// Never fails: transport errors, non-JSON responses and pacing errors
    /// come back as [`GeoResult::failure`] with `ok() == false`.
    pub async fn geocode(&self, query: impl Into<Query>) -> Arc<GeoResult> {
        let params = self.params(query);
        let url = request_url(&self.api_url, &params);
        let logged_url = redacted_url(&self.api_url, &params);

        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(&url)) {
            debug!("Cache hit for {}", logged_url);
            return hit;
        }

        debug!("Requesting {}", logged_url);

        let response = self
            .pacer
            .submit(|| self.http.get(url.as_str()).send())
            .await;

        let result = match response {
            Ok(Ok(response)) => {
                let status = response.status();
                match response.json::<RawResponse>().await {
                    Ok(body) => {
                        let result = Arc::new(GeoResult::from_body(body));
                        if let Some(cache) = &self.cache {
                            if result.status_code() == Some(200) {
                                cache.put(&url, result.clone());
                            }
                        }
                        result
                    }
                    Err(e) => {
                        warn!("Undecodable response body ({}) from {}: {}", status, logged_url, e);
                        Arc::new(GeoResult::failure(
                            Some(status.as_u16()),
                            status.canonical_reason().map(String::from),
                        ))
                    }
                }
            }
            Ok(Err(e)) => {
                // The error would otherwise echo the URL, key included
                let e = e.without_url();
                warn!("Request to {} failed: {}", logged_url, e);
                Arc::new(transport_failure(&e))
            }
            Err(e) => {
                warn!("Request to {} was not admitted: {}", logged_url, e);
                Arc::new(pace_failure(&e))
            }
        };

        if result.ok() {
            info!(
                "Geocoded {:?} -> {:?}",
                params.get("q").unwrap_or_default(),
                result.geo().coordinates()
            );
        }

        result
    }

    /// Geocode several queries concurrently, returning results in input order
    pub async fn geocode_all<I, Q>(&self, queries: I) -> Vec<Arc<GeoResult>>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<Query>,
    {
        join_all(queries.into_iter().map(|query| self.geocode(query))).await
    }
}

fn transport_failure(e: &reqwest::Error) -> GeoResult {
    let status = e.status();
    GeoResult::failure(
        status.map(|s| s.as_u16()),
        Some(
            status
                .and_then(|s| s.canonical_reason())
                .map(String::from)
                .unwrap_or_else(|| e.to_string()),
        ),
    )
}

fn pace_failure(e: &PaceError) -> GeoResult {
    GeoResult::failure(None, Some(e.to_string()))
}

/// Builder for [`Geocoder`] when the defaults need adjusting beyond
/// [`GeocoderOptions`]
pub struct GeocoderBuilder {
    options: ResolvedOptions,
    cache: Option<ResponseCache>,
    admission_timeout: Option<std::time::Duration>,
}

impl GeocoderBuilder {
    pub fn new(options: GeocoderOptions) -> Self {
        Self::from_resolved(options.resolve())
    }

    pub fn from_resolved(options: ResolvedOptions) -> Self {
        Self {
            options,
            cache: None,
            admission_timeout: None,
        }
    }

    /// Use `cache` instead of the process-wide one. Ignored when caching is off.
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Give up on calls that wait longer than this for a pacing slot
    pub fn admission_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.admission_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Geocoder> {
        let options = self.options;

        let api_url = Url::parse(&options.api_url).map_err(|source| Error::InvalidApiUrl {
            url: options.api_url.clone(),
            source,
        })?;

        let mut http = Client::builder().user_agent(options.user_agent.as_str());
        if let Some(timeout) = options.request_timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        let pacer = Pacer::new(PacerConfig {
            admission_timeout: self.admission_timeout,
            ..options.pacer
        })?;

        let cache = options
            .cached
            .then(|| self.cache.unwrap_or_else(ResponseCache::shared));

        if options.api_key.is_empty() {
            warn!("No API key configured; requests will likely be rejected");
        }

        Ok(Geocoder {
            api_key: options.api_key,
            api_url,
            http,
            pacer,
            cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ResolvedOptions {
        GeocoderOptions {
            api_key: Some("secret-key".into()),
            api_url: Some("https://geo.example.com/geocode/v1/json".into()),
            ..Default::default()
        }
        .resolve_with(|_| None)
    }

    #[test]
    fn test_params_for_text_query() {
        let geocoder = GeocoderBuilder::from_resolved(options()).build().unwrap();
        let params = geocoder.params("  Paris ");
        assert_eq!(
            params.serialize(),
            "q=Paris&limit=1&pretty=0&no_annotations=1&key=secret-key"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let geocoder = GeocoderBuilder::from_resolved(options()).build().unwrap();
        assert!(!format!("{:?}", geocoder).contains("secret-key"));
    }

    #[test]
    fn test_invalid_url() {
        let mut resolved = options();
        resolved.api_url = "not a url".into();
        assert!(matches!(
            GeocoderBuilder::from_resolved(resolved).build(),
            Err(Error::InvalidApiUrl { .. })
        ));
    }

    #[test]
    fn test_zero_pace_limit() {
        let mut resolved = options();
        resolved.pacer.limit = 0;
        assert!(matches!(
            GeocoderBuilder::from_resolved(resolved).build(),
            Err(Error::Pacing(PaceError::ZeroLimit))
        ));
    }

    #[test]
    fn test_cache_selection() {
        let geocoder = GeocoderBuilder::from_resolved(options()).build().unwrap();
        assert!(geocoder
            .cache()
            .is_some_and(|c| c.same_as(&ResponseCache::shared())));

        let private = ResponseCache::new();
        let geocoder = GeocoderBuilder::from_resolved(options())
            .cache(private.clone())
            .build()
            .unwrap();
        assert!(geocoder.cache().is_some_and(|c| c.same_as(&private)));

        let mut resolved = options();
        resolved.cached = false;
        let geocoder = GeocoderBuilder::from_resolved(resolved)
            .cache(private)
            .build()
            .unwrap();
        assert!(geocoder.cache().is_none());
    }
}
