use thiserror::Error;

use crate::pacer::PaceError;

/// Errors raised while setting up a [`crate::Geocoder`].
///
/// Geocoding itself never fails; see [`crate::GeoResult::failure`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid API URL {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid pacing configuration: {0}")]
    Pacing(#[from] PaceError),

    #[error("failed to read config file: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
