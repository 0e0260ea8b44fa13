//! OCD Geocoder - a paced, cached client for the OpenCage forward geocoding API
//!
//! Queries are merged with defaults and the API key into a request URL, admitted
//! through a moving-window [`Pacer`], optionally answered from a
//! [`ResponseCache`], and normalized into a [`GeoResult`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pacer;
pub mod query;

pub use cache::ResponseCache;
pub use client::{Geocoder, GeocoderBuilder};
pub use config::GeocoderOptions;
pub use error::{Error, Result};
pub use models::{GeoPoint, GeoQuery, GeoResult, Query};
pub use pacer::{PaceError, Pacer, PacerConfig, Throttle};
