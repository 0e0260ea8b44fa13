//! Core data models for the geocoding client.

pub mod query;
pub mod result;

pub use query::{GeoQuery, Query};
pub use result::{
    Bounds, Candidate, GeoPoint, GeoResult, License, Rate, RawResponse, Status, StayInformed,
    Timestamp,
};
