//! Geo-IP record model.

use serde::{Deserialize, Serialize};

/// A single geo-IP entry as produced by a record source.
///
/// The `ip` field is the natural key used for deduplication and for the
/// uniqueness constraint of the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// Identifying key; a record with a blank ip is invalid
    pub ip: String,
    /// ISO country code
    pub country_code: String,
    /// Country name
    pub country: String,
    /// City name
    pub city: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Opaque numeric payload carried through unchanged
    pub mystery_value: i64,
}

/// An ordered group of records moving through the pipeline together.
pub type Batch = Vec<GeoRecord>;

impl GeoRecord {
    /// Creates a record with only the key set; remaining fields are empty/zero.
    pub fn with_ip(ip: impl Into<String>) -> Self {
        GeoRecord {
            ip: ip.into(),
            country_code: String::new(),
            country: String::new(),
            city: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            mystery_value: 0,
        }
    }

    /// A record is valid iff its key is non-empty after trimming whitespace.
    pub fn is_valid(&self) -> bool {
        !self.ip.trim().is_empty()
    }
}
