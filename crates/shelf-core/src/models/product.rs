//! Product model

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, StoreError, StoreResult};

/// Upper bound of the rating scale
pub const MAX_RATING: f64 = 5.0;

/// Timestamp layout written by older clients (no zone, implicitly UTC)
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable identity of a product across both stores.
///
/// New products get a UUID v7 string. Keys that predate surrogate ids (older
/// documents were keyed by display name) are kept as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductKey(String);

impl ProductKey {
    /// Generate a fresh surrogate key
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parse a key, rejecting empty or whitespace-only input.
    ///
    /// The value is stored as given; legacy document ids may carry
    /// surrounding whitespace and must still address the same document.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, Error> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(Error::InvalidInput("product key cannot be empty".into()));
        }
        Ok(Self(value.to_string()))
    }

    /// Get the string representation of this key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProductKey> for String {
    fn from(key: ProductKey) -> Self {
        key.0
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier, never derived from display fields
    pub key: ProductKey,
    /// Display name (editable, not used for identity)
    pub name: String,
    pub category: String,
    pub sub_category: String,
    /// Link to the product page
    pub link: Option<String>,
    pub likes: u64,
    pub comments: u64,
    pub supplier_orders: u64,
    /// Rating in `[0, 5]`; clamping is the caller's job
    pub rating: f64,
    pub supplier_price: f64,
    pub store_price: f64,
    /// Last write instant; `None` sorts before every real timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create a new product with a generated key, stamped now
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::blank(ProductKey::generate(), name.into(), Some(now_millis()))
    }

    /// Create a product under an existing key, without a timestamp
    pub fn with_key(key: impl AsRef<str>, name: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::blank(ProductKey::parse(key)?, name.into(), None))
    }

    fn blank(key: ProductKey, name: String, updated_at: Option<DateTime<Utc>>) -> Self {
        Self {
            key,
            name,
            category: String::new(),
            sub_category: String::new(),
            link: None,
            likes: 0,
            comments: 0,
            supplier_orders: 0,
            rating: 0.0,
            supplier_price: 0.0,
            store_price: 0.0,
            updated_at,
        }
    }

    /// Restamp `updated_at` with the current instant
    pub fn touch(&mut self) {
        self.updated_at = Some(now_millis());
    }

    /// The freshness marker used for conflict resolution (epoch when unset)
    pub fn freshness(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or_default()
    }

    /// Strictly newer than `other`; equal timestamps are not newer
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.freshness() > other.freshness()
    }

    /// Check the constraints both stores enforce before a write
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::validation(format!(
                "product {} has no name",
                self.key
            )));
        }

        for (field, value) in [
            ("supplier_price", self.supplier_price),
            ("store_price", self.store_price),
            ("rating", self.rating),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StoreError::validation(format!(
                    "product {}: {field} must be a non-negative number, got {value}",
                    self.key
                )));
            }
        }

        if self.rating > MAX_RATING {
            return Err(StoreError::validation(format!(
                "product {}: rating {} exceeds {MAX_RATING}",
                self.key, self.rating
            )));
        }

        Ok(())
    }
}

/// Current instant truncated to millisecond precision.
///
/// Both stores keep milliseconds, so every stamp is truncated up front.
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

/// Drop sub-millisecond precision from an instant
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

/// Instant from Unix milliseconds as stored in SQLite
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Parse a freshness marker: RFC 3339, or the legacy `YYYY-MM-DD HH:MM:SS`
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(truncate_to_millis(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
