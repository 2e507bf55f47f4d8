//! Product encoding for the remote document collection.
//!
//! Documents use the Firestore REST value encoding: every field is an object
//! with exactly one typed member (`stringValue`, `integerValue`, ...).
//! Integers travel as decimal strings.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{StoreError, StoreResult};
use crate::models::{parse_timestamp, Product, ProductKey};

/// Field map of one document
pub type Fields = BTreeMap<String, Value>;

pub const FIELD_NAME: &str = "product_name";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_SUB_CATEGORY: &str = "sub_category";
pub const FIELD_LINK: &str = "product_link";
pub const FIELD_LIKES: &str = "likes";
pub const FIELD_COMMENTS: &str = "comments";
pub const FIELD_SUPPLIER_ORDERS: &str = "supplier_orders";
pub const FIELD_RATING: &str = "rating";
pub const FIELD_SUPPLIER_PRICE: &str = "supplier_price";
pub const FIELD_STORE_PRICE: &str = "store_price";
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// A stored document as returned by the REST API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name; its last segment is the document id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Document id from the resource name, percent-decoded
    pub fn id(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        let raw = name.rsplit('/').next().filter(|id| !id.is_empty())?;
        Some(
            urlencoding::decode(raw)
                .map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned),
        )
    }
}

/// Encode a product's fields; the key lives in the document id
pub fn encode(product: &Product) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_NAME.into(), string_value(&product.name));
    fields.insert(FIELD_CATEGORY.into(), string_value(&product.category));
    fields.insert(FIELD_SUB_CATEGORY.into(), string_value(&product.sub_category));
    fields.insert(
        FIELD_LINK.into(),
        product.link.as_deref().map_or_else(null_value, string_value),
    );
    fields.insert(FIELD_LIKES.into(), integer_value(product.likes));
    fields.insert(FIELD_COMMENTS.into(), integer_value(product.comments));
    fields.insert(
        FIELD_SUPPLIER_ORDERS.into(),
        integer_value(product.supplier_orders),
    );
    fields.insert(FIELD_RATING.into(), double_value(product.rating));
    fields.insert(
        FIELD_SUPPLIER_PRICE.into(),
        double_value(product.supplier_price),
    );
    fields.insert(FIELD_STORE_PRICE.into(), double_value(product.store_price));
    fields.insert(
        FIELD_UPDATED_AT.into(),
        product.updated_at.map_or_else(null_value, timestamp_value),
    );
    fields
}

/// Decode a document's fields into a product stored under `key`.
///
/// Missing fields take their zero value; integer and double encodings are
/// accepted interchangeably for numbers.
pub fn decode(key: &str, fields: &Fields) -> StoreResult<Product> {
    let key = ProductKey::parse(key)
        .map_err(|error| StoreError::malformed(format!("document id: {error}")))?;
    let field = |name: &'static str| Field {
        key: &key,
        name,
        value: fields.get(name),
    };

    Ok(Product {
        name: field(FIELD_NAME).string()?.unwrap_or_default(),
        category: field(FIELD_CATEGORY).string()?.unwrap_or_default(),
        sub_category: field(FIELD_SUB_CATEGORY).string()?.unwrap_or_default(),
        link: field(FIELD_LINK).string()?,
        likes: field(FIELD_LIKES).count()?,
        comments: field(FIELD_COMMENTS).count()?,
        supplier_orders: field(FIELD_SUPPLIER_ORDERS).count()?,
        rating: field(FIELD_RATING).number()?,
        supplier_price: field(FIELD_SUPPLIER_PRICE).number()?,
        store_price: field(FIELD_STORE_PRICE).number()?,
        updated_at: field(FIELD_UPDATED_AT).timestamp()?,
        key,
    })
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn integer_value(value: u64) -> Value {
    json!({ "integerValue": value.to_string() })
}

fn double_value(value: f64) -> Value {
    json!({ "doubleValue": value })
}

fn timestamp_value(value: DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn null_value() -> Value {
    json!({ "nullValue": null })
}

/// The one typed member of an encoded value
enum Typed<'a> {
    Null,
    String(&'a str),
    Integer(&'a Value),
    Double(&'a Value),
    Timestamp(&'a str),
    Other(&'a str),
}

struct Field<'a> {
    key: &'a ProductKey,
    name: &'a str,
    value: Option<&'a Value>,
}

impl<'a> Field<'a> {
    fn malformed(&self, detail: impl std::fmt::Display) -> StoreError {
        StoreError::malformed(format!("document {} field {}: {detail}", self.key, self.name))
    }

    fn typed(&self) -> StoreResult<Typed<'a>> {
        let Some(value) = self.value else {
            return Ok(Typed::Null);
        };
        let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next())
        else {
            return Err(self.malformed("expected a typed value object"));
        };

        Ok(match (kind.as_str(), inner) {
            ("nullValue", _) => Typed::Null,
            ("stringValue", Value::String(text)) => Typed::String(text),
            ("integerValue", number) => Typed::Integer(number),
            ("doubleValue", number) => Typed::Double(number),
            ("timestampValue", Value::String(text)) => Typed::Timestamp(text),
            (other, _) => Typed::Other(other),
        })
    }

    fn string(&self) -> StoreResult<Option<String>> {
        match self.typed()? {
            Typed::Null => Ok(None),
            Typed::String(text) => Ok(Some(text.to_string())),
            Typed::Other(kind) => Err(self.malformed(format!("unexpected {kind}"))),
            _ => Err(self.malformed("expected a string")),
        }
    }

    fn number(&self) -> StoreResult<f64> {
        let parsed = match self.typed()? {
            Typed::Null => return Ok(0.0),
            Typed::Integer(value) | Typed::Double(value) => match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| self.malformed("expected a number"))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&self) -> StoreResult<u64> {
        let parsed = match self.typed()? {
            Typed::Null => return Ok(0),
            Typed::Integer(Value::String(text)) => text.trim().parse::<u64>().ok(),
            Typed::Integer(Value::Number(number)) => number.as_u64(),
            Typed::Double(Value::Number(number)) => number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= 9.0e15)
                .map(|value| value as u64),
            _ => None,
        };
        parsed.ok_or_else(|| self.malformed("expected a non-negative integer"))
    }

    fn timestamp(&self) -> StoreResult<Option<DateTime<Utc>>> {
        match self.typed()? {
            Typed::Null => Ok(None),
            Typed::Timestamp(text) | Typed::String(text) => parse_timestamp(text)
                .map(Some)
                .ok_or_else(|| self.malformed(format!("unrecognized timestamp {text:?}"))),
            _ => Err(self.malformed("expected a timestamp")),
        }
    }
}
