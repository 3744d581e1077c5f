// src/models/entry.rs

//! Business listings as returned by the search API and as written to the table.

use serde::{Deserialize, Serialize};

/// Column order of the output table.
pub const TABLE_HEADER: [&str; 11] = [
    "placeId",
    "title",
    "address",
    "latitude",
    "longitude",
    "rating",
    "ratingCount",
    "primaryType",
    "types",
    "website",
    "phoneNumber",
];

/// One place record from a search response page.
///
/// Every field is optional; entries without a `placeId` cannot be
/// deduplicated and are dropped before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceEntry {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<u64>,
    #[serde(default, rename = "type")]
    pub primary_type: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl PlaceEntry {
    /// The dedup key, if present and non-empty.
    pub fn key(&self) -> Option<&str> {
        self.place_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Map into an output row. Returns `None` when there is no usable key.
    pub fn into_row(self) -> Option<EntryRow> {
        let place_id = self.place_id.filter(|id| !id.is_empty())?;
        Some(EntryRow {
            place_id,
            title: self.title,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            rating: self.rating,
            rating_count: self.rating_count,
            primary_type: self.primary_type,
            types: self.types.unwrap_or_default().join(", "),
            website: self.website,
            phone_number: self.phone_number,
        })
    }
}

/// One row of the output table. Field order matches [`TABLE_HEADER`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow {
    pub place_id: String,
    pub title: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub primary_type: Option<String>,
    pub types: String,
    pub website: Option<String>,
    pub phone_number: Option<String>,
}
