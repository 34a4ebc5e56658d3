//! Catalog response models
//!
//! Only the fields below are forwarded to clients; anything else the
//! upstream sends is dropped during decoding.

use serde::{Deserialize, Deserializer, Serialize};

/// Decode an explicit `null` the same way as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A movie as listed or as fetched in detail
///
/// List endpoints omit `runtime`, `genres` and `tagline`; they default.
/// Non-optional fields sent as `null` decode to their empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub release_date: String,
    pub runtime: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub genres: Vec<Genre>,
    pub tagline: Option<String>,
}

/// One page of movies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieResponse {
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Movie>,
}
