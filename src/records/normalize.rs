use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use simd_json::OwnedValue;
use tracing::{debug, warn};

use crate::geo::Coordinate;
use crate::records::{
    Category, Detail, GeoRecord, HistoricalDetail, RecordId, SourceKind, VenueDetail,
};

/// Records below this count are normalized on a single rayon job
const PAR_MIN_LEN: usize = 64;

/// Result of normalizing one response body
#[derive(Debug, Default)]
pub struct Normalized {
    /// Valid records in response order
    pub records: Vec<Arc<GeoRecord>>,
    /// Records dropped for missing geometry, missing id or duplicate id
    pub dropped: usize,
    /// The body was not a JSON array at all
    pub malformed_payload: bool,
}

/// Convert a raw response body into records.
///
/// Never fails: a body that is not a JSON array yields no records and sets
/// `malformed_payload`; individual broken records are skipped.
///
/// Axis order is fixed per source. Venues carry a named
/// `location { lat, lng }` object, historical places a `coordinates` array in
/// `[lat, lng]` order.
pub fn normalize(kind: SourceKind, payload: &[u8]) -> Normalized {
    // simd-json parses in place
    let mut buf = payload.to_vec();
    let raw: Vec<OwnedValue> = match simd_json::serde::from_slice(&mut buf) {
        Ok(values) => values,
        Err(e) => {
            warn!(source = %kind, error = %e, "response is not a JSON array of records");
            return Normalized {
                malformed_payload: true,
                ..Normalized::default()
            };
        }
    };

    let total = raw.len();
    let parsed: Vec<Option<GeoRecord>> = raw
        .into_par_iter()
        .with_min_len(PAR_MIN_LEN)
        .map(|value| normalize_value(kind, value))
        .collect();

    let mut seen = HashSet::with_capacity(parsed.len());
    let records: Vec<Arc<GeoRecord>> = parsed
        .into_iter()
        .flatten()
        .filter(|record| seen.insert(record.id.clone()))
        .map(Arc::new)
        .collect();

    let dropped = total - records.len();
    if dropped > 0 {
        debug!(source = %kind, dropped, kept = records.len(), "skipped malformed records");
    }

    Normalized {
        records,
        dropped,
        malformed_payload: false,
    }
}

fn normalize_value(kind: SourceKind, value: OwnedValue) -> Option<GeoRecord> {
    match kind {
        SourceKind::Venues => simd_json::serde::from_owned_value::<RawVenue>(value)
            .ok()
            .and_then(RawVenue::into_record),
        SourceKind::Historical => simd_json::serde::from_owned_value::<RawPlace>(value)
            .ok()
            .and_then(RawPlace::into_record),
    }
}

/// Field value that may arrive in a shape other than the one expected
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(IgnoredAny),
}

impl<T> Lenient<T> {
    fn into_value(self) -> Option<T> {
        match self {
            Lenient::Value(v) => Some(v),
            Lenient::Other(_) => None,
        }
    }
}

/// Optional field: null or an unexpected shape reads as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Lenient<T>>::deserialize(deserializer)?.and_then(Lenient::into_value))
}

/// Optional list: null or a non-array reads as empty, bad items are skipped
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(lenient::<D, Vec<Lenient<T>>>(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(Lenient::into_value)
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_record_id(self) -> Option<RecordId> {
        let s = match self {
            RawId::Text(s) => s.trim().to_string(),
            RawId::Number(n) => n.to_string(),
        };
        (!s.is_empty()).then_some(RecordId(s))
    }
}

#[derive(Deserialize)]
struct RawLatLng {
    lat: f64,
    lng: f64,
}

/// A number, possibly sent as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn value(&self) -> Option<f64> {
        match self {
            RawNumber::Number(n) => Some(*n),
            RawNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Detailed { tier: RawNumber },
    Tier(f64),
    Label(String),
}

impl RawPrice {
    fn tier(&self) -> Option<u8> {
        let tier = match self {
            RawPrice::Detailed { tier: RawNumber::Text(label) } | RawPrice::Label(label) => {
                let label = label.trim();
                match label.to_lowercase().as_str() {
                    "cheap" => 1,
                    "moderate" => 2,
                    "expensive" => 3,
                    "very expensive" => 4,
                    _ if !label.is_empty() && label.chars().all(|c| c == '$') => {
                        label.len() as i64
                    }
                    _ => label.parse::<i64>().ok()?,
                }
            }
            RawPrice::Detailed { tier: RawNumber::Number(tier) } | RawPrice::Tier(tier) => {
                if tier.fract() != 0.0 {
                    return None;
                }
                *tier as i64
            }
        };
        (1..=4).contains(&tier).then_some(tier as u8)
    }
}

#[derive(Deserialize)]
struct RawHereNow {
    #[serde(default, deserialize_with = "lenient")]
    count: Option<RawNumber>,
}

#[derive(Deserialize)]
struct RawImagePart {
    prefix: String,
    suffix: String,
}

#[derive(Deserialize)]
struct RawPhotoGroup {
    #[serde(default, deserialize_with = "lenient_list")]
    items: Vec<RawImagePart>,
}

#[derive(Deserialize)]
struct RawPhotos {
    #[serde(default, deserialize_with = "lenient_list")]
    groups: Vec<RawPhotoGroup>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Name(String),
    Full {
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        icon: Option<RawImagePart>,
    },
}

impl RawCategory {
    fn name(&self) -> Option<&str> {
        match self {
            RawCategory::Name(name) => Some(name),
            RawCategory::Full { name, .. } => name.as_deref(),
        }
    }

    fn icon(&self) -> Option<&RawImagePart> {
        match self {
            RawCategory::Name(_) => None,
            RawCategory::Full { icon, .. } => icon.as_ref(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVenue {
    id: RawId,
    location: Option<RawLatLng>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    rating: Option<RawNumber>,
    #[serde(default, deserialize_with = "lenient")]
    price: Option<RawPrice>,
    #[serde(default, deserialize_with = "lenient")]
    here_now: Option<RawHereNow>,
    #[serde(default, deserialize_with = "lenient")]
    photos: Option<RawPhotos>,
    #[serde(default, deserialize_with = "lenient_list")]
    categories: Vec<RawCategory>,
    #[serde(default, deserialize_with = "lenient")]
    category_enum: Option<String>,
}

impl RawVenue {
    fn into_record(self) -> Option<GeoRecord> {
        let id = self.id.into_record_id()?;
        let location = self.location?;
        let coordinate = Coordinate::from_lat_lng(location.lat, location.lng)?;

        let category = self
            .category_enum
            .as_deref()
            .and_then(Category::from_wire)
            .or_else(|| {
                self.categories
                    .first()
                    .and_then(RawCategory::name)
                    .and_then(Category::classify)
            });

        let photo_url = self
            .photos
            .as_ref()
            .and_then(|p| p.groups.first())
            .and_then(|g| g.items.first())
            .map(|item| format!("{}200x200{}", item.prefix, item.suffix));

        let icon_url = self
            .categories
            .first()
            .and_then(RawCategory::icon)
            .map(|icon| format!("{}88{}", icon.prefix, icon.suffix));

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.0.clone());

        Some(GeoRecord {
            id,
            coordinate,
            category,
            detail: Detail::Venue(VenueDetail {
                name,
                rating: self
                    .rating
                    .as_ref()
                    .and_then(RawNumber::value)
                    .and_then(five_point_rating),
                price_tier: self.price.as_ref().and_then(RawPrice::tier),
                occupancy: self
                    .here_now
                    .and_then(|h| h.count)
                    .as_ref()
                    .and_then(RawNumber::value)
                    .and_then(head_count),
                photo_url,
                icon_url,
            }),
        })
    }
}

#[derive(Deserialize)]
struct RawPlace {
    place: String,
    coordinates: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<String>,
    /// Street address; sometimes an object, which is ignored
    #[serde(default, deserialize_with = "lenient")]
    location: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    todos: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    img: Option<String>,
}

impl RawPlace {
    fn into_record(self) -> Option<GeoRecord> {
        let name = self.place.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let coordinate = match self.coordinates.as_deref() {
            Some(&[lat, lng, ..]) => Coordinate::from_lat_lng(lat, lng)?,
            _ => return None,
        };
        let address = self
            .location
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Some(GeoRecord {
            id: RecordId(name.clone()),
            coordinate,
            category: None,
            detail: Detail::Historical(HistoricalDetail {
                name,
                description: self.description.unwrap_or_default(),
                address,
                todos: self.todos,
                photo_url: self.img.filter(|s| !s.trim().is_empty()),
            }),
        })
    }
}

/// Ratings above 5 come from the ten-point scale and are halved
fn five_point_rating(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        None
    } else if raw <= 5.0 {
        Some(raw)
    } else if raw <= 10.0 {
        Some(raw / 2.0)
    } else {
        None
    }
}

fn head_count(raw: f64) -> Option<u32> {
    (raw.is_finite() && raw >= 0.0 && raw <= u32::MAX as f64).then_some(raw as u32)
}
