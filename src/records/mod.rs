//! Point records shown on the map.
//!
//! Both sources are normalized into [`GeoRecord`] so the filter, registry and
//! popup code never look at wire shapes.

mod normalize;

pub use normalize::{normalize, Normalized};

use std::fmt;
use std::sync::Arc;

use crate::geo::Coordinate;

/// The two independent origins of records, reconciled separately
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Venues,
    Historical,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Venues, SourceKind::Historical];

    /// Endpoint path relative to the API base
    pub fn endpoint(self) -> &'static str {
        match self {
            SourceKind::Venues => "/api/trending-venues",
            SourceKind::Historical => "/api/historical-places",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Venues => "trending venues",
            SourceKind::Historical => "historical places",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Venue category as exposed by the venues endpoint (`categoryEnum`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Food,
    CoffeeShop,
    NightlifeSpot,
    EventVenue,
    Hotel,
    Shop,
}

impl Category {
    /// Sidebar order
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::CoffeeShop,
        Category::NightlifeSpot,
        Category::EventVenue,
        Category::Hotel,
        Category::Shop,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Category::Food => "FOOD",
            Category::CoffeeShop => "COFFEE_SHOP",
            Category::NightlifeSpot => "NIGHTLIFE_SPOT",
            Category::EventVenue => "EVENT_VENUE",
            Category::Hotel => "HOTEL",
            Category::Shop => "SHOP",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.wire_name() == name)
    }

    /// Label shown in the sidebar
    pub fn display_name(self) -> &'static str {
        match self {
            Category::Food => "Restaurants",
            Category::CoffeeShop => "Cafes",
            Category::NightlifeSpot => "Lounges",
            Category::EventVenue => "Events",
            Category::Hotel => "Hotels",
            Category::Shop => "Shopping",
        }
    }

    /// Classify a free-form venue category name ("Lebanese Restaurant",
    /// "Shopping Mall", ...) by keyword. Checked in a fixed order, so
    /// "Coffee Shop" is a cafe and not a shop.
    pub fn classify(name: &str) -> Option<Self> {
        const RULES: [(Category, &[&str]); 6] = [
            (Category::CoffeeShop, &["cafe", "café", "coffee", "tea", "bakery"]),
            (
                Category::Food,
                &[
                    "restaurant", "food", "pizzeria", "steakhouse", "burger", "breakfast",
                    "juice bar", "hookah", "dining",
                ],
            ),
            (Category::NightlifeSpot, &["lounge", "bar"]),
            (Category::Shop, &["shop", "mall", "plaza", "store", "business center"]),
            (Category::Hotel, &["hotel", "resort", "inn", "accommodation"]),
            (
                Category::EventVenue,
                &[
                    "event", "festival", "historic", "park", "trail", "gym", "studio", "golf",
                    "airport", "terminal", "city", "village",
                ],
            ),
        ];

        let lower = name.to_lowercase();
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(category, _)| *category)
    }
}

/// Identifier of a record, unique within its source set
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VenueDetail {
    pub name: String,
    /// Five-point scale
    pub rating: Option<f64>,
    /// 1 (cheap) to 4 (very expensive)
    pub price_tier: Option<u8>,
    /// People checked in right now
    pub occupancy: Option<u32>,
    pub photo_url: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalDetail {
    pub name: String,
    pub description: String,
    pub address: Option<String>,
    pub todos: Vec<String>,
    pub photo_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Detail {
    Venue(VenueDetail),
    Historical(HistoricalDetail),
}

/// What a popup can show for a record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_rating: bool,
    pub has_price: bool,
    pub has_occupancy: bool,
    pub has_photo: bool,
    pub is_historical: bool,
}

/// Uniform point shape shared by both sources. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoRecord {
    pub id: RecordId,
    pub coordinate: Coordinate,
    pub category: Option<Category>,
    pub detail: Detail,
}

impl GeoRecord {
    pub fn name(&self) -> &str {
        match &self.detail {
            Detail::Venue(v) => &v.name,
            Detail::Historical(h) => &h.name,
        }
    }

    pub fn is_historical(&self) -> bool {
        matches!(self.detail, Detail::Historical(_))
    }

    pub fn photo_url(&self) -> Option<&str> {
        match &self.detail {
            Detail::Venue(v) => v.photo_url.as_deref(),
            Detail::Historical(h) => h.photo_url.as_deref(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match &self.detail {
            Detail::Venue(v) => Capabilities {
                has_rating: v.rating.is_some(),
                has_price: v.price_tier.is_some(),
                has_occupancy: v.occupancy.is_some(),
                has_photo: v.photo_url.is_some(),
                is_historical: false,
            },
            Detail::Historical(h) => Capabilities {
                has_photo: h.photo_url.is_some(),
                is_historical: true,
                ..Capabilities::default()
            },
        }
    }
}

/// A fetched record set; replaced wholesale, never patched
pub type RecordSet = Arc<[Arc<GeoRecord>]>;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn venue(id: &str, category: Option<Category>, lat: f64, lng: f64) -> Arc<GeoRecord> {
        Arc::new(GeoRecord {
            id: RecordId::from(id),
            coordinate: Coordinate::from_lat_lng(lat, lng).unwrap(),
            category,
            detail: Detail::Venue(VenueDetail {
                name: format!("Venue {id}"),
                rating: Some(4.2),
                price_tier: Some(2),
                occupancy: Some(7),
                photo_url: None,
                icon_url: None,
            }),
        })
    }

    pub fn historical(id: &str, lat: f64, lng: f64) -> Arc<GeoRecord> {
        Arc::new(GeoRecord {
            id: RecordId::from(id),
            coordinate: Coordinate::from_lat_lng(lat, lng).unwrap(),
            category: None,
            detail: Detail::Historical(HistoricalDetail {
                name: format!("Place {id}"),
                description: "Old mud-brick fort".to_string(),
                address: None,
                todos: Vec::new(),
                photo_url: None,
            }),
        })
    }
}
