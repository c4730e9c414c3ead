use crate::records::{Detail, GeoRecord};

/// Image shown when a photo URL cannot be displayed
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Photo {
    Url(String),
    /// The record had a photo we could not use
    Placeholder,
}

impl Photo {
    pub fn display_url(&self) -> &str {
        match self {
            Photo::Url(url) => url,
            Photo::Placeholder => PLACEHOLDER_IMAGE,
        }
    }
}

/// Renderable detail panel for one marker
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopupContent {
    pub title: String,
    /// "4.3"
    pub rating: Option<String>,
    /// "$$"
    pub price: Option<String>,
    /// "12 people here now"
    pub occupancy: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub todos: Vec<String>,
    pub photo: Option<Photo>,
    pub historical: bool,
}

/// Build popup content from data already on the record. Never fails.
pub fn build(record: &GeoRecord) -> PopupContent {
    let caps = record.capabilities();
    let photo = caps
        .has_photo
        .then(|| record.photo_url().map(photo_for))
        .flatten();

    match &record.detail {
        Detail::Venue(v) => PopupContent {
            title: v.name.clone(),
            rating: v.rating.filter(|_| caps.has_rating).map(|r| format!("{r:.1}")),
            price: v
                .price_tier
                .filter(|_| caps.has_price)
                .map(|tier| "$".repeat(tier as usize)),
            occupancy: v
                .occupancy
                .filter(|_| caps.has_occupancy)
                .map(|n| match n {
                    1 => "1 person here now".to_string(),
                    n => format!("{n} people here now"),
                }),
            description: None,
            address: None,
            todos: Vec::new(),
            photo,
            historical: false,
        },
        Detail::Historical(h) => PopupContent {
            title: h.name.clone(),
            rating: None,
            price: None,
            occupancy: None,
            description: Some(h.description.trim().to_string()).filter(|d| !d.is_empty()),
            address: h.address.clone(),
            todos: h.todos.clone(),
            photo,
            historical: caps.is_historical,
        },
    }
}

/// Only absolute http(s) URLs with a host are displayable
fn photo_for(url: &str) -> Photo {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest)
            if !rest.is_empty()
                && !rest.starts_with('/')
                && !url.chars().any(char::is_whitespace) =>
        {
            Photo::Url(url.to_string())
        }
        _ => Photo::Placeholder,
    }
}
