//! Restaurant catalog and returning-user recommendations.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::message::{BotMessage, ProductPayload};

/// One restaurant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub business_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub cuisine: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub number_of_reviews: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

impl Restaurant {
    /// `Rating: 4.5 (120 reviews)` style line; `N/A` for unknown values.
    #[must_use]
    pub fn rating_line(&self) -> String {
        let rating = self
            .rating
            .map_or_else(|| "N/A".to_string(), |r| r.to_string());
        let reviews = self
            .number_of_reviews
            .map_or_else(|| "N/A".to_string(), |n| n.to_string());
        format!("{rating} ({reviews} reviews)")
    }

    /// Product card for this restaurant.
    #[must_use]
    pub fn to_product(&self) -> ProductPayload {
        ProductPayload {
            image_url: self.image_url.clone().unwrap_or_default(),
            name: self.name.clone(),
            price: self.price.clone().unwrap_or_default(),
            click_action: self.url.clone().unwrap_or_default(),
            button_label: "View details".to_string(),
        }
    }
}

/// In-memory restaurant catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    restaurants: Vec<Restaurant>,
}

impl Catalog {
    #[must_use]
    pub fn new(restaurants: Vec<Restaurant>) -> Self {
        Self { restaurants }
    }

    /// Parse a YAML list of restaurants.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let restaurants: Vec<Restaurant> =
            serde_yaml::from_str(raw).context("invalid restaurant catalog")?;
        Ok(Self::new(restaurants))
    }

    /// Load a YAML catalog from disk.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::from_yaml(&raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    /// Up to `size` distinct restaurants serving `cuisine`, catalog order.
    #[must_use]
    pub fn search_by_cuisine(&self, cuisine: &str, size: usize) -> Vec<&Restaurant> {
        let cuisine = cuisine.trim().to_lowercase();
        if cuisine.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<&Restaurant> = Vec::new();
        for restaurant in &self.restaurants {
            if hits.len() == size {
                break;
            }
            if restaurant.cuisine.trim().eq_ignore_ascii_case(&cuisine)
                && !hits.iter().any(|h| h.business_id == restaurant.business_id)
            {
                hits.push(restaurant);
            }
        }
        hits
    }
}

/// Recommendation text for a user coming back after a previous search.
#[must_use]
pub fn returning_user_message(location: &str, cuisine: &str, restaurants: &[&Restaurant]) -> String {
    if restaurants.is_empty() {
        return format!(
            "Welcome back! Last time you searched for {cuisine} food in {location}. \
             I couldn't find matches right now, but tell me a cuisine and I will search again."
        );
    }

    let lines: Vec<String> = restaurants
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let address = if r.address.is_empty() { "N/A" } else { &r.address };
            format!("{}. {}, located at {}", idx + 1, r.name, address)
        })
        .collect();

    format!(
        "Welcome back! Based on your last search for {cuisine} food in {location}, \
         here are some recommendations: {}",
        lines.join("; ")
    )
}

/// Summary text plus one product card per restaurant.
#[must_use]
pub fn recommendation_messages(
    location: &str,
    cuisine: &str,
    restaurants: &[&Restaurant],
) -> Vec<BotMessage> {
    let mut messages = vec![BotMessage::text(returning_user_message(
        location,
        cuisine,
        restaurants,
    ))];
    messages.extend(restaurants.iter().map(|r| {
        BotMessage::product(format!("{}: {}", r.name, r.rating_line()), r.to_product())
    }));
    messages
}
