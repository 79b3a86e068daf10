use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::constants::refresh::STALENESS_THRESHOLD_HOURS;

/// Store-independent product information shared across all stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub upc: Option<String>,
    /// Full ancestor-joined category path, e.g. "Dairy > Milk > Whole Milk"
    pub category_path: Option<String>,
    pub filter_tags: Vec<String>,
    pub nutrition_tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-store pricing, placement and availability for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreProduct {
    pub product_id: String,
    pub store_number: String,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub aisle: Option<String>,
    pub shelf: Option<String>,
    pub available: bool,
    pub last_updated: DateTime<Utc>,
}

/// Serving information, one row per product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Serving {
    pub product_id: String,
    pub size: Option<f64>,
    pub size_uom: Option<String>,
    pub servings_per_container: Option<f64>,
}

/// Nutrient class for a nutrition fact row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientCategory {
    General,
    Vitamin,
}

impl NutrientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Vitamin => "vitamin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "vitamin" => Self::Vitamin,
            _ => Self::General,
        }
    }
}

/// One nutrient row, keyed by (product, nutrient name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFact {
    pub product_id: String,
    pub name: String,
    pub amount: Option<f64>,
    pub uom: Option<String>,
    pub category: NutrientCategory,
    pub daily_value: Option<f64>,
}

/// A physical store location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(rename = "storeNumber")]
    pub store_number: String,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(rename = "hasPickup")]
    pub has_pickup: bool,
    #[serde(rename = "hasDelivery")]
    pub has_delivery: bool,
    /// Stamped by a successful catalog commit, absent until the first one
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Derived category-tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// Full ancestor-joined path, unique across the tree
    pub path: String,
    /// Last path segment
    pub name: String,
    /// 0-based depth (root categories are level 0)
    pub level: u32,
    pub product_count: u32,
}

/// Kind of tag list a tag came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Filter,
    Nutrition,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Nutrition => "nutrition",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "nutrition" => Self::Nutrition,
            _ => Self::Filter,
        }
    }
}

/// Derived tag-frequency entry, keyed by (name, type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub name: String,
    pub tag_type: TagType,
    pub product_count: u32,
}

/// Computed freshness snapshot for one store's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStatus {
    #[serde(rename = "storeNumber")]
    pub store_number: String,
    #[serde(rename = "isEmpty")]
    pub is_empty: bool,
    #[serde(rename = "isStale")]
    pub is_stale: bool,
    #[serde(rename = "productCount")]
    pub product_count: u32,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CatalogStatus {
    /// True when the catalog should be refreshed before serving queries
    pub fn needs_refresh(&self) -> bool {
        self.is_empty || self.is_stale
    }
}

/// Staleness predicate shared by status queries and refresh planning.
///
/// Absent timestamps are stale; present ones are stale strictly past the
/// 24 hour threshold, so a catalog aged exactly 24h is still fresh.
pub fn is_stale(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_updated {
        Some(ts) => now - ts > Duration::hours(STALENESS_THRESHOLD_HOURS),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_boundary() {
        let now = Utc::now();
        assert!(is_stale(None, now));
        assert!(is_stale(
            Some(now - Duration::hours(24) - Duration::seconds(1)),
            now
        ));
        assert!(!is_stale(Some(now - Duration::hours(23)), now));
        assert!(!is_stale(Some(now - Duration::hours(24)), now));
    }

    #[test]
    fn test_needs_refresh() {
        let fresh = CatalogStatus {
            store_number: "100".to_string(),
            is_empty: false,
            is_stale: false,
            product_count: 42,
            last_updated: Some(Utc::now()),
        };
        assert!(!fresh.needs_refresh());

        let empty = CatalogStatus {
            is_empty: true,
            product_count: 0,
            ..fresh.clone()
        };
        assert!(empty.needs_refresh());

        let stale = CatalogStatus {
            is_stale: true,
            ..fresh
        };
        assert!(stale.needs_refresh());
    }

    #[test]
    fn test_tag_type_round_trip() {
        assert_eq!(TagType::parse(TagType::Filter.as_str()), TagType::Filter);
        assert_eq!(
            TagType::parse(TagType::Nutrition.as_str()),
            TagType::Nutrition
        );
        assert_eq!(NutrientCategory::parse("vitamin"), NutrientCategory::Vitamin);
        assert_eq!(NutrientCategory::parse("anything"), NutrientCategory::General);
    }
}
