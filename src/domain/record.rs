//! Raw catalog records as returned by the search API
//!
//! One search hit carries everything known about a product at one store:
//! identity, descriptive fields, pricing/placement, category levels and
//! tag lists, plus optional serving and nutrition sub-structures. The
//! conversion into persisted rows lives here so the fetch and commit
//! paths share a single interpretation of the wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{NutrientCategory, NutritionFact, Product, Serving, StoreProduct};

/// Category membership at fixed depths, deepest level wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryLevels {
    pub lvl0: Option<String>,
    pub lvl1: Option<String>,
    pub lvl2: Option<String>,
    pub lvl3: Option<String>,
    pub lvl4: Option<String>,
}

impl CategoryLevels {
    /// Deepest populated level, which already contains the full
    /// ancestor-joined path ("Dairy > Milk > Whole Milk")
    pub fn deepest_path(&self) -> Option<&str> {
        [&self.lvl4, &self.lvl3, &self.lvl2, &self.lvl1, &self.lvl0]
            .into_iter()
            .find_map(|lvl| lvl.as_deref())
            .filter(|path| !path.trim().is_empty())
    }
}

/// Serving sub-structure of a search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServingInfo {
    pub size: Option<f64>,
    #[serde(rename = "sizeUom")]
    pub size_uom: Option<String>,
    #[serde(rename = "servingsPerContainer")]
    pub servings_per_container: Option<f64>,
}

/// One nutrient entry inside a hit's nutrition or vitamin list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientInfo {
    pub name: String,
    pub amount: Option<f64>,
    pub uom: Option<String>,
    #[serde(rename = "dailyValue")]
    pub daily_value: Option<f64>,
}

/// A single raw record from one search result page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "objectID", default)]
    pub object_id: String,
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub upc: Option<String>,
    pub price: Option<f64>,
    #[serde(rename = "salePrice")]
    pub sale_price: Option<f64>,
    pub aisle: Option<String>,
    pub shelf: Option<String>,
    pub available: Option<bool>,
    #[serde(default)]
    pub categories: CategoryLevels,
    #[serde(rename = "filterTags", default)]
    pub filter_tags: Vec<String>,
    #[serde(rename = "nutritionTags", default)]
    pub nutrition_tags: Vec<String>,
    pub serving: Option<ServingInfo>,
    #[serde(default)]
    pub nutrition: Vec<NutrientInfo>,
    #[serde(default)]
    pub vitamins: Vec<NutrientInfo>,
}

/// Persisted rows derived from one record
#[derive(Debug, Clone)]
pub struct CatalogRows {
    pub product: Product,
    pub store_product: StoreProduct,
    pub serving: Option<Serving>,
    pub nutrition_facts: Vec<NutritionFact>,
}

impl CatalogRecord {
    /// Product identifier, if the record carries a usable one
    pub fn product_id(&self) -> Option<&str> {
        self.product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Convert into persisted rows for the given store.
    ///
    /// Returns `None` for records without a product identifier; such
    /// records cannot be keyed and are dropped during validation.
    pub fn into_rows(self, store_number: &str, now: DateTime<Utc>) -> Option<CatalogRows> {
        let product_id = self.product_id()?.to_string();

        let product = Product {
            product_id: product_id.clone(),
            name: self.name,
            brand: self.brand,
            description: self.description,
            size: self.size,
            upc: self.upc,
            category_path: self.categories.deepest_path().map(str::to_string),
            filter_tags: self.filter_tags,
            nutrition_tags: self.nutrition_tags,
            updated_at: now,
        };

        let store_product = StoreProduct {
            product_id: product_id.clone(),
            store_number: store_number.to_string(),
            price: self.price,
            sale_price: self.sale_price,
            aisle: self.aisle,
            shelf: self.shelf,
            // A record present in the store's index counts as carried
            available: self.available.unwrap_or(true),
            last_updated: now,
        };

        let serving = self.serving.map(|s| Serving {
            product_id: product_id.clone(),
            size: s.size,
            size_uom: s.size_uom,
            servings_per_container: s.servings_per_container,
        });

        let mut nutrition_facts = Vec::with_capacity(self.nutrition.len() + self.vitamins.len());
        for (list, category) in [
            (self.nutrition, NutrientCategory::General),
            (self.vitamins, NutrientCategory::Vitamin),
        ] {
            for nutrient in list {
                if nutrient.name.trim().is_empty() {
                    continue;
                }
                nutrition_facts.push(NutritionFact {
                    product_id: product_id.clone(),
                    name: nutrient.name,
                    amount: nutrient.amount,
                    uom: nutrient.uom,
                    category,
                    daily_value: nutrient.daily_value,
                });
            }
        }

        Some(CatalogRows {
            product,
            store_product,
            serving,
            nutrition_facts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hit() -> serde_json::Value {
        serde_json::json!({
            "objectID": "obj-1001",
            "productId": "p-1001",
            "name": "Whole Milk",
            "brand": "Hilltop Farms",
            "size": "1 gal",
            "upc": "00496731",
            "price": 4.19,
            "salePrice": 3.99,
            "aisle": "A12",
            "available": true,
            "categories": {
                "lvl0": "Dairy",
                "lvl1": "Dairy > Milk",
                "lvl2": "Dairy > Milk > Whole Milk"
            },
            "filterTags": ["Organic", "Local"],
            "nutritionTags": ["High Calcium"],
            "serving": { "size": 240.0, "sizeUom": "ml", "servingsPerContainer": 15.8 },
            "nutrition": [ { "name": "Protein", "amount": 8.0, "uom": "g" } ],
            "vitamins": [ { "name": "Vitamin D", "dailyValue": 25.0 } ]
        })
    }

    #[test]
    fn test_deserialize_full_hit() {
        let record: CatalogRecord = serde_json::from_value(sample_hit()).unwrap();
        assert_eq!(record.object_id, "obj-1001");
        assert_eq!(record.product_id(), Some("p-1001"));
        assert_eq!(
            record.categories.deepest_path(),
            Some("Dairy > Milk > Whole Milk")
        );
        assert_eq!(record.filter_tags.len(), 2);
        assert_eq!(record.nutrition.len(), 1);
        assert_eq!(record.vitamins.len(), 1);
    }

    #[test]
    fn test_sparse_hit_defaults() {
        let record: CatalogRecord =
            serde_json::from_value(serde_json::json!({ "objectID": "obj-2", "productId": "p-2" }))
                .unwrap();
        assert!(record.filter_tags.is_empty());
        assert!(record.categories.deepest_path().is_none());
        assert!(record.serving.is_none());

        let rows = record.into_rows("254", Utc::now()).unwrap();
        assert!(rows.store_product.available);
        assert!(rows.product.category_path.is_none());
        assert!(rows.nutrition_facts.is_empty());
    }

    #[test]
    fn test_into_rows_maps_categories() {
        let record: CatalogRecord = serde_json::from_value(sample_hit()).unwrap();
        let now = Utc::now();
        let rows = record.into_rows("254", now).unwrap();

        assert_eq!(rows.product.product_id, "p-1001");
        assert_eq!(
            rows.product.category_path.as_deref(),
            Some("Dairy > Milk > Whole Milk")
        );
        assert_eq!(rows.store_product.store_number, "254");
        assert_eq!(rows.store_product.sale_price, Some(3.99));
        assert_eq!(rows.store_product.last_updated, now);

        let serving = rows.serving.unwrap();
        assert_eq!(serving.size_uom.as_deref(), Some("ml"));

        assert_eq!(rows.nutrition_facts.len(), 2);
        assert_eq!(rows.nutrition_facts[0].category, NutrientCategory::General);
        assert_eq!(rows.nutrition_facts[1].category, NutrientCategory::Vitamin);
        assert_eq!(rows.nutrition_facts[1].name, "Vitamin D");
    }

    #[test]
    fn test_missing_product_id_is_rejected() {
        let record: CatalogRecord =
            serde_json::from_value(serde_json::json!({ "objectID": "obj-3" })).unwrap();
        assert_eq!(record.product_id(), None);
        assert!(record.into_rows("254", Utc::now()).is_none());

        let blank: CatalogRecord = serde_json::from_value(
            serde_json::json!({ "objectID": "obj-4", "productId": "   " }),
        )
        .unwrap();
        assert!(blank.into_rows("254", Utc::now()).is_none());
    }
}
