//! Derived category-tree and tag-frequency aggregation
//!
//! The builder accumulates observations of current products and produces
//! the full derived ontology in one pass. Counts are per distinct product,
//! so feeding the same product twice changes nothing, and a rebuild from
//! the current product set always replaces earlier aggregates instead of
//! accumulating on top of them.

use std::collections::{HashMap, HashSet};

use super::catalog::{CategoryNode, Product, TagEntry, TagType};
use super::constants::database::CATEGORY_PATH_DELIMITER;

#[derive(Debug, Clone, Copy)]
struct CategoryAccumulator {
    level: u32,
    product_count: u32,
}

/// Accumulates category and tag observations across a product set
#[derive(Debug, Default)]
pub struct OntologyBuilder {
    observed: HashSet<String>,
    categories: HashMap<String, CategoryAccumulator>,
    tags: HashMap<(String, TagType), u32>,
}

/// Finished aggregates, sorted for stable persistence and comparison
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OntologySnapshot {
    pub categories: Vec<CategoryNode>,
    pub tags: Vec<TagEntry>,
}

impl OntologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one product's current category path and tag lists.
    ///
    /// A product id is counted at most once no matter how often it is
    /// observed; products without category or tag data contribute nothing
    /// and are skipped without error.
    pub fn observe(
        &mut self,
        product_id: &str,
        category_path: Option<&str>,
        filter_tags: &[String],
        nutrition_tags: &[String],
    ) {
        if !self.observed.insert(product_id.to_string()) {
            return;
        }

        if let Some(path) = category_path {
            for (level, prefix) in path_prefixes(path) {
                let entry = self
                    .categories
                    .entry(prefix)
                    .or_insert(CategoryAccumulator {
                        level,
                        product_count: 0,
                    });
                entry.product_count += 1;
            }
        }

        // Duplicate tags within one product still count that product once
        let mut seen: HashSet<(&str, TagType)> = HashSet::new();
        for (list, tag_type) in [
            (filter_tags, TagType::Filter),
            (nutrition_tags, TagType::Nutrition),
        ] {
            for tag in list {
                let name = tag.trim();
                if name.is_empty() || !seen.insert((name, tag_type)) {
                    continue;
                }
                *self.tags.entry((name.to_string(), tag_type)).or_insert(0) += 1;
            }
        }
    }

    pub fn observe_product(&mut self, product: &Product) {
        self.observe(
            &product.product_id,
            product.category_path.as_deref(),
            &product.filter_tags,
            &product.nutrition_tags,
        );
    }

    /// Distinct products observed so far
    pub fn product_count(&self) -> usize {
        self.observed.len()
    }

    pub fn snapshot(self) -> OntologySnapshot {
        let mut categories: Vec<CategoryNode> = self
            .categories
            .into_iter()
            .map(|(path, acc)| {
                let name = path
                    .rsplit(CATEGORY_PATH_DELIMITER)
                    .next()
                    .unwrap_or(path.as_str())
                    .to_string();
                CategoryNode {
                    path,
                    name,
                    level: acc.level,
                    product_count: acc.product_count,
                }
            })
            .collect();
        categories.sort_by(|a, b| a.path.cmp(&b.path));

        let mut tags: Vec<TagEntry> = self
            .tags
            .into_iter()
            .map(|((name, tag_type), product_count)| TagEntry {
                name,
                tag_type,
                product_count,
            })
            .collect();
        tags.sort_by(|a, b| (a.tag_type, &a.name).cmp(&(b.tag_type, &b.name)));

        OntologySnapshot { categories, tags }
    }
}

/// Expand "Dairy > Milk > Whole Milk" into every ancestor prefix with its
/// 0-based depth: ("Dairy", 0), ("Dairy > Milk", 1), and the full path at 2.
fn path_prefixes(path: &str) -> Vec<(u32, String)> {
    let segments: Vec<&str> = path
        .split(CATEGORY_PATH_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut prefixes = Vec::with_capacity(segments.len());
    let mut current = String::new();
    for (level, segment) in segments.iter().enumerate() {
        if level > 0 {
            current.push_str(CATEGORY_PATH_DELIMITER);
        }
        current.push_str(segment);
        prefixes.push((level as u32, current.clone()));
    }
    prefixes
}

impl OntologySnapshot {
    pub fn category(&self, path: &str) -> Option<&CategoryNode> {
        self.categories.iter().find(|c| c.path == path)
    }

    pub fn tag(&self, name: &str, tag_type: TagType) -> Option<&TagEntry> {
        self.tags
            .iter()
            .find(|t| t.name == name && t.tag_type == tag_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_of(snapshot: &OntologySnapshot, path: &str) -> u32 {
        snapshot.category(path).map_or(0, |c| c.product_count)
    }

    #[test]
    fn test_prefix_expansion() {
        let prefixes = path_prefixes("Dairy > Milk > Whole Milk");
        assert_eq!(
            prefixes,
            vec![
                (0, "Dairy".to_string()),
                (1, "Dairy > Milk".to_string()),
                (2, "Dairy > Milk > Whole Milk".to_string()),
            ]
        );
        assert!(path_prefixes("  >  > ").is_empty());
    }

    #[test]
    fn test_shared_prefix_counts() {
        let mut builder = OntologyBuilder::new();
        builder.observe("p1", Some("Dairy > Milk"), &[], &[]);
        builder.observe("p2", Some("Dairy > Cheese"), &[], &[]);
        let snapshot = builder.snapshot();

        assert_eq!(count_of(&snapshot, "Dairy"), 2);
        assert_eq!(count_of(&snapshot, "Dairy > Milk"), 1);
        assert_eq!(count_of(&snapshot, "Dairy > Cheese"), 1);
        assert_eq!(snapshot.category("Dairy").unwrap().level, 0);
        assert_eq!(snapshot.category("Dairy > Milk").unwrap().level, 1);
        assert_eq!(snapshot.category("Dairy > Milk").unwrap().name, "Milk");
    }

    #[test]
    fn test_unrelated_product_leaves_counts_alone() {
        let mut builder = OntologyBuilder::new();
        builder.observe("p1", Some("Dairy > Milk"), &[], &[]);
        builder.observe("p2", Some("Dairy"), &[], &[]);
        builder.observe("p3", Some("Bakery > Bread"), &[], &[]);
        let snapshot = builder.snapshot();

        assert_eq!(count_of(&snapshot, "Dairy"), 2);
        assert_eq!(count_of(&snapshot, "Bakery"), 1);
    }

    #[test]
    fn test_tag_counts_are_distinct_products() {
        let mut builder = OntologyBuilder::new();
        builder.observe(
            "p1",
            None,
            &["Organic".to_string(), "Gluten Free".to_string()],
            &[],
        );
        builder.observe("p2", None, &["Organic".to_string()], &[]);
        let snapshot = builder.snapshot();

        assert_eq!(
            snapshot.tag("Organic", TagType::Filter).unwrap().product_count,
            2
        );
        assert_eq!(
            snapshot
                .tag("Gluten Free", TagType::Filter)
                .unwrap()
                .product_count,
            1
        );
        assert!(snapshot.tag("Organic", TagType::Nutrition).is_none());
    }

    #[test]
    fn test_duplicate_observations_count_once() {
        let mut builder = OntologyBuilder::new();
        builder.observe("p1", Some("Dairy"), &["Organic".to_string()], &[]);
        builder.observe("p1", Some("Dairy"), &["Organic".to_string()], &[]);
        // Duplicate tags inside one product likewise count once
        builder.observe(
            "p2",
            None,
            &["Organic".to_string(), "Organic".to_string()],
            &[],
        );
        let snapshot = builder.snapshot();

        assert_eq!(count_of(&snapshot, "Dairy"), 1);
        assert_eq!(
            snapshot.tag("Organic", TagType::Filter).unwrap().product_count,
            2
        );
    }

    #[test]
    fn test_same_name_different_type_stay_separate() {
        let mut builder = OntologyBuilder::new();
        builder.observe(
            "p1",
            None,
            &["High Protein".to_string()],
            &["High Protein".to_string()],
        );
        let snapshot = builder.snapshot();

        assert_eq!(
            snapshot
                .tag("High Protein", TagType::Filter)
                .unwrap()
                .product_count,
            1
        );
        assert_eq!(
            snapshot
                .tag("High Protein", TagType::Nutrition)
                .unwrap()
                .product_count,
            1
        );
    }

    #[test]
    fn test_rebuild_is_order_independent() {
        let observations = [
            ("p1", Some("Dairy > Milk"), vec!["Organic".to_string()]),
            ("p2", Some("Dairy"), vec![]),
            ("p3", Some("Bakery > Bread"), vec!["Organic".to_string()]),
        ];

        let mut forward = OntologyBuilder::new();
        for (id, path, tags) in &observations {
            forward.observe(id, *path, tags, &[]);
        }

        let mut reverse = OntologyBuilder::new();
        for (id, path, tags) in observations.iter().rev() {
            reverse.observe(id, *path, tags, &[]);
        }

        assert_eq!(forward.snapshot(), reverse.snapshot());
    }

    #[test]
    fn test_records_without_data_are_skipped() {
        let mut builder = OntologyBuilder::new();
        builder.observe("p1", None, &[], &[]);
        assert_eq!(builder.product_count(), 1);

        let snapshot = builder.snapshot();
        assert!(snapshot.categories.is_empty());
        assert!(snapshot.tags.is_empty());
    }
}
