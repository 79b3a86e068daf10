//! Property tests for ontology derivation
//!
//! The ontology must behave as a pure function of the current product
//! set: deterministic, order-independent, immune to duplicate product
//! observations, with every count bounded by the distinct product count.

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;

use shelfsync::domain::catalog::Product;
use shelfsync::domain::ontology::{OntologyBuilder, OntologySnapshot};

fn arb_product() -> impl Strategy<Value = Product> {
    let segment = prop::sample::select(vec![
        "Dairy", "Milk", "Cheese", "Bakery", "Bread", "Produce", "Frozen",
    ]);
    let path = prop::collection::vec(segment, 0..4).prop_map(|segments| {
        if segments.is_empty() {
            None
        } else {
            Some(segments.join(" > "))
        }
    });
    let tag = prop::sample::select(vec!["Organic", "Vegan", "Local", "Gluten Free"]);
    let tags = prop::collection::vec(tag, 0..3);

    ("p[0-9]{1,3}", path, tags.clone(), tags).prop_map(
        |(product_id, category_path, filter_tags, nutrition_tags)| Product {
            product_id,
            name: None,
            brand: None,
            description: None,
            size: None,
            upc: None,
            category_path,
            filter_tags: filter_tags.into_iter().map(String::from).collect(),
            nutrition_tags: nutrition_tags.into_iter().map(String::from).collect(),
            updated_at: Utc::now(),
        },
    )
}

fn build(products: &[Product]) -> OntologySnapshot {
    let mut builder = OntologyBuilder::new();
    for product in products {
        builder.observe_product(product);
    }
    builder.snapshot()
}

proptest! {
    #[test]
    fn rebuild_is_deterministic(products in prop::collection::vec(arb_product(), 0..40)) {
        prop_assert_eq!(build(&products), build(&products));
    }

    #[test]
    fn rebuild_is_order_independent(products in prop::collection::vec(arb_product(), 0..40)) {
        let reversed: Vec<Product> = products.iter().rev().cloned().collect();
        prop_assert_eq!(build(&products), build(&reversed));
    }

    #[test]
    fn duplicate_products_never_inflate_counts(
        products in prop::collection::vec(arb_product(), 0..40)
    ) {
        let mut doubled = products.clone();
        doubled.extend(products.iter().cloned());
        prop_assert_eq!(build(&products), build(&doubled));
    }

    #[test]
    fn counts_are_bounded_by_distinct_products(
        products in prop::collection::vec(arb_product(), 0..40)
    ) {
        let distinct: HashSet<&str> =
            products.iter().map(|p| p.product_id.as_str()).collect();
        let bound = distinct.len() as u32;

        let snapshot = build(&products);
        for category in &snapshot.categories {
            prop_assert!(category.product_count >= 1);
            prop_assert!(category.product_count <= bound);
        }
        for tag in &snapshot.tags {
            prop_assert!(tag.product_count >= 1);
            prop_assert!(tag.product_count <= bound);
        }
    }

    #[test]
    fn parent_counts_dominate_child_counts(
        products in prop::collection::vec(arb_product(), 0..40)
    ) {
        let snapshot = build(&products);
        for node in &snapshot.categories {
            if let Some((parent_path, _)) = node.path.rsplit_once(" > ") {
                let parent = snapshot
                    .category(parent_path)
                    .expect("every prefix of a known path is a node");
                prop_assert!(parent.product_count >= node.product_count);
            }
        }
    }
}
