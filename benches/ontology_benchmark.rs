//! Ontology rebuild performance benchmark
//!
//! Measures the full observe-and-snapshot pass over synthetic catalogs of
//! increasing size, mirroring the rebuild every store commit performs.

use chrono::Utc;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use shelfsync::domain::catalog::Product;
use shelfsync::domain::ontology::OntologyBuilder;

fn synthetic_products(count: usize) -> Vec<Product> {
    let departments = ["Produce", "Dairy", "Bakery", "Frozen", "Pantry"];
    let sections = ["Milk", "Cheese", "Yogurt", "Bread", "Vegetables", "Snacks"];
    let filter_tags = ["Organic", "Gluten Free", "Vegan", "Kosher"];
    let nutrition_tags = ["Low Sodium", "High Protein", "Sugar Free"];

    (0..count)
        .map(|i| Product {
            product_id: format!("P{i:06}"),
            name: Some(format!("Product {i}")),
            brand: None,
            description: None,
            size: None,
            upc: None,
            category_path: Some(format!(
                "{} > {} > Shelf {}",
                departments[i % departments.len()],
                sections[i % sections.len()],
                i % 12
            )),
            filter_tags: vec![filter_tags[i % filter_tags.len()].to_string()],
            nutrition_tags: vec![nutrition_tags[i % nutrition_tags.len()].to_string()],
            updated_at: Utc::now(),
        })
        .collect()
}

fn ontology_rebuild(c: &mut Criterion) {
    for &size in &[1_000usize, 10_000] {
        let products = synthetic_products(size);

        c.bench_function(&format!("ontology rebuild, {size} products"), |b| {
            b.iter(|| {
                let mut builder = OntologyBuilder::new();
                for product in &products {
                    builder.observe_product(black_box(product));
                }
                black_box(builder.snapshot())
            })
        });
    }
}

criterion_group!(benches, ontology_rebuild);
criterion_main!(benches);
