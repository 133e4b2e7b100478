//! Product record owned by the backing store.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::store::CacheRecord;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: f64, stock: i32) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            price,
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seed catalog loaded into the demo record store.
    ///
    /// Timestamps are fixed so repeated runs serialize identically.
    pub fn demo_catalog() -> Vec<Product> {
        let stamp = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        [
            (1, "iPhone 15", 999.99, 100),
            (3, "MacBook Pro 14", 1999.0, 25),
            (4, "AirPods Pro", 249.0, 300),
            (5, "iPad Air", 599.0, 80),
            (6, "Apple Watch Series 9", 399.0, 150),
        ]
        .into_iter()
        .map(|(id, name, price, stock)| Product {
            id,
            name: name.to_string(),
            price,
            stock,
            created_at: stamp,
            updated_at: stamp,
        })
        .collect()
    }
}

impl CacheRecord for Product {
    fn key(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_has_key_one_and_no_key_two() {
        let catalog = Product::demo_catalog();

        let first = catalog.iter().find(|p| p.id == 1).unwrap();
        assert_eq!(first.price, 999.99);
        assert!(catalog.iter().all(|p| p.id != 2));
    }

    #[test]
    fn test_serialization_is_stable() {
        let product = Product::demo_catalog().remove(0);

        let first = serde_json::to_vec(&product).unwrap();
        let decoded: Product = serde_json::from_slice(&first).unwrap();
        let second = serde_json::to_vec(&decoded).unwrap();

        assert_eq!(decoded, product);
        assert_eq!(first, second);
    }
}
