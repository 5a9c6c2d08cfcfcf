//! Remote entities as they travel over the wire, plus the fields the engine
//! derives for display.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{CategoryId, ProductId, SupplierId};

/// Immutable, cheaply shared collection as published on every channel.
pub type Collection<T> = Arc<Vec<T>>;

/// Product as served by `GET /products`.
///
/// `category` and `search_key` are derived-only: they are absent on the wire
/// and only [`Product::with_derived`] sets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    pub product_code: String,
    pub description: String,
    pub price: f64,
    pub category_id: CategoryId,
    pub quantity_in_stock: u32,
    #[serde(default)]
    pub supplier_ids: Vec<SupplierId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    search_key: Vec<String>,
}

impl Product {
    pub fn new(
        id: ProductId,
        product_name: impl Into<String>,
        product_code: impl Into<String>,
        price: f64,
        category_id: CategoryId,
    ) -> Self {
        Self {
            id,
            product_name: product_name.into(),
            product_code: product_code.into(),
            description: String::new(),
            price,
            category_id,
            quantity_in_stock: 0,
            supplier_ids: Vec::new(),
            category: None,
            search_key: Vec::new(),
        }
    }

    /// Stub product inserted when a caller asks for an insert without a payload.
    pub fn sample() -> Self {
        Self {
            description: "Our new product".to_string(),
            quantity_in_stock: 30,
            ..Self::new(
                ProductId::new(42),
                "Another One",
                "TBX-0042",
                8.9,
                CategoryId::new(3),
            )
        }
    }

    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.quantity_in_stock = quantity;
        self
    }

    pub fn with_suppliers(mut self, ids: impl IntoIterator<Item = SupplierId>) -> Self {
        self.supplier_ids = ids.into_iter().collect();
        self
    }

    /// Attach the display fields. Reserved for the category join.
    pub fn with_derived(mut self, category: impl Into<String>, search_key: Vec<String>) -> Self {
        self.category = Some(category.into());
        self.search_key = search_key;
        self
    }

    /// Drop any display fields a caller may have filled in.
    pub fn without_derived(mut self) -> Self {
        self.category = None;
        self.search_key.clear();
        self
    }

    /// Resolved category name (joined records only).
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn search_key(&self) -> &[String] {
        &self.search_key
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Product category. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

/// Supplier as served by `GET /suppliers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub min_quantity: u32,
}

impl Supplier {
    pub fn new(id: SupplierId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cost: 0.0,
            min_quantity: 0,
        }
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}
