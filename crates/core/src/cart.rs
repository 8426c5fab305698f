//! Shopping cart with line identity, merging and stock checks.
//!
//! # Line identity
//!
//! Every line carries a [`CartLineKey`] derived from what was bought:
//!
//! - product lines: product id, size and (trimmed) customization text,
//! - kit lines: kit id and the size chosen for each kit product, sorted by
//!   product id.
//!
//! Adding an item whose key matches an existing line raises that line's
//! quantity. Any difference in an attribute produces a new line.
//!
//! # Stock
//!
//! Stock is counted per [`StockBucket`]: one product and one of its sizes,
//! or the product's default bucket. A product line takes its quantity from
//! one bucket; a kit line takes its quantity from the bucket of every
//! configured component. Checks sum what every line in the cart takes from
//! each bucket, so customized lines, kits and plain product lines that share
//! a product all count against the same stock.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{
    CatalogLookup, Kit, KitError, KitSelection, Product, Selection, SelectionError,
    normalize_customization,
};
use crate::types::{CurrencyCode, KitId, Price, ProductId};

/// Deterministic identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLineKey(String);

impl CartLineKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartLineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CartLineKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What a cart line refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartItem {
    Product {
        product_id: ProductId,
        size: Option<String>,
        customization: Option<String>,
    },
    Kit {
        kit_id: KitId,
        configuration: Vec<KitSelection>,
    },
}

impl CartItem {
    /// A product item with normalized size and customization.
    #[must_use]
    pub fn product(product_id: ProductId, size: Option<&str>, customization: Option<&str>) -> Self {
        Self::Product {
            product_id,
            size: size
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            customization: normalize_customization(customization),
        }
    }

    #[must_use]
    pub const fn kit(kit_id: KitId, configuration: Vec<KitSelection>) -> Self {
        Self::Kit {
            kit_id,
            configuration,
        }
    }

    /// Derive the line key. Equal items always produce equal keys.
    #[must_use]
    pub fn key(&self) -> CartLineKey {
        match self {
            Self::Product {
                product_id,
                size,
                customization,
            } => CartLineKey(format!(
                "p{product_id}|s={}|c={}",
                encode(size.as_deref()),
                encode(customization.as_deref())
            )),
            Self::Kit {
                kit_id,
                configuration,
            } => {
                let mut parts: Vec<(i32, String)> = configuration
                    .iter()
                    .map(|s| (s.product_id.as_i32(), encode(s.size.as_deref())))
                    .collect();
                parts.sort();
                let joined = parts
                    .iter()
                    .map(|(id, size)| format!("{id}={size}"))
                    .collect::<Vec<_>>()
                    .join(",");
                CartLineKey(format!("k{kit_id}|{joined}"))
            }
        }
    }

    /// Buckets one unit of this item takes stock from, with the units taken.
    #[must_use]
    pub fn stock_usage(&self) -> Vec<(StockBucket, u32)> {
        let buckets: Vec<StockBucket> = match self {
            Self::Product {
                product_id, size, ..
            } => vec![StockBucket::new(*product_id, size.clone())],
            Self::Kit { configuration, .. } => configuration
                .iter()
                .map(|s| StockBucket::new(s.product_id, s.size.clone()))
                .collect(),
        };

        let mut usage: Vec<(StockBucket, u32)> = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            match usage.iter_mut().find(|(b, _)| *b == bucket) {
                Some((_, units)) => *units += 1,
                None => usage.push((bucket, 1)),
            }
        }
        usage
    }
}

/// One stock count: a product and a size, or its default bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockBucket {
    pub product_id: ProductId,
    pub size: Option<String>,
}

impl StockBucket {
    #[must_use]
    pub const fn new(product_id: ProductId, size: Option<String>) -> Self {
        Self { product_id, size }
    }
}

/// Units on hand per stock bucket.
pub trait StockLookup {
    fn units_available(&self, bucket: &StockBucket) -> u32;
}

impl<T: CatalogLookup + ?Sized> StockLookup for T {
    fn units_available(&self, bucket: &StockBucket) -> u32 {
        self.product(bucket.product_id)
            .map_or(0, |p| p.available(bucket.size.as_deref()))
    }
}

type Demand = HashMap<StockBucket, u32>;

fn take(demand: &mut Demand, item: &CartItem, quantity: u32) {
    for (bucket, per_unit) in item.stock_usage() {
        let units = demand.entry(bucket).or_insert(0);
        *units = units.saturating_add(quantity.saturating_mul(per_unit));
    }
}

fn encode(value: Option<&str>) -> String {
    value.map_or_else(String::new, |v| urlencoding::encode(v).into_owned())
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub key: CartLineKey,
    pub item: CartItem,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
    /// Human-readable attributes: size, customization, kit contents.
    pub details: Vec<String>,
}

impl CartLine {
    /// Build a product line from a validated selection.
    #[must_use]
    pub fn for_product(product: &Product, selection: &Selection, quantity: u32) -> Self {
        let item = CartItem::product(
            product.id,
            selection.size.as_deref(),
            selection.customization.as_deref(),
        );
        Self {
            key: item.key(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_url: product.primary_image().map(|i| i.url.clone()),
            details: product_details(product, selection),
            item,
        }
    }

    /// Build a kit line from a validated configuration.
    #[must_use]
    pub fn for_kit(
        kit: &Kit,
        configuration: Vec<KitSelection>,
        catalog: &impl CatalogLookup,
        quantity: u32,
    ) -> Self {
        let details = kit_details(&configuration, catalog);
        let item = CartItem::kit(kit.id, configuration);
        Self {
            key: item.key(),
            name: kit.name.clone(),
            unit_price: kit.final_price(),
            quantity,
            image_url: kit.primary_image().map(|i| i.url.clone()),
            details,
            item,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

fn product_details(product: &Product, selection: &Selection) -> Vec<String> {
    let mut details = Vec::new();
    if let Some(size) = &selection.size {
        details.push(format!("Size: {size}"));
    }
    if let Some(text) = &selection.customization {
        let label = product
            .customization_label
            .as_deref()
            .unwrap_or("Customization");
        details.push(format!("{label}: {text}"));
    }
    details
}

fn kit_details(configuration: &[KitSelection], catalog: &impl CatalogLookup) -> Vec<String> {
    configuration
        .iter()
        .filter_map(|selection| {
            let product = catalog.product(selection.product_id)?;
            Some(match &selection.size {
                Some(size) => format!("{} ({size})", product.name),
                None => product.name.clone(),
            })
        })
        .collect()
}

/// Errors from cart mutations. The cart is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("only {available} left in stock (requested {requested})")]
    InsufficientStock { available: u32, requested: u32 },
    #[error("cart line not found")]
    LineNotFound,
    #[error("product {0} not found")]
    ProductNotFound(ProductId),
    #[error("kit {0} not found")]
    KitNotFound(KitId),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Kit(#[from] KitError),
}

/// A change made to the cart while reconciling it with the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAdjustment {
    /// The product or kit is gone, or the chosen size no longer exists.
    Removed { name: String },
    /// Nothing left in stock for this line.
    SoldOut { name: String },
    QuantityReduced { name: String, from: u32, to: u32 },
    PriceChanged { name: String, from: Decimal, to: Decimal },
}

impl fmt::Display for CartAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed { name } => write!(f, "{name} is no longer available and was removed"),
            Self::SoldOut { name } => write!(f, "{name} sold out and was removed"),
            Self::QuantityReduced { name, from, to } => {
                write!(f, "{name}: quantity reduced from {from} to {to}")
            }
            Self::PriceChanged { name, .. } => write!(f, "{name}: price updated"),
        }
    }
}

/// Current catalog facts for a line's item.
struct Resolved {
    name: String,
    unit_price: Decimal,
    image_url: Option<String>,
    details: Vec<String>,
}

fn resolve(item: &CartItem, catalog: &impl CatalogLookup) -> Option<Resolved> {
    match item {
        CartItem::Product {
            product_id,
            size,
            customization,
        } => {
            let product = catalog.product(*product_id)?;
            let selection = product
                .validate_selection(size.as_deref(), customization.as_deref())
                .ok()?;
            Some(Resolved {
                name: product.name.clone(),
                unit_price: product.price,
                image_url: product.primary_image().map(|i| i.url.clone()),
                details: product_details(product, &selection),
            })
        }
        CartItem::Kit {
            kit_id,
            configuration,
        } => {
            let kit = catalog.kit(*kit_id)?;
            let configuration = kit.validate_configuration(configuration, catalog).ok()?;
            Some(Resolved {
                name: kit.name.clone(),
                unit_price: kit.final_price(),
                image_url: kit.primary_image().map(|i| i.url.clone()),
                details: kit_details(&configuration, catalog),
            })
        }
    }
}

/// The shopper's cart. Stored in the session between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self, currency: CurrencyCode) -> Price {
        let amount: Decimal = self.lines.iter().map(CartLine::line_total).sum();
        Price::new(amount, currency)
    }

    #[must_use]
    pub fn line(&self, key: &CartLineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.key == key)
    }

    /// Units every line takes from each bucket, skipping the line `except`.
    fn demand(&self, except: Option<&CartLineKey>) -> Demand {
        let mut demand = Demand::new();
        for line in self.lines.iter().filter(|l| Some(&l.key) != except) {
            take(&mut demand, &line.item, line.quantity);
        }
        demand
    }

    /// Check that `quantity` more units of `item` fit next to the other lines.
    fn check_stock(
        &self,
        item: &CartItem,
        quantity: u32,
        except: Option<&CartLineKey>,
        available: &impl StockLookup,
    ) -> Result<(), CartError> {
        let demand = self.demand(except);
        for (bucket, per_unit) in item.stock_usage() {
            let on_hand = available.units_available(&bucket);
            let requested = demand
                .get(&bucket)
                .copied()
                .unwrap_or(0)
                .saturating_add(quantity.saturating_mul(per_unit));
            if requested > on_hand {
                return Err(CartError::InsufficientStock {
                    available: on_hand,
                    requested,
                });
            }
        }
        Ok(())
    }

    /// Add a line, merging into an existing line with the same key.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] for a zero quantity and
    /// [`CartError::InsufficientStock`] when the cart would take more units
    /// from any bucket than `available` reports.
    pub fn add(&mut self, line: CartLine, available: &impl StockLookup) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.check_stock(&line.item, line.quantity, None, available)?;

        match self.lines.iter_mut().find(|l| l.key == line.key) {
            Some(existing) => existing.quantity += line.quantity,
            None => self.lines.push(line),
        }
        Ok(())
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// [`CartError::LineNotFound`] for an unknown key and
    /// [`CartError::InsufficientStock`] when the new quantity does not fit.
    pub fn set_quantity(
        &mut self,
        key: &CartLineKey,
        quantity: u32,
        available: &impl StockLookup,
    ) -> Result<(), CartError> {
        let Some(index) = self.lines.iter().position(|l| &l.key == key) else {
            return Err(CartError::LineNotFound);
        };
        if quantity == 0 {
            self.lines.remove(index);
            return Ok(());
        }

        let item = self.lines.get(index).map(|l| l.item.clone());
        let Some(item) = item else {
            return Err(CartError::LineNotFound);
        };
        self.check_stock(&item, quantity, Some(key), available)?;

        if let Some(line) = self.lines.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove(&mut self, key: &CartLineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key != key);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Validate a product selection against the catalog and add it.
    ///
    /// # Errors
    ///
    /// Any [`CartError`]; the cart is unchanged on error.
    pub fn add_product(
        &mut self,
        catalog: &impl CatalogLookup,
        product_id: ProductId,
        size: Option<&str>,
        customization: Option<&str>,
        quantity: u32,
    ) -> Result<CartLineKey, CartError> {
        let product = catalog
            .product(product_id)
            .ok_or(CartError::ProductNotFound(product_id))?;
        let selection = product.validate_selection(size, customization)?;
        let line = CartLine::for_product(product, &selection, quantity);
        let key = line.key.clone();
        self.add(line, catalog)?;
        Ok(key)
    }

    /// Validate a kit configuration against the catalog and add it.
    ///
    /// # Errors
    ///
    /// Any [`CartError`]; the cart is unchanged on error.
    pub fn add_kit(
        &mut self,
        catalog: &impl CatalogLookup,
        kit_id: KitId,
        selections: &[KitSelection],
        quantity: u32,
    ) -> Result<CartLineKey, CartError> {
        let kit = catalog.kit(kit_id).ok_or(CartError::KitNotFound(kit_id))?;
        let configuration = kit.validate_configuration(selections, catalog)?;
        let line = CartLine::for_kit(kit, configuration, catalog, quantity);
        let key = line.key.clone();
        self.add(line, catalog)?;
        Ok(key)
    }

    /// Set a line's quantity, looking up current stock in the catalog.
    ///
    /// # Errors
    ///
    /// Any [`CartError`]; lines whose item vanished report not found.
    pub fn update_quantity(
        &mut self,
        catalog: &impl CatalogLookup,
        key: &CartLineKey,
        quantity: u32,
    ) -> Result<(), CartError> {
        let line = self.line(key).ok_or(CartError::LineNotFound)?;
        if quantity > 0 && resolve(&line.item, catalog).is_none() {
            return Err(CartError::LineNotFound);
        }
        self.set_quantity(key, quantity, catalog)
    }

    /// Bring the cart in line with the current catalog.
    ///
    /// Lines whose item disappeared are dropped, prices and labels are
    /// refreshed, and quantities are clamped to current stock. Lines are
    /// processed in order, so earlier lines keep their units when a bucket
    /// is short.
    pub fn reconcile(&mut self, catalog: &impl CatalogLookup) -> Vec<CartAdjustment> {
        let mut adjustments = Vec::new();
        let mut kept: Vec<CartLine> = Vec::with_capacity(self.lines.len());
        let mut committed = Demand::new();

        for mut line in std::mem::take(&mut self.lines) {
            let Some(current) = resolve(&line.item, catalog) else {
                adjustments.push(CartAdjustment::Removed { name: line.name });
                continue;
            };

            let remaining = line
                .item
                .stock_usage()
                .iter()
                .map(|(bucket, per_unit)| {
                    let left = catalog
                        .units_available(bucket)
                        .saturating_sub(committed.get(bucket).copied().unwrap_or(0));
                    left / per_unit
                })
                .min()
                .unwrap_or(0);
            if remaining == 0 {
                adjustments.push(CartAdjustment::SoldOut { name: current.name });
                continue;
            }
            if line.quantity > remaining {
                adjustments.push(CartAdjustment::QuantityReduced {
                    name: current.name.clone(),
                    from: line.quantity,
                    to: remaining,
                });
                line.quantity = remaining;
            }
            if line.unit_price != current.unit_price {
                adjustments.push(CartAdjustment::PriceChanged {
                    name: current.name.clone(),
                    from: line.unit_price,
                    to: current.unit_price,
                });
            }

            line.name = current.name;
            line.unit_price = current.unit_price;
            line.image_url = current.image_url;
            line.details = current.details;
            take(&mut committed, &line.item, line.quantity);
            kept.push(line);
        }

        self.lines = kept;
        adjustments
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::product::fixtures::{mug, shirt};
    use crate::catalog::{Catalog, StockLevels};

    fn catalog() -> Catalog {
        Catalog {
            products: vec![shirt(), mug()],
            kits: vec![Kit {
                id: KitId::new(9),
                name: "Kit Presente".to_string(),
                description: String::new(),
                price: Decimal::new(6000, 2),
                images: Vec::new(),
                product_ids: vec![ProductId::new(1), ProductId::new(2)],
                discount_percent: None,
                sort_order: 0,
            }],
            ..Catalog::default()
        }
    }

    fn shirt_g() -> Vec<KitSelection> {
        vec![KitSelection {
            product_id: ProductId::new(1),
            size: Some("G".to_string()),
        }]
    }

    #[test]
    fn test_identical_product_merges_quantity() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let a = cart
            .add_product(&catalog, ProductId::new(1), Some("G"), Some("Ana"), 1)
            .unwrap();
        let b = cart
            .add_product(&catalog, ProductId::new(1), Some(" G "), Some(" Ana "), 2)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
    }

    #[test]
    fn test_differing_attribute_creates_new_line() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), None, 1)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(1), Some("P"), None, 1)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), Some("Ana"), 1)
            .unwrap();
        assert_eq!(cart.lines.len(), 3);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_add_rejects_quantity_over_stock() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let err = cart
            .add_product(&catalog, ProductId::new(1), Some("P"), None, 3)
            .unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                available: 2,
                requested: 3
            }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_counts_existing_quantity_against_stock() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(2), None, None, 2)
            .unwrap();
        let err = cart
            .add_product(&catalog, ProductId::new(2), None, None, 2)
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3, requested: 4 }));
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[test]
    fn test_customized_lines_share_size_bucket() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("P"), Some("Ana"), 1)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(1), Some("P"), Some("Bia"), 1)
            .unwrap();
        let err = cart
            .add_product(&catalog, ProductId::new(1), Some("P"), Some("Caio"), 1)
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 2, .. }));
    }

    #[test]
    fn test_kits_and_products_share_component_stock() {
        let catalog = catalog();
        let mut cart = Cart::new();
        // mug has 3 units
        cart.add_product(&catalog, ProductId::new(2), None, None, 2)
            .unwrap();
        cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 1).unwrap();

        let shirt_p = vec![KitSelection {
            product_id: ProductId::new(1),
            size: Some("P".to_string()),
        }];
        let err = cart
            .add_kit(&catalog, KitId::new(9), &shirt_p, 1)
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3, requested: 4 }));
        assert!(matches!(
            cart.add_product(&catalog, ProductId::new(2), None, None, 1),
            Err(CartError::InsufficientStock { available: 3, requested: 4 })
        ));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_kit_quantity_update_counts_product_lines() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), Some("Ana"), 3)
            .unwrap();
        let kit = cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 1).unwrap();

        assert!(cart.update_quantity(&catalog, &kit, 2).is_ok());
        // shirt G has 5 units, three taken by the customized line
        assert!(matches!(
            cart.update_quantity(&catalog, &kit, 3),
            Err(CartError::InsufficientStock { available: 5, requested: 6 })
        ));
        assert_eq!(cart.line(&kit).unwrap().quantity, 2);
    }

    #[test]
    fn test_zero_stock_size_cannot_be_added() {
        let catalog = catalog();
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add_product(&catalog, ProductId::new(1), Some("M"), None, 1),
            Err(CartError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let catalog = catalog();
        let mut cart = Cart::new();
        assert_eq!(
            cart.add_product(&catalog, ProductId::new(2), None, None, 0),
            Err(CartError::InvalidQuantity)
        );
    }

    #[test]
    fn test_unknown_product() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.add_product(&catalog(), ProductId::new(77), None, None, 1),
            Err(CartError::ProductNotFound(ProductId::new(77)))
        );
    }

    #[test]
    fn test_kit_lines_merge_by_configuration() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 1).unwrap();
        cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 1).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[0].details, vec!["Camiseta (G)", "Caneca"]);

        let shirt_p = vec![KitSelection {
            product_id: ProductId::new(1),
            size: Some("P".to_string()),
        }];
        cart.add_kit(&catalog, KitId::new(9), &shirt_p, 1).unwrap();
        assert_eq!(cart.lines.len(), 2);
    }

    #[test]
    fn test_kit_limited_by_component_stock() {
        let catalog = catalog();
        let mut cart = Cart::new();
        // mug has 3 units
        let err = cart
            .add_kit(&catalog, KitId::new(9), &shirt_g(), 4)
            .unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3, requested: 4 }));
    }

    #[test]
    fn test_kit_key_ignores_selection_order() {
        let a = CartItem::kit(
            KitId::new(1),
            vec![
                KitSelection {
                    product_id: ProductId::new(2),
                    size: None,
                },
                KitSelection {
                    product_id: ProductId::new(1),
                    size: Some("M".to_string()),
                },
            ],
        );
        let b = CartItem::kit(
            KitId::new(1),
            vec![
                KitSelection {
                    product_id: ProductId::new(1),
                    size: Some("M".to_string()),
                },
                KitSelection {
                    product_id: ProductId::new(2),
                    size: None,
                },
            ],
        );
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "k1|1=M,2=");
    }

    #[test]
    fn test_product_key_escapes_separators() {
        let a = CartItem::product(ProductId::new(1), Some("M"), Some("a|c=b"));
        let b = CartItem::product(ProductId::new(1), Some("M|c=a"), Some("b"));
        assert_ne!(a.key(), b.key());
        assert_eq!(
            CartItem::product(ProductId::new(3), None, Some("  ")).key().as_str(),
            "p3|s=|c="
        );
    }

    #[test]
    fn test_set_quantity_checks_other_lines_in_bucket() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let ana = cart
            .add_product(&catalog, ProductId::new(1), Some("G"), Some("Ana"), 2)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), Some("Bia"), 2)
            .unwrap();

        assert!(cart.update_quantity(&catalog, &ana, 3).is_ok());
        assert!(matches!(
            cart.update_quantity(&catalog, &ana, 4),
            Err(CartError::InsufficientStock { available: 5, requested: 6 })
        ));
        assert_eq!(cart.line(&ana).unwrap().quantity, 3);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let key = cart
            .add_product(&catalog, ProductId::new(2), None, None, 1)
            .unwrap();
        cart.update_quantity(&catalog, &key, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(
            cart.update_quantity(&catalog, &key, 1),
            Err(CartError::LineNotFound)
        );
    }

    #[test]
    fn test_remove_and_subtotal() {
        let catalog = catalog();
        let mut cart = Cart::new();
        let shirt = cart
            .add_product(&catalog, ProductId::new(1), Some("G"), None, 2)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(2), None, None, 1)
            .unwrap();
        assert_eq!(
            cart.subtotal(CurrencyCode::BRL).amount,
            Decimal::new(12480, 2)
        );

        assert!(cart.remove(&shirt));
        assert!(!cart.remove(&shirt));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_reconcile_drops_missing_and_clamps_stock() {
        let mut catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), None, 4)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(2), None, None, 1)
            .unwrap();

        catalog.products[0].stock = StockLevels::per_size([("G", 2)]);
        catalog.products[0].price = Decimal::new(5990, 2);
        catalog.products.remove(1);

        let adjustments = cart.reconcile(&catalog);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[0].unit_price, Decimal::new(5990, 2));
        assert!(adjustments.contains(&CartAdjustment::Removed {
            name: "Caneca".to_string()
        }));
        assert!(adjustments.contains(&CartAdjustment::QuantityReduced {
            name: "Camiseta".to_string(),
            from: 4,
            to: 2
        }));
        assert!(adjustments
            .iter()
            .any(|a| matches!(a, CartAdjustment::PriceChanged { .. })));
    }

    #[test]
    fn test_reconcile_sold_out_bucket_removes_later_lines() {
        let mut catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("P"), Some("Ana"), 1)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(1), Some("P"), Some("Bia"), 1)
            .unwrap();

        catalog.products[0].stock = StockLevels::per_size([("P", 1)]);
        let adjustments = cart.reconcile(&catalog);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(
            adjustments,
            vec![CartAdjustment::SoldOut {
                name: "Camiseta".to_string()
            }]
        );
    }

    #[test]
    fn test_reconcile_clamps_kits_sharing_a_component() {
        let mut catalog = catalog();
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(2), None, None, 1)
            .unwrap();
        cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 2).unwrap();

        catalog.products[1].stock = StockLevels::flat(2);
        let adjustments = cart.reconcile(&catalog);
        assert_eq!(cart.lines[1].quantity, 1);
        assert_eq!(
            adjustments,
            vec![CartAdjustment::QuantityReduced {
                name: "Kit Presente".to_string(),
                from: 2,
                to: 1
            }]
        );

        catalog.products[1].stock = StockLevels::flat(1);
        let adjustments = cart.reconcile(&catalog);
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(
            adjustments,
            vec![CartAdjustment::SoldOut {
                name: "Kit Presente".to_string()
            }]
        );
    }

    #[test]
    fn test_stock_usage_of_kit_lists_each_component() {
        let item = CartItem::kit(
            KitId::new(9),
            vec![
                KitSelection {
                    product_id: ProductId::new(1),
                    size: Some("G".to_string()),
                },
                KitSelection {
                    product_id: ProductId::new(2),
                    size: None,
                },
            ],
        );
        assert_eq!(
            item.stock_usage(),
            vec![
                (StockBucket::new(ProductId::new(1), Some("G".to_string())), 1),
                (StockBucket::new(ProductId::new(2), None), 1),
            ]
        );
    }

    #[test]
    fn test_cart_survives_json_round_trip() {
        let catalog = catalog();
        let mut cart = Cart::new();
        cart.add_kit(&catalog, KitId::new(9), &shirt_g(), 1).unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
