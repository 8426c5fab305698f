//! Kits: bundles of products sold at one price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CatalogLookup, Product, ProductImage};
use crate::types::price::round_money;
use crate::types::{KitId, ProductId};

/// A bundle of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    pub id: KitId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<ProductImage>,
    /// Constituent products in display order.
    pub product_ids: Vec<ProductId>,
    /// Percentage off `price`, in `(0, 100]`.
    pub discount_percent: Option<Decimal>,
    pub sort_order: i32,
}

/// The size chosen for one product inside a kit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KitSelection {
    pub product_id: ProductId,
    pub size: Option<String>,
}

/// Why a kit configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KitError {
    #[error("kit product {0} is no longer available")]
    MissingProduct(ProductId),
    #[error("choose a size for {0}")]
    SizeRequired(String),
    #[error("size {size} is not offered for {product}")]
    UnknownSize { product: String, size: String },
    #[error("{0} has no sizes")]
    SizeNotApplicable(String),
    #[error("product {0} is not part of this kit")]
    UnexpectedProduct(ProductId),
    #[error("discount must be greater than 0 and at most 100 percent")]
    InvalidDiscount,
}

impl Kit {
    /// Price after the discount, rounded to cents.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        match self.discount_percent {
            Some(discount) if discount > Decimal::ZERO => {
                let factor = Decimal::ONE - discount.min(Decimal::ONE_HUNDRED) / Decimal::ONE_HUNDRED;
                round_money(self.price * factor)
            }
            _ => self.price,
        }
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.final_price() < self.price
    }

    /// Check a discount value from the admin form.
    ///
    /// # Errors
    ///
    /// Returns [`KitError::InvalidDiscount`] outside `(0, 100]`.
    pub fn validate_discount(discount: Option<Decimal>) -> Result<(), KitError> {
        match discount {
            Some(d) if d <= Decimal::ZERO || d > Decimal::ONE_HUNDRED => {
                Err(KitError::InvalidDiscount)
            }
            _ => Ok(()),
        }
    }

    /// Constituent products that still exist, in kit order.
    #[must_use]
    pub fn components<'a>(&self, catalog: &'a impl CatalogLookup) -> Vec<&'a Product> {
        self.product_ids
            .iter()
            .filter_map(|id| catalog.product(*id))
            .collect()
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }

    /// Check a shopper's size choices against the kit's products.
    ///
    /// The result lists one selection per kit product, in kit order. Missing
    /// entries for one-size products are filled in.
    ///
    /// # Errors
    ///
    /// Returns a [`KitError`] for unknown products, missing or invalid sizes.
    pub fn validate_configuration(
        &self,
        selections: &[KitSelection],
        catalog: &impl CatalogLookup,
    ) -> Result<Vec<KitSelection>, KitError> {
        if let Some(extra) = selections
            .iter()
            .find(|s| !self.product_ids.contains(&s.product_id))
        {
            return Err(KitError::UnexpectedProduct(extra.product_id));
        }

        self.product_ids
            .iter()
            .map(|&product_id| {
                let product = catalog
                    .product(product_id)
                    .ok_or(KitError::MissingProduct(product_id))?;
                let chosen = selections
                    .iter()
                    .find(|s| s.product_id == product_id)
                    .and_then(|s| s.size.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty());

                let size = match (product.has_sizes(), chosen) {
                    (true, None) => return Err(KitError::SizeRequired(product.name.clone())),
                    (true, Some(size)) if !product.sizes.iter().any(|s| s == size) => {
                        return Err(KitError::UnknownSize {
                            product: product.name.clone(),
                            size: size.to_string(),
                        });
                    }
                    (true, Some(size)) => Some(size.to_string()),
                    (false, Some(_)) => {
                        return Err(KitError::SizeNotApplicable(product.name.clone()));
                    }
                    (false, None) => None,
                };
                Ok(KitSelection { product_id, size })
            })
            .collect()
    }

    /// How many complete kits can be sold for a configuration.
    ///
    /// This is the minimum availability over the configured products. A
    /// product that no longer exists makes the kit unavailable.
    #[must_use]
    pub fn available(&self, configuration: &[KitSelection], catalog: &impl CatalogLookup) -> u32 {
        self.product_ids
            .iter()
            .map(|&product_id| {
                let size = configuration
                    .iter()
                    .find(|s| s.product_id == product_id)
                    .and_then(|s| s.size.as_deref());
                catalog
                    .product(product_id)
                    .map_or(0, |product| product.available(size))
            })
            .min()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::catalog::product::fixtures::{mug, shirt};

    fn kit() -> Kit {
        Kit {
            id: KitId::new(5),
            name: "Kit Presente".to_string(),
            description: String::new(),
            price: Decimal::new(7000, 2),
            images: Vec::new(),
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            discount_percent: Some(Decimal::new(10, 0)),
            sort_order: 0,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            products: vec![shirt(), mug()],
            ..Catalog::default()
        }
    }

    #[test]
    fn test_final_price_applies_discount() {
        assert_eq!(kit().final_price(), Decimal::new(6300, 2));
        assert!(kit().has_discount());
    }

    #[test]
    fn test_final_price_without_discount() {
        let mut kit = kit();
        kit.discount_percent = None;
        assert_eq!(kit.final_price(), kit.price);
        kit.discount_percent = Some(Decimal::ZERO);
        assert_eq!(kit.final_price(), kit.price);
    }

    #[test]
    fn test_validate_discount_bounds() {
        assert!(Kit::validate_discount(None).is_ok());
        assert!(Kit::validate_discount(Some(Decimal::ONE_HUNDRED)).is_ok());
        assert_eq!(
            Kit::validate_discount(Some(Decimal::ZERO)),
            Err(KitError::InvalidDiscount)
        );
        assert_eq!(
            Kit::validate_discount(Some(Decimal::new(101, 0))),
            Err(KitError::InvalidDiscount)
        );
    }

    #[test]
    fn test_validate_configuration_fills_one_size_products() {
        let selections = vec![KitSelection {
            product_id: ProductId::new(1),
            size: Some("G".to_string()),
        }];
        let config = kit().validate_configuration(&selections, &catalog()).unwrap();
        assert_eq!(
            config,
            vec![
                KitSelection {
                    product_id: ProductId::new(1),
                    size: Some("G".to_string())
                },
                KitSelection {
                    product_id: ProductId::new(2),
                    size: None
                },
            ]
        );
    }

    #[test]
    fn test_validate_configuration_errors() {
        assert_eq!(
            kit().validate_configuration(&[], &catalog()),
            Err(KitError::SizeRequired("Camiseta".to_string()))
        );

        let foreign = vec![KitSelection {
            product_id: ProductId::new(99),
            size: None,
        }];
        assert_eq!(
            kit().validate_configuration(&foreign, &catalog()),
            Err(KitError::UnexpectedProduct(ProductId::new(99)))
        );

        let sized_mug = vec![
            KitSelection {
                product_id: ProductId::new(1),
                size: Some("P".to_string()),
            },
            KitSelection {
                product_id: ProductId::new(2),
                size: Some("M".to_string()),
            },
        ];
        assert_eq!(
            kit().validate_configuration(&sized_mug, &catalog()),
            Err(KitError::SizeNotApplicable("Caneca".to_string()))
        );
    }

    #[test]
    fn test_available_is_minimum_over_components() {
        let config = vec![
            KitSelection {
                product_id: ProductId::new(1),
                size: Some("G".to_string()),
            },
            KitSelection {
                product_id: ProductId::new(2),
                size: None,
            },
        ];
        // shirt G = 5, mug = 3
        assert_eq!(kit().available(&config, &catalog()), 3);
    }

    #[test]
    fn test_available_zero_when_component_missing() {
        let catalog = Catalog {
            products: vec![shirt()],
            ..Catalog::default()
        };
        assert_eq!(kit().available(&[], &catalog), 0);
        assert_eq!(kit().components(&catalog).len(), 1);
    }
}
