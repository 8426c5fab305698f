//! Parsing of catalog forms with repeated fields.
//!
//! Browsers post repeated inputs (`category_id`, `image_url`, ...) as
//! ordered key/value pairs, so these forms are extracted as
//! `Form<Vec<(String, String)>>` and assembled here.

use std::str::FromStr;

use rust_decimal::Decimal;

use vitrine_core::catalog::{DEFAULT_BUCKET, HighlightKind, ImageFrame, ProductImage, StockLevels};
use vitrine_core::{CategoryId, ProductId};

use crate::error::{AppError, Result};
use crate::models::{HighlightInput, KitInput, ProductInput};

/// Ordered form pairs with typed accessors.
struct Pairs<'a>(&'a [(String, String)]);

impl<'a> Pairs<'a> {
    /// First value for `key`, trimmed; empty values count as absent.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Every value for `key`, in order, including empty ones.
    fn all(&self, key: &str) -> Vec<&'a str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .collect()
    }

    fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn checkbox(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| AppError::BadRequest(format!("invalid {key}: {v}")))
            })
            .transpose()
    }

    fn ids<T: FromStr>(&self, key: &str) -> Result<Vec<T>> {
        self.all(key)
            .into_iter()
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| AppError::BadRequest(format!("invalid {key}: {v}")))
            })
            .collect()
    }
}

/// Parse a money amount, accepting a decimal comma ("49,90").
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the value is not a number.
pub fn parse_money(raw: &str) -> Result<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .map(|d| d.round_dp(2))
        .map_err(|_| AppError::BadRequest(format!("invalid amount: {raw}")))
}

fn money(pairs: &Pairs<'_>, key: &str) -> Result<Decimal> {
    let raw = pairs
        .get(key)
        .ok_or_else(|| AppError::BadRequest(format!("missing {key}")))?;
    parse_money(raw)
}

/// Split a comma separated size list, dropping blanks.
fn parse_sizes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn frame_at(zooms: &[&str], xs: &[&str], ys: &[&str], index: usize) -> ImageFrame {
    let value = |list: &[&str], default: f32| {
        list.get(index)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(default)
    };
    ImageFrame::new(value(zooms, 1.0), value(xs, 0.0), value(ys, 0.0))
}

/// Images are posted as parallel `image_url` / `image_zoom` /
/// `image_offset_x` / `image_offset_y` lists; blank URLs are skipped.
fn parse_images(pairs: &Pairs<'_>) -> Vec<ProductImage> {
    let urls = pairs.all("image_url");
    let zooms = pairs.all("image_zoom");
    let xs = pairs.all("image_offset_x");
    let ys = pairs.all("image_offset_y");

    urls.iter()
        .enumerate()
        .filter(|(_, url)| !url.is_empty())
        .map(|(i, url)| ProductImage::new(*url).with_frame(frame_at(&zooms, &xs, &ys, i)))
        .collect()
}

/// Build a [`ProductInput`] from the product form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for malformed numbers or ids.
pub fn product_input(raw: &[(String, String)]) -> Result<ProductInput> {
    let pairs = Pairs(raw);
    let customizable = pairs.checkbox("customizable");

    Ok(ProductInput {
        name: pairs.text("name"),
        description: pairs.text("description"),
        price: money(&pairs, "price")?,
        images: parse_images(&pairs),
        sizes: parse_sizes(pairs.get("sizes").unwrap_or_default()),
        category_ids: pairs.ids::<CategoryId>("category_id")?,
        customizable,
        customization_label: pairs
            .get("customization_label")
            .filter(|_| customizable)
            .map(ToString::to_string),
    })
}

/// Build a [`KitInput`] from the kit form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for malformed numbers or ids.
pub fn kit_input(raw: &[(String, String)]) -> Result<KitInput> {
    let pairs = Pairs(raw);

    Ok(KitInput {
        name: pairs.text("name"),
        description: pairs.text("description"),
        price: money(&pairs, "price")?,
        images: parse_images(&pairs),
        product_ids: pairs.ids::<ProductId>("product_id")?,
        discount_percent: pairs.get("discount_percent").map(parse_money).transpose()?,
    })
}

/// Build stock levels from `stock_<size>` fields.
///
/// One-size products post a single `stock_default` field.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for negative or non-numeric counts.
pub fn stock_levels(raw: &[(String, String)], sizes: &[String]) -> Result<StockLevels> {
    let pairs = Pairs(raw);
    let mut stock = StockLevels::new();

    let buckets: Vec<&str> = if sizes.is_empty() {
        vec![DEFAULT_BUCKET]
    } else {
        sizes.iter().map(String::as_str).collect()
    };

    for bucket in buckets {
        let count = pairs.parse::<i32>(&format!("stock_{bucket}"))?.unwrap_or(0);
        if count < 0 {
            return Err(AppError::BadRequest(format!(
                "stock for {bucket} cannot be negative"
            )));
        }
        stock.set(bucket, count);
    }
    Ok(stock)
}

/// Build a [`HighlightInput`] from the highlight form.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown kind or malformed ids.
pub fn highlight_input(raw: &[(String, String)]) -> Result<HighlightInput> {
    let pairs = Pairs(raw);

    let kind = match pairs.get("kind") {
        Some("product") => HighlightKind::Product {
            product_id: pairs
                .parse::<ProductId>("product_id")?
                .ok_or_else(|| AppError::BadRequest("missing product_id".to_string()))?,
        },
        Some("image") => HighlightKind::Image {
            image_url: pairs.text("image_url"),
            link_url: pairs.get("link_url").map(ToString::to_string),
            title: pairs.get("title").map(ToString::to_string),
        },
        other => {
            return Err(AppError::BadRequest(format!(
                "unknown highlight kind: {}",
                other.unwrap_or_default()
            )));
        }
    };

    let frame = ImageFrame::new(
        pairs.parse::<f32>("zoom")?.unwrap_or(1.0),
        pairs.parse::<f32>("offset_x")?.unwrap_or(0.0),
        pairs.parse::<f32>("offset_y")?.unwrap_or(0.0),
    );

    Ok(HighlightInput { kind, frame })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_money_accepts_decimal_comma() {
        assert_eq!(parse_money("49,90").unwrap(), Decimal::new(4990, 2));
        assert_eq!(parse_money(" 12 ").unwrap(), Decimal::new(12, 0));
        assert!(parse_money("abc").is_err());
    }

    #[test]
    fn test_product_input_from_pairs() {
        let input = product_input(&pairs(&[
            ("name", " Camiseta Gato "),
            ("price", "59,90"),
            ("sizes", "P, M,, G "),
            ("category_id", "3"),
            ("category_id", "7"),
            ("image_url", "https://cdn/a.jpg"),
            ("image_zoom", "1.5"),
            ("image_offset_x", "10"),
            ("image_offset_y", "-5"),
            ("image_url", ""),
            ("image_zoom", "1"),
            ("image_offset_x", "0"),
            ("image_offset_y", "0"),
            ("image_url", "https://cdn/b.jpg"),
            ("image_zoom", "x"),
            ("image_offset_x", "0"),
            ("image_offset_y", "0"),
            ("customization_label", "Name on the back"),
        ]))
        .unwrap();

        assert_eq!(input.name, "Camiseta Gato");
        assert_eq!(input.price, Decimal::new(5990, 2));
        assert_eq!(input.sizes, vec!["P", "M", "G"]);
        assert_eq!(
            input.category_ids,
            vec![CategoryId::new(3), CategoryId::new(7)]
        );
        assert_eq!(input.images.len(), 2);
        assert_eq!(input.images[0].frame, ImageFrame::new(1.5, 10.0, -5.0));
        assert_eq!(input.images[1].frame, ImageFrame::default());
        // label is ignored unless the checkbox is ticked
        assert!(!input.customizable);
        assert_eq!(input.customization_label, None);
    }

    #[test]
    fn test_product_input_requires_price() {
        assert!(product_input(&pairs(&[("name", "Caneca")])).is_err());
    }

    #[test]
    fn test_kit_input_from_pairs() {
        let input = kit_input(&pairs(&[
            ("name", "Kit Presente"),
            ("price", "100"),
            ("discount_percent", ""),
            ("product_id", "2"),
            ("product_id", "1"),
        ]))
        .unwrap();
        assert_eq!(input.product_ids, vec![ProductId::new(2), ProductId::new(1)]);
        assert_eq!(input.discount_percent, None);

        let input = kit_input(&pairs(&[
            ("name", "Kit"),
            ("price", "100"),
            ("discount_percent", "15"),
        ]))
        .unwrap();
        assert_eq!(input.discount_percent, Some(Decimal::new(15, 0)));
    }

    #[test]
    fn test_stock_levels_per_size_and_default() {
        let sizes = vec!["P".to_string(), "M".to_string()];
        let stock = stock_levels(&pairs(&[("stock_P", "3")]), &sizes).unwrap();
        assert_eq!(stock.recorded("P"), 3);
        assert_eq!(stock.recorded("M"), 0);

        let stock = stock_levels(&pairs(&[("stock_default", "8")]), &[]).unwrap();
        assert_eq!(stock.total(), 8);

        assert!(stock_levels(&pairs(&[("stock_P", "-1")]), &sizes).is_err());
        assert!(stock_levels(&pairs(&[("stock_P", "lots")]), &sizes).is_err());
    }

    #[test]
    fn test_highlight_input_kinds() {
        let input = highlight_input(&pairs(&[("kind", "product"), ("product_id", "9")])).unwrap();
        assert_eq!(
            input.kind,
            HighlightKind::Product {
                product_id: ProductId::new(9)
            }
        );

        let input = highlight_input(&pairs(&[
            ("kind", "image"),
            ("image_url", "https://cdn/banner.jpg"),
            ("link_url", "/kits/2"),
            ("zoom", "2"),
        ]))
        .unwrap();
        assert!(matches!(input.kind, HighlightKind::Image { .. }));
        assert_eq!(input.frame, ImageFrame::new(2.0, 0.0, 0.0));

        assert!(highlight_input(&pairs(&[("kind", "video")])).is_err());
        assert!(highlight_input(&pairs(&[("kind", "product")])).is_err());
    }
}
