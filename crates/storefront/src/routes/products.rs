//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrine_core::catalog::{CatalogLookup, Category};
use vitrine_core::category_tree::{CategoryTree, SortMode, search, sort_products};
use vitrine_core::{CategoryId, ProductId};

use super::PageContext;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::views::{CrumbView, LayoutView, ProductCardView, ProductDetailView};

/// Listing query parameters.
///
/// All fields arrive as strings so an empty `?category=` from the filter
/// form means "all".
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub q: Option<String>,
}

/// Parsed listing filters.
#[derive(Debug, PartialEq, Eq)]
pub struct ListingFilters {
    pub category: Option<CategoryId>,
    pub sort: SortMode,
    pub query: String,
}

impl ListingQuery {
    /// Parse the raw query. Unknown sorts fall back to the default order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-numeric category.
    pub fn parse(&self) -> Result<ListingFilters> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<CategoryId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid category: {raw}")))?,
            ),
        };
        let sort = self
            .sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let query = self.q.as_deref().unwrap_or_default().trim().to_string();

        Ok(ListingFilters {
            category,
            sort,
            query,
        })
    }
}

/// Sort dropdown option.
#[derive(Clone)]
pub struct SortOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: LayoutView,
    pub heading: String,
    pub products: Vec<ProductCardView>,
    pub breadcrumbs: Vec<CrumbView>,
    pub subcategories: Vec<CrumbView>,
    /// Current category id as a query value ("" for all).
    pub category_param: String,
    pub sort_options: Vec<SortOptionView>,
    pub query: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: LayoutView,
    pub product: ProductDetailView,
}

/// Product detail modal fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_modal.html")]
pub struct ProductModalTemplate {
    pub product: ProductDetailView,
}

/// Display the product grid with category filter, sort and search.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> Result<ProductsIndexTemplate> {
    let filters = query.parse()?;
    let page = PageContext::load(&state, &session).await?;
    let currency = state.config().store.currency;

    let category = match filters.category {
        Some(id) => Some(
            page.tree
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("category {id}")))?,
        ),
        None => None,
    };

    let matching = page.tree.filter_products(&page.catalog.products, filters.category);
    let mut matching = search(matching, &filters.query);
    sort_products(&mut matching, filters.sort, category);

    let crumb = |c: &Category| CrumbView {
        id: c.id.as_i32(),
        name: c.name.clone(),
    };
    let (heading, breadcrumbs, subcategories) = match category {
        Some(c) => (
            c.name.clone(),
            page.tree.path(c.id).into_iter().map(crumb).collect(),
            page.tree.children(c.id).into_iter().map(crumb).collect(),
        ),
        None => (
            "All products".to_string(),
            Vec::new(),
            page.tree.roots().into_iter().map(crumb).collect(),
        ),
    };

    Ok(ProductsIndexTemplate {
        layout: page.layout,
        heading,
        products: matching
            .into_iter()
            .map(|p| ProductCardView::new(p, currency))
            .collect(),
        breadcrumbs,
        subcategories,
        category_param: filters
            .category
            .map(|id| id.to_string())
            .unwrap_or_default(),
        sort_options: SortMode::ALL
            .into_iter()
            .map(|mode| SortOptionView {
                value: mode.as_str(),
                label: mode.label(),
                selected: mode == filters.sort,
            })
            .collect(),
        query: filters.query,
    })
}

/// Display the product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<ProductShowTemplate> {
    let page = PageContext::load(&state, &session).await?;
    let product = page
        .catalog
        .product(id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let product = ProductDetailView::new(product, &page.tree, state.config().store.currency);

    Ok(ProductShowTemplate {
        layout: page.layout,
        product,
    })
}

/// Product detail modal fragment (HTMX).
#[instrument(skip(state))]
pub async fn modal(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ProductModalTemplate> {
    let catalog = state.catalog().snapshot().await?;
    let tree = CategoryTree::new(&catalog.categories);
    let product = catalog
        .product(id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductModalTemplate {
        product: ProductDetailView::new(product, &tree, state.config().store.currency),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(category: Option<&str>, sort: Option<&str>, q: Option<&str>) -> ListingQuery {
        ListingQuery {
            category: category.map(ToString::to_string),
            sort: sort.map(ToString::to_string),
            q: q.map(ToString::to_string),
        }
    }

    #[test]
    fn test_empty_query_defaults() {
        let filters = ListingQuery::default().parse().unwrap();
        assert_eq!(
            filters,
            ListingFilters {
                category: None,
                sort: SortMode::Featured,
                query: String::new(),
            }
        );
    }

    #[test]
    fn test_blank_category_means_all() {
        let filters = query(Some(""), Some("price_asc"), Some("  gato ")).parse().unwrap();
        assert_eq!(filters.category, None);
        assert_eq!(filters.sort, SortMode::PriceAsc);
        assert_eq!(filters.query, "gato");
    }

    #[test]
    fn test_category_and_unknown_sort() {
        let filters = query(Some("7"), Some("random"), None).parse().unwrap();
        assert_eq!(filters.category, Some(CategoryId::new(7)));
        assert_eq!(filters.sort, SortMode::Featured);
    }

    #[test]
    fn test_invalid_category_is_rejected() {
        assert!(matches!(
            query(Some("shirts"), None, None).parse(),
            Err(AppError::BadRequest(_))
        ));
    }
}
