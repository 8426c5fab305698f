//! Category hierarchy, product filtering and sorting.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{Category, Product};
use crate::types::CategoryId;

/// Index over a flat list of categories.
///
/// Parent links come from the store and are not trusted to be acyclic:
/// every walk keeps a visited set.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    by_id: HashMap<CategoryId, Category>,
    children: HashMap<Option<CategoryId>, Vec<CategoryId>>,
}

impl CategoryTree {
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        let by_id: HashMap<CategoryId, Category> =
            categories.iter().map(|c| (c.id, c.clone())).collect();

        let mut children: HashMap<Option<CategoryId>, Vec<CategoryId>> = HashMap::new();
        for category in categories {
            // Dangling parents are treated as roots.
            let parent = category.parent_id.filter(|p| by_id.contains_key(p));
            children.entry(parent).or_default().push(category.id);
        }
        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let name = |id: &CategoryId| by_id.get(id).map(|c| c.name.to_lowercase());
                name(a).cmp(&name(b)).then(a.as_i32().cmp(&b.as_i32()))
            });
        }

        Self { by_id, children }
    }

    #[must_use]
    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.by_id.get(&id)
    }

    /// Top-level categories, alphabetically.
    #[must_use]
    pub fn roots(&self) -> Vec<&Category> {
        self.children_of(None)
    }

    /// Direct children, alphabetically.
    #[must_use]
    pub fn children(&self, id: CategoryId) -> Vec<&Category> {
        self.children_of(Some(id))
    }

    fn children_of(&self, parent: Option<CategoryId>) -> Vec<&Category> {
        self.children
            .get(&parent)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// The category and everything below it.
    #[must_use]
    pub fn descendants(&self, id: CategoryId) -> HashSet<CategoryId> {
        let mut seen = HashSet::new();
        if !self.by_id.contains_key(&id) {
            return seen;
        }
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(kids) = self.children.get(&Some(current)) {
                queue.extend(kids.iter().copied());
            }
        }
        seen
    }

    /// Root-first chain ending at `id`, for breadcrumbs.
    #[must_use]
    pub fn path(&self, id: CategoryId) -> Vec<&Category> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.by_id.get(&id);
        while let Some(category) = current {
            if !seen.insert(category.id) {
                break;
            }
            path.push(category);
            current = category.parent_id.and_then(|p| self.by_id.get(&p));
        }
        path.reverse();
        path
    }

    /// Number of ancestors (roots are at depth 0).
    #[must_use]
    pub fn depth(&self, id: CategoryId) -> usize {
        self.path(id).len().saturating_sub(1)
    }

    /// Categories in depth-first order with their depth, for indented
    /// selects in the admin and the header menu.
    #[must_use]
    pub fn flatten(&self) -> Vec<(usize, &Category)> {
        let mut out = Vec::with_capacity(self.by_id.len());
        let mut seen = HashSet::new();
        let mut stack: Vec<(usize, &Category)> =
            self.roots().into_iter().rev().map(|c| (0, c)).collect();
        while let Some((depth, category)) = stack.pop() {
            if !seen.insert(category.id) {
                continue;
            }
            out.push((depth, category));
            for child in self.children(category.id).into_iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }

    /// Whether making `new_parent` the parent of `id` would close a loop.
    #[must_use]
    pub fn would_create_cycle(&self, id: CategoryId, new_parent: Option<CategoryId>) -> bool {
        new_parent.is_some_and(|parent| self.descendants(id).contains(&parent) || parent == id)
    }

    /// Products in the category or any of its descendants.
    ///
    /// `None` keeps every product.
    #[must_use]
    pub fn filter_products<'a>(
        &self,
        products: &'a [Product],
        category: Option<CategoryId>,
    ) -> Vec<&'a Product> {
        match category {
            None => products.iter().collect(),
            Some(id) => {
                let wanted = self.descendants(id);
                products
                    .iter()
                    .filter(|p| p.category_ids.iter().any(|c| wanted.contains(c)))
                    .collect()
            }
        }
    }
}

/// Product listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// The category's explicit order first, then newest.
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    NameAsc,
    Newest,
}

impl SortMode {
    pub const ALL: [Self; 5] = [
        Self::Featured,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::Newest,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
            Self::Newest => "newest",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::NameAsc => "Name",
            Self::Newest => "Newest",
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown sort: {s}"))
    }
}

/// Sort products in place.
///
/// `category` supplies the explicit order for [`SortMode::Featured`].
pub fn sort_products(products: &mut [&Product], mode: SortMode, category: Option<&Category>) {
    fn name_key(p: &Product) -> String {
        p.name.to_lowercase()
    }

    match mode {
        SortMode::Featured => {
            products.sort_by_key(|p| {
                (
                    category
                        .and_then(|c| c.position_of(p.id))
                        .unwrap_or(usize::MAX),
                    Reverse(p.created_at),
                    p.id.as_i32(),
                )
            });
        }
        SortMode::PriceAsc => {
            products.sort_by(|a, b| {
                a.price
                    .cmp(&b.price)
                    .then_with(|| name_key(a).cmp(&name_key(b)))
            });
        }
        SortMode::PriceDesc => {
            products.sort_by(|a, b| {
                b.price
                    .cmp(&a.price)
                    .then_with(|| name_key(a).cmp(&name_key(b)))
            });
        }
        SortMode::NameAsc => {
            products.sort_by(|a, b| {
                name_key(a)
                    .cmp(&name_key(b))
                    .then(a.id.as_i32().cmp(&b.id.as_i32()))
            });
        }
        SortMode::Newest => {
            products.sort_by_key(|p| (Reverse(p.created_at), p.id.as_i32()));
        }
    }
}

/// Case-insensitive match on name and description.
#[must_use]
pub fn search<'a>(products: Vec<&'a Product>, query: &str) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::StockLevels;
    use crate::types::ProductId;

    fn category(id: i32, name: &str, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            parent_id: parent.map(CategoryId::new),
            item_order: None,
        }
    }

    /// Roupas(1) > Camisetas(2) > Estampadas(4); Roupas(1) > Bonés(3); Casa(5)
    fn tree() -> CategoryTree {
        CategoryTree::new(&[
            category(1, "Roupas", None),
            category(2, "Camisetas", Some(1)),
            category(3, "Bonés", Some(1)),
            category(4, "Estampadas", Some(2)),
            category(5, "Casa", None),
        ])
    }

    fn product(id: i32, name: &str, cents: i64, day: u32, categories: &[i32]) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Decimal::new(cents, 2),
            images: Vec::new(),
            sizes: Vec::new(),
            category_ids: categories.iter().copied().map(CategoryId::new).collect(),
            customizable: false,
            customization_label: None,
            stock: StockLevels::flat(1),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
        }
    }

    fn ids(products: &[&Product]) -> Vec<i32> {
        products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[test]
    fn test_roots_and_children_sorted_by_name() {
        let tree = tree();
        let roots: Vec<&str> = tree.roots().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(roots, vec!["Casa", "Roupas"]);
        let kids: Vec<&str> = tree
            .children(CategoryId::new(1))
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(kids, vec!["Bonés", "Camisetas"]);
    }

    #[test]
    fn test_descendants_inclusive() {
        let tree = tree();
        let set = tree.descendants(CategoryId::new(1));
        assert_eq!(set.len(), 4);
        assert!(set.contains(&CategoryId::new(4)));
        assert!(!set.contains(&CategoryId::new(5)));
        assert!(tree.descendants(CategoryId::new(99)).is_empty());
    }

    #[test]
    fn test_path_and_depth() {
        let tree = tree();
        let names: Vec<&str> = tree
            .path(CategoryId::new(4))
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Roupas", "Camisetas", "Estampadas"]);
        assert_eq!(tree.depth(CategoryId::new(4)), 2);
        assert_eq!(tree.depth(CategoryId::new(5)), 0);
    }

    #[test]
    fn test_flatten_is_depth_first() {
        let tree = tree();
        let flat: Vec<(usize, i32)> = tree
            .flatten()
            .iter()
            .map(|(d, c)| (*d, c.id.as_i32()))
            .collect();
        assert_eq!(flat, vec![(0, 5), (0, 1), (1, 3), (1, 2), (2, 4)]);
    }

    #[test]
    fn test_cycle_detection() {
        let tree = tree();
        assert!(tree.would_create_cycle(CategoryId::new(1), Some(CategoryId::new(4))));
        assert!(tree.would_create_cycle(CategoryId::new(2), Some(CategoryId::new(2))));
        assert!(!tree.would_create_cycle(CategoryId::new(4), Some(CategoryId::new(5))));
        assert!(!tree.would_create_cycle(CategoryId::new(4), None));
    }

    #[test]
    fn test_cyclic_data_does_not_hang() {
        let tree = CategoryTree::new(&[category(1, "A", Some(2)), category(2, "B", Some(1))]);
        assert_eq!(tree.path(CategoryId::new(1)).len(), 2);
        assert!(tree.descendants(CategoryId::new(1)).len() <= 2);
    }

    #[test]
    fn test_filter_includes_descendants() {
        let tree = tree();
        let products = vec![
            product(1, "Camiseta Lisa", 3000, 1, &[2]),
            product(2, "Camiseta Gato", 3500, 2, &[4]),
            product(3, "Boné", 2000, 3, &[3]),
            product(4, "Caneca", 1500, 4, &[5]),
        ];

        assert_eq!(ids(&tree.filter_products(&products, Some(CategoryId::new(2)))), vec![1, 2]);
        assert_eq!(ids(&tree.filter_products(&products, Some(CategoryId::new(1)))), vec![1, 2, 3]);
        assert_eq!(tree.filter_products(&products, None).len(), 4);
    }

    #[test]
    fn test_featured_uses_explicit_order_then_newest() {
        let products = [
            product(1, "A", 100, 1, &[1]),
            product(2, "B", 100, 2, &[1]),
            product(3, "C", 100, 3, &[1]),
            product(4, "D", 100, 4, &[1]),
        ];
        let mut cat = category(1, "Roupas", None);
        cat.item_order = Some(vec![ProductId::new(2), ProductId::new(1)]);

        let mut list: Vec<&Product> = products.iter().collect();
        sort_products(&mut list, SortMode::Featured, Some(&cat));
        assert_eq!(ids(&list), vec![2, 1, 4, 3]);

        sort_products(&mut list, SortMode::Featured, None);
        assert_eq!(ids(&list), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_price_and_name_sorts() {
        let products = [
            product(1, "beta", 500, 1, &[]),
            product(2, "Alpha", 500, 2, &[]),
            product(3, "Gamma", 100, 3, &[]),
        ];
        let mut list: Vec<&Product> = products.iter().collect();

        sort_products(&mut list, SortMode::PriceAsc, None);
        assert_eq!(ids(&list), vec![3, 2, 1]);
        sort_products(&mut list, SortMode::PriceDesc, None);
        assert_eq!(ids(&list), vec![2, 1, 3]);
        sort_products(&mut list, SortMode::NameAsc, None);
        assert_eq!(ids(&list), vec![2, 1, 3]);
        sort_products(&mut list, SortMode::Newest, None);
        assert_eq!(ids(&list), vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_mode_from_str() {
        assert_eq!("price_desc".parse::<SortMode>().unwrap(), SortMode::PriceDesc);
        assert!("cheapest".parse::<SortMode>().is_err());
    }

    #[test]
    fn test_search() {
        let products = [
            product(1, "Camiseta Gato", 100, 1, &[]),
            product(2, "Caneca", 100, 2, &[]),
        ];
        let found = search(products.iter().collect(), "  GATO ");
        assert_eq!(ids(&found), vec![1]);
        assert_eq!(search(products.iter().collect(), "").len(), 2);
        assert_eq!(search(products.iter().collect(), "description").len(), 2);
    }
}
