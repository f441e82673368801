//! Listing page logic: search, price filtering and pagination over the fetched catalog.

use super::{money::parse_brl, slug::slugify};
use crate::entities::ProductModel;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Products shown per listing page
pub const PAGE_SIZE: usize = 6;

/// Filters typed by the shopper on the listing page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub search: Option<String>,
    /// Minimum price as typed, e.g. `"10,00"`
    pub min_price: Option<String>,
    /// Maximum price as typed, e.g. `"R$ 1.500"`
    pub max_price: Option<String>,
}

impl CatalogFilter {
    pub fn matches(&self, product: &ProductModel) -> bool {
        let search = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        if let Some(needle) = search {
            if !product.name.to_lowercase().contains(&needle) {
                return false;
            }
        }

        let min = self.min_price.as_deref().and_then(parse_brl);
        let max = self.max_price.as_deref().and_then(parse_brl);
        within(product.price, min, max)
    }

    pub fn apply<'a>(&self, products: &'a [ProductModel]) -> Vec<&'a ProductModel> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

fn within(price: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    if matches!(min, Some(min) if price < min) {
        return false;
    }
    !matches!(max, Some(max) if price > max)
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually shown
    pub page: usize,
    /// Always at least 1, even for an empty listing
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `items` into the requested 1-based page, clamping out-of-range pages.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;

    Page {
        items: items.iter().skip(start).take(page_size).cloned().collect(),
        page,
        total_pages,
        total_items,
    }
}

/// Filter then paginate with the storefront page size.
pub fn browse<'a>(
    products: &'a [ProductModel],
    filter: &CatalogFilter,
    page: usize,
) -> Page<&'a ProductModel> {
    paginate(&filter.apply(products), page, PAGE_SIZE)
}

/// Resolve a product detail page by its name slug.
pub fn find_by_slug<'a>(products: &'a [ProductModel], slug: &str) -> Option<&'a ProductModel> {
    products.iter().find(|p| slugify(&p.name) == slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn product(name: &str, price: Decimal) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            images: serde_json::json!([]),
            description: String::new(),
            category: String::new(),
            stock: 0,
            ean: String::new(),
            sale_unit: String::new(),
            volume: String::new(),
            units_per_case: 0,
            minimum_quantity: String::new(),
            unit_weight: String::new(),
            case_weight: String::new(),
            ncm: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Vec<ProductModel> {
        vec![
            product("Cachaça Ouro", dec!(89.90)),
            product("Cachaça Prata", dec!(49.90)),
            product("Licor de Jabuticaba", dec!(35.00)),
            product("Kit Degustação", dec!(1250.00)),
        ]
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let products = catalog();
        let filter = CatalogFilter {
            search: Some("CACHAÇA".into()),
            ..Default::default()
        };
        let names: Vec<_> = filter.apply(&products).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cachaça Ouro", "Cachaça Prata"]);
    }

    #[test]
    fn price_bounds_accept_brl_input() {
        let products = catalog();
        let filter = CatalogFilter {
            min_price: Some("R$ 40".into()),
            max_price: Some("1.000,00".into()),
            ..Default::default()
        };
        let names: Vec<_> = filter.apply(&products).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cachaça Ouro", "Cachaça Prata"]);
    }

    #[test]
    fn unparseable_bounds_are_ignored() {
        let products = catalog();
        let filter = CatalogFilter {
            min_price: Some("abc".into()),
            max_price: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&products).len(), products.len());
    }

    #[test]
    fn pagination_uses_six_per_page() {
        let items: Vec<u32> = (1..=14).collect();
        let first = paginate(&items, 1, PAGE_SIZE);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(first.total_pages, 3);
        assert!(!first.has_previous());
        assert!(first.has_next());

        let last = paginate(&items, 3, PAGE_SIZE);
        assert_eq!(last.items, vec![13, 14]);
        assert!(!last.has_next());
    }

    #[test]
    fn empty_listing_still_has_one_page() {
        let page = paginate::<u32>(&[], 4, PAGE_SIZE);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn out_of_range_page_is_clamped() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(&items, 0, PAGE_SIZE).page, 1);
        assert_eq!(paginate(&items, 99, PAGE_SIZE).items, vec![7]);
    }

    #[test]
    fn browse_filters_before_paginating() {
        let products = catalog();
        let page = browse(
            &products,
            &CatalogFilter {
                search: Some("licor".into()),
                ..Default::default()
            },
            1,
        );
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Licor de Jabuticaba");
    }

    #[test]
    fn finds_product_by_slug() {
        let products = catalog();
        let found = find_by_slug(&products, "kit-degustacao").map(|p| p.price);
        assert_eq!(found, Some(dec!(1250.00)));
        assert!(find_by_slug(&products, "nao-existe").is_none());
    }
}
