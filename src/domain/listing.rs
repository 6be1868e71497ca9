//! Catalog listing pipeline: filter, sort, paginate.
//!
//! Pure functions over the in-memory catalog; cheap enough to re-run on
//! every keystroke of the search box.

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Product;

pub const PAGE_SIZE: usize = 12;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Manual ranking, ascending; ties broken by newest first.
    #[default]
    Priority,
    PriceLow,
    PriceHigh,
    NameAsc,
    NameDesc,
    Newest,
    Oldest,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogPage {
    pub items: Vec<Product>,
    pub total_pages: usize,
}

/// Filters by case-insensitive substring on name or description, sorts by
/// `sort`, and returns the requested 1-based page. An out-of-range page
/// yields an empty item list; zero matches yield zero pages.
pub fn view(products: &[Product], query: &str, sort: SortKey, page: usize) -> CatalogPage {
    let needle = query.trim().to_lowercase();
    let mut matched: Vec<&Product> = products
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect();

    // Vec::sort_by is stable, so equal keys keep catalog order beyond the
    // documented tie-breaks.
    match sort {
        SortKey::Priority => matched.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        SortKey::PriceLow => matched.sort_by(|a, b| a.price.cmp(&b.price)),
        SortKey::PriceHigh => matched.sort_by(|a, b| b.price.cmp(&a.price)),
        SortKey::NameAsc => matched.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
        SortKey::NameDesc => matched.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase())),
        SortKey::Newest => matched.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => matched.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }

    let total_pages = matched.len().div_ceil(PAGE_SIZE);
    let items = matched
        .into_iter()
        .skip(page.max(1).saturating_sub(1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    CatalogPage { items, total_pages }
}
