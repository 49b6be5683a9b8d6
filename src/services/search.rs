use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Shop;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Search terms mapped to specialty vocabulary they should also match.
const KEYWORD_EXPANSIONS: &[(&str, &[&str])] = &[
    ("oil", &["oil change", "maintenance", "quick service", "lube"]),
    ("brake", &["brakes", "brake repair", "safety"]),
    ("tire", &["tires", "wheel alignment", "wheels"]),
    ("align", &["wheel alignment", "suspension"]),
    ("engine", &["engine repair", "diagnostics"]),
    ("check engine", &["diagnostics"]),
    ("diagnos", &["diagnostics"]),
    ("transmission", &["transmission", "drivetrain"]),
    ("battery", &["battery", "electrical"]),
    ("electric", &["electrical", "battery", "hybrid service"]),
    ("hybrid", &["hybrid service", "electrical"]),
    ("a/c", &["a/c repair", "heating", "climate control"]),
    ("air condition", &["a/c repair", "climate control"]),
    ("heat", &["heating", "climate control"]),
    ("inspection", &["general maintenance", "diagnostics"]),
    ("tune", &["general maintenance", "maintenance"]),
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Rating,
    Reviews,
    Distance,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopFilters {
    pub location: Option<String>,
    pub service: Option<String>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort_by: SortBy,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub shops: Vec<Shop>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

/// Filters, sorts and paginates `shops`. Blank filters are ignored.
pub fn search_shops(shops: Vec<Shop>, filters: &ShopFilters) -> SearchResults {
    let location = normalized(filters.location.as_deref());
    let service_terms = normalized(filters.service.as_deref()).map(|s| expand_service_term(&s));

    let mut matched: Vec<Shop> = shops
        .into_iter()
        .filter(|shop| match &location {
            Some(loc) => matches_location(shop, loc),
            None => true,
        })
        .filter(|shop| match &service_terms {
            Some(terms) => matches_service(shop, terms),
            None => true,
        })
        .filter(|shop| match filters.min_rating {
            Some(min) => shop.rating_average >= min,
            None => true,
        })
        .collect();

    sort_shops(&mut matched, filters.sort_by);

    let page = filters.page.unwrap_or(1).max(1);
    let limit = filters
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    paginate(matched, page, limit)
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn matches_location(shop: &Shop, location: &str) -> bool {
    [&shop.city, &shop.state, &shop.zip]
        .iter()
        .any(|field| field.to_lowercase().contains(location))
}

/// The term itself plus every expansion whose key occurs in it.
fn expand_service_term(term: &str) -> Vec<String> {
    let mut terms = vec![term.to_string()];
    for (key, expansions) in KEYWORD_EXPANSIONS {
        if term.contains(key) {
            for expansion in expansions.iter() {
                if !terms.iter().any(|t| t == expansion) {
                    terms.push(expansion.to_string());
                }
            }
        }
    }
    terms
}

fn matches_service(shop: &Shop, terms: &[String]) -> bool {
    shop.specialties.iter().any(|specialty| {
        let specialty = specialty.trim().to_lowercase();
        !specialty.is_empty()
            && terms
                .iter()
                .any(|term| specialty.contains(term.as_str()) || term.contains(specialty.as_str()))
    })
}

fn sort_shops(shops: &mut [Shop], sort_by: SortBy) {
    match sort_by {
        SortBy::Reviews => shops.sort_by(|a, b| b.review_count.cmp(&a.review_count)),
        // No coordinates are carried on shops, so distance falls back to rating order.
        SortBy::Rating | SortBy::Distance => shops.sort_by(|a, b| {
            b.rating_average
                .partial_cmp(&a.rating_average)
                .unwrap_or(Ordering::Equal)
        }),
    }
}

fn paginate(shops: Vec<Shop>, page: usize, limit: usize) -> SearchResults {
    let total = shops.len();
    let start = (page - 1).saturating_mul(limit);
    let page_shops = shops.into_iter().skip(start).take(limit).collect();

    SearchResults {
        shops: page_shops,
        total,
        page,
        limit,
        has_more: total > page.saturating_mul(limit),
    }
}
