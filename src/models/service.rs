use serde::{Deserialize, Serialize};

/// A service a shop offers. Price and duration are display text, not parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub description: String,
    pub price_range: String,
    pub duration: String,
    pub category: String,
}
