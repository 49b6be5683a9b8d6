use serde::{Deserialize, Serialize};

/// A make, model or trim normalized to an id/name pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleOption {
    pub id: String,
    pub name: String,
}

impl VehicleOption {
    pub fn from_name(name: &str) -> Self {
        Self {
            id: slugify(name),
            name: name.trim().to_string(),
        }
    }
}

/// Where a vehicle lookup was answered from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleSource {
    Api,
    Cache,
    Static,
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
