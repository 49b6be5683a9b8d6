//! Built-in vehicle reference tables, used when the remote API is unreachable.

use crate::models::VehicleOption;

const MAKES: &[&str] = &[
    "Acura",
    "BMW",
    "Chevrolet",
    "Ford",
    "Honda",
    "Hyundai",
    "Jeep",
    "Kia",
    "Mazda",
    "Mercedes-Benz",
    "Nissan",
    "Subaru",
    "Tesla",
    "Toyota",
    "Volkswagen",
];

const MODELS: &[(&str, &[&str])] = &[
    ("Acura", &["ILX", "MDX", "RDX", "TLX"]),
    ("BMW", &["3 Series", "5 Series", "X3", "X5"]),
    ("Chevrolet", &["Equinox", "Malibu", "Silverado 1500", "Tahoe"]),
    ("Ford", &["Escape", "Explorer", "F-150", "Mustang"]),
    ("Honda", &["Accord", "CR-V", "Civic", "Odyssey", "Pilot"]),
    ("Hyundai", &["Elantra", "Santa Fe", "Sonata", "Tucson"]),
    ("Jeep", &["Cherokee", "Grand Cherokee", "Wrangler"]),
    ("Kia", &["Forte", "Sorento", "Sportage", "Telluride"]),
    ("Mazda", &["CX-5", "CX-9", "Mazda3", "Mazda6"]),
    ("Mercedes-Benz", &["C-Class", "E-Class", "GLC"]),
    ("Nissan", &["Altima", "Rogue", "Sentra"]),
    ("Subaru", &["Forester", "Impreza", "Outback"]),
    ("Tesla", &["Model 3", "Model S", "Model Y"]),
    ("Toyota", &["Camry", "Corolla", "Highlander", "RAV4", "Tacoma"]),
    ("Volkswagen", &["Atlas", "Jetta", "Tiguan"]),
];

const TRIMS: &[(&str, &str, &[&str])] = &[
    ("Honda", "Civic", &["LX", "Sport", "EX", "Touring", "Si", "Type R"]),
    ("Honda", "Accord", &["LX", "Sport", "EX-L", "Touring"]),
    ("Honda", "CR-V", &["LX", "EX", "EX-L", "Touring"]),
    ("Toyota", "Camry", &["LE", "SE", "XLE", "XSE", "TRD"]),
    ("Toyota", "Corolla", &["L", "LE", "SE", "XSE"]),
    ("Toyota", "RAV4", &["LE", "XLE", "Adventure", "Limited"]),
    ("Ford", "F-150", &["XL", "XLT", "Lariat", "King Ranch", "Platinum", "Raptor"]),
    ("Ford", "Mustang", &["EcoBoost", "GT", "Mach 1"]),
    ("Tesla", "Model 3", &["Standard Range", "Long Range", "Performance"]),
];

/// Offered for a known model that has no trim table of its own.
const DEFAULT_TRIMS: &[&str] = &["Base", "Sport", "Limited"];

pub fn makes() -> Vec<VehicleOption> {
    MAKES.iter().map(|m| VehicleOption::from_name(m)).collect()
}

pub fn models_for(make: &str) -> Vec<VehicleOption> {
    MODELS
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(make.trim()))
        .map(|(_, models)| models.iter().map(|m| VehicleOption::from_name(m)).collect())
        .unwrap_or_default()
}

pub fn trims_for(make: &str, model: &str) -> Vec<VehicleOption> {
    let (make, model) = (make.trim(), model.trim());

    if let Some((_, _, trims)) = TRIMS
        .iter()
        .find(|(ma, mo, _)| ma.eq_ignore_ascii_case(make) && mo.eq_ignore_ascii_case(model))
    {
        return trims.iter().map(|t| VehicleOption::from_name(t)).collect();
    }

    let known_model = models_for(make)
        .iter()
        .any(|m| m.name.eq_ignore_ascii_case(model));
    if known_model {
        DEFAULT_TRIMS.iter().map(|t| VehicleOption::from_name(t)).collect()
    } else {
        Vec::new()
    }
}
