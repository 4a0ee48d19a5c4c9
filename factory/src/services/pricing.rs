//! Table-driven price and weight estimation
//!
//! Pure lookup plus arithmetic: a part is assumed to be 20% solid shell
//! with the remaining volume scaled by the infill percentage; weight comes
//! from the material density, price from the per-gram rate plus a fixed
//! handling margin.

use std::collections::HashMap;

use crate::error::{FactoryError, FactoryResult};
use crate::traits::PriceEstimator;
use shared::Quote;

/// Fraction of the part treated as fully solid walls
const SHELL_RATIO: f64 = 0.20;

/// Fixed handling fee added to every quote
const FIXED_MARGIN: f64 = 2.00;

/// Density in g/cm³ and price in currency units per gram
#[derive(Clone, Copy, Debug)]
struct Material {
    density: f64,
    price_per_gram: f64,
}

/// Real price estimator implementation
#[derive(Clone)]
pub struct MaterialTable {
    materials: HashMap<&'static str, Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        let mut materials = HashMap::new();
        materials.insert("PLA", Material { density: 1.24, price_per_gram: 0.05 });
        materials.insert("PETG", Material { density: 1.27, price_per_gram: 0.06 });
        materials.insert("ABS", Material { density: 1.04, price_per_gram: 0.055 });
        materials.insert("TPU", Material { density: 1.21, price_per_gram: 0.08 });

        Self { materials }
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceEstimator for MaterialTable {
    fn estimate(&self, volume_cm3: f64, material: &str, infill: u8) -> FactoryResult<Quote> {
        let Some(mat) = self.materials.get(material) else {
            return Err(FactoryError::UnknownMaterial { material: material.to_string() });
        };

        let infill_ratio = f64::from(infill.min(100)) / 100.0;
        let effective_volume =
            volume_cm3 * SHELL_RATIO + volume_cm3 * (1.0 - SHELL_RATIO) * infill_ratio;

        let weight_g = effective_volume * mat.density;
        let price = weight_g * mat.price_per_gram + FIXED_MARGIN;

        Ok(Quote { price: round2(price), weight_g: round2(weight_g) })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
