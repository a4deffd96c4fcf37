//! Recipe Model
//!
//! A recipe is produced once by the intake parser and never mutated afterwards.
//! The mixing engine walks it in flattened order: layer declaration order first,
//! then ingredient `order` inside each layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Name given to ingredients printed before any layer header
pub const DEFAULT_LAYER_NAME: &str = "General";

/// Optional descriptive metadata printed by the dispensing controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_maker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sayer_code: Option<String>,
}

/// One ingredient with its target weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientTarget {
    /// 1-based sequence number inside the layer
    pub order: u32,
    /// Ingredient code, case preserved as printed
    pub sku: String,
    /// Target weight (grams), always > 0
    pub target_weight: Decimal,
}

/// Named group of ingredients dispensed as a contiguous block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub ingredients: Vec<IngredientTarget>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
        }
    }

    /// Sum of target weights in this layer
    pub fn total_weight(&self) -> Decimal {
        self.ingredients.iter().map(|i| i.target_weight).sum()
    }
}

/// Parsed paint-mixing recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe number (mandatory)
    pub number: String,
    /// Batch / history code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(default)]
    pub meta: RecipeMeta,
    /// Per-recipe tolerance, overrides the station default when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Decimal>,
    /// Mix type printed on the ticket (e.g. "Bicapa")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_type: Option<String>,
    pub layers: Vec<Layer>,
}

impl Recipe {
    /// Sum of every ingredient target across all layers
    pub fn total_weight(&self) -> Decimal {
        self.layers.iter().map(Layer::total_weight).sum()
    }

    /// Ingredients in dispensing order
    pub fn flatten(&self) -> impl Iterator<Item = &IngredientTarget> {
        self.layers.iter().flat_map(|l| l.ingredients.iter())
    }

    pub fn ingredient_count(&self) -> usize {
        self.layers.iter().map(|l| l.ingredients.len()).sum()
    }
}
