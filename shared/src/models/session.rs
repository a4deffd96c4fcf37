//! Mixing Session Model
//!
//! Weights are `Decimal` at the precision they were received with. No rounding
//! is applied between live feedback and the final classification, both use
//! [`Classification::classify`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::recipe::Recipe;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No recipe loaded
    Idle,
    /// Recipe detected, waiting for the operator
    Ready,
    /// Operator started, one ingredient is current
    Active,
    /// All ingredients committed
    Completed,
    /// Operator aborted
    Cancelled,
}

impl SessionState {
    /// States from which a newly detected recipe may replace the target
    pub fn accepts_recipe(&self) -> bool {
        !matches!(self, SessionState::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Ready => write!(f, "READY"),
            SessionState::Active => write!(f, "ACTIVE"),
            SessionState::Completed => write!(f, "COMPLETED"),
            SessionState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Tri-state result of comparing a weight difference against the tolerance band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// |difference| <= tolerance
    Perfect,
    /// difference > tolerance
    Over,
    /// difference < -tolerance
    Under,
}

impl Classification {
    /// The band is inclusive on both ends.
    pub fn classify(difference: Decimal, tolerance: Decimal) -> Self {
        if difference > tolerance {
            Classification::Over
        } else if difference < -tolerance {
            Classification::Under
        } else {
            Classification::Perfect
        }
    }

    pub fn is_within(&self) -> bool {
        matches!(self, Classification::Perfect)
    }
}

/// Instantaneous scale reading from the hardware source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightReading {
    pub weight: Decimal,
}

impl WeightReading {
    pub fn new(weight: Decimal) -> Self {
        Self { weight }
    }

    /// Convert a raw float from a scale driver. Non-finite values are rejected.
    pub fn from_f64(weight: f64) -> Option<Self> {
        if !weight.is_finite() {
            return None;
        }
        Decimal::try_from(weight).ok().map(Self::new)
    }
}

/// One line of the flattened ingredient list walked by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIngredient {
    /// Layer the ingredient belongs to
    pub layer: String,
    pub order: u32,
    pub code: String,
    pub target_weight: Decimal,
    /// Accepted weight, set when the operator advances past the ingredient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighed: Option<Decimal>,
}

/// Operator-run execution of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixingSession {
    pub session_id: String,
    pub recipe_id: String,
    pub state: SessionState,
    /// Sum of all target weights
    pub total_weight: Decimal,
    /// Running sum of accepted weights
    pub accumulated_weight: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_weight: Option<Decimal>,
    /// final - total, set on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Absolute tolerance band
    pub tolerance: Decimal,
    pub ingredients: Vec<SessionIngredient>,
    /// Index of the current ingredient while ACTIVE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    /// Latest reading recorded against the current ingredient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mix_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl MixingSession {
    /// Build a READY session targeting `recipe`
    pub fn from_recipe(recipe: &Recipe, tolerance: Decimal) -> Self {
        let ingredients = recipe
            .layers
            .iter()
            .flat_map(|layer| {
                layer.ingredients.iter().map(move |i| SessionIngredient {
                    layer: layer.name.clone(),
                    order: i.order,
                    code: i.sku.clone(),
                    target_weight: i.target_weight,
                    weighed: None,
                })
            })
            .collect();

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            recipe_id: recipe.number.clone(),
            state: SessionState::Ready,
            total_weight: recipe.total_weight(),
            accumulated_weight: Decimal::ZERO,
            final_weight: None,
            difference: None,
            classification: None,
            tolerance,
            ingredients,
            current_index: None,
            last_reading: None,
            mix_type: recipe.mix_type.clone(),
            operator_id: None,
            operator_name: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn current_ingredient(&self) -> Option<&SessionIngredient> {
        self.current_index.and_then(|i| self.ingredients.get(i))
    }

    pub fn is_last_ingredient(&self) -> bool {
        self.current_index
            .is_some_and(|i| i + 1 >= self.ingredients.len())
    }

    /// Number of ingredients already committed
    pub fn weighed_count(&self) -> usize {
        self.ingredients.iter().filter(|i| i.weighed.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recipe::{IngredientTarget, Layer, RecipeMeta};

    #[test]
    fn test_classify_boundaries() {
        let tol = Decimal::new(5, 1);
        assert_eq!(
            Classification::classify(Decimal::new(5, 1), tol),
            Classification::Perfect
        );
        assert_eq!(
            Classification::classify(Decimal::new(-5, 1), tol),
            Classification::Perfect
        );
        assert_eq!(
            Classification::classify(Decimal::new(51, 2), tol),
            Classification::Over
        );
        assert_eq!(
            Classification::classify(Decimal::new(-51, 2), tol),
            Classification::Under
        );
    }

    #[test]
    fn test_zero_tolerance_only_exact_is_perfect() {
        assert!(Classification::classify(Decimal::ZERO, Decimal::ZERO).is_within());
        assert_eq!(
            Classification::classify(Decimal::new(1, 3), Decimal::ZERO),
            Classification::Over
        );
    }

    #[test]
    fn test_weight_reading_rejects_nan() {
        assert!(WeightReading::from_f64(f64::NAN).is_none());
        assert!(WeightReading::from_f64(f64::INFINITY).is_none());
        assert!(WeightReading::from_f64(12.5).is_some());
    }

    #[test]
    fn test_from_recipe_flattens_with_layer_names() {
        let recipe = Recipe {
            number: "7".into(),
            history: None,
            meta: RecipeMeta::default(),
            tolerance: None,
            mix_type: Some("Bicapa".into()),
            layers: vec![
                Layer {
                    name: "Base".into(),
                    ingredients: vec![IngredientTarget {
                        order: 1,
                        sku: "A".into(),
                        target_weight: Decimal::new(10, 0),
                    }],
                },
                Layer {
                    name: "Barniz".into(),
                    ingredients: vec![IngredientTarget {
                        order: 1,
                        sku: "B".into(),
                        target_weight: Decimal::new(205, 1),
                    }],
                },
            ],
        };

        let session = MixingSession::from_recipe(&recipe, Decimal::ONE);
        assert_eq!(session.state, SessionState::Ready);
        assert_eq!(session.total_weight, Decimal::new(305, 1));
        assert_eq!(session.ingredients[1].layer, "Barniz");
        assert_eq!(session.mix_type.as_deref(), Some("Bicapa"));
        assert!(session.current_ingredient().is_none());
        assert!(!session.is_last_ingredient());
    }

    #[test]
    fn test_is_last_ingredient_follows_cursor() {
        let recipe = Recipe {
            number: "8".into(),
            history: None,
            meta: RecipeMeta::default(),
            tolerance: None,
            mix_type: None,
            layers: vec![Layer {
                name: "Base".into(),
                ingredients: vec![
                    IngredientTarget {
                        order: 1,
                        sku: "A".into(),
                        target_weight: Decimal::ONE,
                    },
                    IngredientTarget {
                        order: 2,
                        sku: "B".into(),
                        target_weight: Decimal::ONE,
                    },
                ],
            }],
        };

        let mut session = MixingSession::from_recipe(&recipe, Decimal::ONE);
        session.current_index = Some(0);
        assert!(!session.is_last_ingredient());
        session.current_index = Some(1);
        assert!(session.is_last_ingredient());
    }
}
