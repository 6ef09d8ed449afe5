use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identity of a category row
    CategoryId
);
id_type!(
    /// Identity of an ingredient row
    IngredientId
);
id_type!(
    /// Identity of a dish row
    DishId
);
id_type!(
    /// Identity of a consumption event ("track entry")
    EventId
);

/// Ingredient category. Only its name matters to scoring: it decides
/// membership in the spice-like exclusion set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub emoji: Option<String>,
}

/// A single ingredient in the kitchen
///
/// No last-eaten timestamp is stored here: freshness is always derived
/// from the consumption log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub category_id: CategoryId,
}

/// A dish. Its member ingredients live in the store as plain links
/// (no quantities, no ordering).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
    pub emoji: Option<String>,
}

/// What a consumption event points at - a dish or an ingredient, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Consumable {
    Dish(DishId),
    Ingredient(IngredientId),
}

impl Consumable {
    /// Build from the two-nullable-columns shape some callers still carry.
    ///
    /// Both set or neither set is rejected instead of guessed.
    pub fn from_refs(dish: Option<DishId>, ingredient: Option<IngredientId>) -> crate::Result<Self> {
        match (dish, ingredient) {
            (Some(dish), None) => Ok(Consumable::Dish(dish)),
            (None, Some(ingredient)) => Ok(Consumable::Ingredient(ingredient)),
            _ => Err(crate::Error::AmbiguousConsumptionEvent),
        }
    }

    pub fn dish(&self) -> Option<DishId> {
        match self {
            Consumable::Dish(id) => Some(*id),
            Consumable::Ingredient(_) => None,
        }
    }

    pub fn ingredient(&self) -> Option<IngredientId> {
        match self {
            Consumable::Ingredient(id) => Some(*id),
            Consumable::Dish(_) => None,
        }
    }
}

impl std::fmt::Display for Consumable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Consumable::Dish(id) => write!(f, "dish #{}", id),
            Consumable::Ingredient(id) => write!(f, "ingredient #{}", id),
        }
    }
}

/// One "I ate this" record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub id: EventId,
    pub consumable: Consumable,
    pub consumed_at: DateTime<Utc>,
    /// Informational only - scoring never looks at it
    pub quantity: f64,
}

impl ConsumptionEvent {
    pub fn new(id: EventId, consumable: Consumable, consumed_at: DateTime<Utc>) -> Self {
        Self {
            id,
            consumable,
            consumed_at,
            quantity: default_quantity(),
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Whether this event counts as eating `target` directly
    pub fn is_for(&self, target: Consumable) -> bool {
        self.consumable == target
    }
}

pub fn default_quantity() -> f64 {
    1.0
}

/// User-tunable scoring settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Days for an ingredient to recover from 0 to 100
    #[serde(default = "default_ingredient_window")]
    pub ingredient_window_days: i64,

    /// Days for a dish to recover from 0 to 100
    #[serde(default = "default_dish_window")]
    pub dish_window_days: i64,

    /// Drop spice-like categories from every freshness computation
    #[serde(default)]
    pub exclude_spices: bool,
}

fn default_ingredient_window() -> i64 {
    7
}

fn default_dish_window() -> i64 {
    14
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ingredient_window_days: default_ingredient_window(),
            dish_window_days: default_dish_window(),
            exclude_spices: false,
        }
    }
}

impl Settings {
    /// Reject non-positive windows before they reach the scorer
    pub fn validate(&self) -> crate::Result<()> {
        if self.ingredient_window_days <= 0 {
            return Err(crate::Error::InvalidConfiguration(format!(
                "ingredient window must be at least 1 day, got {}",
                self.ingredient_window_days
            )));
        }
        if self.dish_window_days <= 0 {
            return Err(crate::Error::InvalidConfiguration(format!(
                "dish window must be at least 1 day, got {}",
                self.dish_window_days
            )));
        }
        Ok(())
    }
}
