// Core logic lives here - freshness math, ranking, and the recompute loop
pub mod config;
pub mod error;
pub mod freshness;
pub mod models;
pub mod recommendation;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::Error;
pub use freshness::{ExclusionPolicy, FreshnessCalculator, FreshnessLevel};
pub use models::{
    Category, CategoryId, Consumable, ConsumptionEvent, Dish, DishId, EventId, Ingredient,
    IngredientId, Settings,
};
pub use recommendation::{Recommendation, RecommendationEngine, RecommendationMode, Snapshot};
pub use service::{Ranking, RecommendationHandle, RecommendationService};
pub use store::{KitchenStore, MemoryStore};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
