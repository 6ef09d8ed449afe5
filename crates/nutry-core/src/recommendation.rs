// Ranking dishes by freshness
use crate::freshness::{ExclusionPolicy, FreshnessCalculator, FreshnessLevel};
use crate::models::{
    Category, CategoryId, ConsumptionEvent, Dish, DishId, Ingredient, IngredientId, Settings,
};
use crate::store::KitchenStore;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// How dishes get scored
///
/// Both modes rank dishes. "Ingredient-based" only means the score comes
/// from averaging the dish's members instead of the dish's own history.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    #[default]
    DishBased,
    IngredientBased,
}

impl RecommendationMode {
    pub fn toggled(self) -> Self {
        match self {
            RecommendationMode::DishBased => RecommendationMode::IngredientBased,
            RecommendationMode::IngredientBased => RecommendationMode::DishBased,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RecommendationMode::DishBased => "By dish",
            RecommendationMode::IngredientBased => "By ingredients",
        }
    }
}

impl std::fmt::Display for RecommendationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecommendationMode::DishBased => write!(f, "dish"),
            RecommendationMode::IngredientBased => write!(f, "ingredient"),
        }
    }
}

impl std::str::FromStr for RecommendationMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dish" | "dishes" | "dish_based" | "dish-based" => Ok(RecommendationMode::DishBased),
            "ingredient" | "ingredients" | "ingredient_based" | "ingredient-based" => {
                Ok(RecommendationMode::IngredientBased)
            }
            other => Err(crate::Error::ConfigError(format!(
                "Unknown recommendation mode '{}' (expected 'dish' or 'ingredient')",
                other
            ))),
        }
    }
}

/// One ranked dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub dish: Dish,
    /// Freshness 0-100, higher means "eat this now"
    pub score: u8,
    pub level: FreshnessLevel,
    pub mode: RecommendationMode,
}

/// Everything a recompute needs, read from the store in one go
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// In catalog order - ties in the ranking keep this order
    pub dishes: Vec<Dish>,
    pub ingredients: HashMap<IngredientId, Ingredient>,
    pub categories: HashMap<CategoryId, Category>,
    /// Dishes whose membership could not be fetched are absent here
    pub memberships: HashMap<DishId, Vec<IngredientId>>,
    pub history: Vec<ConsumptionEvent>,
    pub settings: Settings,
}

impl Snapshot {
    /// Read a consistent-enough view of the kitchen
    ///
    /// A failed membership lookup only loses that one dish; anything else
    /// failing aborts the load.
    pub async fn load(store: &dyn KitchenStore) -> Result<Self> {
        use futures::future::join_all;

        let dishes = store.list_dishes().await?;
        let ingredients = store.list_ingredients().await?;
        let categories = store.list_categories().await?;
        let history = store.list_consumption().await?;
        let settings = store.settings().await?;

        let lookups: Vec<_> = dishes.iter().map(|dish| store.dish_members(dish.id)).collect();
        let results = join_all(lookups).await;

        let mut memberships = HashMap::with_capacity(dishes.len());
        for (dish, result) in dishes.iter().zip(results) {
            match result {
                Ok(members) => {
                    memberships.insert(dish.id, members);
                }
                Err(e) => warn!(dish = %dish.name, error = %e, "Could not load dish members"),
            }
        }

        Ok(Self {
            dishes,
            ingredients: ingredients.into_iter().map(|i| (i.id, i)).collect(),
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            memberships,
            history,
            settings,
        })
    }

    /// Members of a dish paired with their categories
    ///
    /// `None` when the membership itself is unknown. Ids pointing at
    /// deleted ingredients are skipped.
    pub fn members_of(&self, dish: DishId) -> Option<Vec<(IngredientId, Option<&Category>)>> {
        let ids = self.memberships.get(&dish)?;
        let members = ids
            .iter()
            .filter_map(|id| match self.ingredients.get(id) {
                Some(ingredient) => {
                    Some((ingredient.id, self.categories.get(&ingredient.category_id)))
                }
                None => {
                    debug!(%dish, ingredient = %id, "dish references a missing ingredient");
                    None
                }
            })
            .collect();
        Some(members)
    }
}

/// Produces ranked recommendations; owns the current mode and nothing else
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    mode: RecommendationMode,
    spice_categories: Vec<String>,
}

impl RecommendationEngine {
    pub fn new(mode: RecommendationMode, spice_categories: Vec<String>) -> Self {
        Self {
            mode,
            spice_categories,
        }
    }

    pub fn mode(&self) -> RecommendationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RecommendationMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) -> RecommendationMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    fn exclusion(&self, settings: &Settings) -> ExclusionPolicy {
        ExclusionPolicy::new(settings.exclude_spices, self.spice_categories.clone())
    }

    /// Rank with the engine's current mode
    pub fn recompute(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Recommendation> {
        self.rank(snapshot, self.mode, now)
    }

    /// Rank every dish, freshest first
    ///
    /// Sorting is stable, so equal scores keep catalog order.
    pub fn rank(
        &self,
        snapshot: &Snapshot,
        mode: RecommendationMode,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let settings = &snapshot.settings;
        let exclusion = self.exclusion(settings);

        let mut entries: Vec<Recommendation> = snapshot
            .dishes
            .iter()
            .filter_map(|dish| {
                let score = match mode {
                    RecommendationMode::DishBased => FreshnessCalculator::dish_freshness(
                        dish.id,
                        &snapshot.history,
                        settings.dish_window_days,
                        now,
                    ),
                    RecommendationMode::IngredientBased => {
                        let Some(members) = snapshot.members_of(dish.id) else {
                            warn!(dish = %dish.name, "Skipping dish without membership data");
                            return None;
                        };
                        FreshnessCalculator::dish_freshness_from_ingredients(
                            dish.id,
                            &members,
                            &snapshot.history,
                            settings.ingredient_window_days,
                            &exclusion,
                            now,
                        )
                    }
                };

                Some(Recommendation {
                    dish: dish.clone(),
                    score,
                    level: FreshnessLevel::from_score(score),
                    mode,
                })
            })
            .collect();

        entries.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(%mode, dishes = entries.len(), "recommendations ranked");
        entries
    }

    /// Load from the store and rank in one call
    pub async fn recompute_from(
        &self,
        store: &dyn KitchenStore,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        let snapshot = Snapshot::load(store).await?;
        Ok(self.recompute(&snapshot, now))
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(
            RecommendationMode::default(),
            ExclusionPolicy::default().category_names,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Consumable, EventId};
    use crate::store::MockKitchenStore;
    use crate::Error;
    use chrono::{Duration, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
    }

    fn dish(id: i64, name: &str) -> Dish {
        Dish {
            id: DishId(id),
            name: name.to_string(),
            emoji: None,
        }
    }

    fn ingredient(id: i64, name: &str, category: i64) -> Ingredient {
        Ingredient {
            id: IngredientId(id),
            name: name.to_string(),
            category_id: CategoryId(category),
        }
    }

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId(id),
            name: name.to_string(),
            emoji: None,
        }
    }

    fn ate(id: i64, consumable: Consumable, at: DateTime<Utc>) -> ConsumptionEvent {
        ConsumptionEvent::new(EventId(id), consumable, at)
    }

    fn names(entries: &[Recommendation]) -> Vec<&str> {
        entries.iter().map(|e| e.dish.name.as_str()).collect()
    }

    /// Four dishes with dish-window scores [30, 90, 90, 10] in catalog order
    fn ranking_snapshot() -> Snapshot {
        let now = fixed_now();
        let dishes = vec![dish(1, "A"), dish(2, "B"), dish(3, "C"), dish(4, "D")];
        // 10-day window: 3 days ago -> 30, 9 days -> 90, 1 day -> 10
        let history = vec![
            ate(1, Consumable::Dish(DishId(1)), now - Duration::days(3)),
            ate(2, Consumable::Dish(DishId(2)), now - Duration::days(9)),
            ate(3, Consumable::Dish(DishId(3)), now - Duration::days(9)),
            ate(4, Consumable::Dish(DishId(4)), now - Duration::days(1)),
        ];
        Snapshot {
            memberships: dishes.iter().map(|d| (d.id, Vec::new())).collect(),
            dishes,
            history,
            settings: Settings {
                ingredient_window_days: 7,
                dish_window_days: 10,
                exclude_spices: false,
            },
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_dish_based_ranking_is_stable_descending() {
        let engine = RecommendationEngine::default();
        let entries = engine.recompute(&ranking_snapshot(), fixed_now());

        let scores: Vec<u8> = entries.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![90, 90, 30, 10]);
        // B and C tie; catalog order wins
        assert_eq!(names(&entries), vec!["B", "C", "A", "D"]);
        assert!(entries.iter().all(|e| e.mode == RecommendationMode::DishBased));
        assert_eq!(entries[0].level, FreshnessLevel::High);
        assert_eq!(entries[3].level, FreshnessLevel::Critical);
    }

    #[test]
    fn test_ingredient_mode_still_ranks_dishes() {
        let now = fixed_now();
        let mut snapshot = ranking_snapshot();
        snapshot.ingredients = [ingredient(10, "Potato", 100)]
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        snapshot.categories = [category(100, "Vegetables")]
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        snapshot.memberships.insert(DishId(2), vec![IngredientId(10)]);
        snapshot
            .history
            .push(ate(5, Consumable::Ingredient(IngredientId(10)), now));

        let engine = RecommendationEngine::new(
            RecommendationMode::IngredientBased,
            vec!["Spices".to_string()],
        );
        let entries = engine.recompute(&snapshot, now);

        // No ingredient entries, only the four dishes
        assert_eq!(entries.len(), 4);
        // Empty dishes score 100 and keep catalog order; B just had its potato
        assert_eq!(names(&entries), vec!["A", "C", "D", "B"]);
        assert_eq!(entries[3].score, 0);
        assert!(entries
            .iter()
            .all(|e| e.mode == RecommendationMode::IngredientBased));
    }

    #[test]
    fn test_mode_switch_changes_the_criterion() {
        let mut engine = RecommendationEngine::default();
        let snapshot = ranking_snapshot();
        let by_dish = engine.recompute(&snapshot, fixed_now());

        assert_eq!(engine.toggle_mode(), RecommendationMode::IngredientBased);
        let by_ingredient = engine.recompute(&snapshot, fixed_now());

        // Same data, different scoring: every dish has no members -> all 100
        assert_ne!(by_dish, by_ingredient);
        assert!(by_ingredient.iter().all(|e| e.score == 100));
        assert_eq!(names(&by_ingredient), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_dish_without_membership_is_dropped_in_ingredient_mode() {
        let mut snapshot = ranking_snapshot();
        snapshot.memberships.remove(&DishId(3));

        let engine = RecommendationEngine::default();
        let by_ingredient = engine.rank(&snapshot, RecommendationMode::IngredientBased, fixed_now());
        assert_eq!(names(&by_ingredient), vec!["A", "B", "D"]);

        // Dish mode does not need membership at all
        let by_dish = engine.rank(&snapshot, RecommendationMode::DishBased, fixed_now());
        assert_eq!(by_dish.len(), 4);
    }

    #[test]
    fn test_missing_ingredients_are_skipped() {
        let now = fixed_now();
        let mut snapshot = ranking_snapshot();
        snapshot.ingredients = [ingredient(10, "Potato", 100)]
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        // #11 was deleted; it must not count as a fresh 100
        snapshot
            .memberships
            .insert(DishId(1), vec![IngredientId(10), IngredientId(11)]);
        snapshot
            .history
            .push(ate(5, Consumable::Ingredient(IngredientId(10)), now));

        let members = snapshot.members_of(DishId(1)).unwrap();
        assert_eq!(members.len(), 1);

        let engine = RecommendationEngine::default();
        let entries = engine.rank(&snapshot, RecommendationMode::IngredientBased, now);
        let a = entries.iter().find(|e| e.dish.id == DishId(1)).unwrap();
        assert_eq!(a.score, 0);
    }

    #[test]
    fn test_exclude_spices_setting_flows_through() {
        let now = fixed_now();
        let mut snapshot = ranking_snapshot();
        snapshot.ingredients = [ingredient(10, "Potato", 100), ingredient(11, "Salt", 200)]
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        snapshot.categories = [category(100, "Vegetables"), category(200, "Spices")]
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        snapshot
            .memberships
            .insert(DishId(1), vec![IngredientId(10), IngredientId(11)]);
        snapshot
            .history
            .push(ate(5, Consumable::Ingredient(IngredientId(11)), now));

        let engine = RecommendationEngine::default();
        let score_of_a = |snapshot: &Snapshot| {
            engine
                .rank(snapshot, RecommendationMode::IngredientBased, now)
                .into_iter()
                .find(|e| e.dish.id == DishId(1))
                .map(|e| e.score)
        };

        // Salt just eaten: (100 + 0) / 2
        assert_eq!(score_of_a(&snapshot), Some(50));

        snapshot.settings.exclude_spices = true;
        assert_eq!(score_of_a(&snapshot), Some(100));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "dish".parse::<RecommendationMode>().unwrap(),
            RecommendationMode::DishBased
        );
        assert_eq!(
            "Ingredients".parse::<RecommendationMode>().unwrap(),
            RecommendationMode::IngredientBased
        );
        assert!("spices".parse::<RecommendationMode>().is_err());
        assert_eq!(RecommendationMode::default(), RecommendationMode::DishBased);
    }

    #[tokio::test]
    async fn test_snapshot_load_survives_one_bad_dish() {
        let mut store = MockKitchenStore::new();
        store
            .expect_list_dishes()
            .returning(|| Ok(vec![dish(1, "Good"), dish(2, "Broken")]));
        store
            .expect_list_ingredients()
            .returning(|| Ok(vec![ingredient(10, "Potato", 100)]));
        store
            .expect_list_categories()
            .returning(|| Ok(vec![category(100, "Vegetables")]));
        store.expect_list_consumption().returning(|| Ok(Vec::new()));
        store.expect_settings().returning(|| Ok(Settings::default()));
        store.expect_dish_members().returning(|id| {
            if id == DishId(2) {
                Err(Error::StoreError("disk on fire".to_string()))
            } else {
                Ok(vec![IngredientId(10)])
            }
        });

        let snapshot = Snapshot::load(&store).await.unwrap();
        assert_eq!(snapshot.dishes.len(), 2);
        assert!(snapshot.memberships.contains_key(&DishId(1)));
        assert!(!snapshot.memberships.contains_key(&DishId(2)));

        let engine = RecommendationEngine::new(RecommendationMode::IngredientBased, Vec::new());
        let entries = engine.recompute(&snapshot, fixed_now());
        assert_eq!(names(&entries), vec!["Good"]);
    }

    #[tokio::test]
    async fn test_snapshot_load_fails_when_catalog_is_unreadable() {
        let mut store = MockKitchenStore::new();
        store
            .expect_list_dishes()
            .returning(|| Err(Error::StoreError("locked".to_string())));

        let result = RecommendationEngine::default()
            .recompute_from(&store, fixed_now())
            .await;
        assert!(matches!(result, Err(Error::StoreError(_))));
    }
}
