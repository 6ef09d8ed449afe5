use crate::models::{Category, Consumable, ConsumptionEvent, DishId, IngredientId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Fully recovered - never eaten, or eaten long enough ago
pub const MAX_FRESHNESS: u8 = 100;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Category names treated as spice-like when none are configured
pub const DEFAULT_SPICE_CATEGORY_NAMES: [&str; 2] = ["Spices", "Подправки"];

/// Display band for a freshness score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FreshnessLevel {
    /// Score 80-100: go ahead, it's been a while
    High,
    /// Score 50-79
    Medium,
    /// Score 20-49
    Low,
    /// Score 0-19: you just had this
    Critical,
}

impl FreshnessLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => FreshnessLevel::High,
            50..=79 => FreshnessLevel::Medium,
            20..=49 => FreshnessLevel::Low,
            _ => FreshnessLevel::Critical,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            FreshnessLevel::High => "🟢",
            FreshnessLevel::Medium => "🟡",
            FreshnessLevel::Low => "🟠",
            FreshnessLevel::Critical => "🔴",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FreshnessLevel::High => "Fresh",
            FreshnessLevel::Medium => "Recovering",
            FreshnessLevel::Low => "Recent",
            FreshnessLevel::Critical => "Just eaten",
        }
    }
}

/// Which categories get dropped from freshness math, and whether the
/// drop is switched on at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    pub enabled: bool,
    /// A category is spice-like when its name contains any of these
    /// (case-insensitive)
    pub category_names: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            category_names: DEFAULT_SPICE_CATEGORY_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl ExclusionPolicy {
    pub fn new(enabled: bool, category_names: Vec<String>) -> Self {
        Self {
            enabled,
            category_names,
        }
    }

    /// Same category set, flag forced off
    pub fn disabled(&self) -> Self {
        Self {
            enabled: false,
            category_names: self.category_names.clone(),
        }
    }

    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            category_names: self.category_names.clone(),
        }
    }

    /// Name match only; ignores the flag
    pub fn is_spice_like(&self, category: &Category) -> bool {
        let name = category.name.to_lowercase();
        self.category_names
            .iter()
            .any(|needle| !needle.is_empty() && name.contains(&needle.to_lowercase()))
    }

    /// True when the flag is on and the category is spice-like
    pub fn excludes(&self, category: Option<&Category>) -> bool {
        self.enabled && category.is_some_and(|c| self.is_spice_like(c))
    }
}

/// Freshness scoring for ingredients and dishes
///
/// Freshness recovers linearly: 0 right after eating, 100 once a full
/// window has passed. Everything here is pure - `now` is always passed in.
pub struct FreshnessCalculator;

impl FreshnessCalculator {
    /// Score from the last time something was eaten
    ///
    /// A window of zero or fewer days is treated as "always fresh" so the
    /// division below never sees a non-positive denominator. Settings
    /// validation should have rejected such a window long before this.
    pub fn freshness_from_last_consumption(
        last_consumed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> u8 {
        let Some(last) = last_consumed_at else {
            return MAX_FRESHNESS;
        };
        if window_days <= 0 {
            return MAX_FRESHNESS;
        }

        let elapsed_ms = (now - last).num_milliseconds();
        let window_ms = window_days.saturating_mul(MILLIS_PER_DAY);

        if elapsed_ms >= window_ms {
            return MAX_FRESHNESS;
        }
        if elapsed_ms <= 0 {
            return 0;
        }

        // Integer math truncates, which is exactly the floor we want here
        let score = (elapsed_ms as i128 * 100) / window_ms as i128;
        score.clamp(0, MAX_FRESHNESS as i128) as u8
    }

    /// Most recent instant `target` was eaten directly
    ///
    /// Eating a dish does not count as eating its ingredients.
    pub fn last_consumption(
        target: Consumable,
        history: &[ConsumptionEvent],
    ) -> Option<DateTime<Utc>> {
        history
            .iter()
            .filter(|event| event.is_for(target))
            .map(|event| event.consumed_at)
            .max()
    }

    /// Freshness of one ingredient from direct consumption only
    ///
    /// Spice-like ingredients score 100 when the exclusion is on - they
    /// never hold anything back.
    pub fn ingredient_freshness(
        ingredient: IngredientId,
        category: Option<&Category>,
        history: &[ConsumptionEvent],
        window_days: i64,
        exclusion: &ExclusionPolicy,
        now: DateTime<Utc>,
    ) -> u8 {
        if exclusion.excludes(category) {
            return MAX_FRESHNESS;
        }

        let last = Self::last_consumption(Consumable::Ingredient(ingredient), history);
        Self::freshness_from_last_consumption(last, now, window_days)
    }

    /// Freshness of a dish from its own consumption history
    pub fn dish_freshness(
        dish: DishId,
        history: &[ConsumptionEvent],
        window_days: i64,
        now: DateTime<Utc>,
    ) -> u8 {
        let last = Self::last_consumption(Consumable::Dish(dish), history);
        Self::freshness_from_last_consumption(last, now, window_days)
    }

    /// Freshness of a dish as the floored mean of its ingredients
    ///
    /// Spice-like members are removed from the set first (when the policy
    /// is on); the rest are scored with the exclusion forced off. An empty
    /// set, before or after filtering, scores 100.
    pub fn dish_freshness_from_ingredients(
        dish: DishId,
        members: &[(IngredientId, Option<&Category>)],
        history: &[ConsumptionEvent],
        window_days: i64,
        exclusion: &ExclusionPolicy,
        now: DateTime<Utc>,
    ) -> u8 {
        if members.is_empty() {
            return MAX_FRESHNESS;
        }

        let relevant: Vec<_> = members
            .iter()
            .filter(|(_, category)| !exclusion.excludes(*category))
            .collect();

        if relevant.is_empty() {
            trace!(%dish, "every member excluded, dish is fully fresh");
            return MAX_FRESHNESS;
        }

        let per_member = exclusion.disabled();
        let total: u32 = relevant
            .iter()
            .map(|(ingredient, category)| {
                Self::ingredient_freshness(
                    *ingredient,
                    *category,
                    history,
                    window_days,
                    &per_member,
                    now,
                ) as u32
            })
            .sum();

        let mean = total / relevant.len() as u32;
        trace!(%dish, members = relevant.len(), mean, "dish scored from ingredients");
        mean as u8
    }
}
