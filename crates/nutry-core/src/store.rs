// Kitchen data access - the engine only ever sees the read trait
use crate::freshness::FreshnessCalculator;
use crate::models::{
    Category, CategoryId, Consumable, ConsumptionEvent, Dish, DishId, EventId, Ingredient,
    IngredientId, Settings,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::debug;

/// Read side of the kitchen store
///
/// Anything that can hand out dishes, ingredients and the consumption log
/// can drive recommendations. Keeps the engine testable and storage-agnostic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KitchenStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Ingredients ordered by name ascending
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>>;

    /// Dishes ordered by name ascending - this is the tie order for rankings
    async fn list_dishes(&self) -> Result<Vec<Dish>>;

    /// Member ingredient ids of one dish
    async fn dish_members(&self, dish: DishId) -> Result<Vec<IngredientId>>;

    async fn list_consumption(&self) -> Result<Vec<ConsumptionEvent>>;

    async fn settings(&self) -> Result<Settings>;

    /// Revision feed; the value changes on every write
    fn changes(&self) -> watch::Receiver<u64>;
}

#[derive(Debug, Default)]
struct Tables {
    categories: BTreeMap<CategoryId, Category>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    dishes: BTreeMap<DishId, Dish>,
    links: BTreeSet<(DishId, IngredientId)>,
    events: BTreeMap<EventId, ConsumptionEvent>,
    settings: Settings,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn contains(&self, consumable: Consumable) -> bool {
        match consumable {
            Consumable::Dish(id) => self.dishes.contains_key(&id),
            Consumable::Ingredient(id) => self.ingredients.contains_key(&id),
        }
    }

    fn drop_ingredient(&mut self, id: IngredientId) {
        self.ingredients.remove(&id);
        self.links.retain(|(_, ingredient)| *ingredient != id);
    }
}

/// In-memory kitchen store
///
/// Deleting a category, ingredient or dish cascades to links that point at
/// it. Consumption events are left alone; they just stop matching anything.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    revision: watch::Sender<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            tables: RwLock::new(Tables::default()),
            revision,
        }
    }

    pub fn with_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let store = Self::new();
        store.write().settings = settings;
        Ok(store)
    }

    // A poisoned lock only means another writer panicked mid-update;
    // the maps themselves are still usable
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Current revision; handy for tests and the CLI
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    // Categories

    pub fn add_category(&self, name: &str, emoji: Option<&str>) -> Result<Category> {
        let category = {
            let mut tables = self.write();
            let category = Category {
                id: CategoryId(tables.next_id()),
                name: name.to_string(),
                emoji: emoji.map(str::to_string),
            };
            tables.categories.insert(category.id, category.clone());
            category
        };
        debug!(id = %category.id, name = %category.name, "category added");
        self.bump();
        Ok(category)
    }

    pub fn update_category(&self, category: Category) -> Result<()> {
        {
            let mut tables = self.write();
            let slot = tables
                .categories
                .get_mut(&category.id)
                .ok_or_else(|| Error::NotFound(format!("category #{}", category.id)))?;
            *slot = category;
        }
        self.bump();
        Ok(())
    }

    /// Removes the category along with its ingredients
    pub fn delete_category(&self, id: CategoryId) -> Result<()> {
        {
            let mut tables = self.write();
            tables
                .categories
                .remove(&id)
                .ok_or_else(|| Error::NotFound(format!("category #{}", id)))?;
            let doomed: Vec<_> = tables
                .ingredients
                .values()
                .filter(|ingredient| ingredient.category_id == id)
                .map(|ingredient| ingredient.id)
                .collect();
            for ingredient in doomed {
                tables.drop_ingredient(ingredient);
            }
        }
        self.bump();
        Ok(())
    }

    // Ingredients

    pub fn add_ingredient(&self, name: &str, category_id: CategoryId) -> Result<Ingredient> {
        let ingredient = {
            let mut tables = self.write();
            if !tables.categories.contains_key(&category_id) {
                return Err(Error::MissingData(format!(
                    "category #{} for ingredient '{}'",
                    category_id, name
                )));
            }
            let ingredient = Ingredient {
                id: IngredientId(tables.next_id()),
                name: name.to_string(),
                category_id,
            };
            tables.ingredients.insert(ingredient.id, ingredient.clone());
            ingredient
        };
        debug!(id = %ingredient.id, name = %ingredient.name, "ingredient added");
        self.bump();
        Ok(ingredient)
    }

    pub fn update_ingredient(&self, ingredient: Ingredient) -> Result<()> {
        {
            let mut tables = self.write();
            if !tables.categories.contains_key(&ingredient.category_id) {
                return Err(Error::MissingData(format!(
                    "category #{} for ingredient '{}'",
                    ingredient.category_id, ingredient.name
                )));
            }
            let slot = tables
                .ingredients
                .get_mut(&ingredient.id)
                .ok_or_else(|| Error::NotFound(format!("ingredient #{}", ingredient.id)))?;
            *slot = ingredient;
        }
        self.bump();
        Ok(())
    }

    pub fn delete_ingredient(&self, id: IngredientId) -> Result<()> {
        {
            let mut tables = self.write();
            if !tables.ingredients.contains_key(&id) {
                return Err(Error::NotFound(format!("ingredient #{}", id)));
            }
            tables.drop_ingredient(id);
        }
        self.bump();
        Ok(())
    }

    // Dishes

    pub fn add_dish(&self, name: &str, emoji: Option<&str>) -> Result<Dish> {
        let dish = {
            let mut tables = self.write();
            let dish = Dish {
                id: DishId(tables.next_id()),
                name: name.to_string(),
                emoji: emoji.map(str::to_string),
            };
            tables.dishes.insert(dish.id, dish.clone());
            dish
        };
        debug!(id = %dish.id, name = %dish.name, "dish added");
        self.bump();
        Ok(dish)
    }

    pub fn update_dish(&self, dish: Dish) -> Result<()> {
        {
            let mut tables = self.write();
            let slot = tables
                .dishes
                .get_mut(&dish.id)
                .ok_or_else(|| Error::NotFound(format!("dish #{}", dish.id)))?;
            *slot = dish;
        }
        self.bump();
        Ok(())
    }

    pub fn delete_dish(&self, id: DishId) -> Result<()> {
        {
            let mut tables = self.write();
            tables
                .dishes
                .remove(&id)
                .ok_or_else(|| Error::NotFound(format!("dish #{}", id)))?;
            tables.links.retain(|(dish, _)| *dish != id);
        }
        self.bump();
        Ok(())
    }

    // Dish membership

    pub fn link_ingredient(&self, dish: DishId, ingredient: IngredientId) -> Result<()> {
        {
            let mut tables = self.write();
            if !tables.dishes.contains_key(&dish) {
                return Err(Error::NotFound(format!("dish #{}", dish)));
            }
            if !tables.ingredients.contains_key(&ingredient) {
                return Err(Error::MissingData(format!("ingredient #{}", ingredient)));
            }
            tables.links.insert((dish, ingredient));
        }
        self.bump();
        Ok(())
    }

    pub fn unlink_ingredient(&self, dish: DishId, ingredient: IngredientId) -> Result<()> {
        let removed = self.write().links.remove(&(dish, ingredient));
        if removed {
            self.bump();
        }
        Ok(())
    }

    /// Replace the whole member set of a dish in one go
    pub fn set_dish_ingredients(&self, dish: DishId, ingredients: &[IngredientId]) -> Result<()> {
        {
            let mut tables = self.write();
            if !tables.dishes.contains_key(&dish) {
                return Err(Error::NotFound(format!("dish #{}", dish)));
            }
            if let Some(missing) = ingredients
                .iter()
                .find(|id| !tables.ingredients.contains_key(*id))
            {
                return Err(Error::MissingData(format!("ingredient #{}", missing)));
            }
            tables.links.retain(|(d, _)| *d != dish);
            for ingredient in ingredients {
                tables.links.insert((dish, *ingredient));
            }
        }
        self.bump();
        Ok(())
    }

    // Consumption log

    /// Record that something was eaten
    pub fn record_consumption(
        &self,
        consumable: Consumable,
        consumed_at: DateTime<Utc>,
        quantity: f64,
    ) -> Result<ConsumptionEvent> {
        let event = {
            let mut tables = self.write();
            if !tables.contains(consumable) {
                return Err(Error::MissingData(format!("{} does not exist", consumable)));
            }
            let event = ConsumptionEvent::new(EventId(tables.next_id()), consumable, consumed_at)
                .with_quantity(quantity);
            tables.events.insert(event.id, event.clone());
            event
        };
        debug!(id = %event.id, consumable = %event.consumable, "consumption recorded");
        self.bump();
        Ok(event)
    }

    /// Same as [`record_consumption`](Self::record_consumption) for callers
    /// holding a pair of optional references
    pub fn track(
        &self,
        dish: Option<DishId>,
        ingredient: Option<IngredientId>,
        consumed_at: DateTime<Utc>,
        quantity: f64,
    ) -> Result<ConsumptionEvent> {
        let consumable = Consumable::from_refs(dish, ingredient)?;
        self.record_consumption(consumable, consumed_at, quantity)
    }

    pub fn update_consumption(&self, event: ConsumptionEvent) -> Result<()> {
        {
            let mut tables = self.write();
            if !tables.contains(event.consumable) {
                return Err(Error::MissingData(format!("{} does not exist", event.consumable)));
            }
            let slot = tables
                .events
                .get_mut(&event.id)
                .ok_or_else(|| Error::NotFound(format!("consumption event #{}", event.id)))?;
            *slot = event;
        }
        self.bump();
        Ok(())
    }

    pub fn delete_consumption(&self, id: EventId) -> Result<()> {
        self.write()
            .events
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("consumption event #{}", id)))?;
        self.bump();
        Ok(())
    }

    /// Latest event in the log, if any
    pub fn latest_consumption(&self) -> Option<ConsumptionEvent> {
        self.read()
            .events
            .values()
            .max_by_key(|event| (event.consumed_at, event.id))
            .cloned()
    }

    /// Derived "last eaten" - direct consumption only
    pub fn last_consumed(&self, consumable: Consumable) -> Option<DateTime<Utc>> {
        let tables = self.read();
        let events: Vec<_> = tables.events.values().cloned().collect();
        FreshnessCalculator::last_consumption(consumable, &events)
    }

    // Settings

    /// Settings boundary - non-positive windows never get in
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.write().settings = settings;
        debug!(?settings, "settings updated");
        self.bump();
        Ok(())
    }

    // Lookups

    pub fn find_dish(&self, name: &str) -> Option<Dish> {
        self.read()
            .dishes
            .values()
            .find(|dish| dish.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    pub fn find_ingredient(&self, name: &str) -> Option<Ingredient> {
        self.read()
            .ingredients
            .values()
            .find(|ingredient| ingredient.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    pub fn dish(&self, id: DishId) -> Option<Dish> {
        self.read().dishes.get(&id).cloned()
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<Ingredient> {
        self.read().ingredients.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KitchenStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<_> = self.read().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        let mut ingredients: Vec<_> = self.read().ingredients.values().cloned().collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ingredients)
    }

    async fn list_dishes(&self) -> Result<Vec<Dish>> {
        // Stable sort, so equal names keep id order
        let mut dishes: Vec<_> = self.read().dishes.values().cloned().collect();
        dishes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dishes)
    }

    async fn dish_members(&self, dish: DishId) -> Result<Vec<IngredientId>> {
        let tables = self.read();
        if !tables.dishes.contains_key(&dish) {
            return Err(Error::NotFound(format!("dish #{}", dish)));
        }
        Ok(tables
            .links
            .range((dish, IngredientId(i64::MIN))..=(dish, IngredientId(i64::MAX)))
            .map(|(_, ingredient)| *ingredient)
            .collect())
    }

    async fn list_consumption(&self) -> Result<Vec<ConsumptionEvent>> {
        Ok(self.read().events.values().cloned().collect())
    }

    async fn settings(&self) -> Result<Settings> {
        Ok(self.read().settings)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
