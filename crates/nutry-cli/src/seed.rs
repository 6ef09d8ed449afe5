// Built-in sample kitchen so the CLI has something to rank
use nutry_core::{IngredientId, MemoryStore};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// (category, emoji, ingredients)
const PANTRY: &[(&str, &str, &[&str])] = &[
    (
        "Vegetables",
        "🥕",
        &[
            "Potatoes",
            "Peppers",
            "Tomatoes",
            "Cucumbers",
            "Zucchini",
            "Carrots",
            "Onions",
            "Spinach",
            "Green Beans",
            "Peas",
            "Garlic",
            "Eggplant",
            "Pumpkin",
        ],
    ),
    (
        "Dairy",
        "🧀",
        &["White Cheese", "Yellow Cheese", "Yogurt", "Milk", "Butter", "Sour Cream", "Eggs"],
    ),
    (
        "Grains",
        "🌾",
        &["Flour", "Bread", "Macaroni", "Spaghetti", "Oats", "Couscous", "Pastry Sheets", "Yeast"],
    ),
    ("Legumes", "🫘", &["Beans", "Lentils"]),
    ("Nuts", "🌰", &["Walnuts"]),
    ("Meat", "🥩", &["Ham"]),
    ("Oils", "🫒", &["Sunflower Oil", "Frying Oil"]),
    ("Sweets", "🍯", &["Sugar", "Honey", "Chocolate", "Cocoa"]),
    ("Spices", "🧂", &["Salt", "Black Pepper", "Dill", "Cinnamon", "Curry"]),
];

/// (dish, emoji, members)
const DISHES: &[(&str, &str, &[&str])] = &[
    ("French Fries", "🍟", &["Potatoes", "Frying Oil", "Salt"]),
    (
        "Pepper Burek",
        "🥙",
        &["Peppers", "White Cheese", "Eggs", "Flour", "Frying Oil"],
    ),
    (
        "Mish Mash",
        "🍳",
        &["Eggs", "White Cheese", "Tomatoes", "Frying Oil", "Salt", "Black Pepper"],
    ),
    (
        "Tarator",
        "🥒",
        &["Cucumbers", "Yogurt", "Walnuts", "Garlic", "Dill", "Sunflower Oil", "Salt"],
    ),
    (
        "Fried Zucchini",
        "🥒",
        &["Zucchini", "Eggs", "White Cheese", "Dill", "Frying Oil", "Salt"],
    ),
    (
        "Pea Stew",
        "🍲",
        &["Peas", "Carrots", "Onions", "Tomatoes", "Sunflower Oil", "Salt", "Black Pepper"],
    ),
    (
        "Spinach with Eggs",
        "🥬",
        &["Spinach", "Eggs", "White Cheese", "Onions", "Sunflower Oil", "Salt"],
    ),
    (
        "Pizza",
        "🍕",
        &["Flour", "Yellow Cheese", "Tomatoes", "Sunflower Oil", "Salt", "Yeast"],
    ),
    ("Macaroni", "🍝", &["Macaroni", "Yellow Cheese", "Butter", "Salt"]),
    (
        "Spaghetti",
        "🍝",
        &["Spaghetti", "Tomatoes", "Yellow Cheese", "Sunflower Oil", "Garlic", "Salt"],
    ),
    ("Oats with Milk", "🥣", &["Oats", "Milk", "Sugar", "Honey"]),
    (
        "Pancakes",
        "🥞",
        &["Flour", "Milk", "Eggs", "Sugar", "Butter", "Salt"],
    ),
    (
        "Bean Soup",
        "🫘",
        &["Beans", "Onions", "Carrots", "Tomatoes", "Sunflower Oil", "Salt", "Black Pepper"],
    ),
    (
        "Lentils",
        "🫘",
        &["Lentils", "Onions", "Carrots", "Sunflower Oil", "Salt", "Black Pepper"],
    ),
    (
        "Banitsa",
        "🥐",
        &["Pastry Sheets", "White Cheese", "Eggs", "Milk", "Sunflower Oil", "Salt"],
    ),
    (
        "Sandwiches",
        "🥪",
        &["Bread", "Yellow Cheese", "Ham", "Tomatoes", "Cucumbers", "Butter"],
    ),
    (
        "Vegetable Curry",
        "🍛",
        &["Potatoes", "Peas", "Onions", "Carrots", "Curry", "Sunflower Oil", "Salt"],
    ),
    (
        "Roasted Vegetables",
        "🥗",
        &["Zucchini", "Peppers", "Eggplant", "Yellow Cheese", "Sunflower Oil", "Salt"],
    ),
    (
        "Pumpkin Pie",
        "🥧",
        &["Pumpkin", "Flour", "Eggs", "Sugar", "Sunflower Oil", "Cinnamon"],
    ),
    ("Couscous", "🍚", &["Couscous", "Mixed Vegetables", "Sunflower Oil", "Salt"]),
    ("Chocolate", "🍫", &["Chocolate"]),
    ("Hot Cocoa", "☕", &["Cocoa", "Milk", "Sugar"]),
];

/// Every ingredient name some dish asks for
pub fn required_ingredients() -> BTreeSet<&'static str> {
    DISHES
        .iter()
        .flat_map(|(_, _, members)| members.iter().copied())
        .collect()
}

/// Ingredients dishes need that the catalog doesn't have
pub fn missing_ingredients<S: AsRef<str>>(catalog: &[S]) -> Vec<&'static str> {
    required_ingredients()
        .into_iter()
        .filter(|needed| {
            !catalog
                .iter()
                .any(|known| known.as_ref().eq_ignore_ascii_case(needed))
        })
        .collect()
}

/// Fill `store` with the sample pantry and dishes
///
/// Dish members that aren't in the pantry get logged and left out.
pub fn load(store: &MemoryStore) -> nutry_core::Result<()> {
    for (category, emoji, ingredients) in PANTRY {
        let category = store.add_category(category, Some(*emoji))?;
        for name in ingredients.iter() {
            store.add_ingredient(name, category.id)?;
        }
    }

    for (name, emoji, members) in DISHES {
        let dish = store.add_dish(name, Some(*emoji))?;
        let ids: Vec<IngredientId> = members
            .iter()
            .filter_map(|member| match store.find_ingredient(member) {
                Some(ingredient) => Some(ingredient.id),
                None => {
                    warn!(dish = %name, ingredient = %member, "Ingredient not in pantry");
                    None
                }
            })
            .collect();
        store.set_dish_ingredients(dish.id, &ids)?;
    }

    debug!(dishes = DISHES.len(), "sample kitchen loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutry_core::KitchenStore;

    fn pantry_names() -> Vec<&'static str> {
        PANTRY
            .iter()
            .flat_map(|(_, _, names)| names.iter().copied())
            .collect()
    }

    #[test]
    fn test_only_mixed_vegetables_is_missing() {
        assert_eq!(missing_ingredients(&pantry_names()), vec!["Mixed Vegetables"]);
    }

    #[test]
    fn test_missing_check_ignores_case() {
        let mut names: Vec<String> = pantry_names()
            .into_iter()
            .map(|name| name.to_uppercase())
            .collect();
        names.push("mixed vegetables".to_string());
        assert!(missing_ingredients(&names).is_empty());
    }

    #[test]
    fn test_empty_catalog_misses_everything() {
        let none: [&str; 0] = [];
        assert_eq!(missing_ingredients(&none).len(), required_ingredients().len());
    }

    #[tokio::test]
    async fn test_load_builds_every_dish() {
        let store = MemoryStore::new();
        load(&store).unwrap();

        let dishes = store.list_dishes().await.unwrap();
        assert_eq!(dishes.len(), DISHES.len());

        let couscous = store.find_dish("Couscous").unwrap();
        // "Mixed Vegetables" is skipped, the rest are linked
        assert_eq!(store.dish_members(couscous.id).await.unwrap().len(), 3);

        let fries = store.find_dish("french fries").unwrap();
        assert_eq!(store.dish_members(fries.id).await.unwrap().len(), 3);
    }
}
