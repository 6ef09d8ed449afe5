// Plain terminal output for rankings and settings
use nutry_core::{Config, Recommendation, RecommendationMode};

pub fn print_ranking(mode: RecommendationMode, entries: &[Recommendation], limit: Option<usize>) {
    println!("Recommendations ({})", mode.display_name());

    if entries.is_empty() {
        println!("  No dishes yet");
        return;
    }

    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    for (rank, entry) in entries.iter().take(shown).enumerate() {
        println!("{}", ranking_line(rank + 1, entry));
    }
    if shown < entries.len() {
        println!("  ... and {} more", entries.len() - shown);
    }
}

pub fn ranking_line(rank: usize, entry: &Recommendation) -> String {
    format!(
        "{:>3}. {} {:>3}  {} {}  ({})",
        rank,
        entry.level.emoji(),
        entry.score,
        entry.dish.emoji.as_deref().unwrap_or("🍽"),
        entry.dish.name,
        entry.level.label()
    )
}

pub fn print_settings(config: &Config) {
    let freshness = &config.freshness;
    println!("Ingredient window: {} days", freshness.ingredient_window_days);
    println!("Dish window:       {} days", freshness.dish_window_days);
    println!(
        "Exclude spices:    {}",
        if freshness.exclude_spices { "yes" } else { "no" }
    );
    println!(
        "Spice categories:  {}",
        config.exclusion.category_names.join(", ")
    );
    println!("Default mode:      {}", config.engine.default_mode);
    println!("Debounce:          {} ms", config.engine.debounce_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutry_core::{Dish, DishId, FreshnessLevel};

    fn entry(score: u8, emoji: Option<&str>) -> Recommendation {
        Recommendation {
            dish: Dish {
                id: DishId(1),
                name: "Tarator".to_string(),
                emoji: emoji.map(str::to_string),
            },
            score,
            level: FreshnessLevel::from_score(score),
            mode: RecommendationMode::DishBased,
        }
    }

    #[test]
    fn test_ranking_line_shows_score_and_label() {
        let line = ranking_line(1, &entry(85, Some("🥒")));
        assert!(line.contains("85"));
        assert!(line.contains("🥒 Tarator"));
        assert!(line.contains("Fresh"));
    }

    #[test]
    fn test_ranking_line_falls_back_to_plate() {
        let line = ranking_line(12, &entry(5, None));
        assert!(line.starts_with(" 12."));
        assert!(line.contains("🍽 Tarator"));
        assert!(line.contains("Just eaten"));
    }
}
