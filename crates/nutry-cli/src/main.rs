mod display;
mod seed;
mod shell;

use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use nutry_core::{Config, Consumable, KitchenStore, MemoryStore, RecommendationMode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nutry")]
#[command(version, about = "Suggests what to cook based on what you haven't eaten lately", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the sample dishes by freshness
    Recommend {
        /// Scoring mode: dish or ingredient
        #[arg(long, short)]
        mode: Option<RecommendationMode>,

        /// Only show the top N dishes
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Pretend something was eaten DAYS ago (repeatable)
        #[arg(long, value_name = "NAME=DAYS")]
        ate: Vec<String>,

        /// Print the ranking as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the sample dishes with their ingredients
    Catalog,
    /// Show or change freshness settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Interactive session with live re-ranking
    Shell,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the current settings
    Show,
    /// Change settings and save them
    Set {
        /// Days until an eaten ingredient is fully fresh again
        #[arg(long, allow_negative_numbers = true)]
        ingredient_window: Option<i64>,

        /// Days until an eaten dish is fully fresh again
        #[arg(long, allow_negative_numbers = true)]
        dish_window: Option<i64>,

        /// Leave spice-like categories out of ingredient averages
        #[arg(long)]
        exclude_spices: Option<bool>,

        /// Mode the ranking starts in
        #[arg(long)]
        mode: Option<RecommendationMode>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load config")?;

    match cli.command {
        Some(Commands::Recommend {
            mode,
            limit,
            ate,
            json,
        }) => recommend(&config, mode, limit, &ate, json).await?,
        Some(Commands::Catalog) => catalog(&config).await?,
        Some(Commands::Settings { action }) => settings(config, action)?,
        Some(Commands::Shell) => shell::run(config).await?,
        None => {
            println!("No command specified. Try --help");
        }
    }

    Ok(())
}

/// Fresh in-memory kitchen filled with the sample dishes
pub(crate) fn sample_kitchen(config: &Config) -> anyhow::Result<Arc<MemoryStore>> {
    let store = MemoryStore::with_settings(config.freshness)?;
    seed::load(&store)?;
    Ok(Arc::new(store))
}

/// Look a name up as a dish first, then as an ingredient
pub(crate) fn resolve(store: &MemoryStore, name: &str) -> Option<(Consumable, String)> {
    if let Some(dish) = store.find_dish(name) {
        return Some((Consumable::Dish(dish.id), dish.name));
    }
    store
        .find_ingredient(name)
        .map(|ingredient| (Consumable::Ingredient(ingredient.id), ingredient.name))
}

/// Name of whatever an event points at, even if it was deleted since
pub(crate) fn consumable_name(store: &MemoryStore, consumable: Consumable) -> String {
    let name = match consumable {
        Consumable::Dish(id) => store.dish(id).map(|dish| dish.name),
        Consumable::Ingredient(id) => store.ingredient(id).map(|ingredient| ingredient.name),
    };
    name.unwrap_or_else(|| consumable.to_string())
}

/// `days` before `now`; errors instead of overflowing on absurd values
pub(crate) fn days_before(now: DateTime<Utc>, days: i64) -> anyhow::Result<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_sub_signed(delta))
        .with_context(|| format!("{} days ago is too far back", days))
}

fn parse_ate(entry: &str) -> anyhow::Result<(String, i64)> {
    let (name, days) = entry
        .rsplit_once('=')
        .with_context(|| format!("Expected NAME=DAYS, got '{}'", entry))?;
    let days: i64 = days
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number of days", days.trim()))?;
    if days < 0 {
        bail!("Can't eat something {} days in the future", -days);
    }
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing name in '{}'", entry);
    }
    Ok((name.to_string(), days))
}

async fn recommend(
    config: &Config,
    mode: Option<RecommendationMode>,
    limit: Option<usize>,
    ate: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let store = sample_kitchen(config)?;
    let now = Utc::now();

    for entry in ate {
        let (name, days) = parse_ate(entry)?;
        let (consumable, found) =
            resolve(&store, &name).with_context(|| format!("Nothing called '{}'", name))?;
        store.record_consumption(consumable, days_before(now, days)?, 1.0)?;
        tracing::info!(name = %found, days, "Recorded consumption");
    }

    let mut engine = config.engine();
    if let Some(mode) = mode {
        engine.set_mode(mode);
    }
    let mut entries = engine.recompute_from(store.as_ref(), now).await?;

    if json {
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        display::print_ranking(engine.mode(), &entries, limit);
    }
    Ok(())
}

async fn catalog(config: &Config) -> anyhow::Result<()> {
    let store = sample_kitchen(config)?;
    let policy = config.exclusion_policy();

    let categories = store.list_categories().await?;
    let ingredients = store.list_ingredients().await?;
    let names: HashMap<_, _> = ingredients
        .iter()
        .map(|ingredient| (ingredient.id, ingredient.name.as_str()))
        .collect();

    println!("Pantry");
    for category in &categories {
        let members: Vec<&str> = ingredients
            .iter()
            .filter(|ingredient| ingredient.category_id == category.id)
            .map(|ingredient| ingredient.name.as_str())
            .collect();
        let marker = if policy.is_spice_like(category) {
            " (spice-like)"
        } else {
            ""
        };
        println!(
            "  {} {}{}: {}",
            category.emoji.as_deref().unwrap_or("•"),
            category.name,
            marker,
            members.join(", ")
        );
    }

    println!();
    println!("Dishes");
    for dish in store.list_dishes().await? {
        let members: Vec<&str> = store
            .dish_members(dish.id)
            .await?
            .iter()
            .filter_map(|id| names.get(id).copied())
            .collect();
        println!(
            "  {} {} [{}]",
            dish.emoji.as_deref().unwrap_or("🍽"),
            dish.name,
            members.len()
        );
        println!("      {}", members.join(", "));
    }

    let pantry: Vec<&str> = names.values().copied().collect();
    let missing = seed::missing_ingredients(&pantry);
    if !missing.is_empty() {
        println!();
        println!("Not in pantry: {}", missing.join(", "));
    }
    Ok(())
}

fn settings(mut config: Config, action: SettingsCommand) -> anyhow::Result<()> {
    match action {
        SettingsCommand::Show => {
            println!("Config file: {}", Config::config_path()?.display());
            display::print_settings(&config);
        }
        SettingsCommand::Set {
            ingredient_window,
            dish_window,
            exclude_spices,
            mode,
        } => {
            if let Some(days) = ingredient_window {
                config.freshness.ingredient_window_days = days;
            }
            if let Some(days) = dish_window {
                config.freshness.dish_window_days = days;
            }
            if let Some(exclude) = exclude_spices {
                config.freshness.exclude_spices = exclude;
            }
            if let Some(mode) = mode {
                config.engine.default_mode = mode;
            }

            config.save().context("Settings not saved")?;
            tracing::info!("Settings saved");
            display::print_settings(&config);
        }
    }
    Ok(())
}
