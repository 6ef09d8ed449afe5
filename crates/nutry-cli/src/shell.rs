// Interactive loop on top of the live recommendation service
use crate::display;
use anyhow::{anyhow, Context};
use chrono::Utc;
use nutry_core::{
    Config, KitchenStore, MemoryStore, Ranking, RecommendationHandle, RecommendationMode,
    RecommendationService,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

const SHOWN: usize = 10;
const REFRESH_PATIENCE: std::time::Duration = std::time::Duration::from_secs(2);

const HELP: &str = "\
Commands:
  eat <name>                 record a dish or ingredient eaten just now
  ate <days> <name>          record something eaten <days> ago
  undo                       remove the latest record
  mode dish|ingredient       switch scoring mode
  toggle                     flip scoring mode
  window ingredient|dish <n> change a recovery window
  spices on|off              leave spice-like categories out of averages
  list                       show the ranking again
  help                       this text
  quit                       leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowTarget {
    Ingredient,
    Dish,
}

#[derive(Debug, PartialEq)]
enum Action {
    Eat { name: String, days_ago: i64 },
    Undo,
    Mode(RecommendationMode),
    Toggle,
    Window { target: WindowTarget, days: i64 },
    Spices(bool),
    List,
    Help,
    Quit,
}

/// What the loop does after an action
enum Next {
    /// Print the next ranking the service publishes
    Rerank,
    Stay,
    Quit,
}

fn parse(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match word.to_lowercase().as_str() {
        "eat" if !rest.is_empty() => Ok(Action::Eat {
            name: rest.to_string(),
            days_ago: 0,
        }),
        "eat" => Err("Eat what?".to_string()),
        "ate" => {
            let (days, name) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: ate <days> <name>".to_string())?;
            let days_ago: i64 = days
                .parse()
                .map_err(|_| format!("'{}' is not a number of days", days))?;
            if days_ago < 0 {
                return Err("Days ago can't be negative".to_string());
            }
            Ok(Action::Eat {
                name: name.trim().to_string(),
                days_ago,
            })
        }
        "undo" => Ok(Action::Undo),
        "mode" => rest
            .parse::<RecommendationMode>()
            .map(Action::Mode)
            .map_err(|e| e.to_string()),
        "toggle" => Ok(Action::Toggle),
        "window" => {
            let (target, days) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "Usage: window ingredient|dish <days>".to_string())?;
            let target = match target.to_lowercase().as_str() {
                "ingredient" | "ingredients" => WindowTarget::Ingredient,
                "dish" | "dishes" => WindowTarget::Dish,
                other => return Err(format!("Unknown window '{}'", other)),
            };
            let days = days
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a number of days", days.trim()))?;
            Ok(Action::Window { target, days })
        }
        "spices" => match rest.to_lowercase().as_str() {
            "on" | "exclude" | "yes" => Ok(Action::Spices(true)),
            "off" | "include" | "no" => Ok(Action::Spices(false)),
            _ => Err("Usage: spices on|off".to_string()),
        },
        "list" | "ls" => Ok(Action::List),
        "help" | "?" => Ok(Action::Help),
        "quit" | "exit" | "q" => Ok(Action::Quit),
        other => Err(format!("Unknown command '{}' (try 'help')", other)),
    }
}

async fn execute(
    store: &MemoryStore,
    handle: &RecommendationHandle,
    action: Action,
) -> anyhow::Result<Next> {
    match action {
        Action::Eat { name, days_ago } => {
            let (consumable, found) = crate::resolve(store, &name)
                .ok_or_else(|| anyhow!("Nothing called '{}'", name))?;
            let consumed_at = crate::days_before(Utc::now(), days_ago)?;
            store.record_consumption(consumable, consumed_at, 1.0)?;
            println!("Noted: {}", found);
            Ok(Next::Rerank)
        }
        Action::Undo => match store.latest_consumption() {
            Some(event) => {
                store.delete_consumption(event.id)?;
                println!(
                    "Removed the record for {}",
                    crate::consumable_name(store, event.consumable)
                );
                Ok(Next::Rerank)
            }
            None => {
                println!("Nothing to undo");
                Ok(Next::Stay)
            }
        },
        Action::Mode(mode) => {
            handle.set_mode(mode).await?;
            Ok(Next::Rerank)
        }
        Action::Toggle => {
            handle.toggle_mode().await?;
            Ok(Next::Rerank)
        }
        Action::Window { target, days } => {
            let mut settings = store.settings().await?;
            match target {
                WindowTarget::Ingredient => settings.ingredient_window_days = days,
                WindowTarget::Dish => settings.dish_window_days = days,
            }
            store.update_settings(settings)?;
            Ok(Next::Rerank)
        }
        Action::Spices(exclude) => {
            let mut settings = store.settings().await?;
            settings.exclude_spices = exclude;
            store.update_settings(settings)?;
            Ok(Next::Rerank)
        }
        Action::List => {
            handle.refresh().await?;
            Ok(Next::Rerank)
        }
        Action::Help => {
            println!("{}", HELP);
            Ok(Next::Stay)
        }
        Action::Quit => Ok(Next::Quit),
    }
}

/// Wait for a ranking newer than `seen`; falls back to the latest one
async fn next_ranking(handle: &RecommendationHandle, seen: u64) -> anyhow::Result<Ranking> {
    match tokio::time::timeout(
        REFRESH_PATIENCE,
        handle.wait_until(|ranking| ranking.generation > seen),
    )
    .await
    {
        Ok(ranking) => Ok(ranking?),
        Err(_) => {
            warn!(generation = seen, "No fresh ranking yet, showing the last one");
            Ok(handle.latest())
        }
    }
}

fn prompt() {
    print!("nutry> ");
    let _ = std::io::stdout().flush();
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let store: Arc<MemoryStore> = crate::sample_kitchen(&config)?;
    let (handle, task) =
        RecommendationService::spawn(store.clone(), config.engine(), config.engine.debounce());

    let mut seen = handle
        .wait_for_generation(1)
        .await
        .context("Recommendation service failed to start")?;
    display::print_ranking(seen.mode, &seen.entries, Some(SHOWN));
    println!("Type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let action = match parse(&line) {
            Ok(action) => action,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };
        debug!(?action, "shell command");

        match execute(&store, &handle, action).await {
            Ok(Next::Rerank) => {
                seen = next_ranking(&handle, seen.generation).await?;
                display::print_ranking(seen.mode, &seen.entries, Some(SHOWN));
            }
            Ok(Next::Stay) => {}
            Ok(Next::Quit) => break,
            Err(e) => println!("Error: {}", e),
        }
    }

    // Dropping the last handle stops the service
    drop(handle);
    task.await?;
    Ok(())
}
