//! Inspect and manage stored personas

use chrono::Local;
use colored::*;
use eyre::Result;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::persona::store::{PersonaStore, prune_cutoff};

fn store(config: &Config) -> PersonaStore {
    PersonaStore::new(config.personas_dir(), config.persona_settings.min_keyword_frequency)
}

pub fn show(user: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let record = store(config).load(user);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&record)?),
        OutputFormat::Text => {
            println!("{} {}", "Persona for".bold(), user.bold());
            println!();

            if record.is_empty() {
                println!("  {}", "(nothing learned yet)".dimmed());
                return Ok(());
            }

            if record.traits.is_empty() {
                println!("  {}", "(no traits)".dimmed());
            } else {
                for (tag, weight) in &record.traits {
                    println!("  {} {}", tag.cyan(), weight);
                }
            }

            let keywords = record.top_keywords(usize::MAX);
            if !keywords.is_empty() {
                println!();
                println!("  Keywords: {}", keywords.join(", ").magenta());
            }

            if let Some(updated) = record.last_updated {
                println!();
                println!("  Last updated: {}", updated.format("%Y-%m-%d %H:%M:%S").to_string().dimmed());
            }
        }
    }

    Ok(())
}

pub fn reset(user: &str, config: &Config) -> Result<()> {
    store(config).reset(user)?;
    println!("{} Reset persona for {}", "✓".green(), user.bold());
    Ok(())
}

pub fn prune(max_age_days: u32, dry_run: bool, config: &Config) -> Result<()> {
    let store = store(config);

    if dry_run {
        let cutoff = prune_cutoff(max_age_days, Local::now())?;
        for user in store.users()? {
            if let Some(updated) = store.load(&user).last_updated
                && updated < cutoff
            {
                println!("  {} Would reset {}", "→".blue(), user);
            }
        }
        return Ok(());
    }

    let pruned = store.prune(max_age_days, Local::now())?;
    if pruned.is_empty() {
        println!("{} No personas older than {} days", "✓".green(), max_age_days);
    } else {
        for user in &pruned {
            println!("  {} Reset {}", "✓".green(), user);
        }
    }

    Ok(())
}
