use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Paths => paths(config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "chronopersona Configuration".bold());
            println!();

            println!("  log_level: {}", config.log_level.as_filter());
            println!("  default_template: {}", config.default_template);
            println!();

            println!("{}:", "paths".cyan());
            println!("  template_path: {}", config.template_path.display());
            println!("  user_persona_path: {}", config.user_persona_path.display());
            println!("  user_preferences_path: {}", config.user_preferences_path.display());
            println!();

            let settings = &config.persona_settings;
            println!("{}:", "persona_settings".cyan());
            println!("  max_history_analysis: {}", settings.max_history_analysis);
            println!("  min_keyword_frequency: {}", settings.min_keyword_frequency);
            for (category, words) in &settings.priority_traits {
                println!("  {}: {}", category, words.join(", "));
            }
            println!(
                "  ignored_keywords: {}",
                settings.ignored_keywords.iter().cloned().collect::<Vec<_>>().join(", ")
            );
            println!();

            println!("{}:", "quick_responses".cyan());
            for pattern in &config.quick_responses {
                println!("  {}: {}", pattern.name, pattern.patterns.join(", "));
            }
        }
    }

    Ok(())
}

fn paths(config: &Config) -> Result<()> {
    println!("base: {}", Config::base_dir().display());
    println!("templates: {}", config.templates_dir().display());
    println!("personas: {}", config.personas_dir().display());
    println!("preferences: {}", config.preferences_dir().display());
    Ok(())
}
