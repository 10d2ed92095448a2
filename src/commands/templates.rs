//! Template listing and selection

use colored::*;
use eyre::Result;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::persona::compose::is_catgirl;
use crate::persona::engine::PersonaEngine;
use crate::persona::template::{Template, TemplateStore};

pub fn list(format: OutputFormat, config: &Config) -> Result<()> {
    let templates_dir = config.templates_dir();
    let store = TemplateStore::load(&templates_dir);
    let templates: Vec<&Template> = store.iter().collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&templates)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&templates)?),
        OutputFormat::Text => {
            println!("{}", "Available Templates:".bold());
            println!();

            if store.is_empty() {
                println!("  {} No templates found in {}", "(none)".dimmed(), templates_dir.display());
                println!();
                println!("  Create starter templates with: {}", "chronopersona init".cyan());
            } else {
                for template in &templates {
                    let marker = if template.role == config.default_template {
                        " (default)".dimmed().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {} {}{}", "●".green(), template.role.bold(), marker);
                    println!("    {}", template.identity.dimmed());
                    if !template.language_style.is_empty() {
                        println!("    Style: {}", template.language_style.cyan());
                    }
                    if is_catgirl(template) {
                        println!("    {}", "catgirl".magenta());
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

pub fn select(user: &str, role: &str, config: &Config) -> Result<()> {
    let mut engine = PersonaEngine::from_config(config);

    if !engine.switch_template(user, role)? {
        let roles = engine.templates().roles().join(", ");
        eyre::bail!("Template not found: {} (available: {})", role, roles);
    }

    println!("{} {} now uses template {}", "✓".green(), user.bold(), role.cyan());
    Ok(())
}
