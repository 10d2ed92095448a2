use colored::*;
use eyre::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::persona::extract::{TraitExtractor, is_analyzable};
use crate::persona::segment::JiebaSegmenter;

#[derive(Serialize)]
struct Analysis {
    traits: IndexMap<String, u32>,
    keywords: Vec<String>,
}

pub fn run(text: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let settings = &config.persona_settings;
    let extractor = TraitExtractor::new(Box::new(JiebaSegmenter::from_settings(settings)), settings);

    let messages = vec![text.to_string()];
    let analysis = Analysis {
        traits: extractor
            .extract_traits(&messages)?
            .into_iter()
            .map(|(tag, weight)| (tag.to_string(), weight))
            .collect(),
        keywords: extractor.extract_keywords(&messages)?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&analysis)?),
        OutputFormat::Text => {
            if !is_analyzable(text) {
                println!("{} Text too short for trait analysis", "⚠".yellow());
                println!();
            }

            println!("{}", "Traits:".bold());
            if analysis.traits.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for (tag, weight) in &analysis.traits {
                println!("  {} {}", tag.cyan(), weight);
            }

            println!();
            println!("{}", "Keywords:".bold());
            if analysis.keywords.is_empty() {
                println!("  {}", "(none)".dimmed());
            } else {
                println!("  {}", analysis.keywords.join(", "));
            }
        }
    }

    Ok(())
}
