//! Initialize chronopersona configuration and starter templates

use colored::*;
use eyre::{Context, Result};
use std::fs;

use crate::config::Config;
use crate::persona::template::ensure_layout;

const CATGIRL_TEMPLATE: &str = r#"{
  "role": "catgirl",
  "persona": {
    "identity": "你是一只可爱的猫娘，是用户贴心的小伙伴",
    "principles": [
      "保持可爱和活泼",
      "真诚地关心用户",
      "遇到不懂的问题要坦白承认"
    ],
    "speaking_style": "撒娇、俏皮，喜欢用叠词",
    "language_style": "可爱、轻松"
  }
}
"#;

const INTELLECTUAL_MAID_TEMPLATE: &str = r#"{
  "role": "intellectual_maid",
  "persona": {
    "identity": "你是一位知性优雅的女仆，学识渊博，举止得体",
    "principles": [
      "礼貌待人，耐心解答",
      "回答准确，条理清晰",
      "在专业问题上给出可靠的建议"
    ],
    "speaking_style": "温和、得体",
    "language_style": "优雅、书面"
  }
}
"#;

pub fn run(force: bool, config: &Config) -> Result<()> {
    let base_dir = Config::base_dir();

    println!("{} Initializing chronopersona in {}", "→".blue(), base_dir.display());

    let config_file = base_dir.join("chronopersona.yaml");
    if config_file.exists() && !force {
        println!("  {} Already initialized at {}", "✓".green(), base_dir.display());
        println!("  Use {} to reinitialize", "--force".cyan());
        return Ok(());
    }

    fs::create_dir_all(&base_dir).context("Failed to create base directory")?;

    let templates_dir = config.templates_dir();
    for dir in ensure_layout(&templates_dir)? {
        println!("  {} Created {}/", "✓".green(), dir.display());
    }

    let starters = [
        ("personalities/catgirl.json", CATGIRL_TEMPLATE),
        ("professions/intellectual_maid.json", INTELLECTUAL_MAID_TEMPLATE),
    ];
    for (rel, content) in starters {
        let path = templates_dir.join(rel);
        if path.exists() && !force {
            continue;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {} Created template {}", "✓".green(), rel);
    }

    for dir in [config.personas_dir(), config.preferences_dir()] {
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        println!("  {} Created {}/", "✓".green(), dir.display());
    }

    let yaml_str = serde_yaml::to_string(&Config::default()).context("Failed to serialize config")?;
    fs::write(&config_file, yaml_str).context("Failed to write chronopersona.yaml")?;
    println!("  {} Created chronopersona.yaml", "✓".green());

    println!();
    println!("{} chronopersona initialized!", "✓".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run {} to see the templates", "chronopersona templates".cyan());
    println!("  2. Run {} to start chatting", "chronopersona session --user <id>".cyan());
    println!("  3. Run {} to see the resulting prompt", "chronopersona prompt <id>".cyan());

    Ok(())
}
