use eyre::Result;

use crate::config::Config;
use crate::persona::engine::PersonaEngine;

pub fn run(user: &str, config: &Config) -> Result<()> {
    let engine = PersonaEngine::from_config(config);
    println!("{}", engine.prompt_for(user));
    Ok(())
}
