//! The message pipeline and the state it runs against
//!
//! One engine lives for the whole process. Each inbound message runs
//! quick match -> history -> trait extraction -> merge, in that order.

use eyre::Result;
use indexmap::IndexMap;
use std::collections::HashMap;

use super::TraitTag;
use super::compose::{self, Composition, FallbackReason};
use super::extract::{TraitExtractor, is_analyzable};
use super::preferences::PreferenceStore;
use super::quick::QuickResponder;
use super::segment::JiebaSegmenter;
use super::store::{PersonaStore, UserPersonaRecord};
use super::template::TemplateStore;
use crate::config::Config;

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// A canned reply was found; the message was not recorded or analyzed
    QuickReply(String),
    /// Recorded in history but too short to analyze
    TooShort,
    /// Analyzed without finding any trait
    NoTraits,
    /// Traits found and merged into the user's record
    Analyzed(IndexMap<TraitTag, u32>),
}

pub struct PersonaEngine {
    default_template: String,
    max_history: usize,
    templates: TemplateStore,
    preferences: PreferenceStore,
    personas: PersonaStore,
    extractor: TraitExtractor,
    quick: QuickResponder,
    history: HashMap<String, Vec<String>>,
}

impl PersonaEngine {
    pub fn new(
        config: &Config,
        templates: TemplateStore,
        preferences: PreferenceStore,
        personas: PersonaStore,
        extractor: TraitExtractor,
    ) -> Self {
        Self {
            default_template: config.default_template.clone(),
            max_history: config.persona_settings.max_history_analysis.max(1),
            templates,
            preferences,
            personas,
            extractor,
            quick: QuickResponder::new(config.quick_responses.clone()),
            history: HashMap::new(),
        }
    }

    /// Load templates and stores from the configured paths, segmenting with jieba
    pub fn from_config(config: &Config) -> Self {
        let settings = &config.persona_settings;
        let segmenter = JiebaSegmenter::from_settings(settings);

        Self::new(
            config,
            TemplateStore::load(&config.templates_dir()),
            PreferenceStore::load(config.preferences_dir()),
            PersonaStore::new(config.personas_dir(), settings.min_keyword_frequency),
            TraitExtractor::new(Box::new(segmenter), settings),
        )
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Messages currently remembered for a user, oldest first
    pub fn history(&self, user_id: &str) -> &[String] {
        self.history.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Run one user message through the pipeline
    pub fn handle_message(&mut self, user_id: &str, message: &str) -> MessageOutcome {
        if let Some(reply) = self.quick.find(message) {
            return MessageOutcome::QuickReply(reply.to_string());
        }

        let history = self.history.entry(user_id.to_string()).or_default();
        history.push(message.to_string());
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }

        if !is_analyzable(message) {
            return MessageOutcome::TooShort;
        }

        let traits = match self.extractor.extract_traits(history) {
            Ok(traits) => traits,
            Err(e) => {
                log::warn!("Trait extraction failed for {}: {:#}", user_id, e);
                return MessageOutcome::NoTraits;
            }
        };
        if traits.is_empty() {
            return MessageOutcome::NoTraits;
        }

        if let Err(e) = self.personas.update(user_id, &traits) {
            log::error!("Failed to save persona for {}: {:#}", user_id, e);
        }
        MessageOutcome::Analyzed(traits)
    }

    /// Compose the user's prompt, reporting why it fell back if it did
    pub fn compose_for(&self, user_id: &str) -> Composition {
        let chosen = self.preferences.template_for(user_id).unwrap_or(&self.default_template);

        let template = match self.templates.get(chosen) {
            Some(template) => template,
            None => {
                log::warn!("Template {} not found, using {}", chosen, self.default_template);
                match self.templates.get(&self.default_template) {
                    Some(template) => template,
                    None => {
                        return Composition::Fallback(FallbackReason::TemplateNotFound(self.default_template.clone()));
                    }
                }
            }
        };

        compose::compose(template, &self.personas.load(user_id))
    }

    /// The system prompt for a user; never fails
    pub fn prompt_for(&self, user_id: &str) -> String {
        let composition = self.compose_for(user_id);
        if let Composition::Fallback(reason) = &composition {
            log::error!("Error generating prompt for user {}: {}", user_id, reason);
        }
        composition.into_prompt()
    }

    /// Select a template for a user; `false` when no such template exists
    pub fn switch_template(&mut self, user_id: &str, role: &str) -> Result<bool> {
        if !self.templates.contains(role) {
            return Ok(false);
        }
        self.preferences.set_template(user_id, role)?;
        Ok(true)
    }

    /// The template role a user's prompts are currently built from
    pub fn template_for(&self, user_id: &str) -> &str {
        self.preferences.template_for(user_id).unwrap_or(&self.default_template)
    }

    pub fn traits(&self, user_id: &str) -> UserPersonaRecord {
        self.personas.load(user_id)
    }

    /// Forget the user's traits and conversation history
    pub fn reset(&mut self, user_id: &str) -> Result<()> {
        self.history.remove(user_id);
        self.personas.reset(user_id)
    }

    /// Fold the keywords of the remembered conversation into the user's profile
    pub fn save_profile(&self, user_id: &str) -> Result<Vec<String>> {
        let keywords = match self.extractor.extract_keywords(self.history(user_id)) {
            Ok(keywords) => keywords,
            Err(e) => {
                log::warn!("Keyword extraction failed for {}: {:#}", user_id, e);
                Vec::new()
            }
        };

        if !keywords.is_empty() {
            self.personas.update_keywords(user_id, &keywords)?;
        }
        Ok(keywords)
    }
}
