//! System prompt composition
//!
//! A prompt is the rendered base template followed by one modifier line per
//! trait category found in the user's record.

use indexmap::IndexMap;
use std::fmt;

use super::TraitTag;
use super::store::UserPersonaRecord;
use super::template::Template;

/// Identity text marking a catgirl persona
pub const CATGIRL_MARKER: &str = "猫娘";

/// Rendered into catgirl templates
pub const CATGIRL_INSTRUCTION: &str = "特别注意: 每次回答都必须以'喵~'开头或结尾";

/// Closes every catgirl prompt
pub const CATGIRL_REMINDER: &str = "记住要保持猫娘的语气喵~";

/// Returned whenever a prompt cannot be composed
pub const FALLBACK_PROMPT: &str = "你是一个友好的AI助手，请用平和的语气交谈。";

/// How many keywords of the user's profile are mentioned in the prompt
const PROFILE_KEYWORDS: usize = 10;

/// Sentence pattern used for one trait category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhrasingRule {
    /// 身份关系: the assistant's role toward the user
    IdentityRelation,
    /// 称谓方式: how the assistant addresses the user
    AddressForm,
    /// 说话特征: words the assistant should use often
    SpeechFeature,
    Generic,
}

impl PhrasingRule {
    pub fn for_category(category: &str) -> Self {
        match category {
            "身份关系" => PhrasingRule::IdentityRelation,
            "称谓方式" => PhrasingRule::AddressForm,
            "说话特征" => PhrasingRule::SpeechFeature,
            _ => PhrasingRule::Generic,
        }
    }

    /// Render a modifier sentence; `values` are ordered by descending weight
    /// and never empty.
    pub fn render(&self, category: &str, values: &[&str]) -> String {
        match self {
            PhrasingRule::IdentityRelation => format!("你是我的{}", values[0]),
            PhrasingRule::AddressForm => format!("你应该称呼我为{}", values[0]),
            PhrasingRule::SpeechFeature => format!("说话时要经常使用 {}", values.join(", ")),
            PhrasingRule::Generic => format!("请保持{}的{}", values.join(", "), category),
        }
    }
}

/// Why a prompt fell back to `FALLBACK_PROMPT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    TemplateNotFound(String),
    MalformedTrait(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::TemplateNotFound(role) => write!(f, "template not found: {}", role),
            FallbackReason::MalformedTrait(tag) => write!(f, "malformed trait tag: {}", tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Composed(String),
    Fallback(FallbackReason),
}

impl Composition {
    /// The prompt to hand to the model, whichever way composition went
    pub fn into_prompt(self) -> String {
        match self {
            Composition::Composed(prompt) => prompt,
            Composition::Fallback(_) => FALLBACK_PROMPT.to_string(),
        }
    }
}

pub fn is_catgirl(template: &Template) -> bool {
    template.identity.contains(CATGIRL_MARKER)
}

/// Render a template on its own, without any user traits
pub fn render_template(template: &Template) -> String {
    let principles = template
        .principles
        .iter()
        .map(|p| format!("- {}", p))
        .collect::<Vec<_>>()
        .join("\n");

    let mut rendered = format!(
        "{}\n\n行为准则:\n{}\n\n说话方式: {}\n语言风格: {}",
        template.identity, principles, template.speaking_style, template.language_style
    );

    if is_catgirl(template) {
        rendered.push_str("\n\n");
        rendered.push_str(CATGIRL_INSTRUCTION);
    }

    rendered
}

/// One modifier line per category, categories in order of their heaviest trait
pub fn trait_modifiers(traits: &IndexMap<String, u32>) -> Result<Vec<String>, FallbackReason> {
    let mut weighted = Vec::with_capacity(traits.len());
    for (key, weight) in traits {
        let tag: TraitTag = key.parse().map_err(|_| FallbackReason::MalformedTrait(key.clone()))?;
        weighted.push((tag, *weight));
    }
    // Stable, so equal weights keep record order
    weighted.sort_by(|a, b| b.1.cmp(&a.1));

    let mut by_category: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for (tag, _) in &weighted {
        by_category.entry(tag.category.as_str()).or_default().push(tag.value.as_str());
    }

    Ok(by_category
        .iter()
        .map(|(category, values)| PhrasingRule::for_category(category).render(category, values))
        .collect())
}

/// Combine a base template with a user's accumulated traits
pub fn compose(template: &Template, record: &UserPersonaRecord) -> Composition {
    let modifiers = match trait_modifiers(&record.traits) {
        Ok(modifiers) => modifiers,
        Err(reason) => return Composition::Fallback(reason),
    };

    let mut lines = vec![render_template(template)];
    lines.extend(modifiers);

    let keywords = record.top_keywords(PROFILE_KEYWORDS);
    if !keywords.is_empty() {
        lines.push(format!("\n用户信息:\n用户关注的话题: {}", keywords.join("、")));
    }

    if is_catgirl(template) {
        lines.push(CATGIRL_REMINDER.to_string());
    }

    Composition::Composed(lines.join("\n").trim().to_string())
}
