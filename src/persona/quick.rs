//! Quick responses
//!
//! Short greetings and farewells get a canned reply instead of going
//! through trait analysis.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How well the assistant knows the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Familiarity {
    FirstTime,
    Normal,
    Familiar,
}

/// A group of trigger substrings sharing one set of replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickPattern {
    pub name: String,
    pub patterns: Vec<String>,
    pub responses: IndexMap<Familiarity, String>,
}

impl QuickPattern {
    fn new(name: &str, patterns: &[&str], responses: &[(Familiarity, &str)]) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            responses: responses.iter().map(|(f, r)| (*f, r.to_string())).collect(),
        }
    }

    /// Built-in greeting and farewell groups
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "问候",
                &["你好", "猫猫", "喵喵", "在吗", "在不在"],
                &[
                    (Familiarity::FirstTime, "喵~初次见面，我是你的AI助手，请多指教~"),
                    (Familiarity::Normal, "喵喵~我在呢，有什么需要帮忙的吗？"),
                    (Familiarity::Familiar, "主人好啊，一直都在等你呢~"),
                ],
            ),
            Self::new(
                "再见",
                &["再见", "拜拜", "晚安", "下次见"],
                &[
                    (Familiarity::Normal, "好的喵~下次见~"),
                    (Familiarity::Familiar, "主人再见，要想我哦~"),
                ],
            ),
        ]
    }

    fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| message.contains(&p.to_lowercase()))
    }
}

pub struct QuickResponder {
    patterns: Vec<QuickPattern>,
}

impl QuickResponder {
    pub fn new(patterns: Vec<QuickPattern>) -> Self {
        Self { patterns }
    }

    /// Reply for the first pattern group whose trigger occurs in `message`.
    ///
    /// Matching is case-insensitive substring containment. Only the
    /// `normal` tier is ever returned; groups without one are passed over.
    pub fn find(&self, message: &str) -> Option<&str> {
        let message = message.to_lowercase();

        for pattern in self.patterns.iter().filter(|p| p.matches(&message)) {
            match pattern.responses.get(&Familiarity::Normal) {
                Some(response) => {
                    log::debug!("Quick response matched group {}", pattern.name);
                    return Some(response.as_str());
                }
                None => log::warn!("Quick response group {} has no normal reply", pattern.name),
            }
        }

        None
    }
}
