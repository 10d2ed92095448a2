//! Word segmentation and keyword ranking
//!
//! The extractor only depends on the `Segmenter` trait; `JiebaSegmenter`
//! is the production implementation backed by jieba-rs.

use eyre::Result;
use indexmap::IndexMap;
use jieba_rs::{Jieba, KeywordExtract, TextRank, TfIdf};

use crate::config::PersonaSettings;

/// Part-of-speech tags kept when ranking keywords: nouns, verbs, adjectives, idioms
pub const KEYWORD_POS: &[&str] = &["n", "v", "a", "i"];

/// Keyword ranking algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStrategy {
    /// Term frequency weighted by inverse document frequency
    TfIdf,
    /// Graph centrality over a co-occurrence window
    TextRank,
}

pub trait Segmenter {
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;
    fn rank_keywords(&self, text: &str, top_k: usize, strategy: RankStrategy) -> Result<Vec<(String, f64)>>;
}

pub struct JiebaSegmenter {
    jieba: Jieba,
    tfidf: TfIdf,
    textrank: TextRank,
}

impl JiebaSegmenter {
    /// Build a segmenter whose dictionary also knows `custom_words` (with
    /// explicit frequencies) and `forced_words` (kept whole at a suggested frequency).
    pub fn new<'a>(
        custom_words: &IndexMap<String, usize>,
        forced_words: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut jieba = Jieba::new();

        for (word, freq) in custom_words {
            jieba.add_word(word, Some(*freq), None);
        }
        for word in forced_words {
            let freq = jieba.suggest_freq(word);
            jieba.add_word(word, Some(freq), None);
        }

        Self {
            jieba,
            tfidf: TfIdf::default(),
            textrank: TextRank::default(),
        }
    }

    /// Dictionary seeded with the configured custom words and every priority trait word
    pub fn from_settings(settings: &PersonaSettings) -> Self {
        let forced_words = settings.priority_traits.values().flatten().map(String::as_str);
        Self::new(&settings.custom_words, forced_words)
    }
}

impl Segmenter for JiebaSegmenter {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.jieba.cut(text, true).into_iter().map(String::from).collect())
    }

    fn rank_keywords(&self, text: &str, top_k: usize, strategy: RankStrategy) -> Result<Vec<(String, f64)>> {
        let allowed_pos: Vec<String> = KEYWORD_POS.iter().map(|p| p.to_string()).collect();
        let keywords = match strategy {
            RankStrategy::TfIdf => self.tfidf.extract_keywords(&self.jieba, text, top_k, allowed_pos),
            RankStrategy::TextRank => self.textrank.extract_keywords(&self.jieba, text, top_k, allowed_pos),
        };
        Ok(keywords.into_iter().map(|k| (k.keyword, k.weight)).collect())
    }
}
