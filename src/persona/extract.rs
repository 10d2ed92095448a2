//! Trait and keyword extraction from conversation text

use eyre::Result;
use indexmap::{IndexMap, IndexSet};

use super::TraitTag;
use super::segment::{RankStrategy, Segmenter};
use crate::config::PersonaSettings;

/// Number of most recent messages analyzed per call
pub const ANALYSIS_WINDOW: usize = 3;

/// Messages this short (in characters) are never analyzed
pub const MIN_MESSAGE_CHARS: usize = 5;

/// Maximum number of keywords returned in keyword-profile mode
pub const TOP_KEYWORDS: usize = 20;

/// Whether a message is long enough to be worth analyzing
pub fn is_analyzable(message: &str) -> bool {
    message.chars().count() > MIN_MESSAGE_CHARS
}

pub struct TraitExtractor {
    segmenter: Box<dyn Segmenter>,
    priority_traits: IndexMap<String, Vec<String>>,
    ignored_keywords: IndexSet<String>,
    keyword_weights: IndexMap<String, f64>,
}

impl TraitExtractor {
    pub fn new(segmenter: Box<dyn Segmenter>, settings: &PersonaSettings) -> Self {
        Self {
            segmenter,
            priority_traits: settings.priority_traits.clone(),
            ignored_keywords: settings.ignored_keywords.clone(),
            keyword_weights: settings.keyword_weights.clone(),
        }
    }

    /// Count priority trait words in the last few messages.
    ///
    /// Each token found in a `priority_traits` category yields a tag
    /// `category:token` weighted by its count within the window.
    pub fn extract_traits(&self, messages: &[String]) -> Result<IndexMap<TraitTag, u32>> {
        let window: Vec<&str> = messages[messages.len().saturating_sub(ANALYSIS_WINDOW)..]
            .iter()
            .map(String::as_str)
            .filter(|m| is_analyzable(m))
            .collect();

        let mut traits = IndexMap::new();
        if window.is_empty() {
            return Ok(traits);
        }

        let text = window.join(" ");
        let mut counts: IndexMap<String, u32> = IndexMap::new();
        for token in self.segmenter.tokenize(&text)? {
            *counts.entry(token).or_insert(0) += 1;
        }

        for (token, count) in &counts {
            for (category, words) in &self.priority_traits {
                if words.iter().any(|w| w == token) {
                    traits.insert(TraitTag::new(category, token), *count);
                }
            }
        }

        log::debug!("Extracted {} trait tags from {} messages", traits.len(), window.len());
        Ok(traits)
    }

    /// Rank the most salient keywords across `messages`.
    ///
    /// Scores from the TF-IDF and TextRank strategies are averaged when both
    /// report a keyword, scaled by the configured keyword weights, and the
    /// ignored keywords removed before taking the top entries.
    pub fn extract_keywords(&self, messages: &[String]) -> Result<Vec<String>> {
        let text = messages.join(" ");
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tfidf = self.segmenter.rank_keywords(&text, TOP_KEYWORDS, RankStrategy::TfIdf)?;
        let textrank = self.segmenter.rank_keywords(&text, TOP_KEYWORDS, RankStrategy::TextRank)?;

        let mut scores: IndexMap<String, f64> = tfidf.into_iter().collect();
        for (word, weight) in textrank {
            scores
                .entry(word)
                .and_modify(|score| *score = (*score + weight) / 2.0)
                .or_insert(weight);
        }

        for (word, score) in scores.iter_mut() {
            if let Some(multiplier) = self.keyword_weights.get(word) {
                *score *= multiplier;
            }
        }

        scores.retain(|word, _| !self.ignored_keywords.contains(word));
        scores.sort_by(|_, a, _, b| b.total_cmp(a));

        Ok(scores.into_keys().take(TOP_KEYWORDS).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Whitespace tokenizer with canned keyword rankings
    #[derive(Default)]
    pub(crate) struct FakeSegmenter {
        pub tfidf: Vec<(String, f64)>,
        pub textrank: Vec<(String, f64)>,
        pub fail: bool,
        pub calls: Rc<Cell<usize>>,
    }

    impl Segmenter for FakeSegmenter {
        fn tokenize(&self, text: &str) -> Result<Vec<String>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                eyre::bail!("segmenter unavailable");
            }
            Ok(text.split_whitespace().map(String::from).collect())
        }

        fn rank_keywords(&self, _text: &str, top_k: usize, strategy: RankStrategy) -> Result<Vec<(String, f64)>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                eyre::bail!("ranker unavailable");
            }
            let ranked = match strategy {
                RankStrategy::TfIdf => &self.tfidf,
                RankStrategy::TextRank => &self.textrank,
            };
            Ok(ranked.iter().take(top_k).cloned().collect())
        }
    }

    pub(crate) fn settings() -> PersonaSettings {
        PersonaSettings {
            priority_traits: IndexMap::from([
                ("身份关系".to_string(), vec!["主人".to_string(), "朋友".to_string()]),
                ("称谓方式".to_string(), vec!["主人".to_string()]),
                ("说话特征".to_string(), vec!["喵".to_string()]),
            ]),
            ..PersonaSettings::default()
        }
    }

    fn msgs(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    fn scored(list: &[(&str, f64)]) -> Vec<(String, f64)> {
        list.iter().map(|(w, s)| (w.to_string(), *s)).collect()
    }

    #[test]
    fn test_extract_traits_counts_priority_words() {
        let extractor = TraitExtractor::new(Box::new(FakeSegmenter::default()), &settings());

        let traits = extractor
            .extract_traits(&msgs(&["主人 主人 今天 喵", "我的 朋友 来了"]))
            .unwrap();

        assert_eq!(traits.get(&TraitTag::new("身份关系", "主人")), Some(&2));
        assert_eq!(traits.get(&TraitTag::new("称谓方式", "主人")), Some(&2));
        assert_eq!(traits.get(&TraitTag::new("说话特征", "喵")), Some(&1));
        assert_eq!(traits.get(&TraitTag::new("身份关系", "朋友")), Some(&1));
        assert!(!traits.keys().any(|t| t.value == "今天"));
    }

    #[test]
    fn test_extract_traits_only_last_three_messages() {
        let extractor = TraitExtractor::new(Box::new(FakeSegmenter::default()), &settings());

        let traits = extractor
            .extract_traits(&msgs(&["朋友 朋友 朋友", "一二三 四五六", "七八九 十十十", "主人 在这里呀"]))
            .unwrap();

        assert!(!traits.contains_key(&TraitTag::new("身份关系", "朋友")));
        assert_eq!(traits.get(&TraitTag::new("身份关系", "主人")), Some(&1));
    }

    #[test]
    fn test_window_is_taken_before_short_messages_are_dropped() {
        let extractor = TraitExtractor::new(Box::new(FakeSegmenter::default()), &settings());

        let traits = extractor
            .extract_traits(&msgs(&["主人 主人 主人", "嗯", "好的", "知道了"]))
            .unwrap();

        assert!(traits.is_empty());
    }

    #[test]
    fn test_short_messages_never_reach_segmenter() {
        let segmenter = FakeSegmenter::default();
        let calls = segmenter.calls.clone();
        let extractor = TraitExtractor::new(Box::new(segmenter), &settings());

        let traits = extractor.extract_traits(&msgs(&["主人 喵", "喵喵喵喵喵"])).unwrap();

        assert!(traits.is_empty());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        let extractor = TraitExtractor::new(Box::new(FakeSegmenter::default()), &settings());
        assert!(extractor.extract_traits(&[]).unwrap().is_empty());
        assert!(extractor.extract_keywords(&[]).unwrap().is_empty());
        assert!(extractor.extract_keywords(&msgs(&["   "])).unwrap().is_empty());
    }

    #[test]
    fn test_segmenter_failure_propagates() {
        let segmenter = FakeSegmenter {
            fail: true,
            ..Default::default()
        };
        let extractor = TraitExtractor::new(Box::new(segmenter), &settings());

        assert!(extractor.extract_traits(&msgs(&["主人 你好呀呀"])).is_err());
        assert!(extractor.extract_keywords(&msgs(&["主人 你好呀呀"])).is_err());
    }

    #[test]
    fn test_extract_keywords_merges_and_weights() {
        let segmenter = FakeSegmenter {
            tfidf: scored(&[("天气", 0.9), ("游戏", 0.4), ("这个", 0.8)]),
            textrank: scored(&[("游戏", 0.6), ("散步", 0.3)]),
            ..Default::default()
        };
        let extractor = TraitExtractor::new(Box::new(segmenter), &settings());

        let keywords = extractor.extract_keywords(&msgs(&["随便 什么 文本"])).unwrap();

        // 游戏: (0.4 + 0.6) / 2 * 1.5 = 0.75; 这个 is ignored
        assert_eq!(keywords, vec!["天气", "游戏", "散步"]);
    }

    #[test]
    fn test_extract_keywords_caps_at_top_k() {
        let ranked: Vec<(String, f64)> = (0..30).map(|i| (format!("词{}", i), 1.0 + i as f64)).collect();
        let segmenter = FakeSegmenter {
            tfidf: ranked.clone(),
            textrank: ranked.iter().map(|(w, s)| (format!("{}甲", w), *s)).collect(),
            ..Default::default()
        };
        let extractor = TraitExtractor::new(Box::new(segmenter), &settings());

        let keywords = extractor.extract_keywords(&msgs(&["文本 文本"])).unwrap();

        assert_eq!(keywords.len(), TOP_KEYWORDS);
    }
}
