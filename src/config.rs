use eyre::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::persona::quick::QuickPattern;

/// Main chronopersona configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Template role used when a user has no (valid) template selected
    pub default_template: String,
    pub template_path: PathBuf,
    pub user_persona_path: PathBuf,
    pub user_preferences_path: PathBuf,
    pub persona_settings: PersonaSettings,
    /// Canned replies checked before any trait analysis, in declaration order
    pub quick_responses: Vec<QuickPattern>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Knobs for trait extraction and merging
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// How many recent messages are kept per user in memory
    pub max_history_analysis: usize,
    /// Trait tags whose merged weight falls below this are dropped
    pub min_keyword_frequency: u32,
    /// category -> trait words recognized in that category
    pub priority_traits: IndexMap<String, Vec<String>>,
    pub ignored_keywords: IndexSet<String>,
    /// Score multipliers for emotion, interest and address-term keywords
    pub keyword_weights: IndexMap<String, f64>,
    /// Extra dictionary entries for the segmenter (word -> frequency)
    pub custom_words: IndexMap<String, usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            default_template: "intellectual_maid".to_string(),
            template_path: PathBuf::from("templates"),
            user_persona_path: PathBuf::from("user_personas"),
            user_preferences_path: PathBuf::from("user_preferences"),
            persona_settings: PersonaSettings::default(),
            quick_responses: QuickPattern::defaults(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            max_history_analysis: 10,
            min_keyword_frequency: 2,
            priority_traits: IndexMap::from([
                (
                    "身份关系".to_string(),
                    words(&["主人", "朋友", "老师", "前辈", "同学", "哥哥", "姐姐", "妹妹"]),
                ),
                ("称谓方式".to_string(), words(&["主人", "前辈", "老师", "亲爱的", "笨蛋"])),
                ("说话特征".to_string(), words(&["喵", "喵喵", "呢", "哦", "啦", "嘛"])),
                ("性格特点".to_string(), words(&["温柔", "可爱", "活泼", "傲娇", "冷静"])),
            ]),
            ignored_keywords: ["什么", "怎么", "这个", "那个", "就是", "可以", "没有", "一个"]
                .into_iter()
                .map(String::from)
                .collect(),
            keyword_weights: IndexMap::from([
                ("喜欢".to_string(), 2.0),
                ("讨厌".to_string(), 2.0),
                ("开心".to_string(), 1.8),
                ("生气".to_string(), 1.8),
                ("游戏".to_string(), 1.5),
                ("音乐".to_string(), 1.5),
                ("动漫".to_string(), 1.5),
                ("运动".to_string(), 1.5),
                ("老师".to_string(), 2.0),
                ("同学".to_string(), 1.8),
                ("朋友".to_string(), 1.8),
                ("前辈".to_string(), 2.0),
            ]),
            custom_words: IndexMap::from([
                ("猫猫".to_string(), 10),
                ("喵喵".to_string(), 10),
                ("小猫".to_string(), 8),
                ("你好啊".to_string(), 5),
                ("早安".to_string(), 5),
                ("晚安".to_string(), 5),
                ("主人".to_string(), 10),
                ("笨蛋".to_string(), 5),
                ("前辈".to_string(), 8),
            ]),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("CHRONOPERSONA_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from CHRONOPERSONA_CONFIG: {}", e);
                    }
                }
            }
        }

        let candidates = [
            Self::base_dir().join("chronopersona.yaml"),
            PathBuf::from("chronopersona.yaml"),
        ];
        for path in candidates {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        // JSON configs parse too, JSON being a subset of YAML
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Directory holding config, templates and per-user state
    pub fn base_dir() -> PathBuf {
        std::env::var("CHRONOPERSONA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("chronopersona"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    /// Expand a configured path, anchoring relative ones at the base dir
    pub fn resolve(path: &Path) -> PathBuf {
        let expanded = Self::expand_path(path);
        if expanded.is_absolute() {
            expanded
        } else {
            Self::base_dir().join(expanded)
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        Self::resolve(&self.template_path)
    }

    pub fn personas_dir(&self) -> PathBuf {
        Self::resolve(&self.user_persona_path)
    }

    pub fn preferences_dir(&self) -> PathBuf {
        Self::resolve(&self.user_preferences_path)
    }
}
