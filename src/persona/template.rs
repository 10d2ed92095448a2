//! Persona template loading
//!
//! Templates live as JSON files under category subdirectories
//! (`professions/`, `personalities/`, ...) of the template directory:
//!
//! ```json
//! {"role": "catgirl", "persona": {"identity": "...", "principles": ["..."],
//!  "speaking_style": "...", "language_style": "..."}}
//! ```

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Category subdirectories created for a fresh template directory
pub const TEMPLATE_CATEGORIES: &[&str] = &["professions", "personalities", "speaking_styles", "relationships"];

/// The descriptive half of a template file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_deserializing)]
    pub role: String,
    pub identity: String,
    pub principles: Vec<String>,
    #[serde(default)]
    pub speaking_style: String,
    pub language_style: String,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    role: String,
    persona: Template,
}

/// Read-only role -> template map, filled once at startup
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, Template>,
}

impl TemplateStore {
    /// Load every `*.json` template under `dir` (one level of category subdirectories).
    ///
    /// Files that fail to read or parse are skipped with a warning. When two files
    /// declare the same role, the later one in path order wins.
    pub fn load(dir: &Path) -> Self {
        let mut store = Self::default();

        if !dir.exists() {
            log::warn!("Template directory does not exist: {}", dir.display());
            return store;
        }

        let files = WalkDir::new(dir)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false));

        for path in files {
            match load_template(&path) {
                Ok(template) => {
                    if store.templates.contains_key(&template.role) {
                        log::debug!("Template {} redefined by {}", template.role, path.display());
                    }
                    store.templates.insert(template.role.clone(), template);
                }
                Err(e) => {
                    log::warn!("Failed to load template from {}: {:#}", path.display(), e);
                }
            }
        }

        log::info!("Loaded {} templates from {}", store.len(), dir.display());
        store
    }

    pub fn get(&self, role: &str) -> Option<&Template> {
        self.templates.get(role)
    }

    pub fn contains(&self, role: &str) -> bool {
        self.templates.contains_key(role)
    }

    /// Role names in sorted order
    pub fn roles(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Later templates replace earlier ones with the same role
impl FromIterator<Template> for TemplateStore {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().map(|t| (t.role.clone(), t)).collect(),
        }
    }
}

/// Load a single template file
pub fn load_template(path: &Path) -> Result<Template> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read template file: {}", path.display()))?;

    let file: TemplateFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse template file: {}", path.display()))?;

    if file.role.trim().is_empty() {
        eyre::bail!("Template role is empty");
    }

    Ok(Template {
        role: file.role,
        ..file.persona
    })
}

/// Create the template directory and its category subdirectories
pub fn ensure_layout(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for category in TEMPLATE_CATEGORIES {
        let path = dir.join(category);
        if !path.exists() {
            fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
            created.push(path);
        }
    }
    Ok(created)
}
