//! Persona inference and prompt composition
//!
//! Messages flow through the pipeline as:
//! - `quick`: canned replies that short-circuit analysis
//! - `extract`: message text -> weighted trait tags / keywords
//! - `store`: per-user accumulated trait weights
//! - `compose`: template + user traits -> system prompt

pub mod compose;
pub mod engine;
pub mod extract;
pub mod preferences;
pub mod quick;
pub mod segment;
pub mod store;
pub mod template;

use std::fmt;
use std::str::FromStr;

/// A category-qualified trait, serialized as `"<category>:<value>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitTag {
    pub category: String,
    pub value: String,
}

impl TraitTag {
    pub fn new(category: &str, value: &str) -> Self {
        Self {
            category: category.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for TraitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.value)
    }
}

impl FromStr for TraitTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((category, value)) if !category.is_empty() && !value.is_empty() => Ok(Self::new(category, value)),
            _ => Err(format!("Malformed trait tag: {}", s)),
        }
    }
}

/// Escape byte for user ids in file names
const STEM_ESCAPE: char = '_';

/// File stem for a user id.
///
/// ASCII letters, digits and `-` are kept; every other byte (including `_`
/// itself) is written as `_XX` in uppercase hex. The empty id is `_`. The
/// mapping is one-to-one, so distinct ids never share a file.
pub fn user_file_stem(user_id: &str) -> String {
    if user_id.is_empty() {
        return STEM_ESCAPE.to_string();
    }

    let mut stem = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("{}{:02X}", STEM_ESCAPE, byte));
        }
    }
    stem
}

/// Inverse of `user_file_stem`; `None` for stems it never produces
pub fn user_id_from_stem(stem: &str) -> Option<String> {
    if stem == "_" {
        return Some(String::new());
    }

    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                let hex = stem.get(i + 1..i + 3)?;
                if !hex.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
                    return None;
                }
                let byte = u8::from_str_radix(hex, 16).ok()?;
                if byte.is_ascii_alphanumeric() || byte == b'-' {
                    return None;
                }
                decoded.push(byte);
                i += 3;
            }
            b if b.is_ascii_alphanumeric() || b == b'-' => {
                decoded.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_file_stem_keeps_plain_ids() {
        assert_eq!(user_file_stem("alice"), "alice");
        assert_eq!(user_file_stem("12345"), "12345");
        assert_eq!(user_file_stem("qq-10001"), "qq-10001");
    }

    #[test]
    fn test_user_file_stem_escapes_everything_else() {
        assert_eq!(user_file_stem("a.b"), "a_2Eb");
        assert_eq!(user_file_stem("a_b"), "a_5Fb");
        assert_eq!(user_file_stem("a/b"), "a_2Fb");
        assert_eq!(user_file_stem("../etc/passwd"), "_2E_2E_2Fetc_2Fpasswd");
        assert_eq!(user_file_stem("猫"), "_E7_8C_AB");
        assert_eq!(user_file_stem(""), "_");
    }

    #[test]
    fn test_user_file_stems_are_distinct_and_reversible() {
        let ids = ["alice.b", "alice/b", "alice_b", "alice_5Fb", "alice%b", "", "_", "主人", "a b"];
        let stems: std::collections::HashSet<String> = ids.iter().map(|id| user_file_stem(id)).collect();
        assert_eq!(stems.len(), ids.len());

        for id in ids {
            assert_eq!(user_id_from_stem(&user_file_stem(id)).as_deref(), Some(id));
        }
    }

    #[test]
    fn test_user_id_from_foreign_stem() {
        assert_eq!(user_id_from_stem("notes.bak"), None);
        assert_eq!(user_id_from_stem("a_2"), None);
        assert_eq!(user_id_from_stem("a_41"), None);
        assert_eq!(user_id_from_stem("a_2e"), None);
        assert_eq!(user_id_from_stem("_FF"), None);
    }

    #[test]
    fn test_trait_tag_display() {
        assert_eq!(TraitTag::new("身份关系", "主人").to_string(), "身份关系:主人");
    }

    #[test]
    fn test_trait_tag_from_str() {
        let tag: TraitTag = "称谓方式:前辈".parse().unwrap();
        assert_eq!(tag.category, "称谓方式");
        assert_eq!(tag.value, "前辈");
    }

    #[test]
    fn test_trait_tag_rejects_missing_separator() {
        assert!("主人".parse::<TraitTag>().is_err());
        assert!(":主人".parse::<TraitTag>().is_err());
        assert!("身份关系:".parse::<TraitTag>().is_err());
    }
}
