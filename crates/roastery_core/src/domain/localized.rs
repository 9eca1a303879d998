//! Two-language text used by catalog documents.

use serde::{Deserialize, Serialize};

/// A language the catalog is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Tr,
    En,
}

text_enum!(Language {
    Tr => "tr",
    En => "en",
});

/// Text carried in Turkish and English. Either side may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LocalizedText {
    #[serde(default)]
    pub tr: String,
    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(tr: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            tr: tr.into(),
            en: en.into(),
        }
    }

    /// Returns the text in `lang`, falling back to the other language when the
    /// requested side is blank.
    pub fn get(&self, lang: Language) -> &str {
        let (primary, fallback) = match lang {
            Language::Tr => (&self.tr, &self.en),
            Language::En => (&self.en, &self.tr),
        };
        if primary.trim().is_empty() {
            fallback
        } else {
            primary
        }
    }

    pub fn is_blank(&self) -> bool {
        self.tr.trim().is_empty() && self.en.trim().is_empty()
    }

    /// Case-insensitive substring match against either language.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.tr.to_lowercase().contains(&needle) || self.en.to_lowercase().contains(&needle)
    }
}
