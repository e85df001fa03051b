//! Reply languages
//!
//! The dispatcher answers in Portuguese, Spanish or English. The language is
//! picked by a vocabulary heuristic over the assistant reply before synthesis.

use serde::{Deserialize, Serialize};

/// Supported reply languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Portuguese => "pt",
            Self::Spanish => "es",
            Self::English => "en",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Portuguese => "Portuguese",
            Self::Spanish => "Spanish",
            Self::English => "English",
        }
    }

    /// Parse from an ISO code or name
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "pt" | "pt-br" | "portuguese" => Some(Self::Portuguese),
            "es" | "spanish" => Some(Self::Spanish),
            "en" | "english" => Some(Self::English),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
