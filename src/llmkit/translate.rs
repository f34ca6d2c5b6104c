//! Translation through a local `translategemma` model.
//!
//! The model expects a fixed prompt naming both languages with their ISO
//! codes, followed by two blank lines and the text.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::client_wrapper::{ChatOptions, ClientWrapper, Message};

pub type TranslateResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub const TRANSLATE_MODEL: &str = "translategemma";

/// Supported languages as `(name, ISO code)`.
pub const LANGUAGES: [(&str, &str); 17] = [
    ("English", "en"),
    ("Spanish", "es"),
    ("French", "fr"),
    ("German", "de"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Chinese (Simplified)", "zh"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Russian", "ru"),
    ("Arabic", "ar"),
    ("Hindi", "hi"),
    ("Dutch", "nl"),
    ("Turkish", "tr"),
    ("Polish", "pl"),
    ("Vietnamese", "vi"),
    ("Thai", "th"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    EmptyInput,
    UnknownLanguage(String),
    /// The local model could not be reached or failed.
    Backend(String),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::EmptyInput => write!(f, "Please enter some text to translate."),
            TranslateError::UnknownLanguage(l) => write!(f, "Unknown language: {}", l),
            TranslateError::Backend(e) => write!(
                f,
                "Error: {}. Make sure Ollama is running and '{}' is pulled.",
                e, TRANSLATE_MODEL
            ),
        }
    }
}

impl Error for TranslateError {}

/// A language resolved to its display name and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub name: &'static str,
    pub code: &'static str,
}

impl Language {
    /// Look up by name or ISO code, case-insensitively.
    pub fn lookup(query: &str) -> Result<Self, TranslateError> {
        let q = query.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|(name, code)| name.to_lowercase() == q || *code == q)
            .map(|&(name, code)| Language { name, code })
            .ok_or_else(|| TranslateError::UnknownLanguage(query.to_string()))
    }
}

pub fn build_translation_prompt(source: Language, target: Language, text: &str) -> String {
    format!(
        "You are a professional {sn} ({sc}) to {tn} ({tc}) translator. \
Your goal is to accurately convey the meaning and nuances of the original {sn} text \
while adhering to {tn} grammar, vocabulary, and cultural sensitivities. \
Produce only the {tn} translation, without any additional explanations or commentary. \
Please translate the following {sn} text into {tn}:\n\n\n{text}",
        sn = source.name,
        sc = source.code,
        tn = target.name,
        tc = target.code,
        text = text
    )
}

pub struct Translator {
    client: Arc<dyn ClientWrapper>,
}

impl Translator {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self { client }
    }

    pub async fn translate(&self, source: Language, target: Language, text: &str) -> TranslateResult<String> {
        if text.trim().is_empty() {
            return Err(Box::new(TranslateError::EmptyInput));
        }
        log::info!("Translator::translate: {} -> {}", source.code, target.code);
        let messages = [Message::user(build_translation_prompt(source, target, text))];
        let response = self
            .client
            .send_message(&messages, &ChatOptions::new())
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))?;
        Ok(response.content)
    }
}
