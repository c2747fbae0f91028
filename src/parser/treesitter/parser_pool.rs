//! Per-language tree-sitter parsers, created lazily and reused.

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::{Language, Parser};

/// Owns one configured parser per language.
pub struct ParserPool {
    parsers: HashMap<&'static str, Parser>,
    languages: HashMap<&'static str, Language>,
}

impl ParserPool {
    pub fn new() -> Self {
        let mut languages: HashMap<&'static str, Language> = HashMap::new();
        languages.insert("rust", tree_sitter_rust::LANGUAGE.into());
        languages.insert("python", tree_sitter_python::LANGUAGE.into());
        languages.insert("javascript", tree_sitter_javascript::LANGUAGE.into());
        languages.insert(
            "typescript",
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        );
        languages.insert("tsx", tree_sitter_typescript::LANGUAGE_TSX.into());

        Self {
            parsers: HashMap::new(),
            languages,
        }
    }

    /// Parser for `language`, created on first use. `None` if unsupported.
    pub fn get_parser(&mut self, language: &str) -> Option<&mut Parser> {
        let (&id, ts_language) = self.languages.get_key_value(language)?;

        if !self.parsers.contains_key(id) {
            let mut parser = Parser::new();
            if let Err(e) = parser.set_language(ts_language) {
                debug!("Failed to set language '{}' for parser: {:?}", language, e);
                return None;
            }
            self.parsers.insert(id, parser);
        }

        self.parsers.get_mut(id)
    }

    pub fn supports(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    pub fn detect_language_from_extension(ext: &str) -> Option<&'static str> {
        match ext {
            "rs" => Some("rust"),
            "py" | "pyi" => Some("python"),
            "js" | "jsx" | "mjs" | "cjs" => Some("javascript"),
            "ts" | "mts" | "cts" => Some("typescript"),
            "tsx" => Some("tsx"),
            _ => None,
        }
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}
