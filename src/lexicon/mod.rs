//! Lexical matcher over categorized keyword and phrase patterns
//!
//! Scan order is fixed so results are reproducible:
//! 1. keyword sets before phrase sets
//! 2. categories in ascending byte order of their name
//! 3. patterns in the order they are listed in the source file
//!
//! The first pattern that matches anywhere in the content wins and scanning stops.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_KEYWORDS: &str = include_str!("../../resources/lexicon/keywords.json");
const DEFAULT_PHRASES: &str = include_str!("../../resources/lexicon/phrases.json");

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Failed to read pattern file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse pattern file {origin}: {message}")]
    Format { origin: String, message: String },

    #[error("Invalid pattern {pattern:?} in category {category:?} of {origin}: {source}")]
    InvalidPattern {
        origin: String,
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Keyword,
    Phrase,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Keyword => "keyword",
            PatternKind::Phrase => "phrase",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

#[derive(Debug, Clone)]
struct PatternCategory {
    name: String,
    patterns: Vec<CompiledPattern>,
}

/// Compiled, immutable set of categorized patterns (a keyword set or a phrase set)
#[derive(Debug, Clone)]
pub struct PatternSet {
    kind: PatternKind,
    categories: Vec<PatternCategory>,
}

impl PatternSet {
    /// Compiles every pattern; categories end up sorted by name
    pub fn compile(
        kind: PatternKind,
        origin: &str,
        categories: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, LexiconError> {
        let categories = categories
            .into_iter()
            .map(|(name, sources)| {
                let patterns = sources
                    .into_iter()
                    .map(|source| {
                        Regex::new(&source)
                            .map(|regex| CompiledPattern {
                                source: source.clone(),
                                regex,
                            })
                            .map_err(|e| LexiconError::InvalidPattern {
                                origin: origin.to_string(),
                                category: name.clone(),
                                pattern: source.clone(),
                                source: e,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PatternCategory { name, patterns })
            })
            .collect::<Result<Vec<_>, LexiconError>>()?;

        Ok(Self { kind, categories })
    }

    /// Parses a JSON or YAML category map; the format is picked from `origin`'s extension
    pub fn parse(kind: PatternKind, origin: &str, text: &str) -> Result<Self, LexiconError> {
        let is_yaml = origin.ends_with(".yaml") || origin.ends_with(".yml");

        let categories: BTreeMap<String, Vec<String>> = if is_yaml {
            serde_yaml::from_str(text).map_err(|e| LexiconError::Format {
                origin: origin.to_string(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(text).map_err(|e| LexiconError::Format {
                origin: origin.to_string(),
                message: e.to_string(),
            })?
        };

        Self::compile(kind, origin, categories)
    }

    pub fn load(kind: PatternKind, path: &Path) -> Result<Self, LexiconError> {
        let text = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(kind, &path.display().to_string(), &text)
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.categories.iter().map(|c| c.patterns.len()).sum()
    }

    /// First match in scan order, or `None`
    pub fn find(&self, content: &str) -> Option<LexicalMatch> {
        for category in &self.categories {
            for pattern in &category.patterns {
                if let Some(m) = pattern.regex.find(content) {
                    return Some(LexicalMatch {
                        kind: self.kind,
                        category: category.name.clone(),
                        pattern: pattern.source.clone(),
                        matched_text: m.as_str().to_string(),
                    });
                }
            }
        }
        None
    }
}

/// A fired lexical rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexicalMatch {
    pub kind: PatternKind,
    pub category: String,
    pub pattern: String,
    pub matched_text: String,
}

impl LexicalMatch {
    pub fn evidence(&self) -> String {
        format!(
            "sensitive {} matched in category {}: pattern \"{}\" found \"{}\"; classified as sensitive without semantic analysis",
            self.kind, self.category, self.pattern, self.matched_text
        )
    }
}

/// Keyword set plus phrase set, shared read-only across classification runs
#[derive(Debug, Clone)]
pub struct Lexicon {
    keywords: PatternSet,
    phrases: PatternSet,
}

impl Lexicon {
    pub fn new(keywords: PatternSet, phrases: PatternSet) -> Self {
        Self { keywords, phrases }
    }

    /// Built-in pattern sets shipped with the crate
    pub fn builtin() -> Result<Self, LexiconError> {
        Ok(Self::new(
            PatternSet::parse(PatternKind::Keyword, "builtin keywords.json", DEFAULT_KEYWORDS)?,
            PatternSet::parse(PatternKind::Phrase, "builtin phrases.json", DEFAULT_PHRASES)?,
        ))
    }

    /// Loads each set from its file when given, falling back to the built-in set
    pub fn load(
        keywords_file: Option<&Path>,
        phrases_file: Option<&Path>,
    ) -> Result<Self, LexiconError> {
        let keywords = match keywords_file {
            Some(path) => PatternSet::load(PatternKind::Keyword, path)?,
            None => PatternSet::parse(PatternKind::Keyword, "builtin keywords.json", DEFAULT_KEYWORDS)?,
        };
        let phrases = match phrases_file {
            Some(path) => PatternSet::load(PatternKind::Phrase, path)?,
            None => PatternSet::parse(PatternKind::Phrase, "builtin phrases.json", DEFAULT_PHRASES)?,
        };

        info!(
            keyword_patterns = keywords.pattern_count(),
            phrase_patterns = phrases.pattern_count(),
            "Lexicon loaded"
        );

        Ok(Self::new(keywords, phrases))
    }

    pub fn keywords(&self) -> &PatternSet {
        &self.keywords
    }

    pub fn phrases(&self) -> &PatternSet {
        &self.phrases
    }

    /// Keywords first, then phrases; stops at the first hit
    pub fn scan(&self, content: &str) -> Option<LexicalMatch> {
        let hit = self
            .keywords
            .find(content)
            .or_else(|| self.phrases.find(content));

        match &hit {
            Some(m) => debug!(kind = %m.kind, category = %m.category, pattern = %m.pattern, "Lexical match"),
            None => debug!("No lexical match"),
        }

        hit
    }
}
