//! Relevance scoring heuristics.
//!
//! A score is a pure function of a file's metadata, the request keywords and
//! the reference time passed in by the caller, so identical inputs always
//! produce the same ranked order.

use crate::domain::ProjectFile;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Integer relevance of one file to one request.
pub type RelevanceScore = i64;

pub const CONFIG_FILE_BONUS: RelevanceScore = 30;
pub const ENTRY_POINT_BONUS: RelevanceScore = 20;
pub const PATH_KEYWORD_BONUS: RelevanceScore = 15;
pub const CONTENT_KEYWORD_BONUS: RelevanceScore = 5;

/// Recency buckets as (max age in minutes, bonus), checked in order.
pub const RECENCY_BUCKETS: &[(i64, RelevanceScore)] = &[(30, 25), (120, 12), (24 * 60, 4)];

/// Minimum keyword length in characters.
pub const MIN_KEYWORD_LEN: usize = 3;

const CONFIG_BASENAMES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "jsconfig.json",
    "cargo.toml",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "go.mod",
    "composer.json",
    "gemfile",
    "pom.xml",
    "build.gradle",
    "makefile",
    "dockerfile",
    "docker-compose.yml",
    "vite.config.js",
    "vite.config.ts",
    "webpack.config.js",
    "next.config.js",
    ".eslintrc.json",
    ".prettierrc",
];

const ENTRY_POINT_BASENAMES: &[&str] = &[
    "main.rs",
    "lib.rs",
    "main.py",
    "app.py",
    "__main__.py",
    "main.go",
    "index.js",
    "index.ts",
    "index.jsx",
    "index.tsx",
    "main.js",
    "main.ts",
    "main.tsx",
    "app.js",
    "app.ts",
    "app.jsx",
    "app.tsx",
    "server.js",
    "server.ts",
    "index.html",
];

/// Case-folded request keywords, deduplicated and ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    /// Split `request` on non-alphanumeric characters and keep tokens of at
    /// least [`MIN_KEYWORD_LEN`] characters.
    pub fn from_request(request: &str) -> Self {
        let words = request
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN)
            .map(|token| token.to_lowercase())
            .collect();
        Self(words)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn basename_lower(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase()
}

pub fn is_config_file(path: &str) -> bool {
    CONFIG_BASENAMES.contains(&basename_lower(path).as_str())
}

pub fn is_entry_point(path: &str) -> bool {
    ENTRY_POINT_BASENAMES.contains(&basename_lower(path).as_str())
}

fn recency_bonus(modified_at: DateTime<Utc>, now: DateTime<Utc>) -> RelevanceScore {
    let age_minutes = (now - modified_at).num_minutes();
    if age_minutes < 0 {
        // Clock skew: treat future timestamps as just modified.
        return RECENCY_BUCKETS.first().map(|(_, bonus)| *bonus).unwrap_or(0);
    }
    RECENCY_BUCKETS
        .iter()
        .find(|(max_age, _)| age_minutes < *max_age)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

/// Score one file against a keyword set at reference time `now`.
pub fn score_file(file: &ProjectFile, keywords: &KeywordSet, now: DateTime<Utc>) -> RelevanceScore {
    let mut score = 0;

    if is_config_file(&file.path) {
        score += CONFIG_FILE_BONUS;
    }
    if is_entry_point(&file.path) {
        score += ENTRY_POINT_BONUS;
    }
    score += recency_bonus(file.modified_at, now);

    if !keywords.is_empty() {
        let path_lower = file.path.to_lowercase();
        let content_lower = file.content.to_lowercase();
        for keyword in keywords.iter() {
            if path_lower.contains(keyword) {
                score += PATH_KEYWORD_BONUS;
            }
            if content_lower.contains(keyword) {
                score += CONTENT_KEYWORD_BONUS;
            }
        }
    }

    score
}
