//! File ranking by relevance to a request

use crate::domain::ProjectFile;
use chrono::{DateTime, Utc};

pub mod ranker;

pub use ranker::{score_file, KeywordSet, RelevanceScore};

/// A file paired with its relevance score.
#[derive(Debug, Clone, Copy)]
pub struct RankedFile<'a> {
    pub score: RelevanceScore,
    pub file: &'a ProjectFile,
}

/// Rank `files` by descending score. Ties keep enumeration order.
pub fn rank_files<'a>(
    files: &'a [ProjectFile],
    keywords: &KeywordSet,
    now: DateTime<Utc>,
) -> Vec<RankedFile<'a>> {
    let mut ranked: Vec<RankedFile<'a>> = files
        .iter()
        .map(|file| RankedFile { score: score_file(file, keywords, now), file })
        .collect();
    // `sort_by` is stable, so equal scores stay in enumeration order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::PathBuf;

    fn file(path: &str, content: &str, modified_at: DateTime<Utc>) -> ProjectFile {
        ProjectFile {
            path: path.to_string(),
            absolute: PathBuf::from(path),
            content: content.to_string(),
            line_count: content.lines().count(),
            byte_size: content.len() as u64,
            modified_at,
        }
    }

    #[test]
    fn test_readme_keyword_outranks_unrelated_file() {
        let now = Utc::now();
        let same_time = now - Duration::minutes(10);
        let files = vec![
            file(
                "README.md",
                "# Demo\n\nA small app.\n\nRun npm start.\n",
                same_time,
            ),
            file(
                "package.json",
                r#"{"name":"demo","dependencies":{"react":"^18.2.0"}}"#,
                same_time,
            ),
            file("utils.js", "export const add = (a, b) => a + b;\n", same_time),
        ];

        let ranked = rank_files(&files, &KeywordSet::from_request("readme"), now);
        let order: Vec<&str> = ranked.iter().map(|r| r.file.path.as_str()).collect();
        let readme = order.iter().position(|p| *p == "README.md").unwrap();
        let utils = order.iter().position(|p| *p == "utils.js").unwrap();
        assert!(readme < utils, "unexpected order: {:?}", order);
    }

    #[test]
    fn test_ties_keep_enumeration_order() {
        let now = Utc::now();
        let old = now - Duration::days(3);
        let files = vec![file("b.txt", "", old), file("a.txt", "", old), file("c.txt", "", old)];

        let ranked = rank_files(&files, &KeywordSet::default(), now);
        let order: Vec<&str> = ranked.iter().map(|r| r.file.path.as_str()).collect();
        assert_eq!(order, vec!["b.txt", "a.txt", "c.txt"]);
    }
}
