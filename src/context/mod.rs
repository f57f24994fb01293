//! Context Builder: scan, rank and pack a bounded slice of the project.

use crate::domain::Config;
use crate::rank::{rank_files, KeywordSet};
use crate::render::{pack_bundle, BundleSpec, ContextBundle};
use crate::scan::{render_tree, scan_project};
use anyhow::Result;
use chrono::Utc;
use std::path::Path;

/// Maximum entries drawn in the tree listing.
pub const TREE_MAX_ENTRIES: usize = 400;

/// Builds context bundles using scan limits and preview size from a [`Config`].
pub struct ContextBuilder<'a> {
    config: &'a Config,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build a bundle for `request` within `budget_chars`.
    pub fn build(&self, root: &Path, request: &str, budget_chars: usize) -> Result<ContextBundle> {
        self.build_inner(root, request, None, budget_chars)
    }

    /// Build a repair bundle tagged with captured build output.
    ///
    /// Keywords come from the failure text, so files named in compiler
    /// errors rank first.
    pub fn build_for_failure(
        &self,
        root: &Path,
        failure: &str,
        budget_chars: usize,
    ) -> Result<ContextBundle> {
        self.build_inner(root, failure, Some(failure), budget_chars)
    }

    fn build_inner(
        &self,
        root: &Path,
        request: &str,
        failure: Option<&str>,
        budget_chars: usize,
    ) -> Result<ContextBundle> {
        let scan = scan_project(root, self.config)?;
        let keywords = KeywordSet::from_request(request);
        let ranked = rank_files(&scan.files, &keywords, Utc::now());
        let tree = render_tree(&scan.listed, TREE_MAX_ENTRIES);

        let bundle = pack_bundle(&BundleSpec {
            tree: &tree,
            failure,
            ranked: &ranked,
            budget_chars,
            preview_lines: self.config.preview_lines,
        });

        tracing::info!(
            "Context bundle: {} chars, {} full, {} previews, {} omitted ({} keywords)",
            bundle.char_len(),
            bundle.full.len(),
            bundle.previews.len(),
            bundle.omitted.len(),
            keywords.len()
        );
        Ok(bundle)
    }
}

/// Build a bundle with default scan settings.
pub fn build(root: &Path, request: &str, budget_chars: usize) -> Result<String> {
    let config = Config::default();
    Ok(ContextBuilder::new(&config).build(root, request, budget_chars)?.text)
}
