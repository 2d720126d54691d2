//! Issue-level consolidation.
//!
//! Handles the timestamp bookkeeping, OLR inference and field pruning for one
//! issue, then hands every content item to the [`ContentItemConsolidator`].

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::adapters::Clock;
use crate::domain::issue::{TYPE_ARTICLE, TYPE_PAGE};
use crate::domain::Issue;

use super::content_item::{ContentItemConsolidator, ContentItemOutcome};
use super::error::ConsolidationError;

/// Canonical timestamp format written to consolidated issues
pub const CANONICAL_TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Accepted input formats, tried in order
const INPUT_TS_FORMATS: [&str; 3] = [CANONICAL_TS_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Normalize a timestamp to `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Strings matching none of the accepted formats are returned unchanged.
pub fn normalize_timestamp(ts: &str) -> String {
    INPUT_TS_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(ts, format).ok())
        .map(|parsed| parsed.format(CANONICAL_TS_FORMAT).to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Infer the OLR flag from content item types.
///
/// The first article or page encountered decides (article → true,
/// page → false); with neither, the issue counts as layout-recognized.
pub fn infer_olr<'a>(type_tags: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    type_tags
        .into_iter()
        .flatten()
        .find_map(|tp| match tp {
            TYPE_ARTICLE => Some(true),
            TYPE_PAGE => Some(false),
            _ => None,
        })
        .unwrap_or(true)
}

/// Per-issue content item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueReport {
    /// Items that received consolidated fields
    pub consolidated: usize,

    /// Items left without consolidated fields (images, unmatched)
    pub skipped: usize,
}

/// Consolidates whole issues
pub struct IssueConsolidator<'a> {
    items: ContentItemConsolidator<'a>,
    clock: &'a dyn Clock,
}

impl<'a> IssueConsolidator<'a> {
    pub fn new(items: ContentItemConsolidator<'a>, clock: &'a dyn Clock) -> Self {
        Self { items, clock }
    }

    /// Consolidate one issue in place
    pub fn consolidate(&self, issue: &mut Issue) -> Result<IssueReport, ConsolidationError> {
        let issue_id = match issue.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => return Err(ConsolidationError::missing_field("id", "issue")),
        };
        debug!("Processing issue: {}", issue_id);

        let pruned = issue.prune_optional_fields();
        if pruned > 0 {
            debug!(issue = %issue_id, pruned, "Pruned blank optional fields");
        }

        let original_ts = issue
            .original_timestamp()
            .map(normalize_timestamp)
            .ok_or_else(|| {
                ConsolidationError::missing_field("ts", format!("issue {} (no 'ts' or 'cdt')", issue_id))
            })?;

        issue.consolidated = Some(true);
        issue.consolidated_ts_original = Some(original_ts);
        issue.ts = Some(self.clock.now().format(CANONICAL_TS_FORMAT).to_string());
        issue.cdt = None;

        if issue.olr.is_none() {
            let olr = infer_olr(issue.type_tags());
            debug!(issue = %issue_id, olr, "Inferred OLR flag");
            issue.olr = Some(olr);
        }

        if issue.content_items().is_empty() {
            warn!("Issue {} has no content items", issue_id);
        }

        let mut report = IssueReport::default();
        for item in issue.content_items_mut() {
            match self.items.consolidate_item(item, &issue_id)? {
                Some(ContentItemOutcome::Consolidated) => report.consolidated += 1,
                Some(ContentItemOutcome::SkippedImage | ContentItemOutcome::SkippedUnmatched) => {
                    report.skipped += 1
                }
                None => {}
            }
        }

        info!(
            "Consolidated {} content items in issue {} (skipped {} items without enrichment data)",
            report.consolidated, issue_id, report.skipped
        );

        Ok(report)
    }
}
