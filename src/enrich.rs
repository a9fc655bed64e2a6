use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ReferenceCache;
use crate::domain::PathwayId;
use crate::error::KeggError;
use crate::hierarchy::Hierarchy;
use crate::reference::ReferenceClient;

const SECTION_START: &str = "ORTHOLOGY";
const SECTION_END: &str = "REFERENCE";

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub trait ProgressSink {
    fn progress(&self, completed: usize, total: usize, label: &str);
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _completed: usize, _total: usize, _label: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathwayTarget {
    pub id: PathwayId,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unavailable,
    Malformed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedPathway {
    pub pathway_id: PathwayId,
    pub label: String,
    pub reason: SkipReason,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub total: usize,
    pub enriched: usize,
    pub fetched: usize,
    pub skipped: Vec<SkippedPathway>,
    pub cancelled: bool,
    pub started_at: String,
    pub finished_at: String,
}

/// Number of ORTHOLOGY entries in a KEGG flat-file document.
///
/// Entry lines are counted up to the line whose first token is `REFERENCE`.
/// The `ORTHOLOGY` line itself counts when it carries an entry after the
/// keyword, which is how KEGG lays out the first one.
pub fn count_orthology_entries(text: &str) -> Result<usize, String> {
    let mut lines = text.lines();
    let header = lines
        .by_ref()
        .find(|line| first_token(line) == Some(SECTION_START))
        .ok_or("missing ORTHOLOGY section")?;
    let mut count = usize::from(header.split_whitespace().nth(1).is_some());
    for line in lines {
        match first_token(line) {
            Some(SECTION_END) => return Ok(count),
            Some(_) => count += 1,
            None => {}
        }
    }
    Err("ORTHOLOGY section is not followed by REFERENCE".to_string())
}

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// `mapped / known * 100` rounded half-up to two decimals; `None` when
/// `known` is zero.
pub fn coverage_percent(mapped: usize, known: usize) -> Option<f64> {
    if known == 0 {
        return None;
    }
    let (mapped, known) = (mapped as u128, known as u128);
    let hundredths = (mapped * 20_000 + known) / (2 * known);
    Some(hundredths as f64 / 100.0)
}

pub struct EnrichmentPipeline<'a, C: ReferenceClient> {
    cache: &'a ReferenceCache,
    client: &'a C,
}

enum Loaded {
    Cached(String),
    Fetched(String),
}

impl<'a, C: ReferenceClient> EnrichmentPipeline<'a, C> {
    pub fn new(cache: &'a ReferenceCache, client: &'a C) -> Self {
        Self { cache, client }
    }

    fn load(&self, id: &PathwayId) -> Result<Loaded, KeggError> {
        match self.cache.read(id) {
            Ok(Some(text)) => {
                debug!(pathway = %id, "reference document served from cache");
                return Ok(Loaded::Cached(text));
            }
            Ok(None) => {}
            Err(err) => {
                return Err(KeggError::FetchUnavailable {
                    pathway_id: id.to_string(),
                    reason: err.to_string(),
                });
            }
        }
        let text = self.client.fetch_pathway(id)?;
        if let Err(err) = self.cache.write(id, &text) {
            warn!(pathway = %id, error = %err, "failed to cache reference document");
        }
        Ok(Loaded::Fetched(text))
    }

    pub fn known_ortholog_count(&self, id: &PathwayId) -> Result<(usize, bool), KeggError> {
        let (text, fetched) = match self.load(id)? {
            Loaded::Cached(text) => (text, false),
            Loaded::Fetched(text) => (text, true),
        };
        let count = count_orthology_entries(&text).map_err(|reason| {
            KeggError::MalformedReferenceDocument {
                pathway_id: id.to_string(),
                reason,
            }
        })?;
        Ok((count, fetched))
    }

    pub fn run(
        &self,
        targets: &[PathwayTarget],
        hierarchy: &RwLock<Hierarchy>,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> EnrichmentReport {
        let started_at = iso_timestamp();
        let total = targets.len();
        let mut report = EnrichmentReport {
            total,
            enriched: 0,
            fetched: 0,
            skipped: Vec::new(),
            cancelled: false,
            started_at,
            finished_at: String::new(),
        };

        for (index, target) in targets.iter().enumerate() {
            if token.is_cancelled() {
                info!(completed = index, total, "enrichment cancelled");
                report.cancelled = true;
                break;
            }
            match self.known_ortholog_count(&target.id) {
                Ok((known, fetched)) => {
                    if fetched {
                        report.fetched += 1;
                    }
                    let mut tree = hierarchy
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    for node in tree
                        .pathways_mut()
                        .filter(|node| node.pathway_id == target.id)
                    {
                        node.set_known_ortholog_count(known);
                    }
                    report.enriched += 1;
                }
                Err(err) => {
                    let reason = match err {
                        KeggError::MalformedReferenceDocument { .. } => SkipReason::Malformed,
                        _ => SkipReason::Unavailable,
                    };
                    warn!(pathway = %target.id, label = %target.label, error = %err, "skipping pathway");
                    report.skipped.push(SkippedPathway {
                        pathway_id: target.id.clone(),
                        label: target.label.clone(),
                        reason,
                        message: err.to_string(),
                    });
                }
            }
            sink.progress(index + 1, total, &target.label);
        }

        report.finished_at = iso_timestamp();
        info!(
            total,
            enriched = report.enriched,
            skipped = report.skipped.len(),
            fetched = report.fetched,
            "enrichment finished"
        );
        report
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_orthology_header_is_not_an_entry() {
        let doc = "ENTRY       ko00010\nORTHOLOGY\n  K00001 ...\n  K00002 ...\nREFERENCE\n  PMID:1\n";
        assert_eq!(count_orthology_entries(doc).unwrap(), 2);
    }

    #[test]
    fn orthology_header_with_entry_counts_as_first() {
        let doc = "\
NAME        Glycolysis
ORTHOLOGY   K00844  HK; hexokinase [EC:2.7.1.1]
            K12407  GCK; glucokinase [EC:2.7.1.2]

            K00845  glk; glucokinase [EC:2.7.1.2]
REFERENCE   PMID:12345
";
        assert_eq!(count_orthology_entries(doc).unwrap(), 3);
    }

    #[test]
    fn missing_markers_are_errors() {
        assert!(count_orthology_entries("NAME x\nREFERENCE y\n").is_err());
        assert!(count_orthology_entries("ORTHOLOGY K1 a\n   K2 b\n").is_err());
        assert!(count_orthology_entries("").is_err());
    }

    #[test]
    fn coverage_rounds_half_up() {
        assert_eq!(coverage_percent(1, 32), Some(3.13));
        assert_eq!(coverage_percent(2, 3), Some(66.67));
        assert_eq!(coverage_percent(1, 8), Some(12.5));
        assert_eq!(coverage_percent(5, 5), Some(100.0));
        assert_eq!(coverage_percent(3, 0), None);
    }

    #[test]
    fn cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());
        other.cancel();
        assert!(token.is_cancelled());
    }
}
