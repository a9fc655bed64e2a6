use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::info;

use crate::cache::ReferenceCache;
use crate::domain::PathwayId;
use crate::enrich::{
    CancellationToken, EnrichmentPipeline, EnrichmentReport, PathwayTarget, ProgressSink,
};
use crate::error::KeggError;
use crate::hierarchy::{self, GeneGroupNode, Hierarchy};
use crate::parser::parse_keg;
use crate::records::{self, Field, RecordStore};
use crate::reference::ReferenceClient;

#[derive(Debug, Clone, Serialize)]
pub struct ParseSummary {
    pub records: usize,
    pub categories: usize,
    pub pathways: usize,
}

pub struct App<C> {
    store: RecordStore,
    hierarchy: RwLock<Hierarchy>,
    cache: ReferenceCache,
    client: C,
}

impl<C: ReferenceClient> App<C> {
    pub fn new(cache: ReferenceCache, client: C) -> Self {
        Self {
            store: RecordStore::new(),
            hierarchy: RwLock::new(Hierarchy::default()),
            cache,
            client,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    fn tree(&self) -> RwLockReadGuard<'_, Hierarchy> {
        self.hierarchy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tree_mut(&self) -> RwLockWriteGuard<'_, Hierarchy> {
        self.hierarchy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn parse(&self, contents: &str) -> Result<ParseSummary, KeggError> {
        let rows = parse_keg(contents)?;
        let summary = ParseSummary {
            records: rows.len(),
            categories: records::distinct(&rows, &[Field::Category]).len(),
            pathways: records::distinct(&rows, &[Field::Pathway]).len(),
        };
        self.store.replace(rows);
        *self.tree_mut() = Hierarchy::default();

        info!(
            records = summary.records,
            categories = summary.categories,
            pathways = summary.pathways,
            "parsed keg file"
        );
        Ok(summary)
    }

    pub fn build_hierarchy(&self) -> Result<Hierarchy, KeggError> {
        let built = hierarchy::build_hierarchy(&self.store)?;
        *self.tree_mut() = built.clone();
        Ok(built)
    }

    pub fn hierarchy(&self) -> Hierarchy {
        self.tree().clone()
    }

    pub fn list_pathway_entries(
        &self,
        pathway: &str,
        category: &str,
        sub_category: &str,
    ) -> Vec<GeneGroupNode> {
        hierarchy::list_pathway_entries(&self.store, pathway, category, sub_category)
    }

    pub fn pathway_targets(&self) -> Result<Vec<PathwayTarget>, KeggError> {
        let mut targets: Vec<PathwayTarget> = Vec::new();
        for key in self.store.distinct(&[Field::PathwayId, Field::Pathway]) {
            let id = key[0]
                .parse::<PathwayId>()
                .map_err(|err| KeggError::Integrity(err.to_string()))?;
            if targets.iter().any(|target| target.id == id) {
                continue;
            }
            targets.push(PathwayTarget {
                id,
                label: key[1].clone(),
            });
        }
        Ok(targets)
    }

    pub fn enrich_pathways(
        &self,
        token: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<EnrichmentReport, KeggError> {
        if self.tree().is_empty() && !self.store.is_empty() {
            self.build_hierarchy()?;
        }
        let targets = self.pathway_targets()?;
        let pipeline = EnrichmentPipeline::new(&self.cache, &self.client);
        Ok(pipeline.run(&targets, &self.hierarchy, token, sink))
    }

    pub fn close(&self) {
        self.store.clear();
        *self.tree_mut() = Hierarchy::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NoProgress;
    use camino::Utf8PathBuf;

    struct OfflineClient;

    impl ReferenceClient for OfflineClient {
        fn fetch_pathway(&self, id: &PathwayId) -> Result<String, KeggError> {
            Err(KeggError::FetchUnavailable {
                pathway_id: id.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    const KEG: &str = "\
A<b>Metabolism</b>
B  <b>Carbohydrate metabolism</b>
C    00010 Glycolysis / Gluconeogenesis [PATH:ko00010]
D      gene_1; K00844  HK; hexokinase [EC:2.7.1.1]
";

    fn app() -> (tempfile::TempDir, App<OfflineClient>) {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("ko")).unwrap();
        (temp, App::new(ReferenceCache::new(root), OfflineClient))
    }

    #[test]
    fn failed_parse_keeps_previous_records() {
        let (_temp, app) = app();
        app.parse(KEG).unwrap();
        let broken = format!("{KEG}C    no id here\n");
        assert!(app.parse(&broken).is_err());
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn enrichment_builds_tree_when_missing() {
        let (_temp, app) = app();
        app.parse(KEG).unwrap();
        let report = app
            .enrich_pathways(&CancellationToken::new(), &NoProgress)
            .unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(!app.hierarchy().is_empty());
    }

    #[test]
    fn close_empties_everything() {
        let (_temp, app) = app();
        app.parse(KEG).unwrap();
        app.build_hierarchy().unwrap();
        app.close();
        assert!(app.store().is_empty());
        assert!(app.hierarchy().is_empty());
    }
}
