use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::GeneRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    SubCategory,
    Pathway,
    PathwayId,
    GeneId,
    OrthologyId,
    Name,
    Description,
    Enzyme,
}

impl Field {
    pub fn value<'a>(&self, record: &'a GeneRecord) -> &'a str {
        match self {
            Field::Category => record.category.as_str(),
            Field::SubCategory => record.sub_category.as_str(),
            Field::Pathway => record.pathway.as_str(),
            Field::PathwayId => record.pathway_id.as_str(),
            Field::GeneId => record.gene_id.as_str(),
            Field::OrthologyId => record.orthology_id.as_str(),
            Field::Name => record.name.as_str(),
            Field::Description => record.description.as_str(),
            Field::Enzyme => record.enzyme.as_deref().unwrap_or(""),
        }
    }
}

pub type GroupKey = Vec<String>;

fn key_of(record: &GeneRecord, fields: &[Field]) -> GroupKey {
    fields
        .iter()
        .map(|field| field.value(record).to_string())
        .collect()
}

#[derive(Debug, Default)]
pub struct RecordStore {
    rows: RwLock<Vec<GeneRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<GeneRecord>> {
        self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<GeneRecord>> {
        self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn insert_all<I: IntoIterator<Item = GeneRecord>>(&self, records: I) {
        self.write().extend(records);
    }

    pub fn replace(&self, records: Vec<GeneRecord>) {
        let mut rows = self.write();
        *rows = records;
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<GeneRecord>
    where
        P: Fn(&GeneRecord) -> bool,
    {
        self.read()
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Runs `f` over the rows under one read lock, so several grouping
    /// queries see the same table.
    pub fn with_rows<R>(&self, f: impl FnOnce(&[GeneRecord]) -> R) -> R {
        f(&self.read())
    }

    pub fn group_count_by(&self, fields: &[Field]) -> BTreeMap<GroupKey, usize> {
        group_count_by(&self.read(), fields)
    }

    pub fn group_distinct_count_by(
        &self,
        fields: &[Field],
        counted: Field,
    ) -> BTreeMap<GroupKey, usize> {
        group_distinct_count_by(&self.read(), fields, counted)
    }

    pub fn distinct(&self, fields: &[Field]) -> Vec<GroupKey> {
        distinct(&self.read(), fields)
    }
}

pub fn group_count_by(rows: &[GeneRecord], fields: &[Field]) -> BTreeMap<GroupKey, usize> {
    let mut groups = BTreeMap::new();
    for record in rows {
        *groups.entry(key_of(record, fields)).or_insert(0) += 1;
    }
    groups
}

pub fn group_distinct_count_by(
    rows: &[GeneRecord],
    fields: &[Field],
    counted: Field,
) -> BTreeMap<GroupKey, usize> {
    let mut groups: BTreeMap<GroupKey, BTreeSet<String>> = BTreeMap::new();
    for record in rows {
        groups
            .entry(key_of(record, fields))
            .or_default()
            .insert(counted.value(record).to_string());
    }
    groups
        .into_iter()
        .map(|(key, values)| (key, values.len()))
        .collect()
}

pub fn distinct(rows: &[GeneRecord], fields: &[Field]) -> Vec<GroupKey> {
    let mut seen = BTreeSet::new();
    let mut keys = Vec::new();
    for record in rows {
        let key = key_of(record, fields);
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pathway: &str, gene: &str, ko: &str) -> GeneRecord {
        GeneRecord {
            category: "Metabolism".to_string(),
            sub_category: "Carbohydrate metabolism".to_string(),
            pathway: pathway.to_string(),
            pathway_id: "00010".parse().unwrap(),
            gene_id: gene.to_string(),
            orthology_id: ko.to_string(),
            name: String::new(),
            description: String::new(),
            enzyme: None,
        }
    }

    #[test]
    fn group_counts_rows_and_distinct_values() {
        let store = RecordStore::new();
        store.insert_all(vec![
            record("Glycolysis", "g1", "K1"),
            record("Glycolysis", "g2", "K1"),
            record("Glycolysis", "g2", "K2"),
            record("TCA cycle", "g3", "K3"),
        ]);

        let rows = store.group_count_by(&[Field::Pathway]);
        assert_eq!(rows[&vec!["Glycolysis".to_string()]], 3);

        let genes = store.group_distinct_count_by(&[Field::Pathway], Field::GeneId);
        assert_eq!(genes[&vec!["Glycolysis".to_string()]], 2);
        let kos = store.group_distinct_count_by(&[Field::Pathway], Field::OrthologyId);
        assert_eq!(kos[&vec!["Glycolysis".to_string()]], 2);
        assert_eq!(kos[&vec!["TCA cycle".to_string()]], 1);
    }

    #[test]
    fn replace_discards_previous_rows() {
        let store = RecordStore::new();
        store.insert_all(vec![record("Glycolysis", "g1", "K1")]);
        store.replace(vec![record("TCA cycle", "g3", "K3")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.filter(|r| r.pathway == "Glycolysis").len(), 0);
        store.clear();
        assert!(store.is_empty());
    }
}
