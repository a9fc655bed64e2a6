use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{GeneRecord, PathwayId};
use crate::enrich::coverage_percent;
use crate::error::KeggError;
use crate::records::{self, Field, RecordStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hierarchy {
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub label: String,
    pub record_count: usize,
    pub sub_categories: Vec<SubCategoryNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryNode {
    pub label: String,
    pub record_count: usize,
    pub pathways: Vec<PathwayNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayNode {
    pub label: String,
    pub pathway_id: PathwayId,
    pub record_count: usize,
    pub distinct_ortholog_count: usize,
    pub distinct_gene_count: usize,
    pub known_ortholog_count: Option<usize>,
    pub coverage_percent: Option<f64>,
}

impl PathwayNode {
    pub fn set_known_ortholog_count(&mut self, known: usize) {
        self.known_ortholog_count = Some(known);
        self.coverage_percent = coverage_percent(self.distinct_gene_count, known);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneGroupNode {
    pub orthology_id: String,
    pub name: String,
    pub description: String,
    pub enzyme: Option<String>,
    pub gene_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Category(&'a CategoryNode),
    SubCategory(&'a SubCategoryNode),
    Pathway(&'a PathwayNode),
}

#[derive(Debug, Clone, Copy)]
pub struct HierarchyEntry<'a> {
    pub depth: usize,
    pub node: NodeRef<'a>,
}

impl Hierarchy {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn walk(&self) -> Vec<HierarchyEntry<'_>> {
        self.walk_to_level(3)
    }

    pub fn walk_to_level(&self, level: usize) -> Vec<HierarchyEntry<'_>> {
        let mut entries = Vec::new();
        if level == 0 {
            return entries;
        }
        for category in &self.categories {
            entries.push(HierarchyEntry {
                depth: 0,
                node: NodeRef::Category(category),
            });
            if level < 2 {
                continue;
            }
            for sub in &category.sub_categories {
                entries.push(HierarchyEntry {
                    depth: 1,
                    node: NodeRef::SubCategory(sub),
                });
                if level < 3 {
                    continue;
                }
                entries.extend(sub.pathways.iter().map(|pathway| HierarchyEntry {
                    depth: 2,
                    node: NodeRef::Pathway(pathway),
                }));
            }
        }
        entries
    }

    pub fn pathways(&self) -> impl Iterator<Item = &PathwayNode> {
        self.categories
            .iter()
            .flat_map(|category| category.sub_categories.iter())
            .flat_map(|sub| sub.pathways.iter())
    }

    pub fn pathways_mut(&mut self) -> impl Iterator<Item = &mut PathwayNode> {
        self.categories
            .iter_mut()
            .flat_map(|category| category.sub_categories.iter_mut())
            .flat_map(|sub| sub.pathways.iter_mut())
    }

    pub fn pathway(&self, id: &PathwayId) -> Option<&PathwayNode> {
        self.pathways().find(|pathway| &pathway.pathway_id == id)
    }

    fn sub_category_by_label_mut(&mut self, label: &str) -> Option<&mut SubCategoryNode> {
        self.categories
            .iter_mut()
            .flat_map(|category| category.sub_categories.iter_mut())
            .find(|sub| sub.label == label)
    }
}

/// Pathways are grouped by name and attached to the first subcategory whose
/// label matches the subcategory recorded on the pathway's first row.
pub fn build_hierarchy(store: &RecordStore) -> Result<Hierarchy, KeggError> {
    store.with_rows(build_from_rows)
}

fn build_from_rows(rows: &[GeneRecord]) -> Result<Hierarchy, KeggError> {
    let mut hierarchy = Hierarchy {
        categories: records::group_count_by(rows, &[Field::Category])
            .into_iter()
            .map(|(key, record_count)| CategoryNode {
                label: key[0].clone(),
                record_count,
                sub_categories: Vec::new(),
            })
            .collect(),
    };

    let sub_categories = records::group_count_by(rows, &[Field::Category, Field::SubCategory]);
    for (key, record_count) in sub_categories {
        let category = hierarchy
            .categories
            .iter_mut()
            .find(|category| category.label == key[0])
            .ok_or_else(|| {
                KeggError::Integrity(format!(
                    "subcategory `{}` has no category `{}`",
                    key[1], key[0]
                ))
            })?;
        category.sub_categories.push(SubCategoryNode {
            label: key[1].clone(),
            record_count,
            pathways: Vec::new(),
        });
    }

    let pathway_key = [Field::Pathway];
    let counts = records::group_count_by(rows, &pathway_key);
    let orthologs = records::group_distinct_count_by(rows, &pathway_key, Field::OrthologyId);
    let genes = records::group_distinct_count_by(rows, &pathway_key, Field::GeneId);

    let mut origins: HashMap<String, (String, String)> = HashMap::new();
    for key in records::distinct(rows, &[Field::Pathway, Field::PathwayId, Field::SubCategory]) {
        origins
            .entry(key[0].clone())
            .or_insert_with(|| (key[1].clone(), key[2].clone()));
    }

    for (key, record_count) in counts {
        let label = &key[0];
        let (pathway_id, sub_category) = origins.get(label).ok_or_else(|| {
            KeggError::Integrity(format!("pathway `{label}` has no identifier row"))
        })?;
        let pathway_id = pathway_id
            .parse::<PathwayId>()
            .map_err(|err| KeggError::Integrity(err.to_string()))?;
        let node = PathwayNode {
            label: label.clone(),
            pathway_id,
            record_count,
            distinct_ortholog_count: orthologs.get(&key).copied().unwrap_or(0),
            distinct_gene_count: genes.get(&key).copied().unwrap_or(0),
            known_ortholog_count: None,
            coverage_percent: None,
        };
        let parent = hierarchy
            .sub_category_by_label_mut(sub_category)
            .ok_or_else(|| {
                KeggError::Integrity(format!(
                    "pathway `{label}` references unknown subcategory `{sub_category}`"
                ))
            })?;
        parent.pathways.push(node);
    }

    Ok(hierarchy)
}

pub fn list_pathway_entries(
    store: &RecordStore,
    pathway: &str,
    category: &str,
    sub_category: &str,
) -> Vec<GeneGroupNode> {
    let records = store.filter(|record| {
        record.pathway == pathway
            && record.category == category
            && record.sub_category == sub_category
    });

    let mut groups: Vec<GeneGroupNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in records {
        match index.get(&record.orthology_id) {
            Some(&position) => groups[position].gene_ids.push(record.gene_id),
            None => {
                index.insert(record.orthology_id.clone(), groups.len());
                groups.push(GeneGroupNode {
                    orthology_id: record.orthology_id,
                    name: record.name,
                    description: record.description,
                    enzyme: record.enzyme,
                    gene_ids: vec![record.gene_id],
                });
            }
        }
    }
    groups
}
