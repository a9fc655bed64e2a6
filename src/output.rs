use std::io::{self, Write};

use serde::Serialize;

use crate::hierarchy::{GeneGroupNode, Hierarchy, NodeRef};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

const COLUMNS: usize = 6;

fn row(indent: &str, mut cells: Vec<String>) -> String {
    cells.resize(COLUMNS, String::new());
    format!("{indent}{}\n", cells.join("\t"))
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render_export<F>(hierarchy: &Hierarchy, details: Option<F>) -> String
where
    F: Fn(&str, &str, &str) -> Vec<GeneGroupNode>,
{
    let mut out = String::new();
    let mut category = "";
    let mut sub_category = "";
    for entry in hierarchy.walk() {
        match entry.node {
            NodeRef::Category(node) => {
                category = &node.label;
                out.push_str(&row("", vec![node.label.clone(), node.record_count.to_string()]));
            }
            NodeRef::SubCategory(node) => {
                sub_category = &node.label;
                out.push_str(&row(
                    "  ",
                    vec![node.label.clone(), node.record_count.to_string()],
                ));
            }
            NodeRef::Pathway(node) => {
                out.push_str(&row(
                    "    ",
                    vec![
                        node.label.clone(),
                        node.distinct_gene_count.to_string(),
                        node.pathway_id.to_string(),
                        node.distinct_ortholog_count.to_string(),
                        optional(node.known_ortholog_count),
                        optional(node.coverage_percent.map(|p| format!("{p:.2}"))),
                    ],
                ));
                if let Some(details) = &details {
                    for group in details(&node.label, category, sub_category) {
                        out.push_str(&row(
                            "      ",
                            vec![
                                group.orthology_id,
                                group.name,
                                group.description,
                                group.enzyme.unwrap_or_default(),
                                group.gene_ids.len().to_string(),
                                group.gene_ids.join(", "),
                            ],
                        ));
                    }
                }
            }
        }
    }
    out
}

pub fn render_tree(hierarchy: &Hierarchy, level: usize) -> String {
    let mut out = String::new();
    for entry in hierarchy.walk_to_level(level) {
        let indent = "  ".repeat(entry.depth);
        let line = match entry.node {
            NodeRef::Category(node) => format!("{} ({} records)", node.label, node.record_count),
            NodeRef::SubCategory(node) => {
                format!("{} ({} records)", node.label, node.record_count)
            }
            NodeRef::Pathway(node) => {
                let mut line = format!(
                    "[{}] {}: {} genes, {} orthologs",
                    node.pathway_id.ko_name(),
                    node.label,
                    node.distinct_gene_count,
                    node.distinct_ortholog_count
                );
                if let (Some(known), Some(coverage)) =
                    (node.known_ortholog_count, node.coverage_percent)
                {
                    line.push_str(&format!(", {known} known, {coverage:.2}% coverage"));
                }
                line
            }
        };
        out.push_str(&indent);
        out.push_str(&line);
        out.push('\n');
    }
    out
}
