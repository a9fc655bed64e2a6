use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{GeneRecord, PathwayId};
use crate::error::KeggError;

static BOLD_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<b>([^<>]+)</b>").expect("valid bold label regex"));
static PATHWAY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^C\s+(\d+)([^\[]+)").expect("valid pathway header regex"));

const ENZYME_MARKER: &str = "[EC:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathwayRef {
    pub id: PathwayId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    category: Option<String>,
    sub_category: Option<String>,
    pathway: Option<PathwayRef>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn sub_category(&self) -> Option<&str> {
        self.sub_category.as_deref()
    }

    pub fn pathway(&self) -> Option<&PathwayRef> {
        self.pathway.as_ref()
    }

    pub fn open_category(&self, label: String) -> Self {
        Self {
            category: Some(label),
            sub_category: None,
            pathway: None,
        }
    }

    pub fn open_sub_category(&self, label: String) -> Result<Self, String> {
        if self.category.is_none() {
            return Err("subcategory opened before any category".to_string());
        }
        Ok(Self {
            category: self.category.clone(),
            sub_category: Some(label),
            pathway: None,
        })
    }

    pub fn open_pathway(&self, pathway: PathwayRef) -> Result<Self, String> {
        if self.sub_category.is_none() {
            return Err("pathway opened before any subcategory".to_string());
        }
        Ok(Self {
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            pathway: Some(pathway),
        })
    }

    pub fn emit(&self, entry: EntryFields) -> Result<GeneRecord, String> {
        let (Some(category), Some(sub_category), Some(pathway)) =
            (&self.category, &self.sub_category, &self.pathway)
        else {
            return Err("entry outside of an open category/subcategory/pathway".to_string());
        };
        Ok(GeneRecord {
            category: category.clone(),
            sub_category: sub_category.clone(),
            pathway: pathway.name.clone(),
            pathway_id: pathway.id.clone(),
            gene_id: entry.gene_id,
            orthology_id: entry.orthology_id,
            name: entry.name,
            description: entry.description,
            enzyme: entry.enzyme,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub gene_id: String,
    pub orthology_id: String,
    pub name: String,
    pub description: String,
    pub enzyme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KegLine {
    Skip,
    Category(String),
    SubCategory(String),
    Pathway(PathwayRef),
    Entry(EntryFields),
}

pub fn classify_line(raw: &str) -> Result<KegLine, String> {
    let line = raw.trim();
    let Some(tag) = line.chars().next() else {
        return Ok(KegLine::Skip);
    };
    match tag {
        '+' | '#' | '!' => Ok(KegLine::Skip),
        'A' => bold_label(line).map(KegLine::Category),
        'B' if line.len() == 1 => Ok(KegLine::Skip),
        'B' => bold_label(line).map(KegLine::SubCategory),
        'C' => parse_pathway_header(line).map(KegLine::Pathway),
        'D' => parse_entry(&line[1..]).map(KegLine::Entry),
        other => {
            debug!(tag = %other, "skipping line with unknown level tag");
            Ok(KegLine::Skip)
        }
    }
}

fn bold_label(line: &str) -> Result<String, String> {
    BOLD_LABEL
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| "missing <b>label</b>".to_string())
}

fn parse_pathway_header(line: &str) -> Result<PathwayRef, String> {
    let caps = PATHWAY_HEADER
        .captures(line)
        .ok_or_else(|| "missing numeric pathway id".to_string())?;
    let id = caps[1].parse::<PathwayId>().map_err(|err| err.to_string())?;
    let name = caps[2].trim().to_string();
    if name.is_empty() {
        return Err("missing pathway name".to_string());
    }
    Ok(PathwayRef { id, name })
}

/// Parses the body of a `D` line (tag removed).
///
/// Standard layout: `gene; KO  name; description [EC:x.x.x.x]`.
/// Compact layout: `gene  KO, name; description [EC:x.x.x.x]`.
pub fn parse_entry(body: &str) -> Result<EntryFields, String> {
    let segments: Vec<&str> = body.split(';').collect();
    let (gene_id, orthology_id, name, tail) = match segments.as_slice() {
        [] | [_] => {
            return Err("expected `;`-separated gene, orthology and description".to_string());
        }
        [head, tail] => {
            let (gene_id, rest) = head
                .trim()
                .split_once("  ")
                .ok_or_else(|| "missing two-space separator after gene id".to_string())?;
            let rest = rest.trim();
            let (orthology_id, name) = match rest.split_once(", ") {
                Some((orthology_id, name)) => (orthology_id.trim(), name.trim()),
                None => (gene_id.trim(), rest),
            };
            (gene_id.trim(), orthology_id, name, *tail)
        }
        [gene, orthology, tail, ..] => {
            let (orthology_id, name) = orthology
                .trim()
                .split_once("  ")
                .ok_or_else(|| "missing two-space separator between orthology id and name".to_string())?;
            (gene.trim(), orthology_id.trim(), name.trim(), *tail)
        }
    };
    if gene_id.is_empty() || orthology_id.is_empty() {
        return Err("empty gene or orthology id".to_string());
    }
    let (description, enzyme) = split_enzyme(tail);
    Ok(EntryFields {
        gene_id: gene_id.to_string(),
        orthology_id: orthology_id.to_string(),
        name: name.to_string(),
        description,
        enzyme,
    })
}

fn split_enzyme(segment: &str) -> (String, Option<String>) {
    match segment.split_once(ENZYME_MARKER) {
        Some((description, enzyme)) => {
            let enzyme = enzyme.trim().trim_end_matches(']').trim();
            (
                description.trim().to_string(),
                (!enzyme.is_empty()).then(|| enzyme.to_string()),
            )
        }
        None => (segment.trim().to_string(), None),
    }
}

pub struct KegParser<I> {
    lines: std::iter::Enumerate<I>,
    context: ParseContext,
    failed: bool,
}

impl<I, S> KegParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines: lines.enumerate(),
            context: ParseContext::new(),
            failed: false,
        }
    }

    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    fn step(&mut self, line: &str) -> Result<Option<GeneRecord>, String> {
        match classify_line(line)? {
            KegLine::Skip => Ok(None),
            KegLine::Category(label) => {
                self.context = self.context.open_category(label);
                Ok(None)
            }
            KegLine::SubCategory(label) => {
                self.context = self.context.open_sub_category(label)?;
                Ok(None)
            }
            KegLine::Pathway(pathway) => {
                self.context = self.context.open_pathway(pathway)?;
                Ok(None)
            }
            KegLine::Entry(entry) => self.context.emit(entry).map(Some),
        }
    }
}

impl<I, S> Iterator for KegParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<GeneRecord, KeggError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some((index, line)) = self.lines.next() {
            let line = line.as_ref();
            match self.step(line) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(reason) => {
                    self.failed = true;
                    return Some(Err(KeggError::Parse {
                        line: index + 1,
                        content: line.trim().to_string(),
                        reason,
                    }));
                }
            }
        }
        None
    }
}

pub fn parse_keg(text: &str) -> Result<Vec<GeneRecord>, KeggError> {
    KegParser::new(text.lines()).collect()
}
