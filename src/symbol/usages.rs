//! Line-based usage scanning.
//!
//! Occurrences are whole-identifier matches; each one is classified from
//! cues on its line.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::SymbolIndex;

lazy_static! {
    static ref IMPORT_LINE: Regex =
        Regex::new(r"^\s*(import\b|from\s+\S+\s+import\b|use\s)|\brequire\s*\(")
            .expect("valid import regex");
    static ref EXPORT_LINE: Regex =
        Regex::new(r"^\s*(export\b|pub\b|module\.exports\b)").expect("valid export regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Definition,
    Call,
    Reference,
    Import,
    Export,
}

/// Which files a usage scan reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageScope {
    /// Only files that define a symbol with the name
    #[default]
    DefiningFiles,
    AllIndexedFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub file_path: String,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed, in characters
    pub column: usize,
    pub kind: UsageKind,
    pub line_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossReference {
    pub name: String,
    pub definition_files: Vec<String>,
    pub usage_files: Vec<String>,
    pub imported_by: Vec<String>,
    pub exported_from: Vec<String>,
}

/// Scan for occurrences of `name`.
///
/// `read` returns the current contents of an indexed file, or `None` when it
/// can no longer be read (such files are skipped).
pub fn find_usages<F>(index: &SymbolIndex, name: &str, scope: UsageScope, read: F) -> Vec<Usage>
where
    F: Fn(&str) -> Option<String>,
{
    if name.is_empty() {
        return Vec::new();
    }

    // file -> definition lines
    let mut definitions: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for symbol in index.find_by_name(name) {
        definitions
            .entry(symbol.file_path.clone())
            .or_default()
            .insert(symbol.start_line);
    }

    let files: Vec<String> = match scope {
        UsageScope::DefiningFiles => definitions.keys().cloned().collect(),
        UsageScope::AllIndexedFiles => {
            let mut files: Vec<String> = index.files().cloned().collect();
            files.sort();
            files
        }
    };

    let mut usages = Vec::new();
    for file in files {
        let Some(content) = read(&file) else {
            tracing::debug!("Skipping usage scan of unreadable file {}", file);
            continue;
        };
        let defined_at = definitions.get(&file);

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            for column in occurrences(line, name) {
                let kind = classify(line, column, name, defined_at.map_or(false, |d| d.contains(&line_no)));
                usages.push(Usage {
                    file_path: file.clone(),
                    line: line_no,
                    column: line[..column].chars().count() + 1,
                    kind,
                    line_text: line.trim().to_string(),
                });
            }
        }
    }
    usages
}

/// Summarize where `name` is defined, used, imported and exported across all files.
pub fn cross_references<F>(index: &SymbolIndex, name: &str, read: F) -> Option<CrossReference>
where
    F: Fn(&str) -> Option<String>,
{
    let definition_files: BTreeSet<String> = index
        .find_by_name(name)
        .into_iter()
        .map(|s| s.file_path.clone())
        .collect();
    if definition_files.is_empty() {
        return None;
    }

    let usages = find_usages(index, name, UsageScope::AllIndexedFiles, read);
    let files_where = |pred: &dyn Fn(UsageKind) -> bool| -> Vec<String> {
        usages
            .iter()
            .filter(|u| pred(u.kind))
            .map(|u| u.file_path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    Some(CrossReference {
        name: name.to_string(),
        usage_files: files_where(&|k| matches!(k, UsageKind::Call | UsageKind::Reference)),
        imported_by: files_where(&|k| k == UsageKind::Import),
        exported_from: files_where(&|k| k == UsageKind::Export),
        definition_files: definition_files.into_iter().collect(),
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offsets of whole-identifier matches of `name` in `line`.
fn occurrences(line: &str, name: &str) -> Vec<usize> {
    line.match_indices(name)
        .filter(|(start, _)| {
            let before = line[..*start].chars().next_back();
            let after = line[start + name.len()..].chars().next();
            !before.map_or(false, is_ident_char) && !after.map_or(false, is_ident_char)
        })
        .map(|(start, _)| start)
        .collect()
}

fn classify(line: &str, column: usize, name: &str, is_definition_line: bool) -> UsageKind {
    if IMPORT_LINE.is_match(line) {
        UsageKind::Import
    } else if is_definition_line {
        UsageKind::Definition
    } else if EXPORT_LINE.is_match(line) {
        UsageKind::Export
    } else if line[column + name.len()..].trim_start().starts_with('(') {
        UsageKind::Call
    } else {
        UsageKind::Reference
    }
}
