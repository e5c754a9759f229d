//! DOCX text extraction via `docx-rs`.
//!
//! A `.docx` file is a ZIP of XML parts; `docx-rs` exposes the body as a tree
//! of paragraphs and tables. Text runs are concatenated per paragraph,
//! paragraphs are joined with newlines, and table cells are read row by row
//! with cells separated by tabs.

use std::path::Path;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild, read_docx,
};

use super::{Extractor, read_bytes};
use crate::document::DocumentFormat;
use crate::error::{RagError, Result};

/// Extracts paragraph and table text from Word documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn can_handle(&self, format: DocumentFormat) -> bool {
        format == DocumentFormat::Docx
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        let bytes = read_bytes(path)?;
        let docx = read_docx(&bytes)
            .map_err(|e| RagError::extraction(path, format!("DOCX parse error: {e:?}")))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => push_line(&mut lines, paragraph_text(paragraph)),
                DocumentChild::Table(table) => table_lines(table, &mut lines),
                _ => {}
            }
        }

        Ok(lines.join("\n"))
    }
}

fn push_line(lines: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        lines.push(line);
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}

#[allow(irrefutable_let_patterns)]
fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for child in &table.rows {
        let TableChild::TableRow(row) = child else { continue };
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell else { continue };
            let text: Vec<String> = cell
                .children
                .iter()
                .filter_map(|content| match content {
                    TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                    _ => None,
                })
                .collect();
            cells.push(text.join(" "));
        }
        push_line(lines, cells.join("\t"));
    }
}

#[cfg(test)]
mod tests {
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

    use super::*;

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
    }

    #[test]
    fn reads_paragraphs_and_table_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        let file = std::fs::File::create(&path).unwrap();

        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Hello docx")))
            .add_paragraph(Paragraph::new())
            .add_table(Table::new(vec![TableRow::new(vec![cell("Many Season"), cell("12.50")])]))
            .build()
            .pack(file)
            .unwrap();

        let text = DocxExtractor.extract_text(&path).unwrap();
        assert_eq!(text, "Hello docx\nMany Season\t12.50");
    }

    #[test]
    fn corrupt_docx_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "not a zip archive").unwrap();
        assert!(matches!(DocxExtractor.extract_text(&path), Err(RagError::Extraction { .. })));
    }
}
