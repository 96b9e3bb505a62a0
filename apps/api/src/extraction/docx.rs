use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use super::ExtractionError;

/// Paragraph text first, then every table as ` | `-separated rows under a `[TABLES]` marker.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

    let mut text = String::new();
    let mut tables = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                text.push_str(&paragraph_text(p));
                text.push('\n');
            }
            DocumentChild::Table(t) => tables.push(t),
            _ => {}
        }
    }

    if !tables.is_empty() {
        text.push_str("\n[TABLES]\n");
        for table in tables {
            for row in table_rows(table) {
                text.push_str(&row.join(" | "));
                text.push('\n');
            }
        }
    }

    Ok(text)
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    push_children(&paragraph.children, &mut out);
    out
}

fn push_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => out.push_str(&t.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_children(&link.children, out),
            _ => {}
        }
    }
}

fn table_rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableChild::TableRow(row) => Some(row),
            #[allow(unreachable_patterns)]
            _ => None,
        })
        .map(|row| {
            row.cells
                .iter()
                .filter_map(|cell| match cell {
                    TableRowChild::TableCell(cell) => Some(cell_text(&cell.children)),
                    #[allow(unreachable_patterns)]
                    _ => None,
                })
                .collect()
        })
        .collect()
}

fn cell_text(contents: &[TableCellContent]) -> String {
    contents
        .iter()
        .filter_map(|content| match content {
            TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
