//! PDF SRS rendering via `printpdf`.
//!
//! Optional on failure: any error is logged and the caller gets `None`,
//! never a failed run.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use serde_json::Value;

use crate::analysis::RequirementsPayload;

use super::{sanitize_project_name, title_case, value_text, RenderError, SECTIONS, SECTION_PLACEHOLDER};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP_Y: f32 = 280.0;
const BOTTOM_Y: f32 = 20.0;
const WRAP_COLUMNS: usize = 90;

/// Render the SRS as a PDF to `{out_dir}/SRS_{project}.pdf`.
///
/// Returns `None` (with a warning) on any failure.
pub fn render_pdf(
    payload: &RequirementsPayload,
    project_name: &str,
    out_dir: &Path,
) -> Option<PathBuf> {
    match try_render_pdf(payload, project_name, out_dir) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "PDF SRS generated");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Skipping PDF generation");
            None
        }
    }
}

fn try_render_pdf(
    payload: &RequirementsPayload,
    project_name: &str,
    out_dir: &Path,
) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(out_dir)?;

    let title = format!("SRS — {project_name}");
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    let mut cursor = PageCursor {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        y: TOP_Y,
    };

    cursor.heading(&bold, 14.0, "Software Requirements Specification");
    cursor.line(&font, 10.0, &format!("Project: {project_name}"));
    cursor.line(
        &font,
        10.0,
        &format!("Date: {}", chrono::Utc::now().format("%Y-%m-%d")),
    );
    cursor.space(6.0);

    for &(heading, snake_key, upper_key) in SECTIONS {
        cursor.heading(&bold, 11.0, heading);
        let lines = match payload.section(snake_key, upper_key) {
            Some(value) => section_lines(value),
            None => vec![SECTION_PLACEHOLDER.trim_matches('*').to_string()],
        };
        for line in lines {
            for wrapped in wrap_text(&line, WRAP_COLUMNS) {
                cursor.line(&font, 9.0, &wrapped);
            }
        }
        cursor.space(4.0);
    }

    match payload {
        RequirementsPayload::RawText(text) => {
            cursor.heading(&bold, 11.0, "Raw Analysis");
            for line in text.lines() {
                for wrapped in wrap_text(line, WRAP_COLUMNS) {
                    cursor.line(&font, 9.0, &wrapped);
                }
            }
        }
        RequirementsPayload::Failed { error } => {
            cursor.heading(&bold, 11.0, "Synthesis Status");
            for wrapped in wrap_text(&format!("Requirement synthesis failed: {error}"), WRAP_COLUMNS)
            {
                cursor.line(&font, 9.0, &wrapped);
            }
        }
        RequirementsPayload::Structured(_) => {}
    }

    let out_path = out_dir.join(format!("SRS_{}.pdf", sanitize_project_name(project_name)));
    let file = File::create(&out_path)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out_path)
}

/// Y-cursor with automatic page breaks.
struct PageCursor<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
}

impl PageCursor<'_> {
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM_Y {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y;
        }
    }

    fn heading(&mut self, font: &IndirectFontRef, size: f32, text: &str) {
        self.ensure_room(10.0);
        self.layer.use_text(text, size, Mm(20.0), Mm(self.y), font);
        self.y -= 8.0;
    }

    fn line(&mut self, font: &IndirectFontRef, size: f32, text: &str) {
        self.ensure_room(5.0);
        self.layer.use_text(text, size, Mm(25.0), Mm(self.y), font);
        self.y -= 4.5;
    }

    fn space(&mut self, amount: f32) {
        self.y -= amount;
    }
}

/// Flatten a section value to plain display lines.
fn section_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", title_case(k), value_text(v)))
            .collect(),
        Value::Array(items) => items.iter().map(|i| format!("· {}", value_text(i))).collect(),
        other => vec![value_text(other)],
    }
}

/// Greedy word wrap at `max_chars` columns.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_structured_payload_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let payload = RequirementsPayload::Structured(
            json!({
                "project_overview": "A portal",
                "functional_requirements": ["Login", "Reset password"]
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        let path = render_pdf(&payload, "Pdf Test", dir.path()).unwrap();
        assert!(path.ends_with("SRS_Pdf_Test.pdf"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_raw_text_payload() {
        let dir = tempfile::tempdir().unwrap();
        let payload = RequirementsPayload::RawText("Lots of free text.\nSecond line.".into());
        assert!(render_pdf(&payload, "Raw", dir.path()).is_some());
    }

    #[test]
    fn unwritable_directory_returns_none() {
        let payload = RequirementsPayload::Failed { error: "x".into() };
        // /proc is not writable; creation fails, rendering degrades to None.
        assert!(render_pdf(&payload, "P", Path::new("/proc/meetscribe-test")).is_none());
    }

    #[test]
    fn wrap_text_honors_column_limit() {
        let wrapped = wrap_text("one two three four five six seven", 10);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn wrap_text_keeps_long_words_whole() {
        let wrapped = wrap_text("supercalifragilisticexpialidocious", 10);
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn section_lines_shapes() {
        assert_eq!(section_lines(&json!("text")), vec!["text"]);
        assert_eq!(section_lines(&json!(["a"])), vec!["· a"]);
        let lines = section_lines(&json!({"load_time": "under 2s"}));
        assert_eq!(lines, vec!["Load Time: under 2s"]);
    }
}
