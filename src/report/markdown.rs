//! Markdown SRS rendering.
//!
//! Never fails on payload shape: unrecognized or missing sections become
//! placeholders, raw-text payloads get a dedicated section, failed
//! synthesis renders an explicit note.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::analysis::RequirementsPayload;

use super::{sanitize_project_name, title_case, value_text, RenderError, SECTIONS, SECTION_PLACEHOLDER};

/// Render the SRS as Markdown to `{out_dir}/SRS_{project}.md`.
pub fn render_markdown(
    payload: &RequirementsPayload,
    project_name: &str,
    out_dir: &Path,
) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(out_dir)?;

    let content = markdown_content(payload, project_name);
    let out_path = out_dir.join(format!("SRS_{}.md", sanitize_project_name(project_name)));
    std::fs::write(&out_path, content)?;

    tracing::info!(path = %out_path.display(), "Markdown SRS generated");
    Ok(out_path)
}

fn markdown_content(payload: &RequirementsPayload, project_name: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    let mut content = format!(
        "# Software Requirements Specification (SRS)\n\n\
         **Project:** {project_name}  \n\
         **Date Generated:** {timestamp}  \n\
         **Version:** 1.0\n\n\
         ---\n\n\
         ## 1. Introduction\n\n\
         This Software Requirements Specification (SRS) document was automatically \
         generated from a meeting recording. It combines audio transcription and \
         visual content analysis to extract project requirements.\n\n\
         ---\n\n"
    );

    for (i, &(heading, snake_key, upper_key)) in SECTIONS.iter().enumerate() {
        content.push_str(&format!("## {}. {heading}\n\n", i + 2));
        match payload.section(snake_key, upper_key) {
            Some(value) => content.push_str(&section_body(snake_key, value)),
            None => {
                content.push_str(SECTION_PLACEHOLDER);
                content.push_str("\n\n");
            }
        }
    }

    match payload {
        RequirementsPayload::RawText(text) => {
            content.push_str("---\n\n## Raw Analysis\n\n");
            content.push_str(text);
            content.push_str("\n\n");
        }
        RequirementsPayload::Failed { error } => {
            content.push_str("---\n\n## Synthesis Status\n\n");
            content.push_str(&format!(
                "Requirement synthesis failed and no analysis is available. Error: {error}\n\n"
            ));
        }
        RequirementsPayload::Structured(_) => {}
    }

    content.push_str(
        "---\n\n\
         ## Appendix\n\n\
         ### Document Information\n\n\
         - **Generated By:** meetscribe\n\
         - **Source:** Automated analysis of meeting video and audio\n\n\
         ### Notes\n\n\
         This document was automatically generated and should be reviewed and \
         refined by the project team.\n",
    );

    content
}

/// Render one recognized section's value.
fn section_body(snake_key: &str, value: &Value) -> String {
    let mut body = String::new();
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                body.push_str(&format!("**{}:** {}\n\n", title_case(key), value_text(val)));
            }
        }
        Value::Array(items) => {
            if snake_key == "functional_requirements" {
                for (i, item) in items.iter().enumerate() {
                    body.push_str(&format!("### FR-{:03}\n\n{}\n\n", i + 1, value_text(item)));
                }
            } else {
                for item in items {
                    body.push_str(&format!("- {}\n", value_text(item)));
                }
                body.push('\n');
            }
        }
        other => {
            body.push_str(&value_text(other));
            body.push_str("\n\n");
        }
    }
    if body.is_empty() {
        body.push_str(SECTION_PLACEHOLDER);
        body.push_str("\n\n");
    }
    body
}
