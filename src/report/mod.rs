pub mod json;
pub mod markdown;
pub mod pdf;

pub use json::*;
pub use markdown::*;
pub use pdf::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// The recognized requirement sections, in document order:
/// (heading, snake_case key, prompt's UPPER-CASE key).
pub const SECTIONS: &[(&str, &str, &str)] = &[
    ("Project Overview", "project_overview", "PROJECT OVERVIEW"),
    (
        "Functional Requirements",
        "functional_requirements",
        "FUNCTIONAL REQUIREMENTS",
    ),
    (
        "Non-Functional Requirements",
        "non_functional_requirements",
        "NON-FUNCTIONAL REQUIREMENTS",
    ),
    (
        "Technical Requirements",
        "technical_requirements",
        "TECHNICAL REQUIREMENTS",
    ),
    ("UI/UX Requirements", "ui_ux_requirements", "UI/UX REQUIREMENTS"),
    ("Issues and Concerns", "issues_and_concerns", "ISSUES AND CONCERNS"),
];

/// Placeholder rendered for a section the payload doesn't cover.
pub const SECTION_PLACEHOLDER: &str = "*To be determined based on meeting analysis.*";

/// Artifact-safe file-name fragment for a project name.
pub fn sanitize_project_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// `snake_case_key` → `Snake Case Key`.
pub fn title_case(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flatten an arbitrary JSON value to display text.
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        serde_json::Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
