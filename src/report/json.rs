//! JSON artifact for downstream tooling.
//!
//! This is the one renderer that must always succeed: it only needs the
//! payload's own serialization, which every shape provides.

use std::path::{Path, PathBuf};

use crate::analysis::RequirementsPayload;

use super::{sanitize_project_name, RenderError};

/// Save the requirements payload to `{out_dir}/requirements_{project}.json`.
pub fn save_json(
    payload: &RequirementsPayload,
    project_name: &str,
    out_dir: &Path,
) -> Result<PathBuf, RenderError> {
    std::fs::create_dir_all(out_dir)?;

    let out_path = out_dir.join(format!(
        "requirements_{}.json",
        sanitize_project_name(project_name)
    ));
    let json =
        serde_json::to_string_pretty(payload).map_err(|e| RenderError::Serialize(e.to_string()))?;
    std::fs::write(&out_path, json)?;

    tracing::info!(path = %out_path.display(), "Requirements JSON saved");
    Ok(out_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn saves_every_payload_shape() {
        let dir = tempfile::tempdir().unwrap();
        let shapes = [
            RequirementsPayload::Structured(
                json!({"functional_requirements": ["login"]})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            RequirementsPayload::RawText("raw".into()),
            RequirementsPayload::Failed { error: "boom".into() },
        ];
        for (i, payload) in shapes.iter().enumerate() {
            let path = save_json(payload, &format!("p{i}"), dir.path()).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            let back: RequirementsPayload = serde_json::from_str(&text).unwrap();
            assert_eq!(&back, payload);
        }
    }

    #[test]
    fn file_name_follows_project_name() {
        let dir = tempfile::tempdir().unwrap();
        let payload = RequirementsPayload::RawText("x".into());
        let path = save_json(&payload, "My Meeting", dir.path()).unwrap();
        assert!(path.ends_with("requirements_My_Meeting.json"));
    }

    #[test]
    fn raw_text_file_contains_the_fallback_key() {
        let dir = tempfile::tempdir().unwrap();
        let payload = RequirementsPayload::RawText("free text".into());
        let path = save_json(&payload, "p", dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"raw_analysis\""));
    }
}
