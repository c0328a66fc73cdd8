//! Prompt templates for captioning and requirement synthesis.

use super::types::FrameAnalysis;

/// Per-frame captioning instruction.
pub const CAPTION_PROMPT: &str = "\
Analyze this screenshot from a meeting recording. Describe what you see including:
- UI elements, screens, or app interfaces
- Diagrams, charts, or visual aids
- Text content visible
- Any features or functionality being shown
Be detailed and technical.";

/// System prompt for the synthesis call.
pub const SYNTHESIS_SYSTEM: &str =
    "You are an expert business analyst creating Software Requirements Specifications.";

/// Build the single synthesis prompt embedding the transcript and all frame
/// captions.
pub fn build_synthesis_prompt(transcript_text: &str, frame_analyses: &[FrameAnalysis]) -> String {
    let visual_context = frame_analyses
        .iter()
        .enumerate()
        .map(|(i, fa)| format!("Frame {}: {}", i + 1, fa.analysis))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are analyzing a meeting recording to create a Software Requirements Specification (SRS).

AUDIO TRANSCRIPT:
{transcript_text}

VISUAL CONTENT ANALYSIS:
{visual_context}

Based on the above meeting content, extract and organize the following:

1. PROJECT OVERVIEW
   - Project name/title
   - Purpose and objectives
   - Scope

2. FUNCTIONAL REQUIREMENTS
   - List all features and functionality mentioned
   - User stories or use cases
   - Specific capabilities required

3. NON-FUNCTIONAL REQUIREMENTS
   - Performance requirements
   - Security requirements
   - Usability requirements
   - Any other quality attributes

4. TECHNICAL REQUIREMENTS
   - Technologies mentioned
   - Platforms or frameworks
   - Integration requirements

5. ISSUES AND CONCERNS
   - Problems identified
   - Risks mentioned
   - Constraints

6. UI/UX REQUIREMENTS
   - Interface designs or mockups shown
   - User flow descriptions
   - Visual design requirements

Provide a comprehensive but concise analysis in JSON format."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_prompt_embeds_both_contexts() {
        let frames = vec![
            FrameAnalysis {
                index: 0,
                frame: "a.jpg".into(),
                analysis: "login form screenshot".into(),
            },
            FrameAnalysis {
                index: 5,
                frame: "b.jpg".into(),
                analysis: "dashboard mockup".into(),
            },
        ];
        let prompt = build_synthesis_prompt("Build a login page", &frames);
        assert!(prompt.contains("AUDIO TRANSCRIPT:\nBuild a login page"));
        assert!(prompt.contains("Frame 1: login form screenshot"));
        assert!(prompt.contains("Frame 2: dashboard mockup"));
        assert!(prompt.contains("FUNCTIONAL REQUIREMENTS"));
        assert!(prompt.contains("JSON format"));
    }

    #[test]
    fn synthesis_prompt_with_no_frames_is_still_complete() {
        let prompt = build_synthesis_prompt("short meeting", &[]);
        assert!(prompt.contains("VISUAL CONTENT ANALYSIS:"));
        assert!(prompt.contains("UI/UX REQUIREMENTS"));
    }
}
