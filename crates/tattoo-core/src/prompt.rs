//! Prompt assembly for the tattoo overlay model.
//!
//! The prompt is a fixed preamble, one line per non-empty style field, and a
//! fixed pair of closing instructions. Line order is significant: the model
//! reads the reference description before the theme so the theme can be
//! phrased as a supplement to it.

const PREAMBLE: [&str; 4] = [
    "You generate images of tattoos overlayed on skin of submitted images.",
    "Based on the provided input data, create a tattoo design that fits naturally on the body part shown.",
    "Input data:",
    "- Photo: An attached image of a body part (can be a hand, arm, leg, face, etc.)",
];

const REFERENCE_LINE: &str = "- Reference Image: An attached image that serves as the inspiration for the tattoo design. Use it as the primary reference for style/subject where appropriate.";

const CLOSING: [&str; 3] = [
    "",
    "Do not generate any text in your response. Your response should only consist of a generated image.",
    "Do not modify the original image except to add the tattoo design.",
];

/// Textual form fields that shape the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFields {
    pub theme: String,
    pub style: String,
    pub color_mode: String,
    pub physical_attributes: String,
    /// Whether the caller uploaded a reference image.
    pub has_reference: bool,
}

/// Build the newline-joined prompt for `fields`.
///
/// Empty fields are omitted; nothing here can fail.
pub fn build_prompt(fields: &PromptFields) -> String {
    prompt_lines(fields).join("\n")
}

fn prompt_lines(fields: &PromptFields) -> Vec<String> {
    let mut lines: Vec<String> = PREAMBLE.iter().map(|l| (*l).to_owned()).collect();

    if fields.has_reference {
        lines.push(REFERENCE_LINE.to_owned());
    }

    if !fields.theme.is_empty() {
        if fields.has_reference {
            lines.push(format!(
                "- Theme (supplementary details for the tattoo based off the chosen reference image): {}",
                fields.theme
            ));
        } else {
            lines.push(format!(
                "- Theme (general description of tattoo): {}",
                fields.theme
            ));
        }
    }
    if !fields.style.is_empty() {
        lines.push(format!("- Style (artistic style of tattoo): {}", fields.style));
    }
    if !fields.color_mode.is_empty() {
        lines.push(format!(
            "- Color Mode (examples: black and white, rainbow color, monochrome, etc.): {}",
            fields.color_mode
        ));
    }
    if !fields.physical_attributes.is_empty() {
        lines.push(format!(
            "- Physical Attributes (size/placement): {}",
            fields.physical_attributes
        ));
    }

    lines.extend(CLOSING.iter().map(|l| (*l).to_owned()));
    lines
}

// ── Tests ──────────────────────────────────────────────────────────────────────
