//! Classification of generated code
//!
//! Generated text is matched against an ordered table of substring rules and
//! the first match decides its file type. The text then replaces the content
//! of the first project file of that type. Matching is plain substring search,
//! so a JavaScript snippet that builds `<div>` markup is classified as HTML.

use tracing::{debug, info};

use crate::commands::project::{FileType, Project};

/// One classification rule
pub struct ClassificationRule {
    /// Short name used in logs
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub file_type: FileType,
}

fn looks_like_html(text: &str) -> bool {
    ["<!DOCTYPE html>", "<html>", "<div>"]
        .iter()
        .any(|marker| text.contains(marker))
}

fn looks_like_css(text: &str) -> bool {
    text.contains('{')
        && ["color:", "background:", "margin:"]
            .iter()
            .any(|marker| text.contains(marker))
}

fn looks_like_javascript(text: &str) -> bool {
    ["function", "const", "let", "var"]
        .iter()
        .any(|marker| text.contains(marker))
}

/// Rules in priority order
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "html",
        matches: looks_like_html,
        file_type: FileType::Html,
    },
    ClassificationRule {
        name: "css",
        matches: looks_like_css,
        file_type: FileType::Css,
    },
    ClassificationRule {
        name: "javascript",
        matches: looks_like_javascript,
        file_type: FileType::Javascript,
    },
];

/// Classify generated text, or `None` when no rule matches
pub fn classify(text: &str) -> Option<FileType> {
    RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| {
            debug!(rule = rule.name, "Classified generated code");
            rule.file_type
        })
}

/// Classify `text` and write it into the first file of the matching type.
///
/// Returns the id of the updated file. Nothing changes when the text is not
/// classified or the project has no file of that type.
pub fn classify_and_route(text: &str, project: &mut Project) -> Option<String> {
    let file_type = classify(text)?;

    let Some(file_id) = project.first_of_type(file_type).map(|f| f.id.clone()) else {
        debug!(
            project_id = %project.id,
            file_type = %file_type,
            "No file of this type, discarding generated code"
        );
        return None;
    };

    project.set_file_content(&file_id, text).ok()?;
    info!(project_id = %project.id, file_id = %file_id, "Routed generated code");
    Some(file_id)
}
