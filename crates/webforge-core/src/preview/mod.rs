//! Live preview
//!
//! Composes the project's first HTML, CSS and JavaScript files into a single
//! self-contained document and hands it to a [`RenderSurface`]. TypeScript
//! files are never rendered.

pub mod surface;

pub use surface::{FileSurface, HOST_FILE, MemorySurface, PREVIEW_FILE, RenderSurface};

use crate::commands::project::{FileItem, FileType};

const DOCTYPE: &str = "<!DOCTYPE html>";

/// Shown in place of the page when the project has no HTML content
pub const PLACEHOLDER_HTML: &str = r#"<div style="padding: 20px; text-align: center; color: #64748b;"><h2>No HTML content</h2><p>Add HTML code to see the preview</p></div>"#;

fn first_non_empty(files: &[FileItem], file_type: FileType) -> Option<&str> {
    files
        .iter()
        .find(|f| f.file_type == file_type)
        .map(|f| f.content.as_str())
        .filter(|content| !content.is_empty())
}

/// Build the preview document for a project's files.
///
/// The style element goes before the first `</head>`, or into a new head after
/// the first `<html>`, or into a head/body wrapper. The script element goes
/// before the first `</body>` or at the end. A result without a doctype is
/// replaced by a canonical skeleton built from the untouched sources.
pub fn compose_preview_document(files: &[FileItem]) -> String {
    let html = first_non_empty(files, FileType::Html);
    let style = first_non_empty(files, FileType::Css).map(|css| format!("<style>{}</style>", css));
    let script = first_non_empty(files, FileType::Javascript)
        .map(|js| format!("<script>{}</script>", js));

    let mut document = html.unwrap_or(PLACEHOLDER_HTML).to_string();

    if let Some(style) = &style {
        document = if document.contains("</head>") {
            document.replacen("</head>", &format!("{}</head>", style), 1)
        } else if document.contains("<html>") {
            document.replacen("<html>", &format!("<html><head>{}</head>", style), 1)
        } else {
            format!("<head>{}</head><body>{}</body>", style, document)
        };
    }

    if let Some(script) = &script {
        if document.contains("</body>") {
            document = document.replacen("</body>", &format!("{}</body>", script), 1);
        } else {
            document.push_str(script);
        }
    }

    if document.contains(DOCTYPE) {
        return document;
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Preview</title>
    {style}
</head>
<body>
    {body}
    {script}
</body>
</html>"#,
        style = style.as_deref().unwrap_or(""),
        body = html.unwrap_or(PLACEHOLDER_HTML),
        script = script.as_deref().unwrap_or(""),
    )
}
