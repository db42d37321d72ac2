//! Projects and their files
//!
//! A project is an ordered list of editable files (insertion order is tab
//! order). A project always keeps at least one file, and every content or
//! membership change refreshes `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of source held by a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Css,
    Javascript,
    Typescript,
}

impl FileType {
    /// Types offered, in order, when a new file is added to a project
    pub const CREATABLE: [FileType; 3] = [FileType::Html, FileType::Css, FileType::Javascript];

    /// Convert to string for storage and display
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Javascript => "javascript",
            FileType::Typescript => "typescript",
        }
    }

    /// Parse from a type name or a file extension
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "html" | "htm" => Some(FileType::Html),
            "css" => Some(FileType::Css),
            "javascript" | "js" => Some(FileType::Javascript),
            "typescript" | "ts" => Some(FileType::Typescript),
            _ => None,
        }
    }

    /// Guess the type of a file from its name
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.rsplit_once('.').and_then(|(_, ext)| Self::parse(ext))
    }

    /// File extension used for new files of this type
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Javascript => "js",
            FileType::Typescript => "ts",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One editable source file of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    /// Unique file identifier within the project
    pub id: String,
    /// Display name (e.g. "index.html")
    pub name: String,
    /// Raw text content
    pub content: String,
    /// Kind of source
    #[serde(rename = "type")]
    pub file_type: FileType,
}

impl FileItem {
    /// Create a new file with a generated id
    pub fn new(file_type: FileType, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("{}-{}", file_type.as_str(), Uuid::new_v4().simple()),
            name: name.into(),
            content: content.into(),
            file_type,
        }
    }

    /// Create a file with an explicit id
    pub fn with_id(
        id: impl Into<String>,
        file_type: FileType,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            file_type,
        }
    }
}

/// A named collection of files representing one workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project identifier
    pub id: String,
    /// Project name
    pub name: String,
    /// Files in tab order
    pub files: Vec<FileItem>,
    /// When the project was created
    pub created_at: DateTime<Utc>,
    /// When the project or one of its files was last changed
    pub updated_at: DateTime<Utc>,
}

const STARTER_HTML: &str = "<!DOCTYPE html>
<html>
<head>
    <title>New Project</title>
</head>
<body>
    <h1>New Project</h1>
</body>
</html>";

const DEFAULT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>My Project</title>
</head>
<body>
    <div class="container">
        <h1>Welcome to Webforge</h1>
        <p>Start building your page with the help of AI!</p>
    </div>
</body>
</html>"#;

const DEFAULT_CSS: &str = "body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0;
    padding: 0;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    min-height: 100vh;
    display: flex;
    align-items: center;
    justify-content: center;
}

.container {
    background: white;
    padding: 2rem;
    border-radius: 10px;
    box-shadow: 0 10px 30px rgba(0, 0, 0, 0.2);
    text-align: center;
    max-width: 500px;
}

h1 {
    color: #333;
    margin-bottom: 1rem;
}

p {
    color: #666;
    line-height: 1.6;
}";

impl Project {
    /// Create a new project seeded with a starter `index.html`
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            files: vec![FileItem::with_id(
                "html-1",
                FileType::Html,
                "index.html",
                STARTER_HTML,
            )],
            created_at: now,
            updated_at: now,
        }
    }

    /// The project shown on first launch
    pub fn default_project() -> Self {
        let now = Utc::now();
        Self {
            id: "default".to_string(),
            name: "My First Project".to_string(),
            files: vec![
                FileItem::with_id("html-1", FileType::Html, "index.html", DEFAULT_HTML),
                FileItem::with_id("css-1", FileType::Css, "style.css", DEFAULT_CSS),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh the modification time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Look up a file by id
    pub fn file(&self, id: &str) -> Option<&FileItem> {
        self.files.iter().find(|f| f.id == id)
    }

    /// First file of the given type, in tab order
    pub fn first_of_type(&self, file_type: FileType) -> Option<&FileItem> {
        self.files.iter().find(|f| f.file_type == file_type)
    }

    /// File names in tab order
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }

    /// Build the next file to add: the first creatable type not yet present,
    /// otherwise another JavaScript file
    pub fn next_new_file(&self) -> FileItem {
        let file_type = FileType::CREATABLE
            .into_iter()
            .find(|t| self.first_of_type(*t).is_none())
            .unwrap_or(FileType::Javascript);

        FileItem::new(file_type, format!("new.{}", file_type.extension()), "")
    }

    /// Append a file
    pub fn add_file(&mut self, file: FileItem) {
        self.files.push(file);
        self.touch();
    }

    /// Replace a file's content wholesale
    pub fn set_file_content(&mut self, id: &str, content: impl Into<String>) -> Result<()> {
        let file = self
            .files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;

        file.content = content.into();
        self.touch();
        Ok(())
    }

    /// Remove a file; refused when it is the last one
    pub fn remove_file(&mut self, id: &str) -> Result<FileItem> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;

        if self.files.len() <= 1 {
            return Err(Error::LastFileRemaining);
        }

        let removed = self.files.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Rename the project
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }
}
