//! Webforge Core Library
//!
//! This crate provides the core functionality for Webforge, including:
//! - Commands (projects and files, chat transcript, settings, generation requests)
//! - Classification and routing of generated code into project files
//! - Preview composition and rendering surfaces
//! - Storage (SQLite-backed key-value records)
//! - LLM integration (OpenAI-compatible chat completions)
//! - The workbench tying the application state together

pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod preview;
pub mod storage;
pub mod workbench;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{
        AppSettings, ChatMessage, FileItem, FileType, MessageRole, Project, SendOutcome, Theme,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::preview::{FileSurface, MemorySurface, RenderSurface};
    pub use crate::storage::{Database, MemoryStore, SqliteStore};
    pub use crate::workbench::{SettingsUpdate, Workbench};
}
