//! Commands module - domain records and operations as library functions
//!
//! These are used by the workbench and the CLI.

pub mod chat;
pub mod generate;
pub mod project;
pub mod settings;

pub use chat::{ChatMessage, MessageRole};
pub use generate::{PendingGeneration, SendOutcome};
pub use project::{FileItem, FileType, Project};
pub use settings::{AppSettings, MAX_FONT_SIZE, MIN_FONT_SIZE, Theme};
