//! Code generation requests
//!
//! A generation is split in three steps so several can be in flight at once:
//! the workbench records the prompt and an assistant placeholder, the request
//! runs against a cloned [`LlmClient`] without borrowing the workbench, and the
//! workbench finalizes the placeholder with the outcome.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::llm::LlmClient;

/// A generation that has been recorded but not yet finalized
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    /// Id of the assistant placeholder message
    pub message_id: String,
    /// Project that was active when the request began
    pub project_id: String,
    /// The user's prompt
    pub prompt: String,
    /// `Project: ..., Files: ...` line sent with the request
    pub context: String,
    client: LlmClient,
}

impl PendingGeneration {
    pub(crate) fn new(
        message_id: String,
        project_id: String,
        prompt: String,
        context: String,
        client: LlmClient,
    ) -> Self {
        Self {
            message_id,
            project_id,
            prompt,
            context,
            client,
        }
    }

    /// Call the generation service
    pub async fn run(&self) -> Result<String> {
        info!(
            message_id = %self.message_id,
            project_id = %self.project_id,
            model = %self.client.model(),
            "Generating code"
        );

        let code = self
            .client
            .generate_code(&self.prompt, Some(&self.context))
            .await?;

        debug!(message_id = %self.message_id, chars = code.len(), "Generation finished");
        Ok(code)
    }
}

/// Result of sending a chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// No credential is configured; nothing was recorded and the settings
    /// surface should be opened
    NeedsCredential,
    /// The assistant message holds the generated code
    Completed {
        message_id: String,
        /// File whose content was replaced, if the code was classified
        routed_to: Option<String>,
    },
    /// The assistant message holds an error indicator
    Failed {
        message_id: String,
        message: String,
        /// Reopen the settings surface after this delay
        reopen_settings_after: Option<Duration>,
    },
}

impl SendOutcome {
    /// Id of the assistant message, when one was recorded
    pub fn message_id(&self) -> Option<&str> {
        match self {
            SendOutcome::NeedsCredential => None,
            SendOutcome::Completed { message_id, .. } | SendOutcome::Failed { message_id, .. } => {
                Some(message_id)
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed { .. })
    }
}
