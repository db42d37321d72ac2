//! Workbench - application state and operations
//!
//! The workbench owns the settings, the project list, the active selection,
//! the chat transcript, the generation client and an optional preview surface.
//! Every operation persists what it changed to the key-value store and
//! re-renders the preview when the visible files changed. Persistence is
//! best-effort: a failed write is logged and the in-memory state is kept.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::classify_and_route;
use crate::commands::{
    AppSettings, ChatMessage, FileItem, FileType, PendingGeneration, Project, SendOutcome,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, project_context};
use crate::preview::{RenderSurface, compose_preview_document};
use crate::storage::{
    ACTIVE_FILE_KEY, ACTIVE_PROJECT_KEY, KeyValueStore, KeyValueStoreExt, MESSAGES_KEY,
    PROJECTS_KEY, SETTINGS_KEY,
};

const INTERRUPTED_TEXT: &str = "Generation was interrupted.";

/// Result of saving settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsUpdate {
    /// The credential changed, so the client was rebuilt (or dropped)
    pub client_reinitialized: bool,
}

/// The application state
pub struct Workbench<S: KeyValueStore> {
    store: S,
    config: Config,
    settings: AppSettings,
    projects: Vec<Project>,
    active_project_id: String,
    active_file_id: Option<String>,
    messages: Vec<ChatMessage>,
    client: Option<LlmClient>,
    surface: Option<Box<dyn RenderSurface>>,
}

impl<S: KeyValueStore> std::fmt::Debug for Workbench<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("projects", &self.projects.len())
            .field("active_project_id", &self.active_project_id)
            .field("active_file_id", &self.active_file_id)
            .field("messages", &self.messages.len())
            .field("has_client", &self.client.is_some())
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

fn build_client(config: &Config, settings: &AppSettings) -> Option<LlmClient> {
    let api_key = config.llm.resolve_api_key(&settings.api_key)?;
    match LlmClient::new(config.llm.clone(), api_key) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!(error = %e, "Could not initialise the generation client");
            None
        }
    }
}

fn first_file_id(project: &Project) -> Option<String> {
    project.files.first().map(|f| f.id.clone())
}

impl<S: KeyValueStore> Workbench<S> {
    /// Load the persisted state, falling back to defaults for anything missing
    pub async fn load(store: S, config: Config) -> Result<Self> {
        let settings: AppSettings = store.get_or(SETTINGS_KEY, AppSettings::default()).await?;

        let mut projects: Vec<Project> = store
            .get_or(PROJECTS_KEY, vec![Project::default_project()])
            .await?;
        projects.retain(|p| {
            if p.files.is_empty() {
                warn!(project_id = %p.id, "Dropping stored project without files");
            }
            !p.files.is_empty()
        });
        if projects.is_empty() {
            projects.push(Project::default_project());
        }

        let mut messages: Vec<ChatMessage> = store.get_or(MESSAGES_KEY, Vec::new()).await?;
        for message in messages.iter_mut().filter(|m| m.is_generating) {
            message.fail(INTERRUPTED_TEXT);
        }

        let stored_project: Option<String> = store.get_or(ACTIVE_PROJECT_KEY, None).await?;
        let stored_file: Option<String> = store.get_or(ACTIVE_FILE_KEY, None).await?;

        let active = stored_project
            .and_then(|id| projects.iter().find(|p| p.id == id))
            .unwrap_or(&projects[0]);
        let active_project_id = active.id.clone();
        let active_file_id = stored_file
            .filter(|id| active.file(id).is_some())
            .or_else(|| first_file_id(active));

        let client = build_client(&config, &settings);

        info!(
            projects = projects.len(),
            messages = messages.len(),
            active_project = %active_project_id,
            has_client = client.is_some(),
            "Workbench loaded"
        );

        Ok(Self {
            store,
            config,
            settings,
            projects,
            active_project_id,
            active_file_id,
            messages,
            client,
            surface: None,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The generation client, present when a credential is configured
    pub fn client(&self) -> Option<&LlmClient> {
        self.client.as_ref()
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_project(&self) -> &Project {
        self.project(&self.active_project_id).unwrap_or(&self.projects[0])
    }

    pub fn active_file(&self) -> Option<&FileItem> {
        let id = self.active_file_id.as_deref()?;
        self.active_project().file(id)
    }

    fn active_project_mut(&mut self) -> Result<&mut Project> {
        let id = self.active_project_id.clone();
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Error::ProjectNotFound(id))
    }

    // ========== Persistence ==========

    async fn persist<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.store.set(key, value).await {
            warn!(key, error = %e, "Failed to persist state");
        }
    }

    async fn persist_projects(&self) {
        self.persist(PROJECTS_KEY, &self.projects).await;
    }

    async fn persist_selection(&self) {
        self.persist(ACTIVE_PROJECT_KEY, &self.active_project_id).await;
        self.persist(ACTIVE_FILE_KEY, &self.active_file_id).await;
    }

    async fn persist_messages(&self) {
        self.persist(MESSAGES_KEY, &self.messages).await;
    }

    // ========== Preview ==========

    /// The preview document for the active project
    pub fn preview_document(&self) -> String {
        compose_preview_document(&self.active_project().files)
    }

    /// Attach a surface and render the active project into it
    pub fn attach_surface(&mut self, surface: Box<dyn RenderSurface>) -> Result<()> {
        self.surface = Some(surface);
        self.refresh_preview()
    }

    /// Re-render the preview explicitly
    pub fn refresh_preview(&mut self) -> Result<()> {
        let document = self.preview_document();
        if let Some(surface) = self.surface.as_mut() {
            surface.replace_document(&document)?;
            debug!(bytes = document.len(), "Preview refreshed");
        }
        Ok(())
    }

    fn render_preview(&mut self) {
        if let Err(e) = self.refresh_preview() {
            warn!(error = %e, "Failed to render preview");
        }
    }

    // ========== Projects ==========

    /// Create a project seeded with a starter page and make it active
    pub async fn create_project(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".to_string()));
        }

        let project = Project::new(name);
        let id = project.id.clone();
        info!(project_id = %id, name, "Creating project");

        self.active_file_id = first_file_id(&project);
        self.active_project_id = id.clone();
        self.projects.push(project);

        self.persist_projects().await;
        self.persist_selection().await;
        self.render_preview();
        Ok(id)
    }

    /// Switch to another project; its first file becomes active
    pub async fn select_project(&mut self, id: &str) -> Result<()> {
        let project = self
            .project(id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        self.active_file_id = first_file_id(project);
        self.active_project_id = id.to_string();
        debug!(project_id = id, "Project selected");

        self.persist_selection().await;
        self.render_preview();
        Ok(())
    }

    /// Delete a project; the last remaining project cannot be deleted
    pub async fn delete_project(&mut self, id: &str) -> Result<Project> {
        let index = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        if self.projects.len() <= 1 {
            return Err(Error::LastProjectRemaining);
        }

        let removed = self.projects.remove(index);
        info!(project_id = id, name = %removed.name, "Project deleted");

        if self.active_project_id == id {
            let next = &self.projects[0];
            self.active_project_id = next.id.clone();
            self.active_file_id = first_file_id(next);
            self.persist_selection().await;
            self.render_preview();
        }

        self.persist_projects().await;
        Ok(removed)
    }

    pub async fn rename_project(&mut self, id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name must not be empty".to_string()));
        }

        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;
        project.rename(name);

        self.persist_projects().await;
        Ok(())
    }

    // ========== Files ==========

    /// Add the next missing file type to the active project and select it
    pub async fn create_file(&mut self) -> Result<String> {
        let file = self.active_project().next_new_file();
        self.add_file(file).await
    }

    /// Add a file with an explicit type and name to the active project
    pub async fn create_file_of(&mut self, file_type: FileType, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("File name must not be empty".to_string()));
        }
        self.add_file(FileItem::new(file_type, name, "")).await
    }

    async fn add_file(&mut self, file: FileItem) -> Result<String> {
        let id = file.id.clone();
        info!(file_id = %id, name = %file.name, file_type = %file.file_type, "Creating file");

        self.active_project_mut()?.add_file(file);
        self.active_file_id = Some(id.clone());

        self.persist_projects().await;
        self.persist_selection().await;
        Ok(id)
    }

    /// Delete a file of the active project; the last file cannot be deleted
    pub async fn delete_file(&mut self, id: &str) -> Result<FileItem> {
        let project = self.active_project_mut()?;
        let removed = project.remove_file(id)?;
        let fallback = first_file_id(project);
        info!(file_id = id, name = %removed.name, "File deleted");

        if self.active_file_id.as_deref() == Some(id) {
            self.active_file_id = fallback;
            self.persist_selection().await;
        }

        self.persist_projects().await;
        self.render_preview();
        Ok(removed)
    }

    pub async fn select_file(&mut self, id: &str) -> Result<()> {
        if self.active_project().file(id).is_none() {
            return Err(Error::FileNotFound(id.to_string()));
        }
        self.active_file_id = Some(id.to_string());
        self.persist_selection().await;
        Ok(())
    }

    /// Replace the content of a file of the active project
    pub async fn update_file(&mut self, id: &str, content: &str) -> Result<()> {
        self.active_project_mut()?.set_file_content(id, content)?;
        debug!(file_id = id, bytes = content.len(), "File updated");

        self.persist_projects().await;
        self.render_preview();
        Ok(())
    }

    // ========== Chat ==========

    /// Record the prompt and an assistant placeholder for a new generation.
    ///
    /// Fails with [`Error::MissingApiKey`] before recording anything when no
    /// credential is configured.
    pub async fn begin_generation(&mut self, prompt: &str) -> Result<PendingGeneration> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::InvalidInput("Prompt must not be empty".to_string()));
        }
        let client = self.client.clone().ok_or(Error::MissingApiKey)?;

        let project = self.active_project();
        let context = project_context(&project.name, project.file_names());
        let project_id = project.id.clone();

        let placeholder = ChatMessage::assistant_placeholder();
        let pending = PendingGeneration::new(
            placeholder.id.clone(),
            project_id,
            prompt.to_string(),
            context,
            client,
        );

        self.messages.push(ChatMessage::user(prompt));
        self.messages.push(placeholder);
        self.persist_messages().await;

        Ok(pending)
    }

    /// Finalize a generation with its result
    pub async fn finish_generation(
        &mut self,
        pending: PendingGeneration,
        result: Result<String>,
    ) -> SendOutcome {
        let message = self.messages.iter_mut().find(|m| m.id == pending.message_id);
        if message.is_none() {
            debug!(message_id = %pending.message_id, "Placeholder no longer in history");
        }

        let outcome = match result {
            Ok(code) => {
                if let Some(message) = message {
                    message.complete(code.clone());
                }

                let routed_to = match self.projects.iter_mut().find(|p| p.id == pending.project_id)
                {
                    Some(project) => classify_and_route(&code, project),
                    None => {
                        warn!(project_id = %pending.project_id, "Project deleted during generation, discarding code");
                        None
                    }
                };

                if routed_to.is_some() {
                    self.persist_projects().await;
                    if pending.project_id == self.active_project_id {
                        self.render_preview();
                    }
                }

                SendOutcome::Completed {
                    message_id: pending.message_id,
                    routed_to,
                }
            }
            Err(e) => {
                warn!(message_id = %pending.message_id, code = e.code(), error = %e, "Generation failed");
                let text = e.user_message();
                if let Some(message) = message {
                    message.fail(&text);
                }

                SendOutcome::Failed {
                    message_id: pending.message_id,
                    message: text,
                    reopen_settings_after: e.reopens_settings().then(|| {
                        Duration::from_millis(self.config.preview.settings_reopen_delay_ms)
                    }),
                }
            }
        };

        self.persist_messages().await;
        outcome
    }

    /// Send a prompt and apply the generated code
    pub async fn send_message(&mut self, prompt: &str) -> Result<SendOutcome> {
        let pending = match self.begin_generation(prompt).await {
            Ok(pending) => pending,
            Err(Error::MissingApiKey) => {
                info!("No API key configured, settings must be opened");
                return Ok(SendOutcome::NeedsCredential);
            }
            Err(e) => return Err(e),
        };

        let result = pending.run().await;
        Ok(self.finish_generation(pending, result).await)
    }

    /// Remove every chat message
    pub async fn clear_history(&mut self) {
        info!(messages = self.messages.len(), "Clearing chat history");
        self.messages.clear();
        self.persist_messages().await;
    }

    // ========== Settings ==========

    /// Replace the settings; the client is rebuilt only when the key changes
    pub async fn save_settings(&mut self, settings: AppSettings) -> Result<SettingsUpdate> {
        settings.validate()?;

        let client_reinitialized = self.settings.credential_changed(&settings);
        if client_reinitialized {
            self.client = build_client(&self.config, &settings);
            info!(has_client = self.client.is_some(), "Generation client reinitialised");
        }

        self.settings = settings;
        self.persist(SETTINGS_KEY, &self.settings).await;

        Ok(SettingsUpdate {
            client_reinitialized,
        })
    }
}
