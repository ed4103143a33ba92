//! Async coordinator over the workspace `Store`.
//!
//! Every operation dispatches an `Action` under the session lock, releases the lock and then
//! runs the returned effects against the sinks. Structural failures come back as `Err` before
//! any sink runs; sink failures are reported per sink and never roll the tree back.
//!
//! Writes to each sink are serialized. A persistence write sends the session's tree as it is
//! when the write starts, and a runtime file write sends the file's current content, so a slow
//! write started for an older tree can never land last.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;

use crate::kernel::completion::{CompletionOutcome, CompletionRequest, InlineCompletion};
use crate::kernel::effect::RuntimeOp;
use crate::kernel::hydration::decode_payload;
use crate::kernel::services::adapters::{RuntimeSync, RuntimeSyncError};
use crate::kernel::services::bus::{event_bus, EventReceiver, EventSender, SinkKind, StoreEvent};
use crate::kernel::services::ports::{
    cache_key, AsyncExecutor, CompletionService, ContentSource, EngineConfig, HydrationError,
    LocalCache, PersistenceError, PersistenceGateway, TemplateProvider,
};
use crate::kernel::store::PendingSave;
use crate::kernel::{Action, DispatchResult, Effect, Store, StoreError, WorkspaceSession};
use crate::models::{is_placeholder, FileId, FileNode, FolderNode, OpenFile, TreeError};

/// The collaborators an `ExplorerStore` writes through to.
#[derive(Clone)]
pub struct WorkspaceServices {
    pub persistence: Arc<dyn PersistenceGateway>,
    pub cache: Arc<dyn LocalCache>,
    pub source: Arc<dyn ContentSource>,
    pub templates: Arc<dyn TemplateProvider>,
    pub runtime: Arc<RuntimeSync>,
    pub executor: Arc<dyn AsyncExecutor>,
    pub completion: Option<Arc<dyn CompletionService>>,
}

impl WorkspaceServices {
    pub fn new(
        persistence: Arc<dyn PersistenceGateway>,
        cache: Arc<dyn LocalCache>,
        source: Arc<dyn ContentSource>,
        templates: Arc<dyn TemplateProvider>,
        runtime: Arc<RuntimeSync>,
        executor: Arc<dyn AsyncExecutor>,
    ) -> Self {
        Self {
            persistence,
            cache,
            source,
            templates,
            runtime,
            executor,
            completion: None,
        }
    }

    pub fn with_completion(mut self, service: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(service);
        self
    }
}

/// A sink write that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("runtime sync failed: {0}")]
    Runtime(#[from] RuntimeSyncError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl SinkError {
    pub fn kind(&self) -> SinkKind {
        match self {
            SinkError::Runtime(_) => SinkKind::Runtime,
            SinkError::Persistence(_) => SinkKind::Persistence,
        }
    }
}

/// Outcome of the two sinks behind a tree change. A sink with nothing to do reports `Ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    pub persistence: Result<(), PersistenceError>,
    pub runtime: Result<(), RuntimeSyncError>,
}

impl MutationReport {
    pub fn is_ok(&self) -> bool {
        self.persistence.is_ok() && self.runtime.is_ok()
    }

    pub fn failures(&self) -> Vec<SinkError> {
        sink_failures(&self.persistence, &self.runtime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Persisted,
    Template,
    /// Neither a persisted tree nor a template exists; the session has no tree.
    Empty,
    AlreadyLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub persistence: Result<(), PersistenceError>,
    pub runtime: Result<(), RuntimeSyncError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub file_id: FileId,
    pub path: String,
    pub runtime: Result<(), RuntimeSyncError>,
    pub persistence: Result<(), PersistenceError>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.persistence.is_ok() && self.runtime.is_ok()
    }

    pub fn failures(&self) -> Vec<SinkError> {
        sink_failures(&self.persistence, &self.runtime)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaveAllReport {
    /// Buffers with unsaved changes when `save_all` was called.
    pub attempted: usize,
    /// Saves that were refused or had at least one sink fail.
    pub failed: usize,
    pub reports: Vec<SaveReport>,
    pub errors: Vec<(FileId, StoreError)>,
}

fn sink_failures(
    persistence: &Result<(), PersistenceError>,
    runtime: &Result<(), RuntimeSyncError>,
) -> Vec<SinkError> {
    let mut failures = Vec::new();
    if let Err(err) = runtime {
        failures.push(SinkError::Runtime(err.clone()));
    }
    if let Err(err) = persistence {
        failures.push(SinkError::Persistence(err.clone()));
    }
    failures
}

struct SinkResults {
    persistence: Result<(), PersistenceError>,
    runtime: Result<(), RuntimeSyncError>,
}

enum RuntimeTask {
    Seed(Arc<FolderNode>),
    Apply(RuntimeOp),
}

struct Inner {
    store: Mutex<Store>,
    persist_gate: tokio::sync::Mutex<()>,
    runtime_gate: tokio::sync::Mutex<()>,
    services: WorkspaceServices,
    completion: Option<InlineCompletion>,
    bus: EventSender,
    config: EngineConfig,
}

/// Shared handle on one workspace session and its sinks. Clones share the same session.
#[derive(Clone)]
pub struct ExplorerStore {
    inner: Arc<Inner>,
}

impl ExplorerStore {
    pub fn new(services: WorkspaceServices, config: EngineConfig) -> (Self, EventReceiver) {
        let (bus, events) = event_bus();
        let completion = services
            .completion
            .clone()
            .map(|service| InlineCompletion::new(service, &config));
        let store = Self {
            inner: Arc::new(Inner {
                store: Mutex::new(Store::default()),
                persist_gate: tokio::sync::Mutex::new(()),
                runtime_gate: tokio::sync::Mutex::new(()),
                services,
                completion,
                bus,
                config,
            }),
        };
        (store, events)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn runtime(&self) -> &Arc<RuntimeSync> {
        &self.inner.services.runtime
    }

    /// Runs `f` against the current session under the lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&WorkspaceSession) -> R) -> R {
        f(self.inner.store.lock().state())
    }

    pub fn tree(&self) -> Option<Arc<FolderNode>> {
        self.with_session(|session| session.tree().cloned())
    }

    pub fn open_file_snapshot(&self, file_id: &FileId) -> Option<OpenFile> {
        self.with_session(|session| session.open_file(file_id).cloned())
    }

    pub fn open_files(&self) -> Vec<OpenFile> {
        self.with_session(|session| session.open_files().to_vec())
    }

    pub fn active_file_id(&self) -> Option<FileId> {
        self.with_session(|session| session.active_file_id().cloned())
    }

    fn dispatch(&self, action: Action) -> Result<DispatchResult, StoreError> {
        self.inner.store.lock().dispatch(action)
    }

    // ---- workspace lifecycle -------------------------------------------------------------

    /// Installs the tree of `workspace_id` from the persisted copy, else from its template.
    ///
    /// A no-op for a workspace that is already loaded with a non-empty tree. A generated tree
    /// is persisted right away so the template is used at most once.
    pub async fn load_workspace(&self, workspace_id: &str) -> Result<LoadReport, StoreError> {
        if self.inner.store.lock().is_loaded(workspace_id) {
            return Ok(already_loaded());
        }

        let persisted = self.inner.services.persistence.load(workspace_id).await?;
        let (tree, source) = match persisted {
            Some(tree) => (Some(tree), LoadSource::Persisted),
            None => match self.inner.services.templates.template_for(workspace_id).await? {
                Some(tree) => (Some(tree), LoadSource::Template),
                None => (None, LoadSource::Empty),
            },
        };

        let result = {
            let mut store = self.inner.store.lock();
            // another load may have finished while this one was awaiting
            if store.is_loaded(workspace_id) {
                return Ok(already_loaded());
            }
            store.dispatch(Action::InstallTree {
                workspace_id: workspace_id.to_string(),
                tree,
                persist: source == LoadSource::Template,
            })?
        };

        let sinks = self.execute(result.effects).await;
        tracing::info!(workspace_id, source = ?source, "workspace loaded");
        self.inner.bus.send(StoreEvent::WorkspaceLoaded {
            workspace_id: workspace_id.to_string(),
        });
        Ok(LoadReport {
            source,
            persistence: sinks.persistence,
            runtime: sinks.runtime,
        })
    }

    /// Drops the session (navigating away). The runtime stays booted.
    pub fn reset(&self) {
        let _ = self.dispatch(Action::Reset);
    }

    /// Tears the sandbox down; the next load boots a fresh one.
    pub async fn release_runtime(&self) -> Result<(), RuntimeSyncError> {
        self.inner.services.runtime.release().await
    }

    // ---- buffers -------------------------------------------------------------------------

    /// Opens `file` in a new tab, or activates its existing tab.
    ///
    /// Placeholder files are filled from the cache when it holds real content, otherwise their
    /// content is fetched in the background.
    pub fn open_file(&self, file: FileNode) -> Result<(), StoreError> {
        let needs_cache = {
            let store = self.inner.store.lock();
            let session = store.state();
            !session.is_open(&file.id)
                && session
                    .tree()
                    .and_then(|tree| tree.find_file(&file.id))
                    .map_or(is_placeholder(&file.content), |node| {
                        is_placeholder(&node.content)
                    })
        };
        let cached = if needs_cache {
            self.read_cache(&file.id)
        } else {
            None
        };

        let result = self.dispatch(Action::OpenFile { file, cached })?;
        self.run_local_effects(result.effects);
        Ok(())
    }

    /// Opens the file with `file_id` from the current tree.
    pub fn open_file_id(&self, file_id: &FileId) -> Result<(), StoreError> {
        let node = self
            .tree()
            .ok_or(StoreError::NoWorkspace)?
            .find_file(file_id)
            .map(|node| FileNode::clone(node))
            .ok_or_else(|| TreeError::NotFound(file_id.to_string()))?;
        self.open_file(node)
    }

    pub fn set_active_file(&self, file_id: &FileId) -> Result<bool, StoreError> {
        Ok(self
            .dispatch(Action::SetActiveFile(file_id.clone()))?
            .state_changed)
    }

    /// Replaces the buffer content and mirrors it into the cache. Returns whether it changed.
    pub fn update_buffer_content(
        &self,
        file_id: &FileId,
        content: impl Into<String>,
    ) -> Result<bool, StoreError> {
        let result = self.dispatch(Action::UpdateBufferContent {
            file_id: file_id.clone(),
            content: content.into(),
        })?;
        let changed = result.state_changed;
        if changed {
            // a pending suggestion was computed for text that no longer exists
            self.cancel_completion(file_id);
        }
        self.run_local_effects(result.effects);
        Ok(changed)
    }

    /// Closes a tab, discarding unsaved edits. Returns whether it had unsaved changes.
    pub fn close_file(&self, file_id: &FileId) -> Result<bool, StoreError> {
        let had_changes = {
            let mut store = self.inner.store.lock();
            let had_changes = store
                .state()
                .open_file(file_id)
                .ok_or_else(|| StoreError::FileNotOpen(file_id.clone()))?
                .has_unsaved_changes();
            store.dispatch(Action::CloseFile(file_id.clone()))?;
            had_changes
        };
        if let Some(completion) = &self.inner.completion {
            completion.forget(file_id);
        }
        if had_changes {
            tracing::debug!(file_id = %file_id, "closed buffer with unsaved changes");
        }
        Ok(had_changes)
    }

    /// Closes every tab. Returns the ids whose unsaved edits were discarded.
    pub fn close_all_files(&self) -> Vec<FileId> {
        let (closed, discarded) = {
            let mut store = self.inner.store.lock();
            let closed: Vec<FileId> = store
                .state()
                .open_files()
                .iter()
                .map(|buffer| buffer.id.clone())
                .collect();
            let discarded = store.state().dirty_file_ids();
            let _ = store.dispatch(Action::CloseAllFiles);
            (closed, discarded)
        };
        if let Some(completion) = &self.inner.completion {
            for file_id in &closed {
                completion.forget(file_id);
            }
        }
        discarded
    }

    // ---- structure -----------------------------------------------------------------------

    pub async fn add_file(
        &self,
        parent_path: &str,
        file: FileNode,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::AddFile {
            parent_path: parent_path.to_string(),
            file,
        })
        .await
    }

    pub async fn add_folder(
        &self,
        parent_path: &str,
        folder: FolderNode,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::AddFolder {
            parent_path: parent_path.to_string(),
            folder,
        })
        .await
    }

    /// Removes the file from the tree and the sandbox. An open buffer of it stays open.
    pub async fn delete_file(
        &self,
        parent_path: &str,
        file: &FileNode,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::DeleteFile {
            parent_path: parent_path.to_string(),
            file: file.clone(),
        })
        .await
    }

    pub async fn delete_folder(
        &self,
        parent_path: &str,
        folder_name: &str,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::DeleteFolder {
            parent_path: parent_path.to_string(),
            folder_name: folder_name.to_string(),
        })
        .await
    }

    pub async fn rename_file(
        &self,
        parent_path: &str,
        file: &FileNode,
        new_name: &str,
        new_extension: &str,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::RenameFile {
            parent_path: parent_path.to_string(),
            file: file.clone(),
            new_name: new_name.to_string(),
            new_extension: new_extension.to_string(),
        })
        .await
    }

    pub async fn rename_folder(
        &self,
        parent_path: &str,
        folder_name: &str,
        new_name: &str,
    ) -> Result<MutationReport, StoreError> {
        self.mutate(Action::RenameFolder {
            parent_path: parent_path.to_string(),
            folder_name: folder_name.to_string(),
            new_name: new_name.to_string(),
        })
        .await
    }

    async fn mutate(&self, action: Action) -> Result<MutationReport, StoreError> {
        let result = self.dispatch(action)?;
        let sinks = self.execute(result.effects).await;
        Ok(MutationReport {
            persistence: sinks.persistence,
            runtime: sinks.runtime,
        })
    }

    // ---- saving --------------------------------------------------------------------------

    /// Writes the buffer into the tree, the sandbox and the persisted copy.
    ///
    /// Both sinks are attempted. The buffer is marked saved only when persistence succeeded.
    pub async fn save(&self, file_id: &FileId) -> Result<SaveReport, StoreError> {
        let pending = self.inner.store.lock().begin_save(file_id)?;
        self.complete_save(pending).await
    }

    /// Saves every buffer with unsaved changes concurrently.
    pub async fn save_all(&self) -> SaveAllReport {
        let (pending, refused) = self.inner.store.lock().begin_save_all();
        let attempted = pending.len() + refused.len();

        let results = join_all(pending.into_iter().map(|save| self.complete_save(save))).await;

        let mut report = SaveAllReport {
            attempted,
            failed: refused.len(),
            reports: Vec::new(),
            errors: refused,
        };
        for result in results {
            match result {
                Ok(save) => {
                    if !save.is_ok() {
                        report.failed += 1;
                    }
                    report.reports.push(save);
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(error = %err, "save failed");
                }
            }
        }
        if report.failed > 0 {
            tracing::warn!(attempted, failed = report.failed, "save all finished with failures");
        }
        report
    }

    async fn complete_save(&self, pending: PendingSave) -> Result<SaveReport, StoreError> {
        let sinks = self.execute(pending.effects.clone()).await;
        let finished = self
            .inner
            .store
            .lock()
            .finish_save(&pending, sinks.persistence.is_ok());
        let saved = match finished {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(
                    file_id = %pending.file_id,
                    path = %pending.path,
                    runtime = ?sinks.runtime,
                    persistence = ?sinks.persistence,
                    error = %err,
                    "file left the tree while saving"
                );
                return Err(err);
            }
        };

        if saved {
            tracing::debug!(file_id = %pending.file_id, path = %pending.path, "file saved");
            self.inner.bus.send(StoreEvent::Saved {
                file_id: pending.file_id.clone(),
                path: pending.path.clone(),
            });
        }
        Ok(SaveReport {
            file_id: pending.file_id,
            path: pending.path,
            runtime: sinks.runtime,
            persistence: sinks.persistence,
        })
    }

    // ---- completion ----------------------------------------------------------------------

    /// Debounced inline suggestion for the buffer at byte offset `cursor`.
    ///
    /// Resolves `Empty` when no completion service is configured.
    pub async fn complete(
        &self,
        file_id: &FileId,
        cursor: usize,
    ) -> Result<CompletionOutcome, StoreError> {
        let request = self.with_session(|session| {
            session
                .open_file(file_id)
                .map(|buffer| CompletionRequest::from_buffer(buffer, cursor))
                .ok_or_else(|| StoreError::FileNotOpen(file_id.clone()))
        })?;
        let Some(completion) = &self.inner.completion else {
            return Ok(CompletionOutcome::Empty);
        };
        let edit_version = request.edit_version;
        let unchanged = || {
            self.with_session(|session| {
                session
                    .open_file(file_id)
                    .is_some_and(|buffer| buffer.edit_version() == edit_version)
            })
        };
        Ok(completion.request_checked(request, unchanged).await)
    }

    /// Invalidates a pending suggestion (cursor moved, buffer blurred).
    pub fn cancel_completion(&self, file_id: &FileId) {
        if let Some(completion) = &self.inner.completion {
            completion.cancel(file_id);
        }
    }

    // ---- effects -------------------------------------------------------------------------

    async fn execute(&self, effects: Vec<Effect>) -> SinkResults {
        let mut trees = Vec::new();
        let mut runtime = Vec::new();
        for effect in effects {
            match effect {
                Effect::Persist { workspace_id, tree } => trees.push((workspace_id, tree)),
                Effect::Runtime(op) => runtime.push(RuntimeTask::Apply(op)),
                Effect::SeedRuntime { tree } => runtime.push(RuntimeTask::Seed(tree)),
                local => self.run_local_effect(local),
            }
        }

        let (persistence, runtime) =
            tokio::join!(self.run_persistence(trees), self.run_runtime(runtime));
        SinkResults {
            persistence,
            runtime,
        }
    }

    async fn run_persistence(
        &self,
        trees: Vec<(String, Arc<FolderNode>)>,
    ) -> Result<(), PersistenceError> {
        for (workspace_id, snapshot) in trees {
            let _gate = self.inner.persist_gate.lock().await;
            let tree = self.latest_tree(&workspace_id).unwrap_or(snapshot);
            if let Err(err) = self.inner.services.persistence.save(&workspace_id, &tree).await {
                tracing::warn!(workspace_id = %workspace_id, error = %err, "persisting tree failed");
                self.inner.bus.send(StoreEvent::SinkFailed {
                    sink: SinkKind::Persistence,
                    message: err.to_string(),
                });
                return Err(err);
            }
        }
        Ok(())
    }

    async fn run_runtime(&self, tasks: Vec<RuntimeTask>) -> Result<(), RuntimeSyncError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let runtime = &self.inner.services.runtime;
        let _gate = self.inner.runtime_gate.lock().await;
        for task in tasks {
            let (path, result) = match task {
                RuntimeTask::Seed(tree) => (String::new(), runtime.seed(&tree).await),
                RuntimeTask::Apply(op) => {
                    let Some(op) = self.refresh_runtime_op(op) else {
                        continue;
                    };
                    (op.path().to_string(), runtime.apply(&op).await)
                }
            };
            if let Err(err) = result {
                tracing::warn!(path = %path, error = %err, "runtime sync failed");
                self.inner.bus.send(StoreEvent::SinkFailed {
                    sink: SinkKind::Runtime,
                    message: err.to_string(),
                });
                return Err(err);
            }
        }
        Ok(())
    }

    /// The session's tree, if the session still shows `workspace_id`.
    fn latest_tree(&self, workspace_id: &str) -> Option<Arc<FolderNode>> {
        let store = self.inner.store.lock();
        let session = store.state();
        if session.workspace_id() != Some(workspace_id) {
            return None;
        }
        session.tree().cloned()
    }

    /// Rebases a file write on the current tree: it carries the file's latest content, and is
    /// dropped when the path left the tree in the meantime.
    fn refresh_runtime_op(&self, op: RuntimeOp) -> Option<RuntimeOp> {
        let (path, content) = match op {
            RuntimeOp::WriteFile { path, content } => (path, content),
            other => return Some(other),
        };
        let store = self.inner.store.lock();
        let Some(tree) = store.state().tree() else {
            return Some(RuntimeOp::WriteFile { path, content });
        };
        match tree.file_at(&path) {
            Some(file) => Some(RuntimeOp::WriteFile {
                content: file.content.clone(),
                path,
            }),
            None => {
                tracing::debug!(path = %path, "skipping write to a path no longer in the tree");
                None
            }
        }
    }

    fn run_local_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_local_effect(effect);
        }
    }

    fn run_local_effect(&self, effect: Effect) {
        match effect {
            Effect::CacheWrite { file_id, content } => self.write_cache(&file_id, &content),
            Effect::Hydrate { file_id, locator } => self.spawn_hydration(file_id, locator),
            sink => {
                tracing::warn!(effect = ?sink, "sink effect outside an async operation dropped");
            }
        }
    }

    fn read_cache(&self, file_id: &FileId) -> Option<String> {
        let key = cache_key(&self.inner.config.cache_key_prefix, file_id);
        match self.inner.services.cache.get(&key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(file_id = %file_id, error = %err, "cache read failed");
                None
            }
        }
    }

    fn write_cache(&self, file_id: &FileId, content: &str) {
        let key = cache_key(&self.inner.config.cache_key_prefix, file_id);
        if let Err(err) = self.inner.services.cache.set(&key, content) {
            tracing::warn!(file_id = %file_id, error = %err, "cache write failed");
            self.inner.bus.send(StoreEvent::CacheWriteFailed {
                file_id: file_id.clone(),
                message: err.to_string(),
            });
        }
    }

    fn spawn_hydration(&self, file_id: FileId, locator: String) {
        tracing::debug!(file_id = %file_id, locator = %locator, "hydrating buffer");
        let this = self.clone();
        self.inner.services.executor.spawn(Box::pin(async move {
            let result = match this.inner.services.source.fetch(&locator).await {
                Ok(raw) => decode_payload(&raw),
                Err(err) => Err(err),
            };
            this.finish_hydration(file_id, result);
        }));
    }

    fn finish_hydration(&self, file_id: FileId, result: Result<String, HydrationError>) {
        let message = result.as_ref().err().map(ToString::to_string);
        let Ok(dispatched) = self.dispatch(Action::HydrationFinished {
            file_id: file_id.clone(),
            result,
        }) else {
            return;
        };
        if !dispatched.state_changed {
            return;
        }
        self.run_local_effects(dispatched.effects);
        let event = match message {
            Some(message) => StoreEvent::HydrationFailed { file_id, message },
            None => StoreEvent::BufferHydrated { file_id },
        };
        self.inner.bus.send(event);
    }
}

fn already_loaded() -> LoadReport {
    LoadReport {
        source: LoadSource::AlreadyLoaded,
        persistence: Ok(()),
        runtime: Ok(()),
    }
}
