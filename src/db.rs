//! The public database handle.
//!
//! [`GitDocumentDb`] binds the validator, codec, repository handle, task
//! queue, CRUD engine, and tree walker behind one object and owns the
//! lifecycle flags. Mutations are *eagerly enqueued*: calling `put` /
//! `insert` / `update` / `delete` validates and submits the task before
//! returning, and the returned future resolves with the outcome. Call order
//! therefore equals queue order, and awaiting is only needed for results.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use serde_json::Value;

use gitddb_git::{DocRepo, GitError, Identity};

use crate::codec::{self, Document, ID_PROPERTY};
use crate::crud::{self, PutMode, PutRequest};
use crate::error::{Error, Result};
use crate::queue::{TaskOutput, TaskQueue, TaskReceiver};
use crate::repository;
use crate::types::{
    AllDocsOptions, AllDocsResult, CloseOptions, DatabaseInfo, DatabaseOptions, DeleteOptions,
    DeleteResult, PutOptions, PutResult, TaskMetadata,
};
use crate::validate;
use crate::walker;

/// An embedded git-backed document database.
///
/// Every document is a JSON file under the working tree; every mutation is a
/// commit on `main`. The handle is cheaply cloneable and safe to share:
/// mutations are serialized through an internal FIFO queue, reads run
/// against the shared object database.
///
/// ```no_run
/// use gitddb::{DatabaseOptions, GitDocumentDb};
/// use serde_json::json;
///
/// # async fn example() -> gitddb::Result<()> {
/// let db = GitDocumentDb::new(DatabaseOptions::new("d1").local_dir("./data"))?;
/// db.open().await?;
///
/// let doc = json!({"name": "shirase"});
/// db.put("prof01", doc.as_object().expect("object")).await?;
/// let loaded = db.get("prof01").await?;
/// assert!(loaded.is_some());
///
/// db.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GitDocumentDb {
    inner: Arc<DbInner>,
}

struct DbInner {
    db_name: String,
    working_dir: PathBuf,
    identity: Identity,
    max_id_len: usize,
    /// True from the moment a close is requested until its future resolves.
    is_closing: AtomicBool,
    task_seq: AtomicU64,
    state: std::sync::Mutex<Option<OpenState>>,
}

/// Everything that exists only while the repository is open. The queue
/// lives exactly as long as the handle.
struct OpenState {
    repo: Arc<dyn DocRepo>,
    queue: Arc<TaskQueue>,
    info: DatabaseInfo,
}

impl GitDocumentDb {
    /// Create a handle from options. Validates the database name and the
    /// working-directory path; does not touch the filesystem.
    ///
    /// # Errors
    /// [`Error::UndefinedDatabaseName`] or
    /// [`Error::InvalidWorkingDirectoryPathLength`].
    pub fn new(options: DatabaseOptions) -> Result<Self> {
        validate::validate_db_name(&options.db_name)?;
        let working_dir = options.local_dir.join(&options.db_name);
        validate::validate_working_dir(&working_dir)?;

        Ok(Self {
            inner: Arc::new(DbInner {
                db_name: options.db_name,
                working_dir,
                identity: options.identity,
                max_id_len: options.max_document_id_length,
                is_closing: AtomicBool::new(false),
                task_seq: AtomicU64::new(0),
                state: std::sync::Mutex::new(None),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open (or create) the repository and start the mutation queue.
    ///
    /// Idempotent: opening an already-open handle returns the cached
    /// [`DatabaseInfo`].
    ///
    /// # Errors
    /// [`Error::DatabaseClosing`] while a close is in flight; otherwise the
    /// repository open/init errors.
    pub async fn open(&self) -> Result<DatabaseInfo> {
        self.check_not_closing()?;
        if let Some(state) = self.inner.state.lock().expect("lock poisoned").as_ref() {
            return Ok(state.info.clone());
        }

        let working_dir = self.inner.working_dir.clone();
        let identity = self.inner.identity.clone();
        let (repo, info) =
            tokio::task::spawn_blocking(move || repository::open_or_init(&working_dir, &identity))
                .await
                .map_err(join_error)??;

        let mut state = self.inner.state.lock().expect("lock poisoned");
        if let Some(existing) = state.as_ref() {
            // Lost a concurrent open race; keep the first handle.
            return Ok(existing.info.clone());
        }
        *state = Some(OpenState {
            repo,
            queue: Arc::new(TaskQueue::start()),
            info: info.clone(),
        });
        Ok(info)
    }

    /// Close with default options (graceful, 10 s timeout).
    pub fn close(&self) -> impl Future<Output = Result<()>> + Send + use<> {
        self.close_with(&CloseOptions::default())
    }

    /// Drain (or force-stop) the queue and release the repository handle.
    ///
    /// The closing flag is set synchronously at this call, so every public
    /// call made before the returned future resolves fails with
    /// [`Error::DatabaseClosing`]. Closing a handle that is not open is a
    /// no-op.
    ///
    /// # Errors
    /// [`Error::DatabaseClosing`] when a close is already in flight;
    /// [`Error::DatabaseCloseTimeout`] when a graceful close exceeds its
    /// timeout (the queue still ends up closed).
    pub fn close_with(&self, options: &CloseOptions) -> impl Future<Output = Result<()>> + Send + use<> {
        let inner = self.inner.clone();
        let options = options.clone();

        let taken: Result<Option<OpenState>> = if inner.is_closing.swap(true, Ordering::SeqCst) {
            Err(Error::DatabaseClosing)
        } else {
            Ok(inner.state.lock().expect("lock poisoned").take())
        };

        async move {
            match taken {
                Err(e) => Err(e),
                Ok(None) => {
                    inner.is_closing.store(false, Ordering::SeqCst);
                    Ok(())
                }
                Ok(Some(state)) => {
                    let result = state.queue.close(options.force, options.timeout).await;
                    inner.is_closing.store(false, Ordering::SeqCst);
                    result
                }
            }
        }
    }

    /// Close the database, then recursively remove its working directory.
    ///
    /// Close errors propagate; filesystem errors during the removal are
    /// logged and swallowed.
    ///
    /// # Errors
    /// Whatever [`close`](Self::close) returns.
    pub async fn destroy(&self) -> Result<()> {
        self.close().await?;

        let working_dir = self.inner.working_dir.clone();
        match tokio::task::spawn_blocking(move || std::fs::remove_dir_all(&working_dir)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("failed to remove working directory during destroy: {e}");
            }
            Err(e) => {
                tracing::warn!("working-directory removal task failed: {e}");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The database name.
    #[must_use]
    pub fn db_name(&self) -> &str {
        &self.inner.db_name
    }

    /// The working directory (`<local_dir>/<db_name>`).
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.inner.working_dir
    }

    /// Whether the repository handle is present.
    #[must_use]
    pub fn is_opened(&self) -> bool {
        self.inner.state.lock().expect("lock poisoned").is_some()
    }

    /// Whether a close is currently in flight.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.inner.is_closing.load(Ordering::SeqCst)
    }

    /// Mutations accepted but not yet finished. Zero when closed.
    #[must_use]
    pub fn task_queue_length(&self) -> usize {
        self.inner
            .state
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map_or(0, |state| state.queue.len())
    }

    // -----------------------------------------------------------------------
    // Put / insert / update
    // -----------------------------------------------------------------------

    /// Create or overwrite the document at `id`.
    pub fn put(
        &self,
        id: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        self.put_with(id, doc, &PutOptions::default())
    }

    /// [`put`](Self::put) with an explicit commit message, task id, or
    /// enqueue callback.
    pub fn put_with(
        &self,
        id: &str,
        doc: &Document,
        options: &PutOptions,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(Some(id), doc, options, PutMode::Upsert, "put"))
    }

    /// [`put`](Self::put) taking the id from the body's `_id` property.
    ///
    /// Fails with [`Error::UndefinedDocumentId`] when `_id` is absent.
    pub fn put_doc(&self, doc: &Document) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(None, doc, &PutOptions::default(), PutMode::Upsert, "put"))
    }

    /// Create the document at `id`; the id must not exist yet.
    ///
    /// Fails with [`Error::SameIdExists`] otherwise.
    pub fn insert(
        &self,
        id: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        self.insert_with(id, doc, &PutOptions::default())
    }

    /// [`insert`](Self::insert) with options.
    pub fn insert_with(
        &self,
        id: &str,
        doc: &Document,
        options: &PutOptions,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(Some(id), doc, options, PutMode::Insert, "insert"))
    }

    /// [`insert`](Self::insert) taking the id from the body's `_id`.
    pub fn insert_doc(&self, doc: &Document) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(None, doc, &PutOptions::default(), PutMode::Insert, "insert"))
    }

    /// Overwrite the document at `id`; the id must already exist.
    ///
    /// Fails with [`Error::DocumentNotFound`] otherwise.
    pub fn update(
        &self,
        id: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        self.update_with(id, doc, &PutOptions::default())
    }

    /// [`update`](Self::update) with options.
    pub fn update_with(
        &self,
        id: &str,
        doc: &Document,
        options: &PutOptions,
    ) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(Some(id), doc, options, PutMode::Update, "update"))
    }

    /// [`update`](Self::update) taking the id from the body's `_id`.
    pub fn update_doc(&self, doc: &Document) -> impl Future<Output = Result<PutResult>> + Send + use<> {
        await_put(self.stage_put(None, doc, &PutOptions::default(), PutMode::Update, "update"))
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete the document at `id`.
    ///
    /// Fails with [`Error::DocumentNotFound`] when the document does not
    /// exist. The result's `file_oid` is the blob as it existed before the
    /// deletion.
    pub fn delete(&self, id: &str) -> impl Future<Output = Result<DeleteResult>> + Send + use<> {
        self.delete_with(id, &DeleteOptions::default())
    }

    /// [`delete`](Self::delete) with an explicit commit message, task id, or
    /// enqueue callback.
    pub fn delete_with(
        &self,
        id: &str,
        options: &DeleteOptions,
    ) -> impl Future<Output = Result<DeleteResult>> + Send + use<> {
        await_delete(self.stage_delete(Some(id), options))
    }

    /// [`delete`](Self::delete) taking the id from the body's `_id`.
    pub fn delete_doc(&self, doc: &Document) -> impl Future<Output = Result<DeleteResult>> + Send + use<> {
        let id = doc
            .get(ID_PROPERTY)
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        let staged = match id {
            Some(id) => self.stage_delete(Some(id.as_str()), &DeleteOptions::default()),
            None => Err(Error::UndefinedDocumentId),
        };
        await_delete(staged)
    }

    // -----------------------------------------------------------------------
    // Get / all_docs
    // -----------------------------------------------------------------------

    /// Read the document at `id` from HEAD. Returns `Ok(None)` when the
    /// document does not exist (including after a delete).
    ///
    /// # Errors
    /// Lifecycle and validation errors, or [`Error::InvalidJsonObject`] when
    /// the stored blob does not parse.
    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        self.get_back_number(id, 0).await
    }

    /// Read an older revision of the document at `id`.
    ///
    /// `back_number` counts commits in which the document changed along the
    /// first-parent chain: `0` is the current state, `1` the state at the
    /// previous change, and so on. A delete counts as a change and reads as
    /// `None`; so does an exhausted chain.
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub async fn get_back_number(&self, id: &str, back_number: usize) -> Result<Option<Document>> {
        self.check_not_closing()?;
        validate::validate_document_id(id, self.inner.max_id_len)?;
        let repo = self.repo_handle()?;

        let id = id.to_owned();
        tokio::task::spawn_blocking(move || {
            crud::execute_get_back_number(repo.as_ref(), &id, back_number)
        })
        .await
        .map_err(join_error)?
    }

    /// Enumerate documents reachable from HEAD.
    ///
    /// See [`AllDocsOptions`] for directory targeting, ordering, recursion,
    /// and document inclusion. Returns an empty result when the repository
    /// has no commits or the targeted sub-directory does not exist.
    ///
    /// # Errors
    /// Lifecycle errors, [`Error::InvalidCollectionPathCharacter`] for a bad
    /// `sub_directory`, or [`Error::InvalidJsonObject`] from `include_docs`.
    pub async fn all_docs(&self, options: &AllDocsOptions) -> Result<AllDocsResult> {
        self.check_not_closing()?;
        if let Some(dir) = options.sub_directory.as_deref() {
            validate::validate_sub_directory(dir)?;
        }
        let repo = self.repo_handle()?;

        let options = options.clone();
        tokio::task::spawn_blocking(move || walker::execute_all_docs(repo.as_ref(), &options))
            .await
            .map_err(join_error)?
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_not_closing(&self) -> Result<()> {
        if self.inner.is_closing.load(Ordering::SeqCst) {
            return Err(Error::DatabaseClosing);
        }
        Ok(())
    }

    fn repo_handle(&self) -> Result<Arc<dyn DocRepo>> {
        self.inner
            .state
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|state| state.repo.clone())
            .ok_or(Error::RepositoryNotOpen)
    }

    fn open_handles(&self) -> Result<(Arc<dyn DocRepo>, Arc<TaskQueue>)> {
        self.inner
            .state
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|state| (state.repo.clone(), state.queue.clone()))
            .ok_or(Error::RepositoryNotOpen)
    }

    fn next_task_id(&self) -> String {
        let n = self.inner.task_seq.fetch_add(1, Ordering::SeqCst);
        format!("task#{n:06}")
    }

    /// Validate, encode, and enqueue a put-shaped mutation. Runs entirely at
    /// call time so validation errors surface before the queue is involved
    /// and call order equals commit order.
    fn stage_put(
        &self,
        id: Option<&str>,
        doc: &Document,
        options: &PutOptions,
        mode: PutMode,
        label: &'static str,
    ) -> Result<TaskReceiver> {
        self.check_not_closing()?;

        let id = match id {
            Some(id) => id.to_owned(),
            None => doc
                .get(ID_PROPERTY)
                .and_then(Value::as_str)
                .ok_or(Error::UndefinedDocumentId)?
                .to_owned(),
        };
        validate::validate_document_id(&id, self.inner.max_id_len)?;
        codec::check_property_names(doc)?;
        let content = codec::serialize_document(doc, &id)?;

        let (repo, queue) = self.open_handles()?;
        let metadata = TaskMetadata {
            task_id: options.task_id.clone().unwrap_or_else(|| self.next_task_id()),
            label,
            target_id: id.clone(),
            enqueued_at: SystemTime::now(),
        };

        let identity = self.inner.identity.clone();
        let request = PutRequest {
            id,
            content,
            mode,
            commit_message: options.commit_message.clone(),
        };
        let receiver = queue.enqueue(
            metadata.clone(),
            Box::new(move || {
                crud::execute_put(repo.as_ref(), &identity, &request).map(TaskOutput::Put)
            }),
        )?;

        if let Some(callback) = &options.enqueue_callback {
            callback(&metadata);
        }
        Ok(receiver)
    }

    fn stage_delete(&self, id: Option<&str>, options: &DeleteOptions) -> Result<TaskReceiver> {
        self.check_not_closing()?;

        let id = id.ok_or(Error::UndefinedDocumentId)?.to_owned();
        validate::validate_document_id(&id, self.inner.max_id_len)?;

        let (repo, queue) = self.open_handles()?;
        let metadata = TaskMetadata {
            task_id: options.task_id.clone().unwrap_or_else(|| self.next_task_id()),
            label: "delete",
            target_id: id.clone(),
            enqueued_at: SystemTime::now(),
        };

        let identity = self.inner.identity.clone();
        let commit_message = options.commit_message.clone();
        let receiver = queue.enqueue(
            metadata.clone(),
            Box::new(move || {
                crud::execute_delete(repo.as_ref(), &identity, &id, commit_message.as_deref())
                    .map(TaskOutput::Delete)
            }),
        )?;

        if let Some(callback) = &options.enqueue_callback {
            callback(&metadata);
        }
        Ok(receiver)
    }
}

/// Await a staged put and unwrap its output.
fn await_put(
    staged: Result<TaskReceiver>,
) -> impl Future<Output = Result<PutResult>> + Send {
    async move {
        match staged?.await {
            Ok(Ok(TaskOutput::Put(result))) => Ok(result),
            Ok(Ok(TaskOutput::Delete(_))) => Err(mismatched_output()),
            Ok(Err(e)) => Err(e),
            // The worker dropped the reply: the queue was torn down.
            Err(_) => Err(Error::DatabaseClosing),
        }
    }
}

/// Await a staged delete and unwrap its output.
fn await_delete(
    staged: Result<TaskReceiver>,
) -> impl Future<Output = Result<DeleteResult>> + Send {
    async move {
        match staged?.await {
            Ok(Ok(TaskOutput::Delete(result))) => Ok(result),
            Ok(Ok(TaskOutput::Put(_))) => Err(mismatched_output()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::DatabaseClosing),
        }
    }
}

fn mismatched_output() -> Error {
    Error::Git(GitError::Backend {
        message: "task produced an output of the wrong kind".to_owned(),
    })
}

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Git(GitError::Backend {
        message: format!("blocking task failed: {e}"),
    })
}
