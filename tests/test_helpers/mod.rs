//! Shared fakes and fixtures for integration tests.

use async_trait::async_trait;
use atelier::provider::domain::{
    OperationHandle, PollStatus, ProviderError, ProviderFamily, ProviderId, ProviderResult,
};
use atelier::provider::ports::OperationProvider;
use atelier::task::domain::{GenerationPayload, Task};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

/// State of one operation on the fake remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteJob {
    Running,
    Done(String),
    Failed(String),
}

/// Remote create-then-poll service that outlives simulated restarts.
///
/// Operations stay running until a test finishes or fails them, unless
/// [`RemoteStudio::complete_new_operations`] was called.
pub struct RemoteStudio {
    id: ProviderId,
    jobs: Mutex<HashMap<OperationHandle, RemoteJob>>,
    auto_complete: Mutex<Option<String>>,
    submits: AtomicU32,
}

impl RemoteStudio {
    /// Creates a studio registered under `id`.
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id).unwrap_or_else(|err| panic!("invalid provider id: {err}")),
            jobs: Mutex::new(HashMap::new()),
            auto_complete: Mutex::new(None),
            submits: AtomicU32::new(0),
        })
    }

    /// Returns the provider id.
    pub fn provider_id(&self) -> ProviderId {
        self.id.clone()
    }

    /// Returns how many operations were submitted.
    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    /// Makes operations submitted from now on finish immediately.
    pub fn complete_new_operations(&self, url: &str) {
        *lock(&self.auto_complete) = Some(url.to_owned());
    }

    /// Finishes a running operation with output at `url`.
    pub fn finish(&self, handle: &OperationHandle, url: &str) {
        lock(&self.jobs).insert(handle.clone(), RemoteJob::Done(url.to_owned()));
    }

    /// Fails a running operation.
    pub fn fail(&self, handle: &OperationHandle, message: &str) {
        lock(&self.jobs).insert(handle.clone(), RemoteJob::Failed(message.to_owned()));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl OperationProvider for RemoteStudio {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn family(&self) -> ProviderFamily {
        ProviderFamily::Video
    }

    async fn submit(&self, _task: &Task) -> ProviderResult<OperationHandle> {
        let number = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = OperationHandle::new(format!("op-{number}"));
        let job = lock(&self.auto_complete)
            .clone()
            .map_or(RemoteJob::Running, RemoteJob::Done);
        lock(&self.jobs).insert(handle.clone(), job);
        Ok(handle)
    }

    async fn poll(&self, handle: &OperationHandle) -> ProviderResult<PollStatus> {
        match lock(&self.jobs).get(handle).cloned() {
            Some(RemoteJob::Running) => Ok(PollStatus::Pending {
                progress: Some("rendering".to_owned()),
            }),
            Some(RemoteJob::Done(url)) => Ok(PollStatus::Completed(GenerationPayload::from_url(url))),
            Some(RemoteJob::Failed(message)) => Err(ProviderError::fatal(message)),
            None => Err(ProviderError::fatal(format!("unknown operation {handle}"))),
        }
    }
}

/// Temporary directory with a UTF-8 path inside it.
pub struct ScratchDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ScratchDir {
    /// Creates a fresh scratch directory.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non UTF-8 temp path: {}", path.display()));
        Self { _temp: temp, root }
    }

    /// Returns a path below the scratch directory.
    pub fn join(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}
