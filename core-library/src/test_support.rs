//! In-memory bridge fakes shared by the unit tests of this crate.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Default)]
struct HttpState {
    responses: HashMap<String, (u16, Bytes)>,
    requests: Vec<String>,
    delay: Option<Duration>,
}

/// Serves canned responses by URL; unknown URLs fail at the transport level.
#[derive(Default)]
pub struct FakeHttpClient {
    state: Mutex<HttpState>,
}

impl FakeHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) {
        self.state
            .lock()
            .responses
            .insert(url.to_string(), (status, body.into()));
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|requested| requested.as_str() == url)
            .count()
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let (delay, canned) = {
            let mut state = self.state.lock();
            state.requests.push(request.url.clone());
            (state.delay, state.responses.get(&request.url).cloned())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match canned {
            Some((status, body)) => Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body,
            }),
            None => Err(BridgeError::OperationFailed(format!(
                "connection refused: {}",
                request.url
            ))),
        }
    }
}

/// File system held in a map, rooted at a fixed cache directory.
pub struct MemoryFileSystem {
    cache_dir: PathBuf,
    files: Mutex<HashMap<PathBuf, Bytes>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            cache_dir: PathBuf::from("/cache"),
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    pub fn contents(&self, path: &Path) -> Option<Bytes> {
        self.files.lock().get(path).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn get_cache_directory(&self) -> Result<PathBuf> {
        Ok(self.cache_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(path == self.cache_dir || self.files.lock().contains_key(path))
    }

    async fn create_dir_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        self.contents(path).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        self.files.lock().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        self.files.lock().remove(path);
        Ok(())
    }
}
