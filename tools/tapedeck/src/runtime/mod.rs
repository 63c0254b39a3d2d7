use crate::errors::{TapedeckError, TransportError};
use crate::types::{Request, Response};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[cfg(feature = "reqwest-client")]
pub mod reqwest_client;

/// Anything that turns a request into a response. Implemented by real
/// clients, by the dispatchers in [`crate::dispatcher`], and by test fakes.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: &Request) -> Result<Response, TransportError>;
}

pub trait FileSystem: Send + Sync {
    /// A missing file is reported as [`TapedeckError::NotFound`].
    fn read(&self, path: &Path) -> Result<Vec<u8>, TapedeckError>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), TapedeckError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), TapedeckError>;
    fn remove_file(&self, path: &Path) -> Result<(), TapedeckError>;
    fn exists(&self, path: &Path) -> bool;
    /// Files directly inside `path`. A missing directory is `NotFound`.
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TapedeckError>;

    fn read_to_string(&self, path: &Path) -> Result<String, TapedeckError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| TapedeckError::Io(e.to_string()))
    }
}

pub trait Terminal: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), TapedeckError>;
}

pub struct ProductionFileSystem;

fn io_error(path: &Path, error: std::io::Error) -> TapedeckError {
    if error.kind() == std::io::ErrorKind::NotFound {
        TapedeckError::NotFound(path.display().to_string())
    } else {
        TapedeckError::Io(format!("{}: {error}", path.display()))
    }
}

impl FileSystem for ProductionFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, TapedeckError> {
        std::fs::read(path).map_err(|e| io_error(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), TapedeckError> {
        std::fs::write(path, contents).map_err(|e| TapedeckError::Io(e.to_string()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), TapedeckError> {
        std::fs::create_dir_all(path).map_err(|e| TapedeckError::Io(e.to_string()))
    }

    fn remove_file(&self, path: &Path) -> Result<(), TapedeckError> {
        std::fs::remove_file(path).map_err(|e| io_error(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TapedeckError> {
        let entries = std::fs::read_dir(path).map_err(|e| io_error(path, e))?;
        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect())
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_line(&self, line: &str) -> Result<(), TapedeckError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| TapedeckError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    writes: Arc<Mutex<Vec<PathBuf>>>,
    fail_next: Arc<Mutex<Option<TapedeckError>>>,
    read_only: Arc<Mutex<bool>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
        fs
    }

    pub fn set_fail_next(&self, error: TapedeckError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    /// Every write and directory creation fails until cleared.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.lock().expect("read only lock") = read_only;
    }

    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().expect("files lock").get(path).cloned()
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }

    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().expect("writes lock").clone()
    }

    fn maybe_fail(&self) -> Result<(), TapedeckError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }

    fn check_writable(&self, path: &Path) -> Result<(), TapedeckError> {
        if *self.read_only.lock().expect("read only lock") {
            return Err(TapedeckError::Io(format!(
                "read-only file system: {}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, TapedeckError> {
        self.maybe_fail()?;
        self.file(path)
            .ok_or_else(|| TapedeckError::NotFound(path.display().to_string()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), TapedeckError> {
        self.maybe_fail()?;
        self.check_writable(path)?;
        self.writes
            .lock()
            .expect("writes lock")
            .push(path.to_path_buf());
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), TapedeckError> {
        self.maybe_fail()?;
        self.check_writable(path)?;
        self.dirs
            .lock()
            .expect("dirs lock")
            .push(path.to_path_buf());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), TapedeckError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| TapedeckError::NotFound(path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>, TapedeckError> {
        self.maybe_fail()?;
        let files = self.files.lock().expect("files lock");
        let listed = files
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect::<Vec<_>>();
        let known_dir = self.dirs.lock().expect("dirs lock").iter().any(|d| d == path);
        if listed.is_empty() && !known_dir {
            return Err(TapedeckError::NotFound(path.display().to_string()));
        }
        Ok(listed)
    }
}

#[derive(Default, Clone)]
pub struct FakeHttpClient {
    responses: Arc<Mutex<Vec<Result<Response, String>>>>,
    calls: Arc<Mutex<Vec<Request>>>,
}

impl FakeHttpClient {
    /// Queue a response. Its `request` field is replaced by the request that
    /// consumes it.
    pub fn push_response(&self, response: Response) {
        self.responses
            .lock()
            .expect("responses lock")
            .push(Ok(response));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push(Err(message.into()));
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl HttpClient for FakeHttpClient {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        let mut responses = self.responses.lock().expect("responses lock");
        if responses.is_empty() {
            return Err(TransportError::new(request, "no fake response queued"));
        }
        match responses.remove(0) {
            Ok(response) => Ok(Response {
                request: request.clone(),
                ..response
            }),
            Err(message) => Err(TransportError::new(request, message)),
        }
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_line(&self, line: &str) -> Result<(), TapedeckError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }
}
