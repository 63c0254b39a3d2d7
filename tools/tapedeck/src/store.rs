//! Request-keyed record storage: one `<fingerprint>.http` file per request,
//! flat under a single root directory.

use crate::codec;
use crate::errors::TapedeckError;
use crate::fingerprint::{decode_fingerprint, fingerprint_request};
use crate::runtime::FileSystem;
use crate::types::{Request, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const RECORD_EXTENSION: &str = "http";

/// A record found on disk, with the request recovered from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub path: PathBuf,
    pub fingerprint: String,
    pub request: Request,
}

#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, request: &Request) -> PathBuf {
        self.root
            .join(format!("{}.{RECORD_EXTENSION}", fingerprint_request(request)))
    }

    /// Writes `response` as the record for `request`, replacing any existing
    /// record. Returns the path written.
    pub fn save(&self, request: &Request, response: &Response) -> Result<PathBuf, TapedeckError> {
        self.fs.create_dir_all(&self.root)?;
        let path = self.path_for(request);
        self.fs.write(&path, &codec::serialize(response))?;
        Ok(path)
    }

    /// A missing record is [`TapedeckError::NotFound`]; a record that does not
    /// parse surfaces the codec error.
    pub fn load(&self, request: &Request) -> Result<Response, TapedeckError> {
        let bytes = self.fs.read(&self.path_for(request))?;
        codec::deserialize(&bytes, request)
    }

    pub fn contains(&self, request: &Request) -> bool {
        self.fs.exists(&self.path_for(request))
    }

    pub fn remove(&self, request: &Request) -> Result<PathBuf, TapedeckError> {
        let path = self.path_for(request);
        self.fs.remove_file(&path)?;
        Ok(path)
    }

    /// All records under the root, sorted by file name. Files whose name is
    /// not a fingerprint are ignored; a root that does not exist yet is empty.
    pub fn entries(&self) -> Result<Vec<StoredEntry>, TapedeckError> {
        let files = match self.fs.list_dir(&self.root) {
            Ok(files) => files,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut entries = files
            .into_iter()
            .filter_map(|path| {
                if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?.to_string();
                let (method, url) = decode_fingerprint(&stem)?;
                Some(StoredEntry {
                    path,
                    fingerprint: stem,
                    request: Request::new(method, url),
                })
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::FileStore;
    use crate::errors::TapedeckError;
    use crate::runtime::{FakeFileSystem, ProductionFileSystem};
    use crate::types::{Request, Response};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn fake_store() -> (FileStore, FakeFileSystem) {
        let fs = FakeFileSystem::default();
        (FileStore::new("/records", Arc::new(fs.clone())), fs)
    }

    fn json_response(request: &Request) -> Response {
        Response::new(request.clone(), 200)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"a":1}"#)
    }

    #[test]
    fn path_for_uses_fingerprint_and_extension() {
        let (store, _) = fake_store();
        let path = store.path_for(&Request::get("https://example.com/x?q=1"));
        assert_eq!(
            path,
            PathBuf::from("/records/R0VUIGh0dHBzOi8vZXhhbXBsZS5jb20veD9xPTE.http")
        );
    }

    #[test]
    fn save_creates_root_and_writes_wire_format() {
        let (store, fs) = fake_store();
        let request = Request::get("https://example.com/x?q=1");
        let path = store.save(&request, &json_response(&request)).expect("save");

        assert_eq!(fs.created_dirs(), vec![PathBuf::from("/records")]);
        assert_eq!(
            fs.file(&path),
            Some(b"HTTP/1.1 200\r\nContent-Type: application/json\r\n\r\n{\"a\":1}".to_vec())
        );
    }

    #[test]
    fn save_overwrites_existing_record() {
        let (store, fs) = fake_store();
        let request = Request::get("https://example.com/");
        store
            .save(&request, &Response::new(request.clone(), 500))
            .expect("first");
        let path = store
            .save(&request, &Response::new(request.clone(), 200))
            .expect("second");
        assert_eq!(fs.file(&path), Some(b"HTTP/1.1 200\r\n\r\n".to_vec()));
        assert_eq!(store.load(&request).expect("load").status, 200);
    }

    #[test]
    fn save_propagates_directory_failure() {
        let (store, fs) = fake_store();
        fs.set_read_only(true);
        let request = Request::get("https://example.com/");
        let err = store
            .save(&request, &Response::new(request.clone(), 200))
            .expect_err("read only");
        assert!(matches!(err, TapedeckError::Io(_)));
        assert!(fs.writes().is_empty());
    }

    #[test]
    fn load_missing_record_is_not_found() {
        let (store, _) = fake_store();
        let err = store
            .load(&Request::get("https://example.com/none"))
            .expect_err("missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn load_propagates_malformed_record() {
        let request = Request::get("https://example.com/bad");
        let layout = FileStore::new("/records", Arc::new(FakeFileSystem::default()));
        let fs = FakeFileSystem::with_file(layout.path_for(&request), "garbage");
        let store = FileStore::new("/records", Arc::new(fs));
        let err = store.load(&request).expect_err("malformed");
        assert!(matches!(err, TapedeckError::MalformedMessage(_)));
    }

    #[test]
    fn load_binds_response_to_request() {
        let (store, _) = fake_store();
        let request = Request::get("https://example.com/x?q=1");
        store.save(&request, &json_response(&request)).expect("save");
        let loaded = store.load(&request).expect("load");
        assert_eq!(loaded, json_response(&request));
    }

    #[test]
    fn remove_and_contains_track_records() {
        let (store, _) = fake_store();
        let request = Request::new("DELETE", "https://example.com/a");
        assert!(!store.contains(&request));
        store
            .save(&request, &Response::new(request.clone(), 204))
            .expect("save");
        assert!(store.contains(&request));
        store.remove(&request).expect("remove");
        assert!(!store.contains(&request));
        assert!(store.remove(&request).expect_err("gone").is_not_found());
    }

    #[test]
    fn entries_recover_requests_and_skip_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path(), Arc::new(ProductionFileSystem));
        let a = Request::get("https://example.com/a");
        let b = Request::new("POST", "https://example.com/b?x=1");
        store.save(&a, &Response::new(a.clone(), 200)).expect("a");
        store.save(&b, &Response::new(b.clone(), 201)).expect("b");
        std::fs::write(dir.path().join("notes.txt"), "hi").expect("notes");
        std::fs::write(dir.path().join("not a fingerprint.http"), "hi").expect("foreign");

        let entries = store.entries().expect("entries");
        let mut requests = entries.into_iter().map(|e| e.request).collect::<Vec<_>>();
        requests.sort_by(|x, y| x.url.cmp(&y.url));
        assert_eq!(requests, vec![a, b]);
    }

    #[test]
    fn entries_of_missing_root_is_empty() {
        let store = FileStore::new(
            Path::new("/definitely/not/here"),
            Arc::new(ProductionFileSystem),
        );
        assert!(store.entries().expect("entries").is_empty());
    }
}
