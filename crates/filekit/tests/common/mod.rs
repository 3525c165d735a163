//! In-memory platform for service tests.
//!
//! Directories and files live in shared maps keyed by full path. Every
//! directory creation, transfer call and platform request is recorded so
//! tests can assert exactly what the service asked for.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use filekit::error::{file_codes, transfer_codes};
use filekit::{
    DirEntry, DownloadOptions, Entry, EntryFlags, FileError, FileInfo, FileSystem, Platform,
    ReadinessGate, StorageKind, TransferError, Transport, UploadOptions, UploadResult,
};

const SCHEME: &str = "mem://";

#[derive(Debug, Clone)]
struct StoredFile {
    data: Vec<u8>,
    mime_type: Option<String>,
}

#[derive(Debug)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, StoredFile>,
    created_dirs: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert("/".to_string());
        Self {
            dirs,
            files: BTreeMap::new(),
            created_dirs: Vec::new(),
        }
    }
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

fn name_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn join(parent: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", parent, path)
    };
    let segments: Vec<&str> = joined.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemDir {
    name: String,
    full_path: String,
}

impl MemDir {
    fn new(full_path: String) -> Self {
        Self {
            name: name_of(&full_path),
            full_path,
        }
    }
}

impl Entry for MemDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_path(&self) -> &str {
        &self.full_path
    }

    fn to_url(&self) -> String {
        format!("{}{}/", SCHEME, self.full_path.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemFile {
    name: String,
    full_path: String,
}

impl MemFile {
    fn new(full_path: String) -> Self {
        Self {
            name: name_of(&full_path),
            full_path,
        }
    }
}

impl Entry for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_path(&self) -> &str {
        &self.full_path
    }

    fn to_url(&self) -> String {
        format!("{}{}", SCHEME, self.full_path)
    }
}

pub struct MemoryFs {
    state: Arc<Mutex<State>>,
    root: MemDir,
}

impl FileSystem for MemoryFs {
    type Directory = MemDir;
    type File = MemFile;

    fn root(&self) -> &MemDir {
        &self.root
    }

    async fn get_directory(
        &self,
        parent: &MemDir,
        path: &str,
        flags: EntryFlags,
    ) -> Result<MemDir, FileError> {
        let full = join(parent.full_path(), path);
        let mut state = self.state.lock().unwrap();

        if state.files.contains_key(&full) {
            return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
        }
        if state.dirs.contains(&full) {
            if flags.create && flags.exclusive {
                return Err(FileError::new(file_codes::PATH_EXISTS_ERR));
            }
            return Ok(MemDir::new(full));
        }
        if !flags.create || !state.dirs.contains(&parent_of(&full)) {
            return Err(FileError::new(file_codes::NOT_FOUND_ERR));
        }

        state.dirs.insert(full.clone());
        state.created_dirs.push(full.clone());
        Ok(MemDir::new(full))
    }

    async fn get_file(
        &self,
        parent: &MemDir,
        path: &str,
        flags: EntryFlags,
    ) -> Result<MemFile, FileError> {
        let full = join(parent.full_path(), path);
        let mut state = self.state.lock().unwrap();

        if state.dirs.contains(&full) {
            return Err(FileError::new(file_codes::TYPE_MISMATCH_ERR));
        }
        if state.files.contains_key(&full) {
            return Ok(MemFile::new(full));
        }
        if !flags.create || !state.dirs.contains(&parent_of(&full)) {
            return Err(FileError::new(file_codes::NOT_FOUND_ERR));
        }

        state.files.insert(
            full.clone(),
            StoredFile {
                data: Vec::new(),
                mime_type: None,
            },
        );
        Ok(MemFile::new(full))
    }

    async fn resolve_url(&self, url: &str) -> Result<MemFile, FileError> {
        let path = url
            .strip_prefix(SCHEME)
            .ok_or(FileError::new(file_codes::ENCODING_ERR))?;
        let state = self.state.lock().unwrap();
        if state.files.contains_key(path) {
            Ok(MemFile::new(path.to_string()))
        } else {
            Err(FileError::new(file_codes::NOT_FOUND_ERR))
        }
    }

    async fn read_entries(&self, dir: &MemDir) -> Result<Vec<DirEntry<MemDir, MemFile>>, FileError> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains(dir.full_path()) {
            return Err(FileError::new(file_codes::NOT_FOUND_ERR));
        }

        let mut entries = Vec::new();
        for path in state.dirs.iter().filter(|p| *p != "/") {
            if parent_of(path) == dir.full_path() {
                entries.push(DirEntry::Directory(MemDir::new(path.clone())));
            }
        }
        for path in state.files.keys() {
            if parent_of(path) == dir.full_path() {
                entries.push(DirEntry::File(MemFile::new(path.clone())));
            }
        }
        Ok(entries)
    }

    async fn file(&self, entry: &MemFile) -> Result<FileInfo, FileError> {
        let state = self.state.lock().unwrap();
        let stored = state
            .files
            .get(entry.full_path())
            .ok_or(FileError::new(file_codes::NOT_FOUND_ERR))?;
        Ok(FileInfo {
            name: entry.name().to_string(),
            mime_type: stored.mime_type.clone(),
            size: stored.data.len() as u64,
            last_modified: None,
            url: entry.to_url(),
        })
    }

    async fn copy_to(
        &self,
        entry: &MemFile,
        dest: &MemDir,
        new_name: Option<&str>,
    ) -> Result<MemFile, FileError> {
        let target = join(dest.full_path(), new_name.unwrap_or(entry.name()));
        if target == entry.full_path() {
            return Err(FileError::new(file_codes::INVALID_MODIFICATION_ERR));
        }
        let mut state = self.state.lock().unwrap();
        let stored = state
            .files
            .get(entry.full_path())
            .cloned()
            .ok_or(FileError::new(file_codes::NOT_FOUND_ERR))?;
        state.files.insert(target.clone(), stored);
        Ok(MemFile::new(target))
    }

    async fn move_to(
        &self,
        entry: &MemFile,
        dest: &MemDir,
        new_name: Option<&str>,
    ) -> Result<MemFile, FileError> {
        let target = join(dest.full_path(), new_name.unwrap_or(entry.name()));
        if target == entry.full_path() {
            return Err(FileError::new(file_codes::INVALID_MODIFICATION_ERR));
        }
        let mut state = self.state.lock().unwrap();
        let stored = state
            .files
            .remove(entry.full_path())
            .ok_or(FileError::new(file_codes::NOT_FOUND_ERR))?;
        state.files.insert(target.clone(), stored);
        Ok(MemFile::new(target))
    }
}

#[derive(Debug, Default)]
struct Script {
    /// Number of downloads that fail before one succeeds.
    download_failures: usize,
    download_code: i32,
    download_calls: Vec<(String, String)>,
    upload_code: Option<i32>,
    upload_calls: Vec<(String, String, UploadOptions, bool)>,
}

pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
    script: Arc<Mutex<Script>>,
}

impl Transport for MemoryTransport {
    async fn download(
        &self,
        source: &str,
        target: &str,
        _trust_all: bool,
        _options: &DownloadOptions,
    ) -> Result<(), TransferError> {
        let mut script = self.script.lock().unwrap();
        script
            .download_calls
            .push((source.to_string(), target.to_string()));

        if script.download_failures > 0 {
            script.download_failures -= 1;
            return Err(TransferError::new(script.download_code, source, target).with_status(503));
        }

        let path = target
            .strip_prefix(SCHEME)
            .ok_or_else(|| TransferError::new(transfer_codes::FILE_NOT_FOUND_ERR, source, target))?;
        let mut state = self.state.lock().unwrap();
        if !state.dirs.contains(&parent_of(path)) {
            return Err(TransferError::new(
                transfer_codes::FILE_NOT_FOUND_ERR,
                source,
                target,
            ));
        }
        state.files.insert(
            path.to_string(),
            StoredFile {
                data: source.as_bytes().to_vec(),
                mime_type: None,
            },
        );
        Ok(())
    }

    async fn upload(
        &self,
        file_url: &str,
        server_url: &str,
        options: &UploadOptions,
        trust_all: bool,
    ) -> Result<UploadResult, TransferError> {
        let mut script = self.script.lock().unwrap();
        script.upload_calls.push((
            file_url.to_string(),
            server_url.to_string(),
            options.clone(),
            trust_all,
        ));

        if let Some(code) = script.upload_code {
            return Err(TransferError::new(code, file_url, server_url).with_status(500));
        }

        let size = file_url
            .strip_prefix(SCHEME)
            .and_then(|path| {
                self.state
                    .lock()
                    .unwrap()
                    .files
                    .get(path)
                    .map(|f| f.data.len() as u64)
            })
            .unwrap_or(0);

        Ok(UploadResult {
            bytes_sent: size,
            response_code: 200,
            response: "ok".to_string(),
            headers: Default::default(),
        })
    }
}

pub struct MemoryPlatform {
    state: Arc<Mutex<State>>,
    script: Arc<Mutex<Script>>,
    gate: ReadinessGate,
    root_path: Result<String, String>,
    fs_error: Option<i32>,
    fs_requests: AtomicUsize,
    transports_created: AtomicUsize,
}

impl MemoryPlatform {
    /// Ready platform with `root_path` as the device root (created).
    pub fn new(root_path: &str) -> Self {
        let platform = Self::with_gate(root_path, ReadinessGate::opened());
        platform.add_dir(root_path);
        platform
    }

    /// Platform whose readiness gate has not opened yet.
    pub fn pending(root_path: &str) -> Self {
        let platform = Self::with_gate(root_path, ReadinessGate::new());
        platform.add_dir(root_path);
        platform
    }

    fn with_gate(root_path: &str, gate: ReadinessGate) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            script: Arc::new(Mutex::new(Script::default())),
            gate,
            root_path: Ok(root_path.to_string()),
            fs_error: None,
            fs_requests: AtomicUsize::new(0),
            transports_created: AtomicUsize::new(0),
        }
    }

    /// Platform whose root path cannot be resolved.
    pub fn without_root_path(reason: &str) -> Self {
        let mut platform = Self::with_gate("/", ReadinessGate::opened());
        platform.root_path = Err(reason.to_string());
        platform
    }

    /// Platform that refuses to provide a filesystem.
    pub fn without_file_system(code: i32) -> Self {
        let mut platform = Self::with_gate("/", ReadinessGate::opened());
        platform.fs_error = Some(code);
        platform
    }

    /// Create a directory and all its ancestors without recording them.
    pub fn add_dir(&self, path: &str) {
        let full = join("/", path);
        let mut state = self.state.lock().unwrap();
        let mut current = String::new();
        for segment in full.split('/').filter(|s| !s.is_empty()) {
            current = format!("{}/{}", current, segment);
            state.dirs.insert(current.clone());
        }
    }

    /// Create a file (and its parent directories).
    pub fn add_file(&self, path: &str, data: &[u8]) {
        self.add_file_with_type(path, data, None);
    }

    pub fn add_file_with_type(&self, path: &str, data: &[u8], mime_type: Option<&str>) {
        let full = join("/", path);
        self.add_dir(&parent_of(&full));
        self.state.lock().unwrap().files.insert(
            full,
            StoredFile {
                data: data.to_vec(),
                mime_type: mime_type.map(str::to_string),
            },
        );
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(path)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    /// Directories created through the filesystem, in order.
    pub fn created_dirs(&self) -> Vec<String> {
        self.state.lock().unwrap().created_dirs.clone()
    }

    /// Make the next `count` downloads fail with `code`.
    pub fn fail_downloads(&self, count: usize, code: i32) {
        let mut script = self.script.lock().unwrap();
        script.download_failures = count;
        script.download_code = code;
    }

    /// Make every upload fail with `code`.
    pub fn fail_uploads(&self, code: i32) {
        self.script.lock().unwrap().upload_code = Some(code);
    }

    pub fn download_calls(&self) -> Vec<(String, String)> {
        self.script.lock().unwrap().download_calls.clone()
    }

    pub fn upload_calls(&self) -> Vec<(String, String, UploadOptions, bool)> {
        self.script.lock().unwrap().upload_calls.clone()
    }

    pub fn fs_requests(&self) -> usize {
        self.fs_requests.load(Ordering::SeqCst)
    }

    pub fn transports_created(&self) -> usize {
        self.transports_created.load(Ordering::SeqCst)
    }
}

impl Platform for MemoryPlatform {
    type FileSystem = MemoryFs;
    type Transport = MemoryTransport;

    fn readiness(&self) -> &ReadinessGate {
        &self.gate
    }

    async fn root_path(&self) -> Result<String, String> {
        self.root_path.clone()
    }

    async fn request_file_system(&self, _kind: StorageKind, _size: u64) -> Result<MemoryFs, FileError> {
        self.fs_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.fs_error {
            return Err(FileError::new(code));
        }
        Ok(MemoryFs {
            state: Arc::clone(&self.state),
            root: MemDir::new("/".to_string()),
        })
    }

    fn create_transport(&self) -> MemoryTransport {
        self.transports_created.fetch_add(1, Ordering::SeqCst);
        MemoryTransport {
            state: Arc::clone(&self.state),
            script: Arc::clone(&self.script),
        }
    }
}
