use anyhow::{Result, Context};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files whose name starts with `prefix` and has extension `extension`,
    /// directly inside `dir` (no recursion)
    pub fn find_files<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Ok(Vec::new());
        }

        let normalized_ext = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let ext_matches = path.extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext));
            if ext_matches && name.starts_with(prefix) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// List the immediate sub-directory names of `dir`, sorted
    pub fn list_subdirs<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.context("Failed to read directory entry")?;
            if entry.file_type().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read a file's bytes, `None` when it does not exist
    pub fn read_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>> {
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read file: {:?}", path.as_ref())),
        }
    }

    /// Write bytes so readers only ever see the old file or the complete new one
    ///
    /// The data goes to a temporary file in the same directory which is then
    /// renamed over the target.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::ensure_dir(parent)?;

        let mut temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.as_file().sync_all()
            .with_context(|| format!("Failed to flush temporary file for {:?}", path))?;
        temp.persist(path)
            .with_context(|| format!("Failed to move temporary file onto {:?}", path))?;

        Ok(())
    }

    /// Remove a file, returning whether it existed
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove file: {:?}", path.as_ref())),
        }
    }
}
