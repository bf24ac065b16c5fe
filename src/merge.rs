//! Merging a directory of wallet exports into one deduplicated file.

use crate::{Error, Result, Wallet, WalletCollection};
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_DIR: &str = "json";
pub const DEFAULT_OUTPUT: &str = "wallets.json";

/// Where to read wallet exports from and where to write the merged list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
}

impl MergeConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output: output.into(),
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_DIR, DEFAULT_OUTPUT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processed,
    Skipped,
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file: PathBuf,
    /// Array length, including elements that were not wallets.
    pub records: usize,
    pub added: usize,
    pub duplicates: usize,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn skipped(file: &Path, error: &Error) -> Self {
        Self {
            file: file.to_path_buf(),
            records: 0,
            added: 0,
            duplicates: 0,
            status: FileStatus::Skipped,
            error: Some(error.to_string()),
        }
    }

    pub fn file_name(&self) -> String {
        self.file.file_name().map_or_else(
            || self.file.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub files_found: usize,
    pub files_processed: usize,
    pub files: Vec<FileOutcome>,
    pub unique_wallets: usize,
    pub duplicates: usize,
    pub sorted: bool,
    pub output: PathBuf,
}

impl MergeReport {
    pub fn skipped(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Skipped)
    }
}

/// Lists `*.json` files in `dir`, sorted by name.
///
/// The order decides which record wins when two files share an address.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInputDir(dir.to_path_buf()));
    }

    let read_err = |source| Error::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_json = path
            .file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| name.ends_with(".json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(Error::NoInputFiles(dir.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Reads one export, which must be a top-level JSON array.
pub fn load_file(path: &Path) -> Result<Vec<Value>> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match serde_json::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })? {
        Value::Array(items) => Ok(items),
        _ => Err(Error::NotAnArray(path.to_path_buf())),
    }
}

/// Folds the given files, in order, into one collection.
///
/// Unreadable files and non-arrays are recorded as skipped. Elements that are
/// not objects with an `address` are dropped without a trace.
pub fn merge_files(files: &[PathBuf]) -> (WalletCollection, Vec<FileOutcome>) {
    let mut wallets = WalletCollection::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        let items = match load_file(file) {
            Ok(items) => items,
            Err(e) => {
                outcomes.push(FileOutcome::skipped(file, &e));
                continue;
            }
        };

        let records = items.len();
        let mut added = 0;
        let mut duplicates = 0;
        for wallet in items.into_iter().filter_map(Wallet::from_value) {
            if wallets.insert(wallet) {
                added += 1;
            } else {
                duplicates += 1;
            }
        }

        outcomes.push(FileOutcome {
            file: file.clone(),
            records,
            added,
            duplicates,
            status: FileStatus::Processed,
            error: None,
        });
    }

    (wallets, outcomes)
}

/// Writes wallets as a 2-space indented JSON array, overwriting `path`.
pub fn write_wallets(path: &Path, wallets: &WalletCollection) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
    serde_json::to_writer_pretty(&mut writer, wallets)
        .map_err(io::Error::from)
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush())
        .map_err(write_err)
}

/// Runs a full merge: discover, deduplicate, sort, write.
///
/// Nothing is written if the input directory is missing or empty.
pub fn merge(config: &MergeConfig) -> Result<MergeReport> {
    let files = discover_files(&config.input_dir)?;
    let (mut wallets, outcomes) = merge_files(&files);
    let sorted = wallets.sort_by_created_at();

    write_wallets(&config.output, &wallets)?;

    Ok(MergeReport {
        files_found: files.len(),
        files_processed: outcomes
            .iter()
            .filter(|f| f.status == FileStatus::Processed)
            .count(),
        unique_wallets: wallets.len(),
        duplicates: outcomes.iter().map(|f| f.duplicates).sum(),
        files: outcomes,
        sorted,
        output: config.output.clone(),
    })
}
