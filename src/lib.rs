mod merge;
mod timeline;
mod wallet;

pub use merge::{
    discover_files, load_file, merge, merge_files, write_wallets, FileOutcome, FileStatus,
    MergeConfig, MergeReport, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT,
};
pub use timeline::{
    build_timeline, load_addresses, load_challenges, parse_timestamp, Challenge, SolutionPoint,
    Timeline, TimelineConfig, UnparsedTimestamp, DEFAULT_CHALLENGES, DEFAULT_WALLETS,
};
pub use wallet::{address_key, Wallet, WalletCollection};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input directory {} not found", .0.display())]
    MissingInputDir(PathBuf),
    #[error("no JSON files found in {}", .0.display())]
    NoInputFiles(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} is not a JSON array", .0.display())]
    NotAnArray(PathBuf),
    #[error("record {index} in {} has no address", path.display())]
    MissingAddress { path: PathBuf, index: usize },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("challenge dataset {} not found", .0.display())]
    ChallengesNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
