use std::io;

use thiserror::Error;

/// Every failure the volume engine can surface to the shell. Recoverable
/// variants are printed as a single `Error:` line by the dispatcher;
/// `InvalidImage` and startup-time `Image` errors are fatal.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not a valid FAT32 image: {0}")]
    InvalidImage(String),

    #[error("image I/O failed: {0}")]
    Image(#[from] io::Error),

    #[error("'{0}' not found in the current directory")]
    NotFound(String),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("'{0}' is a directory, not a file")]
    NotARegularFile(String),

    #[error("invalid file name '{0}'")]
    BadName(String),

    #[error("invalid mode '{0}'")]
    InvalidMode(String),

    #[error("file '{0}' is not open for {1}")]
    WrongMode(String, &'static str),

    #[error("file '{0}' is already open")]
    AlreadyOpen(String),

    #[error("file '{0}' is not open")]
    NotOpen(String),

    #[error("maximum number of open files reached")]
    TooManyOpen,

    #[error("offset exceeds the size of the file '{0}'")]
    OffsetTooLarge(String),

    #[error("offset is beyond the end of the cluster chain")]
    OffsetBeyondEof,

    #[error("no free clusters left on the volume")]
    NoSpace,

    #[error("corrupt cluster chain at cluster {0}")]
    CorruptChain(u32),

    #[error("directory '{0}' is not empty")]
    DirectoryNotEmpty(String),

    #[error("already at root directory")]
    AlreadyAtRoot,
}
