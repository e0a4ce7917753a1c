use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("invalid device geometry: {0}")]
    Config(String),
    #[error("found no file named {0:?}")]
    NotFound(String),
    #[error("a file named {0:?} already exists")]
    AlreadyExists(String),
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("not enough space: {required} blocks required, {available} available")]
    OutOfSpace { required: usize, available: usize },
    #[error("file table is full ({0} records)")]
    TableFull(usize),
    /// Access outside the device. Volume operations never issue one, so it indicates a layout bug.
    #[error("access to block {block} at offset {offset} ({len} bytes) is out of range")]
    OutOfRange {
        block: usize,
        offset: usize,
        len: usize,
    },
    #[error("corrupt allocation structure: {0}")]
    Corrupt(String),
    #[error("host file transfer failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
