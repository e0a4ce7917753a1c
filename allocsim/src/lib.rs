//! An in-memory block device with three classic file allocation policies: chained, indexed and
//! contiguous.
//!
//! A volume reserves its first two blocks. Block 0 holds a packed file table and block 1 a
//! one byte per block free space bitmap. Every other block is data. A block counts as free
//! exactly when all of its bytes are zero.
mod alloc;
mod config;
mod error;
mod fat;
mod fs;
pub mod host;
pub mod io;
pub mod report;
mod strategy;

pub use crate::alloc::{FreeSpace, State};
pub use crate::config::{
    check_geometry, AllocationType, Config, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE,
    MAX_BLOCK_COUNT,
};
pub use crate::error::{FsError, Result};
pub use crate::fat::{FileRecord, FileTable, Placement};
pub use crate::fs::Volume;
pub use crate::strategy::{Allocator, Chained, Contiguous, Indexed};

/// Known locations.
pub const FAT_BLOCK: usize = 0;
pub const BITMAP_BLOCK: usize = 1;
pub const FIRST_DATA_BLOCK: usize = 2;

/// Most data blocks a single file may occupy.
pub const MAX_FILE_BLOCKS: usize = 10;
/// Bytes available for a file name in a table record.
pub const NAME_LEN: usize = 8;
