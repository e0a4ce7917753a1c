use std::fmt;
use std::str::FromStr;

use crate::error::{FsError, Result};
use crate::{FIRST_DATA_BLOCK, MAX_FILE_BLOCKS};

pub const DEFAULT_BLOCK_COUNT: usize = 256;
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Block indices are stored on disk as a single byte.
pub const MAX_BLOCK_COUNT: usize = u8::MAX as usize + 1;

/// The layout policy a volume uses for every file it stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationType {
    Chained,
    Indexed,
    Contiguous,
}

impl AllocationType {
    /// Bytes taken by one file table record. Indexed records drop the length byte.
    pub fn record_size(self) -> usize {
        match self {
            AllocationType::Indexed => 9,
            AllocationType::Chained | AllocationType::Contiguous => 10,
        }
    }
}

impl fmt::Display for AllocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllocationType::Chained => "chained",
            AllocationType::Indexed => "indexed",
            AllocationType::Contiguous => "contiguous",
        };
        f.write_str(name)
    }
}

impl FromStr for AllocationType {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chained" => Ok(AllocationType::Chained),
            "indexed" => Ok(AllocationType::Indexed),
            "contiguous" => Ok(AllocationType::Contiguous),
            other => Err(FsError::Config(format!(
                "unknown allocation type {:?}, expected chained, indexed or contiguous",
                other
            ))),
        }
    }
}

/// Everything needed to stand up a simulated volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub allocation: AllocationType,
    pub block_count: usize,
    pub block_size: usize,
    /// Seeds the free block picker. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Config {
    pub fn new(allocation: AllocationType) -> Self {
        Self {
            allocation,
            block_count: DEFAULT_BLOCK_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
            seed: None,
        }
    }

    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Validates a device shape.
///
/// The bitmap block stores one byte per block, so a block must be at least as large as the
/// block count. Indices are single bytes, which caps the device at 256 blocks. A block must also
/// hold a full file table record and a full index block.
pub fn check_geometry(block_count: usize, block_size: usize) -> Result<()> {
    if block_size < block_count {
        return Err(FsError::Config(format!(
            "block size {} must not be smaller than the number of blocks {}",
            block_size, block_count
        )));
    }
    if block_count <= FIRST_DATA_BLOCK || block_count > MAX_BLOCK_COUNT {
        return Err(FsError::Config(format!(
            "block count {} must be between {} and {}",
            block_count,
            FIRST_DATA_BLOCK + 1,
            MAX_BLOCK_COUNT
        )));
    }
    let min_size = AllocationType::Chained.record_size().max(MAX_FILE_BLOCKS);
    if block_size < min_size {
        return Err(FsError::Config(format!(
            "block size {} must be at least {} bytes",
            block_size, min_size
        )));
    }
    Ok(())
}
