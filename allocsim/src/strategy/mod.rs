//! Block layout policies.
//!
//! Each policy picks blocks for a payload, walks them back out and clears them again. Policies
//! work purely on the device; the file table and bitmap refresh are the caller's business.
//!
//! Writes check every precondition (size limit, free space, contiguity) and choose all of their
//! blocks before touching the device, so a failed write leaves it unchanged.

mod chained;
mod contiguous;
mod indexed;

pub use chained::Chained;
pub use contiguous::Contiguous;
pub use indexed::Indexed;

use crate::alloc::FreeSpace;
use crate::config::AllocationType;
use crate::error::{FsError, Result};
use crate::fat::Placement;
use crate::io::{BlockNumber, BlockStorage};
use crate::{FIRST_DATA_BLOCK, MAX_FILE_BLOCKS};

pub trait Allocator {
    /// Writes `data` to freshly chosen blocks and describes where it went.
    fn store<T: BlockStorage>(
        &self,
        dev: &mut T,
        free: &mut FreeSpace,
        data: &[u8],
    ) -> Result<Placement>;

    /// Reads back every byte of the blocks a placement covers, padding included.
    fn load<T: BlockStorage>(&self, dev: &T, placement: &Placement) -> Result<Vec<u8>>;

    /// Zeroes every block a placement covers.
    fn release<T: BlockStorage>(&self, dev: &mut T, placement: &Placement) -> Result<()>;
}

impl AllocationType {
    pub fn store<T: BlockStorage>(
        self,
        dev: &mut T,
        free: &mut FreeSpace,
        data: &[u8],
    ) -> Result<Placement> {
        match self {
            AllocationType::Chained => Chained.store(dev, free, data),
            AllocationType::Indexed => Indexed.store(dev, free, data),
            AllocationType::Contiguous => Contiguous.store(dev, free, data),
        }
    }

    pub fn load<T: BlockStorage>(self, dev: &T, placement: &Placement) -> Result<Vec<u8>> {
        match self {
            AllocationType::Chained => Chained.load(dev, placement),
            AllocationType::Indexed => Indexed.load(dev, placement),
            AllocationType::Contiguous => Contiguous.load(dev, placement),
        }
    }

    pub fn release<T: BlockStorage>(self, dev: &mut T, placement: &Placement) -> Result<()> {
        match self {
            AllocationType::Chained => Chained.release(dev, placement),
            AllocationType::Indexed => Indexed.release(dev, placement),
            AllocationType::Contiguous => Contiguous.release(dev, placement),
        }
    }
}

/// Blocks needed for `len` bytes at `per_block` payload bytes each.
pub(crate) fn blocks_for(len: usize, per_block: usize) -> usize {
    (len + per_block - 1) / per_block
}

pub(crate) fn check_file_limit(required: usize) -> Result<()> {
    if required > MAX_FILE_BLOCKS {
        return Err(FsError::OutOfSpace {
            required,
            available: MAX_FILE_BLOCKS,
        });
    }
    Ok(())
}

pub(crate) fn check_data_block<T: BlockStorage>(dev: &T, blocknr: BlockNumber) -> Result<()> {
    if blocknr < FIRST_DATA_BLOCK || blocknr >= dev.block_count() {
        return Err(FsError::Corrupt(format!(
            "block {} is outside the data region",
            blocknr
        )));
    }
    Ok(())
}

pub(crate) fn mismatch(expected: AllocationType, placement: &Placement) -> FsError {
    FsError::Corrupt(format!(
        "{} allocator handed a {} placement",
        expected,
        placement.allocation()
    ))
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::io::{MemDisk, MemDiskBuilder};

    pub fn create_test_device() -> MemDisk {
        MemDiskBuilder::new()
            .with_block_count(16)
            .with_block_size(16)
            .build()
            .expect("Could not initialize disk.")
    }

    /// Payload with no zero bytes so reads compare exactly.
    pub fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 250) as u8 + 1).collect()
    }
}
