use crate::config::{check_geometry, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::io::block::{BlockNumber, BlockStorage};
use crate::BITMAP_BLOCK;

/// Emulates a block device in memory. The whole device is one zero initialized buffer that
/// lives as long as the value does.
#[derive(Debug, Clone)]
pub struct MemDisk {
    bytes: Vec<u8>,
    block_count: usize,
    block_size: usize,
}

impl MemDisk {
    fn range(
        &self,
        blocknr: BlockNumber,
        offset: usize,
        len: usize,
    ) -> Result<std::ops::Range<usize>> {
        let past_end = offset
            .checked_add(len)
            .map_or(true, |end| end > self.block_size);
        if blocknr >= self.block_count || past_end {
            return Err(FsError::OutOfRange {
                block: blocknr,
                offset,
                len,
            });
        }
        let start = blocknr * self.block_size + offset;
        Ok(start..start + len)
    }

    /// Borrows a whole block without copying.
    pub fn block(&self, blocknr: BlockNumber) -> Option<&[u8]> {
        self.range(blocknr, 0, self.block_size)
            .ok()
            .map(|range| &self.bytes[range])
    }

    /// Returns ownership of the raw device bytes to the caller.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl BlockStorage for MemDisk {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read(&self, blocknr: BlockNumber, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = self.range(blocknr, offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, blocknr: BlockNumber, offset: usize, buf: &[u8]) -> Result<()> {
        let range = self.range(blocknr, offset, buf.len())?;
        self.bytes[range].copy_from_slice(buf);

        // Set-only: a block that became empty keeps its used flag until the next rebuild.
        let whole = self.range(blocknr, 0, self.block_size)?;
        if self.bytes[whole].iter().any(|&b| b != 0) {
            let flag = BITMAP_BLOCK * self.block_size + blocknr;
            self.bytes[flag] = 1;
        }
        Ok(())
    }

    fn is_zeroed(&self, blocknr: BlockNumber) -> Result<bool> {
        let range = self.range(blocknr, 0, self.block_size)?;
        Ok(self.bytes[range].iter().all(|&b| b == 0))
    }
}

pub struct MemDiskBuilder {
    block_count: usize,
    block_size: usize,
}

impl Default for MemDiskBuilder {
    fn default() -> Self {
        MemDiskBuilder {
            block_count: DEFAULT_BLOCK_COUNT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl MemDiskBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of blocks in the device.
    pub fn with_block_count(mut self, blocks: usize) -> Self {
        self.block_count = blocks;
        self
    }

    /// Sets the number of bytes per block.
    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    /// Validates the geometry and allocates a zeroed device.
    pub fn build(self) -> Result<MemDisk> {
        check_geometry(self.block_count, self.block_size)?;
        Ok(MemDisk {
            bytes: vec![0; self.block_count * self.block_size],
            block_count: self.block_count,
            block_size: self.block_size,
        })
    }
}
