use crate::error::Result;

/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available.
pub type BlockNumber = usize;

/// Byte addressable access to a fixed array of equally sized blocks.
///
/// Implementations own the free-space side effect of a write: after any write that leaves the
/// target block holding a nonzero byte, the block's entry in the bitmap block
/// ([`BITMAP_BLOCK`](crate::BITMAP_BLOCK)) is set to used. Writes never clear that entry, even
/// when they zero the whole block. Only a full rebuild clears it.
pub trait BlockStorage {
    /// Total number of blocks on the device.
    fn block_count(&self) -> usize;
    /// Number of bytes in every block.
    fn block_size(&self) -> usize;
    /// Reads `buf.len()` bytes of block `blocknr` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Attempting to read past the end of the block or device returns
    /// [`FsError::OutOfRange`](crate::FsError::OutOfRange).
    fn read(&self, blocknr: BlockNumber, offset: usize, buf: &mut [u8]) -> Result<()>;
    /// Writes `buf` into block `blocknr` starting at `offset` and marks the block used in the
    /// bitmap block if it now holds any nonzero byte.
    ///
    /// # Errors
    ///
    /// Attempting to write past the end of the block or device returns
    /// [`FsError::OutOfRange`](crate::FsError::OutOfRange).
    fn write(&mut self, blocknr: BlockNumber, offset: usize, buf: &[u8]) -> Result<()>;

    fn read_byte(&self, blocknr: BlockNumber, offset: usize) -> Result<u8> {
        let mut byte = [0; 1];
        self.read(blocknr, offset, &mut byte)?;
        Ok(byte[0])
    }

    fn write_byte(&mut self, blocknr: BlockNumber, offset: usize, value: u8) -> Result<()> {
        self.write(blocknr, offset, &[value])
    }

    /// Copies a whole block out of the device.
    fn read_block(&self, blocknr: BlockNumber) -> Result<Vec<u8>> {
        let mut buf = vec![0; self.block_size()];
        self.read(blocknr, 0, &mut buf)?;
        Ok(buf)
    }

    /// True iff every byte of the block is zero.
    fn is_zeroed(&self, blocknr: BlockNumber) -> Result<bool> {
        Ok(self.read_block(blocknr)?.iter().all(|&b| b == 0))
    }

    /// Zero fills a block. The bitmap entry is left as is.
    fn clear_block(&mut self, blocknr: BlockNumber) -> Result<()> {
        let zeroes = vec![0; self.block_size()];
        self.write(blocknr, 0, &zeroes)
    }
}
