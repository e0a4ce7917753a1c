use super::{blocks_for, check_data_block, check_file_limit, mismatch, Allocator};
use crate::alloc::FreeSpace;
use crate::config::AllocationType;
use crate::error::{FsError, Result};
use crate::fat::Placement;
use crate::io::{BlockNumber, BlockStorage};
use crate::MAX_FILE_BLOCKS;

/// Scattered data blocks listed, in order, in one dedicated index block.
pub struct Indexed;

impl Indexed {
    /// Data blocks listed in an index block.
    ///
    /// Slot value 0 ends the list early. The same value is also a block index, so block 0 could
    /// only ever be listed last. Block 0 is reserved for the file table and never allocated to
    /// data, so the ambiguity never shows up in practice.
    fn entries<T: BlockStorage>(dev: &T, index_block: BlockNumber) -> Result<Vec<BlockNumber>> {
        check_data_block(dev, index_block)?;
        let mut slots = [0; MAX_FILE_BLOCKS];
        dev.read(index_block, 0, &mut slots)?;

        let mut blocks = Vec::with_capacity(MAX_FILE_BLOCKS);
        for &slot in slots.iter().take_while(|&&slot| slot != 0) {
            let blocknr = slot as BlockNumber;
            check_data_block(dev, blocknr)?;
            blocks.push(blocknr);
        }
        Ok(blocks)
    }

    fn index_block(placement: &Placement) -> Result<BlockNumber> {
        match *placement {
            Placement::Indexed { index_block } => Ok(index_block),
            ref other => Err(mismatch(AllocationType::Indexed, other)),
        }
    }
}

impl Allocator for Indexed {
    fn store<T: BlockStorage>(
        &self,
        dev: &mut T,
        free: &mut FreeSpace,
        data: &[u8],
    ) -> Result<Placement> {
        let block_size = dev.block_size();
        let required = blocks_for(data.len(), block_size);
        check_file_limit(required)?;
        if required == 0 {
            return Ok(Placement::Indexed { index_block: 0 });
        }

        // One extra block for the index itself.
        let available = free.count_free(dev)?;
        if available < required + 1 {
            return Err(FsError::OutOfSpace {
                required: required + 1,
                available,
            });
        }
        let picked = free.pick_many(dev, required + 1)?;
        let (index_block, data_blocks) = (picked[0], &picked[1..]);

        let slots: Vec<u8> = data_blocks.iter().map(|&b| b as u8).collect();
        dev.write(index_block, 0, &slots)?;
        for (chunk, &blocknr) in data.chunks(block_size).zip(data_blocks) {
            dev.write(blocknr, 0, chunk)?;
        }

        Ok(Placement::Indexed { index_block })
    }

    fn load<T: BlockStorage>(&self, dev: &T, placement: &Placement) -> Result<Vec<u8>> {
        let index_block = Self::index_block(placement)?;
        if index_block == 0 {
            return Ok(Vec::new());
        }

        let blocks = Self::entries(dev, index_block)?;
        let mut content = Vec::with_capacity(blocks.len() * dev.block_size());
        for blocknr in blocks {
            content.extend_from_slice(&dev.read_block(blocknr)?);
        }
        Ok(content)
    }

    fn release<T: BlockStorage>(&self, dev: &mut T, placement: &Placement) -> Result<()> {
        let index_block = Self::index_block(placement)?;
        if index_block == 0 {
            return Ok(());
        }

        for blocknr in Self::entries(dev, index_block)? {
            dev.clear_block(blocknr)?;
        }
        dev.clear_block(index_block)
    }
}
