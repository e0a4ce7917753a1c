use super::{blocks_for, check_data_block, check_file_limit, mismatch, Allocator};
use crate::alloc::FreeSpace;
use crate::config::AllocationType;
use crate::error::{FsError, Result};
use crate::fat::Placement;
use crate::io::{BlockNumber, BlockStorage};

/// One uninterrupted run of blocks, first fit from the start of the data region.
pub struct Contiguous;

impl Contiguous {
    fn run<T: BlockStorage>(
        dev: &T,
        placement: &Placement,
    ) -> Result<std::ops::Range<BlockNumber>> {
        let (start, len) = match *placement {
            Placement::Contiguous { start, len } => (start, len),
            ref other => return Err(mismatch(AllocationType::Contiguous, other)),
        };
        if len > 0 {
            check_data_block(dev, start)?;
            check_data_block(dev, start + len - 1)?;
        }
        Ok(start..start + len)
    }
}

impl Allocator for Contiguous {
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
            return Ok(Placement::Contiguous { start: 0, len: 0 });
        }

        let start = match free.find_contiguous_run(dev, required)? {
            Some(start) => start,
            None => {
                return Err(FsError::OutOfSpace {
                    required,
                    available: free.longest_run(dev)?,
                })
            }
        };

        for (offset, chunk) in data.chunks(block_size).enumerate() {
            dev.write(start + offset, 0, chunk)?;
        }

        Ok(Placement::Contiguous {
            start,
            len: required,
        })
    }

    fn load<T: BlockStorage>(&self, dev: &T, placement: &Placement) -> Result<Vec<u8>> {
        let run = Self::run(dev, placement)?;
        let mut content = Vec::with_capacity(run.len() * dev.block_size());
        for blocknr in run {
            content.extend_from_slice(&dev.read_block(blocknr)?);
        }
        Ok(content)
    }

    fn release<T: BlockStorage>(&self, dev: &mut T, placement: &Placement) -> Result<()> {
        for blocknr in Self::run(dev, placement)? {
            dev.clear_block(blocknr)?;
        }
        Ok(())
    }
}
