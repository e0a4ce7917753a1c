use log::debug;

use super::{blocks_for, check_data_block, check_file_limit, mismatch, Allocator};
use crate::alloc::FreeSpace;
use crate::config::AllocationType;
use crate::error::{FsError, Result};
use crate::fat::Placement;
use crate::io::{BlockNumber, BlockStorage};

/// Scattered blocks linked through their last byte.
///
/// Every block but the last carries `block_size - 1` payload bytes followed by the index of the
/// next block. The last block stores no terminator; its trailing byte is simply never written.
pub struct Chained;

impl Chained {
    /// Follows the chain from `start` and returns the `len` blocks it visits, checking every
    /// link before anything is read or cleared.
    fn walk<T: BlockStorage>(dev: &T, start: BlockNumber, len: usize) -> Result<Vec<BlockNumber>> {
        let link = dev.block_size() - 1;
        let mut blocks = Vec::with_capacity(len);
        let mut blocknr = start;
        for remaining in (1..=len).rev() {
            check_data_block(dev, blocknr)?;
            if blocks.contains(&blocknr) {
                return Err(FsError::Corrupt(format!(
                    "chain from block {} loops back to block {}",
                    start, blocknr
                )));
            }
            blocks.push(blocknr);
            if remaining > 1 {
                blocknr = dev.read_byte(blocknr, link)? as BlockNumber;
            }
        }
        debug!("chain from block {}: {:?}", start, blocks);
        Ok(blocks)
    }

    fn span(placement: &Placement) -> Result<(BlockNumber, usize)> {
        match *placement {
            Placement::Chained { start, len } => Ok((start, len)),
            ref other => Err(mismatch(AllocationType::Chained, other)),
        }
    }
}

impl Allocator for Chained {
    fn store<T: BlockStorage>(
        &self,
        dev: &mut T,
        free: &mut FreeSpace,
        data: &[u8],
    ) -> Result<Placement> {
        let capacity = dev.block_size() - 1;
        let required = blocks_for(data.len(), capacity);
        check_file_limit(required)?;
        if required == 0 {
            return Ok(Placement::Chained { start: 0, len: 0 });
        }

        let available = free.count_free(dev)?;
        if available < required {
            return Err(FsError::OutOfSpace {
                required,
                available,
            });
        }
        let blocks = free.pick_many(dev, required)?;

        for (i, chunk) in data.chunks(capacity).enumerate() {
            dev.write(blocks[i], 0, chunk)?;
            if let Some(&next) = blocks.get(i + 1) {
                dev.write_byte(blocks[i], capacity, next as u8)?;
            }
        }

        Ok(Placement::Chained {
            start: blocks[0],
            len: required,
        })
    }

    fn load<T: BlockStorage>(&self, dev: &T, placement: &Placement) -> Result<Vec<u8>> {
        let (start, len) = Self::span(placement)?;
        let block_size = dev.block_size();
        let capacity = block_size - 1;

        let blocks = Self::walk(dev, start, len)?;
        let mut content = Vec::with_capacity(len * block_size);
        for (i, &blocknr) in blocks.iter().enumerate() {
            let block = dev.read_block(blocknr)?;
            if i + 1 < blocks.len() {
                content.extend_from_slice(&block[..capacity]);
            } else {
                content.extend_from_slice(&block);
            }
        }
        Ok(content)
    }

    fn release<T: BlockStorage>(&self, dev: &mut T, placement: &Placement) -> Result<()> {
        let (start, len) = Self::span(placement)?;
        for blocknr in Self::walk(dev, start, len)? {
            dev.clear_block(blocknr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{create_test_device, payload};

    #[test]
    fn links_each_block_to_the_next() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(11);
        let data = payload(40);

        let placement = Chained.store(&mut dev, &mut free, &data).unwrap();
        let (start, len) = Chained::span(&placement).unwrap();
        assert_eq!(len, 3);

        let blocks = Chained::walk(&dev, start, len).unwrap();
        assert_eq!(dev.read_byte(blocks[0], 15).unwrap() as usize, blocks[1]);
        assert_eq!(dev.read_byte(blocks[1], 15).unwrap() as usize, blocks[2]);
        // 40 - 2 * 15 = 10 bytes in the last block, the rest untouched.
        assert_eq!(dev.read_byte(blocks[2], 15).unwrap(), 0);
        assert_eq!(&dev.read_block(blocks[2]).unwrap()[..10], &data[30..]);
    }

    #[test]
    fn load_returns_payload_followed_by_padding() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(5);
        let data = payload(20);

        let placement = Chained.store(&mut dev, &mut free, &data).unwrap();
        let content = Chained.load(&dev, &placement).unwrap();

        assert_eq!(content.len(), 15 + 16);
        assert_eq!(&content[..20], &data[..]);
        assert!(content[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn exact_multiple_of_capacity_fills_without_extra_block() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(2);

        let placement = Chained.store(&mut dev, &mut free, &payload(30)).unwrap();

        assert_eq!(placement.length(), Some(2));
        assert_eq!(free.count_free(&dev).unwrap(), 12);
    }

    #[test]
    fn release_clears_every_block_in_the_chain() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(9);

        let placement = Chained.store(&mut dev, &mut free, &payload(100)).unwrap();
        assert_eq!(free.count_free(&dev).unwrap(), 14 - 7);

        Chained.release(&mut dev, &placement).unwrap();
        assert_eq!(free.count_free(&dev).unwrap(), 14);
    }

    #[test]
    fn too_large_file_touches_nothing() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(1);

        let result = Chained.store(&mut dev, &mut free, &payload(151));

        match result.unwrap_err() {
            FsError::OutOfSpace { required: 11, .. } => (),
            e => panic!("unexpected error {:?}", e),
        }
        assert_eq!(free.count_free(&dev).unwrap(), 14);
    }

    #[test]
    fn shortage_of_free_blocks_touches_nothing() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(1);
        for blocknr in 2..12 {
            dev.write_byte(blocknr, 0, 0xaa).unwrap();
        }

        let result = Chained.store(&mut dev, &mut free, &payload(75));

        match result.unwrap_err() {
            FsError::OutOfSpace {
                required: 5,
                available: 4,
            } => (),
            e => panic!("unexpected error {:?}", e),
        }
        assert_eq!(free.count_free(&dev).unwrap(), 4);
    }

    #[test]
    fn empty_payload_owns_no_blocks() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(1);

        let placement = Chained.store(&mut dev, &mut free, &[]).unwrap();

        assert_eq!(placement, Placement::Chained { start: 0, len: 0 });
        assert!(Chained.load(&dev, &placement).unwrap().is_empty());
        Chained.release(&mut dev, &placement).unwrap();
    }

    #[test]
    fn broken_link_is_reported_before_clearing() {
        let mut dev = create_test_device();
        let mut free = FreeSpace::seeded(4);
        let placement = Chained.store(&mut dev, &mut free, &payload(40)).unwrap();
        let (start, _) = Chained::span(&placement).unwrap();

        // Point the first link at the file table block.
        dev.write_byte(start, 15, 0).unwrap();

        match Chained.release(&mut dev, &placement).unwrap_err() {
            FsError::Corrupt(_) => (),
            e => panic!("unexpected error {:?}", e),
        }
        assert!(!dev.is_zeroed(start).unwrap());
    }
}
