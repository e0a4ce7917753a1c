use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{FsError, Result};
use crate::io::{BlockNumber, BlockStorage};
use crate::{BITMAP_BLOCK, FAT_BLOCK, FIRST_DATA_BLOCK};

/// Random draws per device block before the picker gives up.
const PICK_ATTEMPTS_PER_BLOCK: usize = 64;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum State {
    Free,
    Used,
}

impl From<u8> for State {
    fn from(flag: u8) -> Self {
        match flag {
            0 => State::Free,
            _ => State::Used,
        }
    }
}

/// Tracks free space by looking at block contents. A block is free iff every byte in it is
/// zero, which means a payload block made entirely of zero bytes is indistinguishable from free
/// space.
///
/// The bitmap block is only a cache of that answer. Device writes set entries eagerly and
/// [`FreeSpace::rebuild`] is the one place that clears them.
pub struct FreeSpace {
    rng: StdRng,
}

impl FreeSpace {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// A picker whose choices repeat for the same seed and device contents.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_empty<T: BlockStorage>(&self, dev: &T, blocknr: BlockNumber) -> Result<bool> {
        dev.is_zeroed(blocknr)
    }

    /// Counts the empty blocks outside the reserved region.
    pub fn count_free<T: BlockStorage>(&self, dev: &T) -> Result<usize> {
        let mut free = 0;
        for blocknr in FIRST_DATA_BLOCK..dev.block_count() {
            if dev.is_zeroed(blocknr)? {
                free += 1;
            }
        }
        Ok(free)
    }

    /// Draws data block indices uniformly until one is empty and not already in `taken`.
    ///
    /// The device is not modified, so a block picked earlier in the same operation still looks
    /// empty; callers allocating several blocks pass the earlier picks in `taken`.
    pub fn pick_free<T: BlockStorage>(
        &mut self,
        dev: &T,
        taken: &[BlockNumber],
    ) -> Result<BlockNumber> {
        let count = dev.block_count();
        for _ in 0..count * PICK_ATTEMPTS_PER_BLOCK {
            let candidate = self.rng.gen_range(FIRST_DATA_BLOCK..count);
            if !taken.contains(&candidate) && dev.is_zeroed(candidate)? {
                return Ok(candidate);
            }
        }

        let free = self.count_free(dev)?;
        warn!(
            "gave up picking a free block after {} draws ({} free, {} already taken)",
            count * PICK_ATTEMPTS_PER_BLOCK,
            free,
            taken.len()
        );
        Err(FsError::OutOfSpace {
            required: taken.len() + 1,
            available: free,
        })
    }

    /// Picks `n` distinct empty blocks in draw order.
    pub fn pick_many<T: BlockStorage>(&mut self, dev: &T, n: usize) -> Result<Vec<BlockNumber>> {
        let mut picked = Vec::with_capacity(n);
        while picked.len() < n {
            let blocknr = self.pick_free(dev, &picked)?;
            picked.push(blocknr);
        }
        debug!("picked free blocks {:?}", picked);
        Ok(picked)
    }

    /// Returns the lowest index starting `needed` consecutive empty data blocks.
    pub fn find_contiguous_run<T: BlockStorage>(
        &self,
        dev: &T,
        needed: usize,
    ) -> Result<Option<BlockNumber>> {
        if needed == 0 {
            return Ok(Some(FIRST_DATA_BLOCK));
        }
        let mut run = 0;
        for blocknr in FIRST_DATA_BLOCK..dev.block_count() {
            if dev.is_zeroed(blocknr)? {
                run += 1;
                if run == needed {
                    return Ok(Some(blocknr + 1 - needed));
                }
            } else {
                run = 0;
            }
        }
        Ok(None)
    }

    /// Length of the longest run of empty data blocks.
    pub fn longest_run<T: BlockStorage>(&self, dev: &T) -> Result<usize> {
        let (mut run, mut longest) = (0, 0);
        for blocknr in FIRST_DATA_BLOCK..dev.block_count() {
            if dev.is_zeroed(blocknr)? {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        Ok(longest)
    }

    /// Recomputes the bitmap block from block contents.
    ///
    /// Data block entries reflect whether the block holds any nonzero byte. The entries for the
    /// two reserved blocks summarize the device: both are used iff some data block is used. Safe
    /// to call any number of times.
    pub fn rebuild<T: BlockStorage>(&self, dev: &mut T) -> Result<()> {
        let mut bitmap = vec![0; dev.block_size()];
        let mut used = 0;
        for blocknr in FIRST_DATA_BLOCK..dev.block_count() {
            if !dev.is_zeroed(blocknr)? {
                bitmap[blocknr] = 1;
                used += 1;
            }
        }
        if used > 0 {
            bitmap[FAT_BLOCK] = 1;
            bitmap[BITMAP_BLOCK] = 1;
        }
        dev.write(BITMAP_BLOCK, 0, &bitmap)?;
        debug!("rebuilt bitmap, {} data blocks used", used);
        Ok(())
    }

    /// Cached state of one block.
    pub fn state<T: BlockStorage>(&self, dev: &T, blocknr: BlockNumber) -> Result<State> {
        Ok(State::from(dev.read_byte(BITMAP_BLOCK, blocknr)?))
    }

    /// The cached bitmap, one flag per block, `true` meaning used.
    pub fn snapshot<T: BlockStorage>(&self, dev: &T) -> Result<Vec<bool>> {
        let mut flags = vec![0; dev.block_count()];
        dev.read(BITMAP_BLOCK, 0, &mut flags)?;
        Ok(flags.into_iter().map(|flag| flag != 0).collect())
    }
}

impl Default for FreeSpace {
    fn default() -> Self {
        Self::new()
    }
}
