use log::{debug, info};

use crate::alloc::FreeSpace;
use crate::config::{check_geometry, AllocationType, Config};
use crate::error::{FsError, Result};
use crate::fat::{check_name, FileRecord, FileTable};
use crate::io::{BlockNumber, BlockStorage, MemDisk, MemDiskBuilder};

/// A simulated volume: one block device, the file table in block 0, the free space bitmap in
/// block 1 and a single allocation policy for every file.
///
/// # Layout
/// ==========================================================
/// | File table | Bitmap (one byte per block) | Data region |
/// ==========================================================
///
/// Every operation runs to completion against the owned device; there is no concurrent access.
pub struct Volume<T: BlockStorage> {
    dev: T,
    allocation: AllocationType,
    table: FileTable,
    free: FreeSpace,
}

impl Volume<MemDisk> {
    /// Stands up a zeroed in-memory device with the configured geometry.
    pub fn create(config: Config) -> Result<Self> {
        let dev = MemDiskBuilder::new()
            .with_block_count(config.block_count)
            .with_block_size(config.block_size)
            .build()?;
        Self::open(dev, config.allocation, config.seed)
    }
}

impl<T: BlockStorage> Volume<T> {
    /// Mounts a device as is. Whatever the file table block already holds is taken as the
    /// table for `allocation`.
    pub fn open(mut dev: T, allocation: AllocationType, seed: Option<u64>) -> Result<Self> {
        check_geometry(dev.block_count(), dev.block_size())?;
        let table = FileTable::new(allocation, dev.block_size());
        let free = match seed {
            Some(seed) => FreeSpace::seeded(seed),
            None => FreeSpace::new(),
        };
        free.rebuild(&mut dev)?;
        debug!(
            "opened {} volume: {} blocks of {} bytes, {} table slots",
            allocation,
            dev.block_count(),
            dev.block_size(),
            table.capacity()
        );

        Ok(Volume {
            dev,
            allocation,
            table,
            free,
        })
    }

    pub fn allocation(&self) -> AllocationType {
        self.allocation
    }

    /// Maximum number of files the table can hold.
    pub fn table_capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn into_device(self) -> T {
        self.dev
    }

    /// Stores a new file.
    ///
    /// Fails without modifying anything when the name is taken or cannot be encoded, the table
    /// is full, the file needs more than ten blocks, or the device lacks the space the layout
    /// requires.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        check_name(name)?;
        if self.table.lookup(&self.dev, name)?.is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        if self.table.scan(&self.dev)?.len() >= self.table.capacity() {
            return Err(FsError::TableFull(self.table.capacity()));
        }

        let placement = self.allocation.store(&mut self.dev, &mut self.free, data)?;
        let record = FileRecord::new(name, placement);
        self.table.append(&mut self.dev, &record)?;
        self.table.repack(&mut self.dev)?;
        self.free.rebuild(&mut self.dev)?;

        info!("wrote {} ({} bytes)", record, data.len());
        Ok(())
    }

    /// Returns a file's content with trailing zero bytes removed.
    ///
    /// Blocks are read whole, so padding and genuine trailing zeros in the payload cannot be
    /// told apart; both are dropped.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let record = self.find(name)?;
        let mut content = self.allocation.load(&self.dev, &record.placement)?;
        let end = content.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
        content.truncate(end);
        Ok(content)
    }

    /// Clears a file's blocks and drops its record from the table.
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        let record = self.find(name)?;
        self.allocation.release(&mut self.dev, &record.placement)?;
        self.table.remove(&mut self.dev, &record.name)?;
        self.table.repack(&mut self.dev)?;
        self.free.rebuild(&mut self.dev)?;

        info!("deleted {}", record);
        Ok(())
    }

    /// All records in table order, which is sorted by name.
    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.table.scan(&self.dev)
    }

    pub fn lookup(&self, name: &str) -> Result<Option<FileRecord>> {
        self.table.lookup(&self.dev, name)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.lookup(name)?.is_some())
    }

    /// Empty blocks in the data region, counted from block contents rather than the bitmap.
    pub fn free_block_count(&self) -> Result<usize> {
        self.free.count_free(&self.dev)
    }

    /// The cached bitmap, one flag per block. Accurate after any volume operation, since each
    /// one ends with a rebuild.
    pub fn bitmap_snapshot(&self) -> Result<Vec<bool>> {
        self.free.snapshot(&self.dev)
    }

    pub fn rebuild_bitmap(&mut self) -> Result<()> {
        self.free.rebuild(&mut self.dev)
    }

    /// Raw copy of any block, reserved ones included.
    pub fn read_block(&self, blocknr: BlockNumber) -> Result<Vec<u8>> {
        self.dev.read_block(blocknr)
    }

    fn find(&self, name: &str) -> Result<FileRecord> {
        self.table
            .lookup(&self.dev, name)?
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }
}
