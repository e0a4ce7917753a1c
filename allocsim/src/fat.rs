use std::fmt;

use log::debug;
use zerocopy::{AsBytes, FromBytes, LayoutVerified};

use crate::config::AllocationType;
use crate::error::{FsError, Result};
use crate::io::{BlockNumber, BlockStorage};
use crate::{FAT_BLOCK, NAME_LEN};

/// On-disk shape of one record. Indexed tables only store the first nine bytes.
#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy)]
struct RawRecord {
    name: [u8; NAME_LEN],
    block: u8,
    length: u8,
}

const RAW_RECORD_SIZE: usize = NAME_LEN + 2;

/// Where a file's blocks live. What the record's block byte means depends on the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First block of a linked chain and the number of blocks in it.
    Chained { start: BlockNumber, len: usize },
    /// Block holding the ordered list of data blocks.
    Indexed { index_block: BlockNumber },
    /// First block of an uninterrupted run and the run length.
    Contiguous { start: BlockNumber, len: usize },
}

impl Placement {
    fn decode(allocation: AllocationType, block: u8, length: u8) -> Self {
        let block = block as BlockNumber;
        let len = length as usize;
        match allocation {
            AllocationType::Chained => Placement::Chained { start: block, len },
            AllocationType::Indexed => Placement::Indexed { index_block: block },
            AllocationType::Contiguous => Placement::Contiguous { start: block, len },
        }
    }

    /// The block the record points at: a start block or an index block. 0 means the file owns
    /// no blocks.
    pub fn primary(&self) -> BlockNumber {
        match *self {
            Placement::Chained { start, .. } | Placement::Contiguous { start, .. } => start,
            Placement::Indexed { index_block } => index_block,
        }
    }

    /// Block count for layouts that store one.
    pub fn length(&self) -> Option<usize> {
        match *self {
            Placement::Chained { len, .. } | Placement::Contiguous { len, .. } => Some(len),
            Placement::Indexed { .. } => None,
        }
    }

    pub fn allocation(&self) -> AllocationType {
        match self {
            Placement::Chained { .. } => AllocationType::Chained,
            Placement::Indexed { .. } => AllocationType::Indexed,
            Placement::Contiguous { .. } => AllocationType::Contiguous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub placement: Placement,
}

impl FileRecord {
    pub fn new<S: Into<String>>(name: S, placement: Placement) -> Self {
        Self {
            name: name.into(),
            placement,
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    fn encode(&self) -> Result<RawRecord> {
        check_name(&self.name)?;
        let mut raw = RawRecord {
            name: [0; NAME_LEN],
            block: to_byte(self.placement.primary(), "block")?,
            length: 0,
        };
        raw.name[..self.name.len()].copy_from_slice(self.name.as_bytes());
        if let Some(len) = self.placement.length() {
            raw.length = to_byte(len, "block count")?;
        }
        Ok(raw)
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placement.length() {
            Some(len) => write!(
                f,
                "{:?} start block {} length {}",
                self.name,
                self.placement.primary(),
                len
            ),
            None => write!(f, "{:?} index block {}", self.name, self.placement.primary()),
        }
    }
}

fn to_byte(value: usize, what: &str) -> Result<u8> {
    if value > u8::MAX as usize {
        return Err(FsError::Corrupt(format!(
            "{} {} does not fit a record",
            what, value
        )));
    }
    Ok(value as u8)
}

/// Rejects names the record layout cannot hold: empty, longer than eight bytes, containing NUL,
/// or starting with whitespace (those would read back as a different or empty name).
pub fn check_name(name: &str) -> Result<()> {
    let starts_blank = name.chars().next().map_or(true, char::is_whitespace);
    if starts_blank || name.len() > NAME_LEN || name.bytes().any(|b| b == 0) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// The packed directory kept in the reserved file table block.
///
/// Records sit back to back from offset 0. A slot is occupied iff its first name byte is
/// nonzero. Removal zeroes a slot in place and leaves a gap; [`FileTable::repack`] closes it and
/// must run before the next [`FileTable::append`].
pub struct FileTable {
    allocation: AllocationType,
    record_size: usize,
    capacity: usize,
}

impl FileTable {
    pub fn new(allocation: AllocationType, block_size: usize) -> Self {
        let record_size = allocation.record_size();
        Self {
            allocation,
            record_size,
            capacity: block_size / record_size,
        }
    }

    /// Maximum number of records the block holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn offset(&self, slot: usize) -> usize {
        slot * self.record_size
    }

    fn read_raw<T: BlockStorage>(&self, dev: &T, slot: usize) -> Result<RawRecord> {
        let mut buf = [0; RAW_RECORD_SIZE];
        dev.read(FAT_BLOCK, self.offset(slot), &mut buf[..self.record_size])?;
        let raw = LayoutVerified::<_, RawRecord>::new(&buf[..])
            .map(|record| *record)
            .ok_or_else(|| FsError::Corrupt("misaligned file table record".to_string()))?;
        Ok(raw)
    }

    fn write_raw<T: BlockStorage>(&self, dev: &mut T, slot: usize, raw: &RawRecord) -> Result<()> {
        dev.write(FAT_BLOCK, self.offset(slot), &raw.as_bytes()[..self.record_size])
    }

    /// Occupied slots in storage order. Stops at the first occupied slot whose name reads back
    /// blank, which is treated as the end of the table.
    fn slots<T: BlockStorage>(&self, dev: &T) -> Result<Vec<(usize, FileRecord)>> {
        let mut found = Vec::new();
        for slot in 0..self.capacity {
            let raw = self.read_raw(dev, slot)?;
            if raw.name[0] == 0 {
                continue;
            }
            let end = raw.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
            let name = String::from_utf8_lossy(&raw.name[..end]).trim().to_string();
            if name.is_empty() {
                break;
            }
            let placement = Placement::decode(self.allocation, raw.block, raw.length);
            found.push((slot, FileRecord::new(name, placement)));
        }
        Ok(found)
    }

    /// Records in the order they are stored.
    pub fn scan<T: BlockStorage>(&self, dev: &T) -> Result<Vec<FileRecord>> {
        Ok(self
            .slots(dev)?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Case-insensitive lookup on the trimmed name. Returns a copy of the record.
    pub fn lookup<T: BlockStorage>(&self, dev: &T, name: &str) -> Result<Option<FileRecord>> {
        Ok(self
            .scan(dev)?
            .into_iter()
            .find(|record| record.matches(name)))
    }

    /// Writes the record into the slot right after the current last record. Assumes the table
    /// has no gaps.
    pub fn append<T: BlockStorage>(&self, dev: &mut T, record: &FileRecord) -> Result<()> {
        let slot = self.scan(dev)?.len();
        if slot >= self.capacity {
            return Err(FsError::TableFull(self.capacity));
        }
        let raw = record.encode()?;
        self.write_raw(dev, slot, &raw)?;
        debug!("appended {} at slot {}", record, slot);
        Ok(())
    }

    /// Zeroes the named record in place. Returns false when no record matches.
    pub fn remove<T: BlockStorage>(&self, dev: &mut T, name: &str) -> Result<bool> {
        let slot = self
            .slots(dev)?
            .into_iter()
            .find(|(_, record)| record.matches(name))
            .map(|(slot, _)| slot);
        match slot {
            Some(slot) => {
                let zeroes = vec![0; self.record_size];
                dev.write(FAT_BLOCK, self.offset(slot), &zeroes)?;
                debug!("cleared file table slot {}", slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rewrites the table sorted by name, then primary block, with no gaps.
    pub fn repack<T: BlockStorage>(&self, dev: &mut T) -> Result<()> {
        let mut occupied = Vec::new();
        for slot in 0..self.capacity {
            if dev.read_byte(FAT_BLOCK, self.offset(slot))? != 0 {
                occupied.push(slot);
            }
        }

        // A lone record only needs to move to the front.
        if occupied.len() == 1 {
            let slot = occupied[0];
            if slot > 0 {
                let raw = self.read_raw(dev, slot)?;
                self.write_raw(dev, 0, &raw)?;
                let zeroes = vec![0; self.record_size];
                dev.write(FAT_BLOCK, self.offset(slot), &zeroes)?;
                debug!("moved lone file table record from slot {} to 0", slot);
            }
            return Ok(());
        }

        let mut records = self.scan(dev)?;
        records.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.placement.primary().cmp(&b.placement.primary()))
        });
        let encoded = records
            .iter()
            .map(FileRecord::encode)
            .collect::<Result<Vec<_>>>()?;

        dev.clear_block(FAT_BLOCK)?;
        for (slot, raw) in encoded.iter().enumerate() {
            self.write_raw(dev, slot, raw)?;
        }
        debug!("repacked file table with {} records", encoded.len());
        Ok(())
    }
}
