mod block;
mod memdisk;

pub use block::{BlockNumber, BlockStorage};
pub use memdisk::{MemDisk, MemDiskBuilder};
