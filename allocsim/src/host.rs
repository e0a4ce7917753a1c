//! Copies whole files between the host file system and a volume.
use std::fs;
use std::path::Path;

use log::info;

use crate::error::{FsError, Result};
use crate::fs::Volume;
use crate::io::BlockStorage;
use crate::NAME_LEN;

/// Shortest name accepted on import.
pub const MIN_NAME_LEN: usize = 5;

/// Names accepted on import: 5 to 8 bytes once trimmed, e.g. `"text.txt"`.
pub fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LEN..=NAME_LEN).contains(&name.trim().len())
}

/// Stores the host file at `src` in the volume under `name`.
pub fn import<T, P>(volume: &mut Volume<T>, src: P, name: &str) -> Result<()>
where
    T: BlockStorage,
    P: AsRef<Path>,
{
    let name = name.trim();
    if !is_valid_name(name) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    let content = fs::read(src.as_ref())?;
    volume.write_file(name, &content)?;
    info!("imported {} as {}", src.as_ref().display(), name);
    Ok(())
}

/// Writes the volume file `name` to `dest`, replacing whatever is there.
pub fn export<T, P>(volume: &Volume<T>, name: &str, dest: P) -> Result<()>
where
    T: BlockStorage,
    P: AsRef<Path>,
{
    let content = volume.read_file(name)?;
    fs::write(dest.as_ref(), &content)?;
    info!("exported {} to {}", name, dest.as_ref().display());
    Ok(())
}
