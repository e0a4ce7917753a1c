use std::env;
use std::error::Error;

use allocsim::{report, AllocationType, Config, Volume, BITMAP_BLOCK};

pub fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let allocation = match args.get(1) {
        Some(arg) => arg.parse::<AllocationType>()?,
        None => AllocationType::Chained,
    };

    let mut volume = Volume::create(Config::new(allocation))?;
    println!("{} allocation, {} free blocks", allocation, volume.free_block_count()?);

    let letters: Vec<u8> = b"abcdefghijklmnopqrstuvwxyz"
        .iter()
        .cycle()
        .take(1100)
        .copied()
        .collect();
    volume.write_file("hello.md", &letters)?;
    volume.write_file("tiny.txt", b"tiny")?;
    volume.write_file("notes", &letters[..600])?;
    print!("{}", report::file_table(allocation, &volume.list_files()?));
    print!("{}", report::bitmap(&volume.bitmap_snapshot()?));

    let first = volume.lookup("hello.md")?.map(|record| record.placement.primary());
    if let Some(blocknr) = first {
        println!("block {}:", blocknr);
        print!("{}", report::block_dump(&volume.read_block(blocknr)?));
    }

    volume.delete_file("hello.md")?;
    println!("deleted hello.md, {} free blocks", volume.free_block_count()?);
    print!("{}", report::file_table(allocation, &volume.list_files()?));
    println!("bitmap block:");
    print!("{}", report::block_dump(&volume.read_block(BITMAP_BLOCK)?));

    Ok(())
}
