use allocsim::io::{BlockStorage, MemDiskBuilder};
use allocsim::{report, AllocationType, Config, FsError, Placement, Volume, BITMAP_BLOCK};

fn letters(len: usize) -> Vec<u8> {
    b"abcdefghijklmnopqrstuvwxyz".iter().cycle().take(len).copied().collect()
}

fn create_volume(allocation: AllocationType) -> Volume<allocsim::io::MemDisk> {
    Volume::create(Config::new(allocation).with_seed(2024)).expect("Could not initialize volume.")
}

fn names(volume: &Volume<allocsim::io::MemDisk>) -> Vec<String> {
    volume
        .list_files()
        .unwrap()
        .into_iter()
        .map(|record| record.name)
        .collect()
}

#[test]
fn every_allocation_type_round_trips() {
    for &allocation in &[
        AllocationType::Chained,
        AllocationType::Indexed,
        AllocationType::Contiguous,
    ] {
        let mut volume = create_volume(allocation);
        let data = letters(4000);

        volume.write_file("round.md", &data).unwrap();

        assert_eq!(volume.read_file("round.md").unwrap(), data, "{}", allocation);
    }
}

#[test]
fn contiguous_file_takes_three_blocks_and_frees_them() {
    let mut volume = create_volume(AllocationType::Contiguous);
    assert_eq!(volume.free_block_count().unwrap(), 254);

    volume.write_file("hello.md", &letters(1100)).unwrap();

    let record = volume.lookup("hello.md").unwrap().unwrap();
    assert_eq!(record.placement, Placement::Contiguous { start: 2, len: 3 });
    assert_eq!(volume.free_block_count().unwrap(), 251);
    assert_eq!(volume.read_file("hello.md").unwrap(), letters(1100));

    volume.delete_file("hello.md").unwrap();

    assert_eq!(volume.free_block_count().unwrap(), 254);
    assert!(volume.list_files().unwrap().is_empty());
    match volume.read_file("hello.md").unwrap_err() {
        FsError::NotFound(_) => (),
        e => panic!("unexpected error {:?}", e),
    }
}

#[test]
fn indexed_file_spends_one_extra_block_on_its_index() {
    let mut volume = create_volume(AllocationType::Indexed);

    volume.write_file("hello.md", &letters(1100)).unwrap();

    assert_eq!(volume.free_block_count().unwrap(), 250);
    volume.delete_file("hello.md").unwrap();
    assert_eq!(volume.free_block_count().unwrap(), 254);
}

#[test]
fn chained_delete_then_write_keeps_table_sorted() {
    let mut volume = create_volume(AllocationType::Chained);

    volume.write_file("a.txt", &letters(700)).unwrap();
    volume.write_file("b.txt", &letters(300)).unwrap();
    volume.delete_file("a.txt").unwrap();
    volume.write_file("c.txt", &letters(900)).unwrap();

    assert_eq!(names(&volume), vec!["b.txt", "c.txt"]);
    assert_eq!(volume.read_file("b.txt").unwrap(), letters(300));
    assert_eq!(volume.read_file("c.txt").unwrap(), letters(900));
    assert_eq!(volume.free_block_count().unwrap(), 254 - 1 - 2);
}

#[test]
fn listing_is_sorted_by_name_after_every_write() {
    let mut volume = create_volume(AllocationType::Indexed);

    for name in &["zeta.md", "alpha.md", "mid.md", "beta.md"] {
        volume.write_file(name, &letters(20)).unwrap();
        let listed = names(&volume);
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
    }
    assert_eq!(names(&volume), vec!["alpha.md", "beta.md", "mid.md", "zeta.md"]);
}

#[test]
fn oversized_files_are_rejected_without_side_effects() {
    let cases = [
        (AllocationType::Chained, 10 * 511 + 1),
        (AllocationType::Indexed, 10 * 512 + 1),
        (AllocationType::Contiguous, 10 * 512 + 1),
    ];
    for &(allocation, len) in &cases {
        let mut volume = create_volume(allocation);
        volume.write_file("small.md", &letters(10)).unwrap();
        let free = volume.free_block_count().unwrap();

        match volume.write_file("big.bin", &letters(len)).unwrap_err() {
            FsError::OutOfSpace { required: 11, .. } => (),
            e => panic!("unexpected error {:?} for {}", e, allocation),
        }
        assert_eq!(volume.free_block_count().unwrap(), free);
        assert_eq!(names(&volume), vec!["small.md"]);
    }
}

#[test]
fn ten_block_files_are_accepted() {
    let mut volume = create_volume(AllocationType::Chained);
    let data = letters(10 * 511);

    volume.write_file("max.bin", &data).unwrap();

    assert_eq!(volume.free_block_count().unwrap(), 244);
    assert_eq!(volume.read_file("max.bin").unwrap(), data);
}

#[test]
fn fragmented_device_defeats_contiguous_but_not_chained() {
    let mut dev = MemDiskBuilder::new()
        .with_block_count(32)
        .with_block_size(64)
        .build()
        .unwrap();
    // Occupy every odd data block, leaving single block gaps.
    for blocknr in (3..32).step_by(2) {
        dev.write_byte(blocknr, 0, 0xee).unwrap();
    }

    let mut contiguous = Volume::open(dev.clone(), AllocationType::Contiguous, Some(5)).unwrap();
    assert_eq!(contiguous.free_block_count().unwrap(), 15);
    match contiguous.write_file("wide.md", &letters(100)).unwrap_err() {
        FsError::OutOfSpace {
            required: 2,
            available: 1,
        } => (),
        e => panic!("unexpected error {:?}", e),
    }
    assert_eq!(contiguous.free_block_count().unwrap(), 15);
    assert!(contiguous.list_files().unwrap().is_empty());

    let mut chained = Volume::open(dev, AllocationType::Chained, Some(5)).unwrap();
    chained.write_file("wide.md", &letters(100)).unwrap();
    assert_eq!(chained.free_block_count().unwrap(), 13);
    assert_eq!(chained.read_file("wide.md").unwrap(), letters(100));
}

#[test]
fn opening_a_device_rebuilds_its_bitmap() {
    let mut dev = MemDiskBuilder::new()
        .with_block_count(32)
        .with_block_size(64)
        .build()
        .unwrap();
    dev.write_byte(7, 10, 1).unwrap();
    dev.write_byte(9, 0, 1).unwrap();
    dev.clear_block(9).unwrap();

    let volume = Volume::open(dev, AllocationType::Indexed, None).unwrap();
    let bitmap = volume.bitmap_snapshot().unwrap();

    let used: Vec<_> = (0..bitmap.len()).filter(|&blocknr| bitmap[blocknr]).collect();
    assert_eq!(used, vec![0, 1, 7]);
    assert_eq!(
        volume.read_block(BITMAP_BLOCK).unwrap()[..32].iter().filter(|&&b| b == 1).count(),
        3
    );
}

#[test]
fn reports_reflect_volume_state() {
    let mut volume = create_volume(AllocationType::Contiguous);
    volume.write_file("hello.md", &letters(1100)).unwrap();

    let table = report::file_table(volume.allocation(), &volume.list_files().unwrap());
    assert!(table.lines().any(|line| line.starts_with("hello.md") && line.ends_with('3')));

    let bitmap = report::bitmap(&volume.bitmap_snapshot().unwrap());
    assert_eq!(bitmap.lines().count(), 8);
    assert!(bitmap.starts_with("11111000"));

    let dump = report::block_dump(&volume.read_block(2).unwrap());
    assert_eq!(dump.lines().count(), 16);
    assert!(dump.starts_with(" 97  98  99"));
}

#[test]
fn repeated_bitmap_rebuilds_agree_after_a_delete() {
    let mut volume = create_volume(AllocationType::Chained);
    volume.write_file("abcde ", &letters(600)).unwrap();
    volume.write_file("Zeta1", &letters(1200)).unwrap();
    volume.write_file("alpha", &letters(40)).unwrap();

    volume.delete_file("abcde").unwrap();
    volume.rebuild_bitmap().unwrap();
    let first = volume.bitmap_snapshot().unwrap();
    volume.rebuild_bitmap().unwrap();

    assert_eq!(volume.bitmap_snapshot().unwrap(), first);
    assert_eq!(first.iter().filter(|&&used| used).count(), 2 + 3 + 1);
    assert!(!volume.contains("abcde").unwrap());
    assert!(volume.contains("ZETA1").unwrap());
    assert!(volume.contains("alpha").unwrap());
    assert_eq!(names(&volume), vec!["Zeta1", "alpha"]);
}
