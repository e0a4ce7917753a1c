//! Plain text renderings of volume state.
use crate::config::AllocationType;
use crate::fat::FileRecord;

const BITMAP_ROW: usize = 32;
const DUMP_ROW: usize = 32;

/// The file table as a fixed width listing. Chained and contiguous tables show start block and
/// length, indexed tables the index block.
pub fn file_table(allocation: AllocationType, records: &[FileRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        out.push_str("There are no file records in the file table.\n");
        return out;
    }

    let (rule, header) = match allocation {
        AllocationType::Indexed => (
            "-".repeat(30),
            format!("{:<15}{:>15}", "File Name", "Index Block"),
        ),
        AllocationType::Chained | AllocationType::Contiguous => (
            "-".repeat(40),
            format!("{:<15}{:>15}{:>10}", "File Name", "Start Block", "Length"),
        ),
    };
    out.push_str(&format!("{}\n{}\n{}\n", rule, header, rule));

    for record in records {
        let primary = record.placement.primary();
        let row = match record.placement.length() {
            Some(len) => format!("{:<15}{:>15}{:>10}\n", record.name, primary, len),
            None => format!("{:<15}{:>15}\n", record.name, primary),
        };
        out.push_str(&row);
    }
    out
}

/// One `0`/`1` per block, 32 blocks per row.
pub fn bitmap(flags: &[bool]) -> String {
    let mut out = String::with_capacity(flags.len() + flags.len() / BITMAP_ROW + 1);
    for row in flags.chunks(BITMAP_ROW) {
        for &used in row {
            out.push(if used { '1' } else { '0' });
        }
        out.push('\n');
    }
    out
}

/// Unsigned byte values, right aligned in three columns, 32 per row.
pub fn block_dump(block: &[u8]) -> String {
    let mut out = String::with_capacity(block.len() * 4);
    for row in block.chunks(DUMP_ROW) {
        let line = row
            .iter()
            .map(|b| format!("{:>3}", b))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
