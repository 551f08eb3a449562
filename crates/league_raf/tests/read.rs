use std::fs;

use league_raf::error::Error;
use league_raf::{entry_hash, Codec, RafArchive};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

/// Builds a synthetic index buffer for entries of (name, offset, size).
fn build_index(entries: &[(&str, u32, u32)]) -> Vec<u8> {
    let file_list_offset = 20u32;
    let count = entries.len() as u32;
    let string_table_offset = file_list_offset + 4 + count * 16;

    let mut buffer = Vec::new();
    buffer.extend_from_slice(&0x18BE_0EF0u32.to_le_bytes());
    buffer.extend_from_slice(&1u32.to_le_bytes());
    buffer.extend_from_slice(&0u32.to_le_bytes());
    buffer.extend_from_slice(&file_list_offset.to_le_bytes());
    buffer.extend_from_slice(&string_table_offset.to_le_bytes());

    buffer.extend_from_slice(&count.to_le_bytes());
    for (index, (name, offset, size)) in entries.iter().enumerate() {
        buffer.extend_from_slice(&entry_hash(name).to_le_bytes());
        buffer.extend_from_slice(&offset.to_le_bytes());
        buffer.extend_from_slice(&size.to_le_bytes());
        buffer.extend_from_slice(&(index as u32).to_le_bytes());
    }

    // Slots first, string bytes after them.
    let slots_len = 8 + count * 8;
    let mut slot_bytes = Vec::new();
    let mut string_bytes = Vec::new();
    for (name, _, _) in entries {
        let rel = slots_len + string_bytes.len() as u32;
        slot_bytes.extend_from_slice(&rel.to_le_bytes());
        slot_bytes.extend_from_slice(&((name.len() + 1) as u32).to_le_bytes());
        string_bytes.extend_from_slice(name.as_bytes());
        string_bytes.push(0);
    }
    buffer.extend_from_slice(&(slots_len + string_bytes.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&count.to_le_bytes());
    buffer.extend_from_slice(&slot_bytes);
    buffer.extend_from_slice(&string_bytes);
    buffer
}

#[traced_test]
#[test]
fn parse_resolves_entries_from_the_string_table() -> league_raf::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let index_path = dir.path().join("archive.raf");
    fs::write(
        &index_path,
        build_index(&[
            ("DATA/misc/keep.bin", 0, 1000),
            ("DATA/textures/a.dds", 1000, 50),
        ]),
    )?;

    let archive = RafArchive::open(&index_path)?;
    assert_eq!(archive.len(), 2);
    assert_eq!(archive.version(), 1);

    let triples: Vec<(&str, u32, u32)> = archive
        .entries()
        .map(|e| (e.name.as_str(), e.offset, e.size))
        .collect();
    assert_eq!(
        triples,
        vec![
            ("DATA/misc/keep.bin", 0, 1000),
            ("DATA/textures/a.dds", 1000, 50),
        ]
    );

    let entry = archive.entry("DATA/textures/a.dds").unwrap();
    assert_eq!(entry.short_name(), "a.dds");
    assert_eq!(entry.hash, entry_hash("DATA/textures/a.dds"));
    assert!(archive.entry("DATA/absent.bin").is_none());
    assert_eq!(archive.data_path(), dir.path().join("archive.raf.dat"));

    Ok(())
}

#[traced_test]
#[test]
fn reparsing_rederived_records_is_stable() -> league_raf::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let entries = [
        ("DATA/Characters/Aatrox/Aatrox.skn", 0u32, 321u32),
        ("DATA/Characters/Aatrox/Aatrox.dds", 321, 17),
        ("DATA/Menu/fiddlesticks.luaobj", 338, 4096),
    ];

    let first_path = dir.path().join("first.raf");
    fs::write(&first_path, build_index(&entries))?;
    let first = RafArchive::open(&first_path)?;

    // Rebuild an index from the parsed triples and parse it again.
    let rederived: Vec<(String, u32, u32)> = first
        .entries()
        .map(|e| (e.name.clone(), e.offset, e.size))
        .collect();
    let rederived: Vec<(&str, u32, u32)> = rederived
        .iter()
        .map(|(name, offset, size)| (name.as_str(), *offset, *size))
        .collect();

    let second_path = dir.path().join("second.raf");
    fs::write(&second_path, build_index(&rederived))?;
    let second = RafArchive::open(&second_path)?;

    let first_triples: Vec<(String, u32, u32)> = first
        .entries()
        .map(|e| (e.name.clone(), e.offset, e.size))
        .collect();
    let second_triples: Vec<(String, u32, u32)> = second
        .entries()
        .map(|e| (e.name.clone(), e.offset, e.size))
        .collect();
    assert_eq!(first_triples, second_triples);

    Ok(())
}

#[traced_test]
#[test]
fn bad_magic_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("archive.raf");
    let mut buffer = build_index(&[("DATA/a.bin", 0, 4)]);
    buffer[..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    fs::write(&index_path, buffer).unwrap();

    let result = RafArchive::open(&index_path);
    assert!(matches!(result, Err(Error::InvalidIndex(_))));
}

#[traced_test]
#[test]
fn disagreeing_table_counts_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("archive.raf");
    let mut buffer = build_index(&[("DATA/a.bin", 0, 4)]);
    // Bump the string table count so it no longer matches the file list.
    let string_table_offset = 20 + 4 + 16;
    buffer[string_table_offset + 4..string_table_offset + 8]
        .copy_from_slice(&2u32.to_le_bytes());
    fs::write(&index_path, buffer).unwrap();

    let result = RafArchive::open(&index_path);
    assert!(matches!(result, Err(Error::InvalidIndex(_))));
}

#[traced_test]
#[test]
fn entry_bytes_inflates_compressed_payloads() -> league_raf::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut codec = Codec::new();

    let plain = b"uncompressed payload".to_vec();
    let secret = b"the compressed payload".to_vec();
    let deflated = codec.compress(&secret)?;

    let mut data = plain.clone();
    data.extend_from_slice(&deflated);

    let index_path = dir.path().join("archive.raf");
    fs::write(
        &index_path,
        build_index(&[
            ("DATA/plain.bin", 0, plain.len() as u32),
            ("DATA/secret.bin", plain.len() as u32, deflated.len() as u32),
        ]),
    )?;
    fs::write(dir.path().join("archive.raf.dat"), &data)?;

    let mut archive = RafArchive::open(&index_path)?;
    assert_eq!(archive.entry_bytes("DATA/plain.bin")?, plain);
    assert_eq!(archive.entry_bytes("DATA/secret.bin")?, secret);

    let entry = archive.entry("DATA/secret.bin").unwrap().clone();
    assert_eq!(archive.entry_raw_bytes(&entry)?, deflated);

    Ok(())
}
