use std::fs;
use std::path::Path;

use league_manifest::error::Error;
use league_manifest::ReleaseManifest;
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

/// Builds a synthetic manifest buffer.
///
/// Directories are (name index, subdir index, subdir count, file index,
/// file count); files are (name index, version, size, compressed size).
fn build_manifest(
    dirs: &[(u32, u32, u32, u32, u32)],
    files: &[(u32, u32, u32, u32)],
    strings: &[&str],
) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&0x4D53_4C52u32.to_le_bytes());
    buffer.extend_from_slice(&0x0001_0001u32.to_le_bytes());
    buffer.extend_from_slice(&(files.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&33u32.to_le_bytes());

    buffer.extend_from_slice(&(dirs.len() as u32).to_le_bytes());
    for (name, subdir_index, subdir_count, file_index, file_count) in dirs {
        buffer.extend_from_slice(&name.to_le_bytes());
        buffer.extend_from_slice(&subdir_index.to_le_bytes());
        buffer.extend_from_slice(&subdir_count.to_le_bytes());
        buffer.extend_from_slice(&file_index.to_le_bytes());
        buffer.extend_from_slice(&file_count.to_le_bytes());
    }

    buffer.extend_from_slice(&(files.len() as u32).to_le_bytes());
    for (name, version, size, compressed_size) in files {
        buffer.extend_from_slice(&name.to_le_bytes());
        buffer.extend_from_slice(&version.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 16]);
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(&size.to_le_bytes());
        buffer.extend_from_slice(&compressed_size.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
    }

    let data_size: usize = strings.iter().map(|s| s.len() + 1).sum();
    buffer.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&(data_size as u32).to_le_bytes());
    for string in strings {
        buffer.extend_from_slice(string.as_bytes());
        buffer.push(0);
    }
    buffer
}

/// A root with two subdirectories, one of them nested, plus a file the walk
/// passes over and a trailing file claimed by no directory.
fn sample_manifest() -> Vec<u8> {
    build_manifest(
        &[
            (0, 1, 2, 0, 1), // root, owns f0
            (1, 3, 1, 1, 1), // D1, owns f1
            (2, 0, 0, 4, 1), // DX, owns f4
            (3, 0, 0, 2, 1), // D1/D2, owns f2
        ],
        &[
            (4, 1, 10, 10), // /root.txt
            (5, 1, 20, 15), // /D1/b.bin
            (6, 1, 80, 44), // /D1/D2/a.dds
            (7, 1, 5, 5),   // /gap.txt, between declared ranges
            (8, 1, 9, 9),   // /DX/x.dat
            (9, 1, 7, 7),   // stray.luaobj, past every declared range
        ],
        &[
            "", "D1", "DX", "D2", "root.txt", "b.bin", "a.dds", "gap.txt", "x.dat",
            "stray.luaobj",
        ],
    )
}

fn write_manifest(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("releasemanifest");
    fs::write(&path, sample_manifest()).unwrap();
    path
}

#[traced_test]
#[test]
fn tree_reconstruction_assigns_every_parent() -> league_manifest::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = ReleaseManifest::open(write_manifest(dir.path()))?;

    assert_eq!(manifest.len(), 6);
    assert_eq!(manifest.item_count(), 6);
    assert_eq!(manifest.version(), 33);
    assert_eq!(manifest.directories().len(), 4);

    let parents: Vec<Option<usize>> = manifest.files().iter().map(|f| f.parent).collect();
    assert_eq!(
        parents,
        vec![Some(0), Some(1), Some(3), Some(0), Some(2), None]
    );

    let paths: Vec<&str> = manifest.file_paths().collect();
    assert_eq!(
        paths,
        vec![
            "/root.txt",
            "/D1/b.bin",
            "/D1/D2/a.dds",
            "/gap.txt",
            "/DX/x.dat",
            "stray.luaobj",
        ]
    );

    let nested = manifest.file_by_path("/D1/D2/a.dds").unwrap();
    assert_eq!(nested.name, "a.dds");
    assert_eq!(nested.size, 80);
    assert_eq!(nested.compressed_size, 44);
    assert!(manifest.file_by_path("/D1/absent.bin").is_none());

    // Directory children follow the walk order.
    assert_eq!(manifest.directories()[0].files, vec![0, 3]);
    assert_eq!(manifest.directories()[3].files, vec![2]);

    Ok(())
}

#[traced_test]
#[test]
fn opening_takes_a_one_time_snapshot() -> league_manifest::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_manifest(dir.path());
    let backup = dir.path().join("releasemanifest.bak");
    let original = fs::read(&path)?;

    {
        let mut manifest = ReleaseManifest::open(&path)?;
        assert_eq!(fs::read(&backup)?, original);
        manifest.set_size("/D1/D2/a.dds", 99, 123)?;
        manifest.flush()?;
    }

    // A second open must not overwrite the snapshot with the patched file.
    let _ = ReleaseManifest::open(&path)?;
    assert_eq!(fs::read(&backup)?, original);
    assert_ne!(fs::read(&path)?, original);

    Ok(())
}

#[traced_test]
#[test]
fn set_size_writes_through_the_mapping() -> league_manifest::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_manifest(dir.path());
    let mut manifest = ReleaseManifest::open(&path)?;

    // A key without the leading separator is normalized.
    manifest.set_size("D1/D2/a.dds", 99, 123)?;
    manifest.flush()?;

    let entry = manifest.file_by_path("/D1/D2/a.dds").unwrap();
    assert_eq!(entry.size, 123);
    assert_eq!(entry.compressed_size, 99);

    // f2 is the third file record: header, dir table, file count, two records.
    let record_offset = 16 + 4 + 4 * 20 + 4 + 2 * 44;
    let bytes = fs::read(&path)?;
    let at = record_offset + 28;
    assert_eq!(bytes[at..at + 4], 123u32.to_le_bytes());
    assert_eq!(bytes[at + 4..at + 8], 99u32.to_le_bytes());

    // The patched file still parses to the same tree.
    drop(manifest);
    let reopened = ReleaseManifest::open(&path)?;
    assert_eq!(reopened.file_by_path("/D1/D2/a.dds").unwrap().size, 123);

    Ok(())
}

#[traced_test]
#[test]
fn set_size_is_a_noop_when_the_compressed_size_matches(
) -> league_manifest::error::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_manifest(dir.path());
    let before = fs::read(&path)?;
    let mut manifest = ReleaseManifest::open(&path)?;

    // Same compressed size, different uncompressed size: nothing happens.
    manifest.set_size("/D1/D2/a.dds", 44, 5555)?;
    manifest.flush()?;

    assert_eq!(fs::read(&path)?, before);
    assert_eq!(manifest.file_by_path("/D1/D2/a.dds").unwrap().size, 80);

    Ok(())
}

#[traced_test]
#[test]
fn set_size_rejects_sizes_over_the_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_manifest(dir.path());
    let mut manifest = ReleaseManifest::open(&path).unwrap();

    let result = manifest.set_size("/D1/D2/a.dds", 76 * 1024 * 1024, 80);
    assert!(matches!(result, Err(Error::SanityCheck(_))));

    let result = manifest.set_size("/DATA/absent.dds", 1, 1);
    assert!(matches!(result, Err(Error::PathNotFound(_))));
}

#[traced_test]
#[test]
fn bad_magics_are_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let mut wrong_magic = sample_manifest();
    wrong_magic[..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    let path = dir.path().join("wrong_magic");
    fs::write(&path, wrong_magic).unwrap();
    assert!(matches!(
        ReleaseManifest::open(&path),
        Err(Error::InvalidManifest(_))
    ));

    let mut wrong_type = sample_manifest();
    wrong_type[4..8].copy_from_slice(&0x0002_0002u32.to_le_bytes());
    let path = dir.path().join("wrong_type");
    fs::write(&path, wrong_type).unwrap();
    assert!(matches!(
        ReleaseManifest::open(&path),
        Err(Error::InvalidManifest(_))
    ));
}
