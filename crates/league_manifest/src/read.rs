//! Types for reading and patching release manifests
//!

use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use binrw::BinRead;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use indexmap::IndexMap;
use memmap2::{MmapMut, MmapOptions};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::types::{DirRecord, FileRecord, ManifestHeader, MANIFEST_FILE_TYPE, MANIFEST_MAGIC};

/// Largest size a manifest file entry can plausibly record.
const MAX_ENTRY_SIZE: u32 = 75 * 1024 * 1024;

/// Byte length of the fixed header.
const HEADER_LEN: usize = 16;

/// Lowest byte offset a file record can occupy: the fixed header plus the
/// directory and file table counts.
const MIN_RECORD_OFFSET: usize = HEADER_LEN + 8;

/// Offset of the size fields inside a file record, past the name index,
/// version, checksum and flags.
const SIZE_FIELD_OFFSET: usize = 28;

/// One directory of the manifest tree.
///
/// Parent and file links are arena indices into the manifest's directory and
/// file arrays, inferred from the depth-first range layout at parse time.
#[derive(Debug)]
pub struct DirEntry {
    /// Directory name; empty for the root
    pub name: String,
    /// Index of the parent directory, none for the root
    pub parent: Option<usize>,
    /// Indices of the files assigned to this directory
    pub files: Vec<usize>,
    pub(crate) record: DirRecord,
}

/// One file of the manifest tree.
#[derive(Debug)]
pub struct FileEntry {
    /// File name without any directory part
    pub name: String,
    /// Release version of the file
    pub version: u32,
    /// Uncompressed size in bytes
    pub size: u32,
    /// Compressed size in bytes
    pub compressed_size: u32,
    /// Index of the owning directory, none for entries outside any directory
    pub parent: Option<usize>,
    /// Byte position of this entry's record inside the manifest file
    pub(crate) record_offset: usize,
}

/// Release manifest reader and size patcher
///
/// The manifest file is memory-mapped read-write for the lifetime of the
/// value and parsed once at open time; size updates write straight into the
/// mapping. Not safe for concurrent use, callers must serialize all access.
///
/// Opening takes a one-time `.bak` snapshot of the file if none exists yet,
/// as a safety net for everything later written through the mapping.
pub struct ReleaseManifest {
    path: PathBuf,
    mmap: MmapMut,
    header: ManifestHeader,
    dirs: Vec<DirEntry>,
    files: Vec<FileEntry>,
    paths: IndexMap<String, usize>,
}

impl ReleaseManifest {
    /// Open a manifest file and parse it, keeping the mapping for in-place
    /// size patching.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let backup = append_extension(&path, ".bak");
        if !backup.exists() {
            fs::copy(&path, &backup)?;
            debug!(backup = %backup.display(), "created one-time manifest snapshot");
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file) }?;
        let (header, dirs, files) = parse(&mmap)?;
        debug!(
            manifest = %path.display(),
            directories = dirs.len(),
            files = files.len(),
            "parsed release manifest"
        );
        let paths = index_paths(&dirs, &files);
        let manifest = Self {
            path,
            mmap,
            header,
            dirs,
            files,
            paths,
        };
        manifest.sanity_check()?;
        Ok(manifest)
    }

    /// Number of file entries recorded in this manifest.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether this manifest records no file entries
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Release version recorded in the header.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Item count recorded in the header.
    pub fn item_count(&self) -> u32 {
        self.header.item_count
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory arena in table order; index 0 is the root.
    pub fn directories(&self) -> &[DirEntry] {
        &self.dirs
    }

    /// The file arena in table order.
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Returns an iterator over every resolved file path in table order.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(|path| path.as_str())
    }

    /// Search for a file entry by its full path, e.g. `/DATA/a.dds`.
    pub fn file_by_path(&self, path: &str) -> Option<&FileEntry> {
        self.paths.get(path).map(|&index| &self.files[index])
    }

    /// Records new sizes for the file at `path`, writing through to the
    /// mapped manifest bytes.
    ///
    /// Manifest paths are absolute with a leading separator; a key supplied
    /// without one is normalized by prefixing it. Updating is a no-op when
    /// the stored compressed size already matches.
    #[instrument(skip(self), err)]
    pub fn set_size(
        &mut self,
        path: &str,
        compressed_size: u32,
        uncompressed_size: u32,
    ) -> Result<()> {
        let key: Cow<'_, str> = if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("/{path}"))
        };
        let index = *self
            .paths
            .get(key.as_ref())
            .ok_or_else(|| Error::PathNotFound(key.to_string()))?;
        if self.files[index].compressed_size == compressed_size {
            return Ok(());
        }

        self.files[index].size = uncompressed_size;
        self.files[index].compressed_size = compressed_size;
        self.sanity_check_entry(index)?;

        let at = self.files[index].record_offset + SIZE_FIELD_OFFSET;
        LittleEndian::write_u32(&mut self.mmap[at..at + 4], uncompressed_size);
        LittleEndian::write_u32(&mut self.mmap[at + 4..at + 8], compressed_size);
        debug!(path = %key, compressed_size, uncompressed_size, "updated recorded sizes");
        Ok(())
    }

    /// Flushes the mapping to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    fn sanity_check(&self) -> Result<()> {
        for index in 0..self.files.len() {
            self.sanity_check_entry(index)?;
        }
        Ok(())
    }

    fn sanity_check_entry(&self, index: usize) -> Result<()> {
        let entry = &self.files[index];
        if entry.size > MAX_ENTRY_SIZE || entry.compressed_size > MAX_ENTRY_SIZE {
            return Err(Error::SanityCheck(format!(
                "{} records an implausible size ({} bytes, {} compressed)",
                entry.name, entry.size, entry.compressed_size
            )));
        }
        if entry.name.is_empty() {
            return Err(Error::SanityCheck(format!("file record {index} has no name")));
        }
        if entry.record_offset < MIN_RECORD_OFFSET {
            return Err(Error::SanityCheck(format!(
                "file record {index} sits inside the header"
            )));
        }
        if entry.parent.is_none() {
            // Benign for the handful of entries living outside any directory.
            warn!(entry = %entry.name, "file entry has no parent directory");
        }
        Ok(())
    }
}

impl Drop for ReleaseManifest {
    fn drop(&mut self) {
        if let Err(error) = self.mmap.flush() {
            warn!(error = %error, "failed to flush the manifest mapping");
        }
    }
}

impl league_raf::SizeSink for ReleaseManifest {
    fn record_size(
        &mut self,
        path: &str,
        compressed_size: u32,
        uncompressed_size: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.set_size(path, compressed_size, uncompressed_size)?;
        Ok(())
    }
}

/// Parses a manifest buffer into its header and linked directory and file
/// arenas.
fn parse(data: &[u8]) -> Result<(ManifestHeader, Vec<DirEntry>, Vec<FileEntry>)> {
    let mut cursor = Cursor::new(data);
    let header = ManifestHeader::read(&mut cursor)?;
    if header.magic != MANIFEST_MAGIC {
        return Err(Error::InvalidManifest(format!(
            "bad magic 0x{:08X}, expected 0x{MANIFEST_MAGIC:08X}",
            header.magic
        )));
    }
    if header.file_type != MANIFEST_FILE_TYPE {
        return Err(Error::InvalidManifest(format!(
            "bad file type 0x{:08X}, expected 0x{MANIFEST_FILE_TYPE:08X}",
            header.file_type
        )));
    }

    let dir_count = u32::read_le(&mut cursor)? as usize;
    let mut dir_records = Vec::with_capacity(dir_count);
    for _ in 0..dir_count {
        dir_records.push(DirRecord::read(&mut cursor)?);
    }

    let file_count = u32::read_le(&mut cursor)? as usize;
    let mut file_records = Vec::with_capacity(file_count);
    for _ in 0..file_count {
        let record_offset = cursor.position() as usize;
        file_records.push((record_offset, FileRecord::read(&mut cursor)?));
    }

    let string_count = u32::read_le(&mut cursor)? as usize;
    let _data_size = u32::read_le(&mut cursor)?;
    let mut strings = Vec::with_capacity(string_count);
    for index in 0..string_count {
        let mut bytes = Vec::new();
        loop {
            let byte = cursor.read_u8()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        strings.push(String::from_utf8(bytes).map_err(|e| {
            Error::InvalidManifest(format!("string {index} is not utf-8: {e}"))
        })?);
    }

    // Name index 0 is the reserved empty string used for the root.
    let resolve = |index: u32| -> Result<String> {
        if index == 0 {
            return Ok(String::new());
        }
        strings.get(index as usize).cloned().ok_or_else(|| {
            Error::InvalidManifest(format!("name index {index} lies outside the string table"))
        })
    };

    let mut dirs = Vec::with_capacity(dir_count);
    for record in dir_records {
        dirs.push(DirEntry {
            name: resolve(record.name_index)?,
            parent: None,
            files: Vec::new(),
            record,
        });
    }
    let mut files = Vec::with_capacity(file_count);
    for (record_offset, record) in file_records {
        files.push(FileEntry {
            name: resolve(record.name_index)?,
            version: record.version,
            size: record.size,
            compressed_size: record.compressed_size,
            parent: None,
            record_offset,
        });
    }

    link_tree(&mut dirs, &mut files);
    Ok((header, dirs, files))
}

/// Reconstructs parent links from the depth-first range layout, starting at
/// directory 0.
///
/// Each directory owns its declared file range. Files the walk has passed
/// over without an owner belong to the nearest enclosing directory already
/// visited; files past every declared range keep no parent and are flagged
/// by the sanity check.
fn link_tree(dirs: &mut [DirEntry], files: &mut [FileEntry]) {
    if dirs.is_empty() {
        return;
    }
    let mut next_unassigned = 0usize;
    walk(dirs, files, 0, &mut next_unassigned);
}

fn walk(
    dirs: &mut [DirEntry],
    files: &mut [FileEntry],
    current: usize,
    next_unassigned: &mut usize,
) {
    let first = dirs[current].record.file_index as usize;
    let count = dirs[current].record.file_count as usize;

    if let Some(enclosing) = dirs[current].parent {
        for index in (*next_unassigned).min(first)..first.min(files.len()) {
            if files[index].parent.is_none() {
                files[index].parent = Some(enclosing);
                dirs[enclosing].files.push(index);
            }
        }
    }
    for index in first..(first + count).min(files.len()) {
        files[index].parent = Some(current);
        dirs[current].files.push(index);
    }
    *next_unassigned = (*next_unassigned).max((first + count).min(files.len()));

    let subdir_first = dirs[current].record.subdir_index as usize;
    let subdir_count = dirs[current].record.subdir_count as usize;
    for child in subdir_first..subdir_first.saturating_add(subdir_count) {
        if child >= dirs.len() {
            warn!(
                directory = current,
                child, "subdirectory range lies outside the directory table"
            );
            break;
        }
        if child == 0 || dirs[child].parent.is_some() {
            warn!(directory = current, child, "subdirectory was already visited");
            continue;
        }
        dirs[child].parent = Some(current);
        walk(dirs, files, child, next_unassigned);
    }
}

/// Builds the full path lookup once the walk has assigned parents.
///
/// A path is the parent chain joined with `/`; the root's empty name gives
/// every contained file a leading separator. A parentless file keeps its
/// bare name.
fn index_paths(dirs: &[DirEntry], files: &[FileEntry]) -> IndexMap<String, usize> {
    let mut paths = IndexMap::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let path = match file.parent {
            Some(parent) => format!("{}/{}", dir_path(dirs, parent), file.name),
            None => file.name.clone(),
        };
        paths.insert(path, index);
    }
    paths
}

fn dir_path(dirs: &[DirEntry], index: usize) -> String {
    let mut segments = Vec::new();
    let mut cursor = Some(index);
    while let Some(i) = cursor {
        segments.push(dirs[i].name.as_str());
        cursor = dirs[i].parent;
    }
    segments.reverse();
    segments.join("/")
}

fn append_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
