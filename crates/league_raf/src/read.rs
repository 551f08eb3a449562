//! Types for reading RAF archives
//!

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use binrw::BinRead;
use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::codec::{is_zlib, Codec};
use crate::error::{Error, Result};
use crate::types::{RafHeader, RafRecord, StringSlot, StringTableHeader, RAF_MAGIC};

/// One named payload range inside the companion data file.
#[derive(Debug, Clone)]
pub struct RafEntry {
    /// Full resolved path of the entry, e.g. `DATA/Characters/Aatrox/Aatrox.skn`
    pub name: String,
    /// Stored legacy hash of the name
    pub hash: u32,
    /// Offset of the payload inside the data file
    pub offset: u32,
    /// Size of the payload inside the data file
    pub size: u32,
    pub(crate) name_index: u32,
    /// Byte position of this entry's record inside the index file
    pub(crate) record_offset: u32,
    /// Bytes this entry is expected to hold on disk after a patch
    pub(crate) expected: Option<Vec<u8>>,
}

impl RafEntry {
    /// Final path segment of the entry name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for RafEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is of size {} at offset {}",
            self.name,
            human_size(self.size as u64),
            self.offset
        )
    }
}

/// Formats a byte count with binary units, e.g. `1.5 KiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// RAF archive reader and patcher
///
/// The index file is memory-mapped read-write for the lifetime of the
/// archive; parsing annotates zero-copy record views with names resolved
/// from the string table. Not safe for concurrent use, callers must
/// serialize all access.
///
/// ```no_run
/// fn list_raf_contents(path: &std::path::Path) -> league_raf::error::Result<()> {
///     let raf = league_raf::RafArchive::open(path)?;
///
///     for entry in raf.entries() {
///         println!("{entry}");
///     }
///
///     Ok(())
/// }
/// ```
pub struct RafArchive {
    pub(crate) path: PathBuf,
    pub(crate) mmap: MmapMut,
    header: RafHeader,
    pub(crate) entries: Vec<RafEntry>,
    pub(crate) codec: Codec,
}

impl RafArchive {
    /// Open an index file and parse it, keeping the mapping for in-place
    /// record patching.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file) }?;
        let (header, entries) = parse(&mmap)?;
        debug!(
            archive = %path.display(),
            entries = entries.len(),
            version = header.version,
            "parsed archive index"
        );
        Ok(Self {
            path,
            mmap,
            header,
            entries,
            codec: Codec::new(),
        })
    }

    /// Number of entries contained in this archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Format version recorded in the index header.
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the companion data file holding the entry payloads.
    pub fn data_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".dat");
        PathBuf::from(name)
    }

    /// Returns an iterator over the entries in index order.
    pub fn entries(&self) -> impl Iterator<Item = &'_ RafEntry> {
        self.entries.iter()
    }

    /// Search for an entry by its full resolved name.
    pub fn entry(&self, name: &str) -> Option<&RafEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Reads an entry's exact byte range out of the companion data file.
    pub fn entry_raw_bytes(&self, entry: &RafEntry) -> Result<Vec<u8>> {
        let mut file = File::open(self.data_path())?;
        file.seek(SeekFrom::Start(entry.offset as u64))?;
        let mut data = vec![0u8; entry.size as usize];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    /// Reads an entry's payload by name, inflating it when the stored bytes
    /// carry the zlib stream header.
    pub fn entry_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_owned()))?
            .clone();
        let data = self.entry_raw_bytes(&entry)?;
        if is_zlib(&data) {
            self.codec.decompress(&data)
        } else {
            Ok(data)
        }
    }
}

/// Parses an index buffer into its header and resolved entry list.
///
/// Pure over the input bytes, so a patched mapping can be re-parsed for the
/// post-patch consistency audit.
pub(crate) fn parse(data: &[u8]) -> Result<(RafHeader, Vec<RafEntry>)> {
    let mut cursor = Cursor::new(data);
    let header = RafHeader::read(&mut cursor)?;
    if header.magic != RAF_MAGIC {
        return Err(Error::InvalidIndex(format!(
            "bad magic 0x{:08X}, expected 0x{RAF_MAGIC:08X}",
            header.magic
        )));
    }

    cursor.set_position(header.file_list_offset as u64);
    let count = u32::read_le(&mut cursor)?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let record_offset = cursor.position() as u32;
        let record = RafRecord::read(&mut cursor)?;
        entries.push(RafEntry {
            name: String::new(),
            hash: record.hash,
            offset: record.data_offset,
            size: record.data_size,
            name_index: record.name_index,
            record_offset,
            expected: None,
        });
    }

    cursor.set_position(header.string_table_offset as u64);
    let table = StringTableHeader::read(&mut cursor)?;
    if table.count != count {
        return Err(Error::InvalidIndex(format!(
            "string table holds {} names for {} file list entries",
            table.count, count
        )));
    }
    for index in 0..count {
        let slot = StringSlot::read(&mut cursor)?;
        let length = (slot.length as usize)
            .checked_sub(1)
            .ok_or_else(|| Error::InvalidIndex(format!("string {index} has no terminator")))?;
        let start = header.string_table_offset as usize + slot.offset as usize;
        let bytes = data
            .get(start..start + length)
            .ok_or_else(|| Error::InvalidIndex(format!("string {index} lies out of bounds")))?;
        let name = std::str::from_utf8(bytes)
            .map_err(|e| Error::InvalidIndex(format!("string {index} is not utf-8: {e}")))?;
        if let Some(entry) = entries.iter_mut().find(|e| e.name_index == index) {
            entry.name = name.to_owned();
        }
    }

    Ok((header, entries))
}
