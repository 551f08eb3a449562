//! Base types for the structure of a release manifest file.

use binrw::{BinRead, BinWrite};

/// Magic number opening every release manifest ("RLSM").
pub const MANIFEST_MAGIC: u32 = 0x4D53_4C52;

/// Fixed file-type value following the magic.
pub const MANIFEST_FILE_TYPE: u32 = 0x0001_0001;

/// Release manifest header
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ManifestHeader {
    /// Magic number, always [`MANIFEST_MAGIC`]
    pub magic: u32,

    /// Fixed file-type value, always [`MANIFEST_FILE_TYPE`]
    pub file_type: u32,

    /// Number of items recorded in the manifest
    pub item_count: u32,

    /// Release version
    pub version: u32,
}

/// Directory table record
///
/// Subdirectories and owned files are contiguous ranges into the global
/// directory and file arrays; the tree shape is implied by the depth-first
/// layout of those ranges.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct DirRecord {
    /// Index of the directory name in the string table (0 = root)
    pub name_index: u32,

    /// Index of the first subdirectory in the directory array
    pub subdir_index: u32,

    /// Number of contiguous subdirectories
    pub subdir_count: u32,

    /// Index of the first owned file in the file array
    pub file_index: u32,

    /// Number of contiguous owned files
    pub file_count: u32,
}

/// File table record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct FileRecord {
    /// Index of the file name in the string table
    pub name_index: u32,

    /// Release version of the file
    pub version: u32,

    /// MD5 of the file content, not interpreted here
    pub checksum: [u8; 16],

    /// Not interpreted here
    pub flags: u32,

    /// Uncompressed size in bytes
    pub size: u32,

    /// Compressed size in bytes
    pub compressed_size: u32,

    /// Reserved, not interpreted here
    pub reserved1: u32,

    /// Reserved, not interpreted here
    pub reserved2: u32,
}
