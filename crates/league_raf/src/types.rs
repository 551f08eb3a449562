//! Base types for the structure of a RAF index file.

use binrw::{BinRead, BinWrite};

/// Magic number opening every RAF index file.
pub const RAF_MAGIC: u32 = 0x18BE_0EF0;

/// RAF index header
///
/// Sits at offset 0 of the index file. All data is stored in little endian
/// format.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct RafHeader {
    /// Magic number, always [`RAF_MAGIC`]
    pub magic: u32,

    /// Format version
    pub version: u32,

    /// Bookkeeping value written by the release manager
    pub manager_index: u32,

    /// Offset from the beginning of the file to the file list
    pub file_list_offset: u32,

    /// Offset from the beginning of the file to the string table
    pub string_table_offset: u32,
}

/// RAF file list record
///
/// One fixed-width record per entry, following the file list count.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct RafRecord {
    /// Legacy hash of the entry name ([`crate::entry_hash`])
    pub hash: u32,

    /// Offset of the payload inside the companion data file
    pub data_offset: u32,

    /// Size of the payload inside the companion data file
    pub data_size: u32,

    /// Index of the entry's name in the string table
    pub name_index: u32,
}

/// String table header
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct StringTableHeader {
    /// Size of the string table in bytes
    pub data_size: u32,

    /// Number of strings, which must equal the file list count
    pub count: u32,
}

/// String table slot addressing one NUL-terminated string
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct StringSlot {
    /// Offset of the string, relative to the string table start
    pub offset: u32,

    /// Length of the string in bytes, including the NUL terminator
    pub length: u32,
}
