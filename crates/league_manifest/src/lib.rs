//! This library handles reading from and patching **release manifest** files
//! used by *League of Legends*.
//!
//! # Release Manifest Format Documentation
//!
//! A release manifest records a directory tree and per-file compressed and
//! uncompressed sizes for one game release. The directory and file tables are
//! flat, offset-addressed arrays; the tree shape is implied by the
//! depth-first layout of the index ranges, not stored.
//!
//! ## File Structure
//!
//! All multi-byte integers are little-endian.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x4D534C52 ("RLSM")                               |
//! | 0x0004         | File type              | 4 bytes: Fixed value 0x00010001                            |
//! | 0x0008         | Item count             | 4 bytes: Number of items recorded                          |
//! | 0x000C         | Version                | 4 bytes: Release version                                   |
//!
//! ### Directory Table
//!
//! A 4-byte directory count, then one 20-byte record per directory:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name index             | 4 bytes: Index into the string table (0 = root)         |
//! | 0x0004         | Subdir index           | 4 bytes: First subdirectory in the directory array      |
//! | 0x0008         | Subdir count           | 4 bytes: Number of contiguous subdirectories            |
//! | 0x000C         | File index             | 4 bytes: First owned file in the file array             |
//! | 0x0010         | File count             | 4 bytes: Number of contiguous owned files               |
//!
//! ### File Table
//!
//! A 4-byte file count, then one 44-byte record per file:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name index             | 4 bytes: Index into the string table                    |
//! | 0x0004         | Version                | 4 bytes: Release version of the file                    |
//! | 0x0008         | Checksum               | 16 bytes: MD5 of the file content (not interpreted)     |
//! | 0x0018         | Flags                  | 4 bytes: Not interpreted                                |
//! | 0x001C         | Size                   | 4 bytes: Uncompressed size                              |
//! | 0x0020         | Compressed size        | 4 bytes: Compressed size                                |
//! | 0x0024         | Reserved               | 8 bytes: Two reserved values, not interpreted           |
//!
//! ### String Table
//!
//! A 4-byte string count and a 4-byte data size, then `count` NUL-terminated
//! UTF-8 strings stored sequentially. Index 0 is the reserved empty string
//! used for the root directory.
//!
//! ## Additional Information
//!
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Tree shape**: Inferred from the depth-first layout of the directory
//!   and file index ranges

pub mod error;
pub mod read;
pub mod types;

pub use read::{DirEntry, FileEntry, ReleaseManifest};
