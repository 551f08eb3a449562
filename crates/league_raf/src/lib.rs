//! This library handles reading from and patching **RAF** archive pairs used by
//! *League of Legends*.
//!
//! # RAF Archive Format Documentation
//!
//! A RAF archive is a pair of files: an index file (`.raf`) describing the
//! entries, and a companion data file (`.raf.dat`) holding the raw payload
//! bytes. The index records where each named payload lives inside the data
//! file; patching replaces payload bytes in the data file and rewrites the
//! affected index records in place.
//!
//! ## Index File Structure
//!
//! All multi-byte integers are little-endian.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x18BE0EF0                                        |
//! | 0x0004         | Version                | 4 bytes: Format version                                    |
//! | 0x0008         | Manager index          | 4 bytes: Release-manager bookkeeping value                 |
//! | 0x000C         | File list offset       | 4 bytes: Offset to the file list                           |
//! | 0x0010         | String table offset    | 4 bytes: Offset to the string table                        |
//!
//! ### File List
//!
//! At the file list offset: a 4-byte entry count, then one 16-byte record per
//! entry:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Hash                   | 4 bytes: Legacy hash of the entry name (see below)      |
//! | 0x0004         | Data offset            | 4 bytes: Offset of the payload in the data file         |
//! | 0x0008         | Data size              | 4 bytes: Size of the payload in the data file           |
//! | 0x000C         | Name index             | 4 bytes: Index into the string table                    |
//!
//! The stored hash is the legacy archive hash ([`entry_hash`]). It collides
//! easily and is never used as an entry's identity here; lookups go through
//! the resolved name.
//!
//! ### String Table
//!
//! At the string table offset: a 4-byte data size, a 4-byte string count
//! (which must equal the file list count), then `count` 8-byte slots of
//! {offset, length}. Each slot addresses a NUL-terminated UTF-8 string of
//! `length - 1` bytes at `string table offset + offset`.
//!
//! ## Data File
//!
//! The data file is a raw concatenation of entry payloads at the recorded
//! offsets. A payload is zlib-compressed iff its first two bytes are `0x7801`
//! or `0x789C` big-endian ([`is_zlib`]).
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.raf` (index), `.raf.dat` (data)
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression**: zlib, detected per payload by the stream header

pub mod codec;
pub mod error;
pub mod patch;
pub mod read;
pub mod types;

pub use codec::{entry_hash, is_zlib, Codec};
pub use patch::{
    MeshCodec, MeshModel, MeshReplacement, NullSizeSink, Replacement, SizeSink,
    UnsupportedMeshCodec,
};
pub use read::{human_size, RafArchive, RafEntry};
