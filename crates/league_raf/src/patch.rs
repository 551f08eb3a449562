//! Types for replacing entry payloads inside a RAF archive
//!
//! A patch rewrites the companion data file through a rename-to-backup,
//! rewrite, delete-backup transaction, then updates the affected index
//! records in place through the mapping. Any failure before the backup is
//! deleted restores the original data file, so a readable primary always
//! exists. The index and data file are still two separate steps, not one
//! atomic unit.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, instrument, warn};

use crate::codec::is_zlib;
use crate::error::{Error, Result};
use crate::read::{parse, RafArchive};

/// Replacement payload for a single archive entry, keyed by the entry's
/// lowercase short name.
pub enum Replacement {
    /// Bytes used directly as the entry's new uncompressed payload
    Raw(Vec<u8>),
    /// Geometry swapped into the entry's decoded model before re-encoding
    Mesh(MeshReplacement),
}

/// Vertex and index buffers to substitute into a decoded model.
///
/// The buffers are opaque to this library; only the vertex count is
/// inspected, to check that the replacement fits the original model.
pub struct MeshReplacement {
    pub vertex_count: usize,
    pub vertices: Vec<u8>,
    pub indices: Vec<u8>,
}

/// Decoded model handle produced by a [`MeshCodec`].
pub trait MeshModel {
    /// Number of vertices in the decoded model.
    fn vertex_count(&self) -> usize;

    /// Substitutes the model's vertex and index buffers.
    fn replace_geometry(&mut self, vertices: &[u8], indices: &[u8]);

    /// Re-encodes the model into its original binary form.
    fn encode(&mut self) -> Result<Vec<u8>>;
}

/// Round-trip codec for the model payloads stored in archive entries.
pub trait MeshCodec {
    /// Decodes a model from an entry's decompressed payload.
    fn decode(&self, name: &str, data: &[u8]) -> Result<Box<dyn MeshModel>>;
}

/// Mesh codec for callers that only supply raw replacements; every decode
/// fails.
pub struct UnsupportedMeshCodec;

impl MeshCodec for UnsupportedMeshCodec {
    fn decode(&self, name: &str, _data: &[u8]) -> Result<Box<dyn MeshModel>> {
        Err(Error::MeshCodec(format!(
            "no mesh codec available to decode {name}"
        )))
    }
}

/// Receives the rewritten sizes of patched entries, keyed by entry path.
///
/// Implemented by the release manifest so that a patch keeps its recorded
/// sizes synchronized with the archive.
pub trait SizeSink {
    fn record_size(
        &mut self,
        path: &str,
        compressed_size: u32,
        uncompressed_size: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink for callers with no manifest to keep synchronized.
pub struct NullSizeSink;

impl SizeSink for NullSizeSink {
    fn record_size(
        &mut self,
        _path: &str,
        _compressed_size: u32,
        _uncompressed_size: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// New layout of one entry after the data file rewrite.
#[derive(Default, Clone)]
struct EntryRewrite {
    offset: u32,
    size: u32,
    expected: Option<Vec<u8>>,
}

impl RafArchive {
    /// Replaces the payloads of every entry whose lowercase short name
    /// appears in `replacements`, rewriting the companion data file and
    /// keeping the index records and `sizes` consistent with it.
    ///
    /// Entries are rewritten in ascending payload-offset order. Payload
    /// ranges are assumed contiguous and non-overlapping, which the source
    /// format guarantees but this function does not verify; recomputed sizes
    /// come from write-cursor deltas and would silently diverge otherwise.
    ///
    /// Returns without touching anything when no replacement key matches.
    #[instrument(skip_all, fields(archive = %self.path.display()), err)]
    pub fn patch<C, S>(
        &mut self,
        replacements: &HashMap<String, Replacement>,
        codec: &C,
        sizes: &mut S,
    ) -> Result<()>
    where
        C: MeshCodec + ?Sized,
        S: SizeSink + ?Sized,
    {
        let affected = self
            .entries
            .iter()
            .filter(|e| replacements.contains_key(&e.short_name().to_lowercase()))
            .count();
        if affected == 0 {
            debug!("no replacement matches any entry, leaving the archive untouched");
            return Ok(());
        }
        debug!(affected, "rewriting data file");

        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&index| self.entries[index].offset);

        let data_path = self.data_path();
        let backup_path = append_extension(&data_path, ".bak");
        if backup_path.exists() {
            // A backup left behind by an interrupted run is the good copy;
            // the primary written alongside it is not trusted.
            fs::remove_file(&data_path)?;
        } else {
            fs::rename(&data_path, &backup_path)?;
        }

        let rewrites =
            match self.rewrite_data(&order, replacements, codec, sizes, &backup_path, &data_path) {
                Ok(rewrites) => rewrites,
                Err(error) => {
                    restore_backup(&backup_path, &data_path);
                    return Err(error);
                }
            };

        fs::remove_file(&backup_path)?;

        for (entry, rewrite) in self.entries.iter_mut().zip(rewrites) {
            entry.offset = rewrite.offset;
            entry.size = rewrite.size;
            entry.expected = rewrite.expected;
        }

        for entry in &self.entries {
            // Skip the stored hash field, then offset and size in place.
            let at = entry.record_offset as usize + 4;
            LittleEndian::write_u32(&mut self.mmap[at..at + 4], entry.offset);
            LittleEndian::write_u32(&mut self.mmap[at + 4..at + 8], entry.size);
        }
        self.mmap.flush()?;

        self.verify_expected_bytes()?;
        self.audit();
        Ok(())
    }

    /// Streams every entry from the backup into a fresh data file, applying
    /// replacements, and returns the new per-entry layout.
    fn rewrite_data<C, S>(
        &mut self,
        order: &[usize],
        replacements: &HashMap<String, Replacement>,
        codec: &C,
        sizes: &mut S,
        backup_path: &Path,
        data_path: &Path,
    ) -> Result<Vec<EntryRewrite>>
    where
        C: MeshCodec + ?Sized,
        S: SizeSink + ?Sized,
    {
        let mut source = File::open(backup_path)?;
        let mut target = File::create_new(data_path)?;
        let mut rewrites = vec![EntryRewrite::default(); self.entries.len()];

        for &index in order {
            let entry = &self.entries[index];
            let new_offset = target.stream_position()? as u32;
            if source.stream_position()? != entry.offset as u64 {
                debug!(entry = %entry.name, offset = entry.offset, "read cursor drifted, seeking");
                source.seek(SeekFrom::Start(entry.offset as u64))?;
            }
            let mut original = vec![0u8; entry.size as usize];
            source.read_exact(&mut original)?;

            let replacement = replacements.get(&entry.short_name().to_lowercase());
            let (expected_size, expected, uncompressed_size) = match replacement {
                None => {
                    target.write_all(&original)?;
                    (entry.size, None, 0)
                }
                Some(replacement) => {
                    let compressed = is_zlib(&original);
                    let mut payload = match replacement {
                        Replacement::Raw(bytes) => bytes.clone(),
                        Replacement::Mesh(mesh) => {
                            let decoded = self.codec.decompress(&original)?;
                            let mut model = codec.decode(&entry.name, &decoded)?;
                            if mesh.vertex_count != model.vertex_count() {
                                warn!(
                                    entry = %entry.name,
                                    replacement = mesh.vertex_count,
                                    original = model.vertex_count(),
                                    "vertex counts differ, keeping the original geometry"
                                );
                                decoded
                            } else {
                                model.replace_geometry(&mesh.vertices, &mesh.indices);
                                model.encode()?
                            }
                        }
                    };
                    let uncompressed_size = payload.len() as u32;
                    if compressed {
                        payload = self.codec.compress(&payload)?;
                    }
                    target.write_all(&payload)?;
                    (payload.len() as u32, Some(payload), uncompressed_size)
                }
            };

            let new_size = target.stream_position()? as u32 - new_offset;
            if replacement.is_some() {
                let entry = &self.entries[index];
                sizes
                    .record_size(&entry.name, new_size, uncompressed_size)
                    .map_err(Error::SizeSink)?;
            }
            if new_size != expected_size {
                let entry = &self.entries[index];
                return Err(Error::IntegrityCheck(format!(
                    "wrote {new_size} bytes for {}, expected {expected_size}",
                    entry.name
                )));
            }
            rewrites[index] = EntryRewrite {
                offset: new_offset,
                size: new_size,
                expected,
            };
        }

        target.flush()?;
        Ok(rewrites)
    }

    /// Re-reads every entry holding retained expected bytes and compares
    /// them against the data file.
    fn verify_expected_bytes(&self) -> Result<()> {
        for entry in &self.entries {
            if let Some(expected) = &entry.expected {
                let actual = self.entry_raw_bytes(entry)?;
                if &actual != expected {
                    return Err(Error::IntegrityCheck(format!(
                        "on-disk bytes for {} differ from the bytes just written",
                        entry.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Re-parses the index from the mapping and logs any entry whose
    /// descriptive string no longer matches the in-memory state. Never
    /// fails.
    fn audit(&mut self) {
        match parse(&self.mmap) {
            Ok((_, reparsed)) => {
                for (old, new) in self.entries.iter().zip(&reparsed) {
                    if old.to_string() != new.to_string() {
                        warn!(before = %old, after = %new, "index entry changed across re-parse");
                    }
                }
                self.entries = reparsed;
            }
            Err(error) => {
                warn!(error = %error, "failed to re-parse the index for the consistency audit");
            }
        }
    }
}

fn append_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Best-effort restoration of the data file from its backup; the failure
/// that triggered the restore is the one worth propagating.
fn restore_backup(backup_path: &Path, data_path: &Path) {
    if data_path.exists() {
        if let Err(error) = fs::remove_file(data_path) {
            warn!(error = %error, "failed to remove the partially written data file");
        }
    }
    if let Err(error) = fs::rename(backup_path, data_path) {
        warn!(error = %error, "failed to restore the data file backup");
    }
}
