//! On-disk index layout.
//!
//! An index is a directory of three files:
//!
//! - `manifest.json`: format version, shape, metric, embedding model, and a
//!   BLAKE3 checksum of the vector payload
//! - `vectors.bin`: `chunk_count * dimension` little-endian `f32`
//! - `chunks.jsonl`: one chunk record per line, in insertion order
//!
//! Writes go to a hidden staging directory beside the target which is then
//! renamed into place, so readers never see a half-written index.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Chunk;
use crate::error::{IndexError, Result};
use crate::store::{Metric, VectorIndex};

pub const FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.jsonl";

const INDEX_FILES: [&str; 3] = [MANIFEST_FILE, VECTORS_FILE, CHUNKS_FILE];
const STAGING_PREFIX: &str = ".lectern-index-";

/// Every field is optional on read so that a missing one is reported as
/// corruption rather than a JSON error.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: Option<u32>,
    dimension: Option<usize>,
    metric: Option<Metric>,
    chunk_count: Option<usize>,
    embedding_model: Option<String>,
    checksum: Option<String>,
}

fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

fn encode_vectors(vectors: &[f32]) -> Vec<u8> {
    vectors.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vectors(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn parent_dir(dir: &Path) -> &Path {
    match dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn write_files(index: &VectorIndex, dir: &Path) -> Result<()> {
    let payload = encode_vectors(index.vectors());

    let mut vectors = fs::File::create(dir.join(VECTORS_FILE))?;
    vectors.write_all(&payload)?;
    vectors.sync_all()?;

    let mut chunks = BufWriter::new(fs::File::create(dir.join(CHUNKS_FILE))?);
    for chunk in index.chunks() {
        serde_json::to_writer(&mut chunks, chunk)?;
        chunks.write_all(b"\n")?;
    }
    chunks.into_inner().map_err(std::io::IntoInnerError::into_error)?.sync_all()?;

    let manifest = Manifest {
        format_version: Some(FORMAT_VERSION),
        dimension: Some(index.dimension()),
        metric: Some(index.metric()),
        chunk_count: Some(index.len()),
        embedding_model: index.embedding_model().map(str::to_owned),
        checksum: Some(checksum(&payload)),
    };
    let mut file = fs::File::create(dir.join(MANIFEST_FILE))?;
    file.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
    file.sync_all()?;
    Ok(())
}

/// Only a missing path, an empty directory, or a previous index may be replaced.
///
/// # Errors
///
/// [`IndexError::NotAnIndex`] when `dir` is a file or a directory with
/// content but no `manifest.json`.
pub fn ensure_replaceable(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let replaceable = dir.is_dir()
        && (dir.join(MANIFEST_FILE).is_file() || fs::read_dir(dir)?.next().is_none());
    if replaceable {
        Ok(())
    } else {
        Err(IndexError::NotAnIndex {
            path: dir.to_path_buf(),
        })
    }
}

/// Replace `target` with `staged`, restoring the old index if the swap fails.
fn swap_into_place(staged: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        return fs::rename(staged, target).map_err(Into::into);
    }

    let name = target
        .file_name()
        .map_or_else(|| "index".into(), |n| n.to_string_lossy().into_owned());
    let backup = parent_dir(target).join(format!(".{name}.previous"));
    if backup.exists() {
        fs::remove_dir_all(&backup)?;
    }

    fs::rename(target, &backup)?;
    if let Err(e) = fs::rename(staged, target) {
        tracing::error!(path = %target.display(), "index swap failed, restoring previous: {e}");
        fs::rename(&backup, target)?;
        return Err(e.into());
    }
    if let Err(e) = fs::remove_dir_all(&backup) {
        tracing::warn!(backup = %backup.display(), "failed to remove previous index: {e}");
    }
    Ok(())
}

impl VectorIndex {
    /// Write the index to `dir`, replacing an earlier index there.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NotAnIndex`] when `dir` holds anything but an earlier
    ///   index; nothing is written in that case
    /// - any staging, write, or rename failure, which leaves a pre-existing
    ///   index at `dir` intact
    pub fn persist(&self, dir: &Path) -> Result<()> {
        ensure_replaceable(dir)?;
        let parent = parent_dir(dir);
        fs::create_dir_all(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(parent)?;
        write_files(self, staging.path())?;

        let staged = staging.keep();
        if let Err(e) = swap_into_place(&staged, dir) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }

        tracing::info!(
            path = %dir.display(),
            chunks = self.len(),
            dimension = self.dimension(),
            "index persisted"
        );
        Ok(())
    }

    /// Load an index previously written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// - [`IndexError::IndexNotFound`] when `dir` is missing or holds none of the index files
    /// - [`IndexError::CorruptIndex`] when files are partial, unreadable, or inconsistent
    pub fn load(dir: &Path) -> Result<Self> {
        let present: Vec<PathBuf> = INDEX_FILES
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.is_file())
            .collect();
        if !dir.is_dir() || present.is_empty() {
            return Err(IndexError::IndexNotFound {
                path: dir.to_path_buf(),
            });
        }
        for file in INDEX_FILES {
            if !dir.join(file).is_file() {
                return Err(IndexError::corrupt(dir, format!("missing {file}")));
            }
        }

        let manifest_bytes = fs::read(dir.join(MANIFEST_FILE))
            .map_err(|e| IndexError::corrupt(dir, format!("unreadable {MANIFEST_FILE}: {e}")))?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| IndexError::corrupt(dir, format!("invalid {MANIFEST_FILE}: {e}")))?;

        match manifest.format_version {
            Some(FORMAT_VERSION) => {}
            Some(v) => {
                return Err(IndexError::corrupt(
                    dir,
                    format!("unsupported format version {v}"),
                ));
            }
            None => return Err(IndexError::corrupt(dir, "manifest missing format_version")),
        }
        let dimension = manifest
            .dimension
            .filter(|&d| d > 0)
            .ok_or_else(|| IndexError::corrupt(dir, "manifest missing dimension"))?;
        let metric = manifest
            .metric
            .ok_or_else(|| IndexError::corrupt(dir, "manifest missing metric"))?;
        let chunk_count = manifest
            .chunk_count
            .ok_or_else(|| IndexError::corrupt(dir, "manifest missing chunk_count"))?;
        let expected_checksum = manifest
            .checksum
            .ok_or_else(|| IndexError::corrupt(dir, "manifest missing checksum"))?;

        let payload = fs::read(dir.join(VECTORS_FILE))
            .map_err(|e| IndexError::corrupt(dir, format!("unreadable {VECTORS_FILE}: {e}")))?;
        let expected_len = chunk_count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| IndexError::corrupt(dir, "manifest shape overflows"))?;
        if payload.len() != expected_len {
            return Err(IndexError::corrupt(
                dir,
                format!(
                    "{VECTORS_FILE} is {} bytes, expected {expected_len}",
                    payload.len()
                ),
            ));
        }
        if checksum(&payload) != expected_checksum {
            return Err(IndexError::corrupt(dir, "vector checksum mismatch"));
        }

        let file = fs::File::open(dir.join(CHUNKS_FILE))
            .map_err(|e| IndexError::corrupt(dir, format!("unreadable {CHUNKS_FILE}: {e}")))?;
        let mut chunks = Vec::with_capacity(chunk_count);
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .map_err(|e| IndexError::corrupt(dir, format!("unreadable {CHUNKS_FILE}: {e}")))?;
            if line.trim().is_empty() {
                continue;
            }
            let chunk: Chunk = serde_json::from_str(&line).map_err(|e| {
                IndexError::corrupt(dir, format!("{CHUNKS_FILE} line {}: {e}", n + 1))
            })?;
            chunks.push(chunk);
        }
        if chunks.len() != chunk_count {
            return Err(IndexError::corrupt(
                dir,
                format!(
                    "{CHUNKS_FILE} has {} records, manifest says {chunk_count}",
                    chunks.len()
                ),
            ));
        }
        if chunk_count == 0 {
            return Err(IndexError::corrupt(dir, "index holds no chunks"));
        }

        tracing::debug!(path = %dir.display(), chunks = chunk_count, dimension, "index loaded");
        Ok(Self::from_parts(
            metric,
            dimension,
            manifest.embedding_model,
            chunks,
            decode_vectors(&payload),
        ))
    }
}
