//! Output directory for generated images.
//!
//! Files are named `generated_image<N>.png`. The next `N` is one greater than
//! the largest index already on disk, and allocation uses exclusive creation
//! so two requests finishing at the same time never share a file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, info};

use crate::codec;
use crate::error::{CoreError, Result};

pub const FILE_PREFIX: &str = "generated_image";
pub const FILE_SUFFIX: &str = ".png";

/// Upper bound on collisions stepped over in one allocation.
const MAX_ALLOCATION_ATTEMPTS: u64 = 1024;

/// Append-only store of generated PNGs.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Index the next saved file would get (`1` for an empty or missing dir).
    pub fn next_index(&self) -> Result<u64> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(e.into()),
        };

        let mut max_idx = 0;
        for entry in entries {
            let name = entry?.file_name();
            if let Some(idx) = name.to_str().and_then(parse_index) {
                max_idx = max_idx.max(idx);
            }
        }
        Ok(max_idx + 1)
    }

    /// Path for a given index.
    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{index}{FILE_SUFFIX}"))
    }

    /// Encode `img` as PNG and write it under a freshly allocated index.
    ///
    /// Returns the path written and the PNG bytes.
    pub fn save_png(&self, img: &DynamicImage) -> Result<(PathBuf, Vec<u8>)> {
        let png = codec::encode_png(img)?;
        let path = self.write_new(&png)?;
        Ok((path, png))
    }

    fn write_new(&self, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|source| CoreError::Save {
            path: self.dir.clone(),
            source,
        })?;

        let start = self.next_index()?;
        for index in start..start + MAX_ALLOCATION_ATTEMPTS {
            let path = self.path_for(index);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "output index taken; trying next");
                    continue;
                }
                Err(source) => return Err(CoreError::Save { path, source }),
            };
            file.write_all(bytes)
                .and_then(|_| file.flush())
                .map_err(|source| CoreError::Save {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), bytes = bytes.len(), "saved generated image");
            return Ok(path);
        }

        Err(CoreError::Save {
            path: self.dir.clone(),
            source: std::io::Error::other("no free output index"),
        })
    }
}

/// Parse `generated_image<digits>.png` (suffix case-insensitive).
fn parse_index(name: &str) -> Option<u64> {
    let rest = name.strip_prefix(FILE_PREFIX)?;
    let cut = rest.len().checked_sub(FILE_SUFFIX.len())?;
    let (digits, suffix) = (rest.get(..cut)?, rest.get(cut..)?);
    if !suffix.eq_ignore_ascii_case(FILE_SUFFIX) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
