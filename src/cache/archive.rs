//! Pretrained model archive handling
//!
//! Model zoo releases are gzipped tarballs. Plain tarballs are accepted too.

use crate::error::{TpodError, TpodResult};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// SHA256 of a file's contents as lowercase hex
pub fn sha256_file(path: &Path) -> TpodResult<String> {
    let file = File::open(path)
        .map_err(|e| TpodError::io(format!("opening {}", path.display()), e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| TpodError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn is_gzip(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Extract a (optionally gzipped) tar archive into `dest`
///
/// Entries that would land outside `dest` fail the whole extraction.
/// Returns the number of entries written.
pub fn extract_tarball(archive: &Path, dest: &Path) -> TpodResult<usize> {
    let gzip = is_gzip(archive)
        .map_err(|e| TpodError::io(format!("reading {}", archive.display()), e))?;
    let file = File::open(archive)
        .map_err(|e| TpodError::io(format!("opening {}", archive.display()), e))?;

    let reader: Box<dyn Read> = if gzip {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut tarball = tar::Archive::new(reader);
    let entries = tarball
        .entries()
        .map_err(|e| TpodError::io(format!("reading archive {}", archive.display()), e))?;

    let mut count = 0;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| TpodError::io(format!("reading archive {}", archive.display()), e))?;
        let entry_path = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let inside = entry
            .unpack_in(dest)
            .map_err(|e| TpodError::io(format!("extracting {}", entry_path), e))?;
        if !inside {
            return Err(TpodError::Internal(format!(
                "archive entry escapes destination: {}",
                entry_path
            )));
        }
        count += 1;
    }

    debug!(
        "Extracted {} entries from {} into {}",
        count,
        archive.display(),
        dest.display()
    );
    Ok(count)
}
