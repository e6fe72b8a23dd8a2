//! Binary snapshots of a combined [`Hts`].
//!
//! Layout: 8-byte magic, little-endian `u32` format version, then the
//! bincode-encoded system. The origin of the saved system is not stored;
//! [`load`] marks the restored system as coming from the snapshot path.

use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::hts::{Hts, HtsOrigin};

pub const MAGIC: &[u8; 8] = b"TERNHTS\0";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("system was loaded from snapshot {0}; refusing to snapshot it again")]
    AlreadySnapshot(String),
    #[error("I/O error on snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("not a tern snapshot (bad magic)")]
    BadMagic,
    #[error("snapshot format version {found} is not supported (expected {FORMAT_VERSION})")]
    VersionMismatch { found: u32 },
}

/// Encode `hts` into a self-describing blob.
pub fn to_bytes(hts: &Hts) -> Result<Vec<u8>, SnapshotError> {
    if let HtsOrigin::Snapshot(path) = hts.origin() {
        return Err(SnapshotError::AlreadySnapshot(path.display().to_string()));
    }
    let body = bincode::serialize(hts)?;
    let mut out = Vec::with_capacity(MAGIC.len() + 4 + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a blob produced by [`to_bytes`]. The result has origin `Parsed`.
pub fn from_bytes(bytes: &[u8]) -> Result<Hts, SnapshotError> {
    let header = MAGIC.len() + 4;
    if bytes.len() < header || &bytes[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..header]);
    let found = u32::from_le_bytes(version);
    if found != FORMAT_VERSION {
        return Err(SnapshotError::VersionMismatch { found });
    }
    Ok(bincode::deserialize(&bytes[header..])?)
}

pub fn save(hts: &Hts, path: &Path) -> Result<(), SnapshotError> {
    let bytes = to_bytes(hts)?;
    fs::write(path, &bytes).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(system = %hts.name, path = %path.display(), bytes = bytes.len(), "saved snapshot");
    Ok(())
}

pub fn load(path: &Path) -> Result<Hts, SnapshotError> {
    let bytes = fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut hts = from_bytes(&bytes)?;
    hts.set_origin(HtsOrigin::Snapshot(path.to_path_buf()));
    debug!(system = %hts.name, path = %path.display(), "loaded snapshot");
    Ok(hts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::transition_system::TransitionSystem;
    use crate::vars::{Sort, VarDecl};

    fn sample() -> Hts {
        let mut ts = TransitionSystem::new("c");
        ts.declare(VarDecl::state("x", Sort::BitVec(3))).unwrap();
        ts.declare(VarDecl::input("en", Sort::Bool)).unwrap();
        ts.add_init(Expr::var("x").eq(Expr::int(0)));
        ts.add_trans(Expr::next("x").eq(Expr::ite(
            Expr::var("en"),
            Expr::var("x").add(Expr::int(1)),
            Expr::var("x"),
        )));
        let mut hts = Hts::new("top");
        hts.add_ts(ts).unwrap();
        hts.add_assumption(Expr::var("x").le(Expr::int(6)));
        hts
    }

    #[test]
    fn bytes_round_trip() {
        let hts = sample();
        let restored = from_bytes(&to_bytes(&hts).unwrap()).unwrap();
        assert_eq!(restored, hts);
    }

    #[test]
    fn file_round_trip_marks_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.tsnap");
        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.origin(), &HtsOrigin::Snapshot(path.clone()));
        assert_eq!(loaded.trans(), sample().trans());
    }

    #[test]
    fn resnapshot_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.tsnap");
        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();
        let err = save(&loaded, &dir.path().join("again.tsnap")).unwrap_err();
        assert!(matches!(err, SnapshotError::AlreadySnapshot(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(from_bytes(b"nope"), Err(SnapshotError::BadMagic)));
        let mut bytes = to_bytes(&sample()).unwrap();
        bytes[8] = 9;
        assert!(matches!(
            from_bytes(&bytes),
            Err(SnapshotError::VersionMismatch { found: 9 })
        ));
    }
}
