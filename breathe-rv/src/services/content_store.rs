//! Partitioned storage for uploaded image content
//!
//! Two partitions under the uploads root: verified/ and rejected/, plus a
//! proofs/ sub-partition under verified/ that holds remediation evidence.
//! Stored names carry a random token prefix so concurrent uploads never
//! overwrite each other.

use breathe_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Sub-directory under the verified partition holding remediation proofs
pub const PROOFS_SUBDIR: &str = "proofs";

/// Content partition selected by the verification verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Verified,
    Rejected,
}

impl Partition {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Partition::Verified => "verified",
            Partition::Rejected => "rejected",
        }
    }

    /// Map a status path segment to its partition. Approved and finalized
    /// reports keep using the file stored at verification time.
    pub fn from_status_segment(segment: &str) -> Option<Partition> {
        match segment {
            "verified" | "approved" | "finalized" => Some(Partition::Verified),
            "rejected" => Some(Partition::Rejected),
            _ => None,
        }
    }
}

/// Partitioned content store rooted at the configured uploads directory
#[derive(Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open the store, creating both partitions and the proofs sub-partition
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(Partition::Verified.dir_name()).join(PROOFS_SUBDIR))?;
        std::fs::create_dir_all(root.join(Partition::Rejected.dir_name()))?;
        Ok(Self { root })
    }

    fn partition_root(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }

    /// Store image bytes into a partition, returning the stored filename
    /// relative to the partition root.
    pub fn store(
        &self,
        partition: Partition,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String> {
        let stored_name = format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        );
        let path = self.partition_root(partition).join(&stored_name);

        std::fs::write(&path, bytes).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Content write failed");
            Error::Persistence("Failed to store image content".to_string())
        })?;

        tracing::debug!(
            partition = partition.dir_name(),
            stored = %stored_name,
            size = bytes.len(),
            "Stored image content"
        );

        Ok(stored_name)
    }

    /// Store a remediation proof image under verified/proofs/, returning its
    /// reference relative to the verified partition root. The distinct
    /// `proof_` prefix keeps these apart from ordinary uploads.
    pub fn store_proof(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let stored_name = format!(
            "proof_{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(original_name)
        );
        let path = self
            .partition_root(Partition::Verified)
            .join(PROOFS_SUBDIR)
            .join(&stored_name);

        std::fs::write(&path, bytes).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Proof write failed");
            Error::Persistence("Failed to store proof content".to_string())
        })?;

        // Forward slash so the reference doubles as a URL path segment
        Ok(format!("{}/{}", PROOFS_SUBDIR, stored_name))
    }

    /// Resolve a stored reference to an absolute path, refusing anything
    /// that escapes the partition root.
    ///
    /// The reference may include the proofs sub-directory. Both the root and
    /// the candidate are normalized to absolute form; the candidate must stay
    /// equal to or under the root or the request fails with `InvalidPath`.
    pub fn resolve(&self, partition: Partition, relative: &str) -> Result<PathBuf> {
        // Reject parent/root components before touching the filesystem
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(Error::InvalidPath(format!(
                        "Rejected content path: {}",
                        relative
                    )))
                }
            }
        }

        let root = self
            .partition_root(partition)
            .canonicalize()
            .map_err(|e| Error::InvalidPath(format!("Partition root unavailable: {}", e)))?;

        let candidate = root.join(relative);
        let resolved = candidate.canonicalize().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("No stored content at {}", relative))
            } else {
                Error::InvalidPath(format!("Rejected content path: {}", relative))
            }
        })?;

        if resolved != root && !resolved.starts_with(&root) {
            return Err(Error::InvalidPath(format!(
                "Rejected content path: {}",
                relative
            )));
        }

        Ok(resolved)
    }
}

/// Reduce a client-supplied filename to a safe basename: path components
/// stripped, anything outside [A-Za-z0-9._-] replaced.
pub fn sanitize_filename(name: &str) -> String {
    let basename = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    let cleaned: String = basename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_filename("smoke field.jpg"), "smoke_field.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("dir\\sub\\photo.png"), "photo.png");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn store_writes_into_partition() {
        let (_dir, store) = test_store();

        let name = store
            .store(Partition::Verified, "smoke.jpg", b"image-bytes")
            .unwrap();
        assert!(name.ends_with("_smoke.jpg"));

        let resolved = store.resolve(Partition::Verified, &name).unwrap();
        assert_eq!(std::fs::read(resolved).unwrap(), b"image-bytes");
    }

    #[test]
    fn stored_names_never_collide() {
        let (_dir, store) = test_store();

        let a = store.store(Partition::Rejected, "same.jpg", b"a").unwrap();
        let b = store.store(Partition::Rejected, "same.jpg", b"b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn proofs_land_in_subpartition() {
        let (_dir, store) = test_store();

        let reference = store.store_proof("evidence.png", b"proof-bytes").unwrap();
        assert!(reference.starts_with("proofs/proof_"));
        assert!(reference.ends_with("_evidence.png"));

        let resolved = store.resolve(Partition::Verified, &reference).unwrap();
        assert_eq!(std::fs::read(resolved).unwrap(), b"proof-bytes");
    }

    #[test]
    fn traversal_outside_partition_is_rejected() {
        let (_dir, store) = test_store();

        // Plant a file in the sibling partition and try to reach it
        let name = store
            .store(Partition::Rejected, "secret.jpg", b"secret")
            .unwrap();

        let escape = format!("../rejected/{}", name);
        assert!(matches!(
            store.resolve(Partition::Verified, &escape),
            Err(breathe_common::Error::InvalidPath(_))
        ));

        assert!(matches!(
            store.resolve(Partition::Verified, "/etc/passwd"),
            Err(breathe_common::Error::InvalidPath(_))
        ));
    }

    #[test]
    fn missing_content_is_not_found() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.resolve(Partition::Verified, "nope.jpg"),
            Err(breathe_common::Error::NotFound(_))
        ));
    }
}
