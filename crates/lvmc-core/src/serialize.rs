//! Binary lattice snapshots.
//!
//! A snapshot is the full lattice state (orientations, masks, particle
//! arena, serial counter, random stream) encoded with `bitcode` behind a
//! versioned header. Restoring a snapshot resumes the exact same run,
//! including particle ids and future random draws. When and where to take
//! snapshots is left to the driver.

use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a lattice snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x1A77_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot particle identities are inconsistent with its sites")]
    Inconsistent,
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Particle count when the snapshot was taken.
    pub particles: u64,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(particles: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            particles,
        }
    }

    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    header: SnapshotHeader,
    lattice: &'a Lattice,
}

#[derive(Deserialize)]
struct Snapshot {
    header: SnapshotHeader,
    lattice: Lattice,
}

/// Read just the header of a snapshot.
///
/// bitcode has no partial decoding, so this decodes the whole payload.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: Snapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

impl Lattice {
    /// Encode the full lattice state.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = SnapshotRef {
            header: SnapshotHeader::new(self.n_particles() as u64),
            lattice: self,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Decode a lattice, validating the header, the shape of every layer
    /// and the identity invariant.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: Snapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        if !snapshot.lattice.identity_is_consistent() {
            return Err(DeserializeError::Inconsistent);
        }
        log::debug!(
            "restored {}x{} lattice with {} particles",
            snapshot.lattice.width(),
            snapshot.lattice.height(),
            snapshot.lattice.n_particles()
        );
        Ok(snapshot.lattice)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
