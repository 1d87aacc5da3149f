use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a particle in the lattice's particle arena.
    ///
    /// Keys are generational: once a particle is removed its id never
    /// resolves again, even if the arena slot is reused.
    pub struct ParticleId;
}

/// Creation order of a particle. Strictly increasing over a lattice's
/// lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Serial(pub u64);
