use rand::Rng;
use uuid::Uuid;

use crate::StructureId;

/// Deterministic v4-format UUID drawn from a seeded RNG.
pub fn generate_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Id for a newly placed structure.
pub fn structure_id(rng: &mut impl Rng) -> StructureId {
    StructureId(format!("build_{}", generate_uuid(rng).simple()))
}
