//! Content hashing for interned strings
//!
//! 32-bit FNV-1a. The values must match other Lox implementations
//! exactly so that interning keys are comparable across them.

/// FNV-1a 32-bit offset basis
pub const FNV_OFFSET_BASIS: u32 = 2_166_136_261;

/// FNV-1a 32-bit prime
pub const FNV_PRIME: u32 = 16_777_619;

/// Hash a byte sequence with 32-bit FNV-1a
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}
