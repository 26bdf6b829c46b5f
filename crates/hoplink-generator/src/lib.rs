//! Random short-code generation.
//!
//! Generators are pure: they never consult storage, so uniqueness is
//! probabilistic. The resolution service owns the collision check and the
//! bounded retry around it.

use hoplink_core::ShortCode;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::OsRng;

/// Length of generated short codes.
pub const CODE_LENGTH: usize = 10;

// 64 URL-safe symbols; a power of two, so uniform index sampling is
// unbiased by construction.
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Trait for generating short codes.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Generates a fresh random code.
    ///
    /// The output is valid by construction and carries no uniqueness
    /// guarantee.
    fn generate(&self) -> ShortCode;
}

/// Generates fixed-length codes from the OS's cryptographic random source.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator emitting codes of the default length.
    pub fn new() -> Self {
        Self::with_length(CODE_LENGTH)
    }

    /// Creates a generator emitting codes of `length` characters.
    pub fn with_length(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for RandomGenerator {
    fn generate(&self) -> ShortCode {
        let index = Uniform::from(0..ALPHABET.len());
        let code: String = (0..self.length)
            .map(|_| ALPHABET[index.sample(&mut OsRng)] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
