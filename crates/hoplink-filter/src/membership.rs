use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;
use typed_builder::TypedBuilder;

/// Well-known key under which the serialized filter snapshot is persisted
/// in the cache layer's backing store.
pub const SNAPSHOT_KEY: &str = "hl:filter:snapshot";

/// Default number of bit slots.
pub const DEFAULT_SLOTS: usize = 10_000;

/// Default target false-positive rate.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

// Fixed SipHash keys. The bit positions a code maps to must be stable
// across processes, or a persisted snapshot would be useless after restart.
const SIP_KEYS: [(u64, u64); 2] = [
    (0x6870_6c6e_6b5f_6631, 0x9e37_79b9_7f4a_7c15),
    (0x6870_6c6e_6b5f_6632, 0xc2b2_ae3d_27d4_eb4f),
];

/// Number of hash rounds for a filter of `slots` bits sized for
/// `expected_items` entries at the target `false_positive_rate`.
pub fn hash_rounds(slots: usize, expected_items: usize, false_positive_rate: f64) -> u32 {
    (-(slots as f64 / expected_items as f64) * false_positive_rate.ln()).ceil() as u32
}

/// Sizing parameters for a [`MembershipFilter`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct FilterConfig {
    /// Number of bit slots in the filter.
    #[builder(default = DEFAULT_SLOTS)]
    pub slots: usize,

    /// Expected number of codes to be inserted. Defaults to half the slot
    /// count when not set.
    #[builder(default, setter(strip_option))]
    pub expected_items: Option<usize>,

    /// Target false-positive rate as a probability between 0.0 and 1.0.
    #[builder(default = DEFAULT_FALSE_POSITIVE_RATE)]
    pub false_positive_rate: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A monotonically growing approximation of "codes ever created".
///
/// May yield false positives, never false negatives: a code that was
/// inserted always tests positive thereafter. There is no remove
/// operation.
///
/// The whole structure serializes as a snapshot so restarts do not force a
/// rebuild from the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipFilter {
    bits: Vec<u64>,
    slots: u64,
    rounds: u32,
}

impl MembershipFilter {
    /// Creates an empty filter sized per `config`.
    pub fn new(config: &FilterConfig) -> Self {
        let slots = config.slots.max(1);
        let expected_items = config.expected_items.unwrap_or(slots / 2).max(1);
        let rounds = hash_rounds(slots, expected_items, config.false_positive_rate).max(1);

        Self {
            bits: vec![0; slots.div_ceil(64)],
            slots: slots as u64,
            rounds,
        }
    }

    /// Registers a code as possibly present. Idempotent.
    ///
    /// Returns `true` if the filter changed, i.e. the code did not already
    /// test positive.
    pub fn insert(&mut self, code: &str) -> bool {
        let (h1, h2) = Self::hash_pair(code);
        let mut changed = false;

        for round in 0..self.rounds {
            let index = self.slot_index(h1, h2, round);
            let (word, mask) = (index / 64, 1u64 << (index % 64));
            if self.bits[word as usize] & mask == 0 {
                self.bits[word as usize] |= mask;
                changed = true;
            }
        }

        changed
    }

    /// Whether the code could have been inserted.
    ///
    /// `false` is a guarantee of absence; `true` means "check further".
    pub fn may_contain(&self, code: &str) -> bool {
        let (h1, h2) = Self::hash_pair(code);

        (0..self.rounds).all(|round| {
            let index = self.slot_index(h1, h2, round);
            let (word, mask) = (index / 64, 1u64 << (index % 64));
            self.bits[word as usize] & mask != 0
        })
    }

    /// Number of hash rounds this filter applies per code.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Number of bit slots in this filter.
    pub fn slots(&self) -> usize {
        self.slots as usize
    }

    /// Serializes the filter into snapshot bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Restores a filter from snapshot bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    // Kirsch-Mitzenmacher double hashing: round i probes (h1 + i*h2) mod m.
    fn slot_index(&self, h1: u64, h2: u64, round: u32) -> u64 {
        h1.wrapping_add(u64::from(round).wrapping_mul(h2)) % self.slots
    }

    fn hash_pair(code: &str) -> (u64, u64) {
        let mut hashes = SIP_KEYS.iter().map(|&(k0, k1)| {
            let mut hasher = SipHasher13::new_with_keys(k0, k1);
            hasher.write(code.as_bytes());
            hasher.finish()
        });
        let h1 = hashes.next().unwrap_or_default();
        // An even h2 would cycle through a subset of slots; force it odd.
        let h2 = hashes.next().unwrap_or_default() | 1;
        (h1, h2)
    }
}
