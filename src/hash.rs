//! Hasher for the crate's string-keyed maps.
//!
//! Event names and storage keys are short strings chosen by the application,
//! so HashDoS resistance buys nothing here. `FastHashBuilder` hashes them with
//! foldhash under a fixed seed and takes no space in the map.

use std::hash::BuildHasher;

use foldhash::fast::{FixedState, FoldHasher};

// Fixed so that map iteration and hashes are stable across runs
const BINDABLE_SEED: u64 = 0x62_696e_6461_626c_65;

/// Zero-sized, deterministic `BuildHasher` backed by foldhash.
#[derive(Clone, Copy, Debug, Default)]
pub struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(BINDABLE_SEED).build_hasher()
    }
}
