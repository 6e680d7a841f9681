pub mod channel;
pub mod hash;
pub mod object;

pub use channel::{ChannelDifferentiationTuple, ChannelHashingDifferentiation};
pub use hash::HashAlgorithm;
pub use object::{ObjectDifferentiationPair, ObjectHashingDifferentiation};

/// The 32-bit hash of the canonical string of enabled classifiers.
pub type DiffToken = u32;
