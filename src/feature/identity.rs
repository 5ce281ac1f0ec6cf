use std::fmt;
use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use super::FeatureOptions;

/// Deterministic fingerprint of a feature's name and option set.
///
/// Options are folded with XOR so their order never changes the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureIdentity(u64);

impl FeatureIdentity {
    pub fn compute(
        name: &str,
        options: &FeatureOptions,
    ) -> Self {
        let seed = hash_of(&("feature", name));
        let folded = options.iter().fold(0u64, |acc, pair| acc ^ hash_of(&pair));
        FeatureIdentity(seed ^ folded.rotate_left(17))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureIdentity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
