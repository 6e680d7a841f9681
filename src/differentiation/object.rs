//! Object-level differentiation: turns a subset of `(type, ctx)` into a 32-bit token.
//!
//! An analogue of [`super::channel::ChannelHashingDifferentiation`] restricted to the two
//! classifiers meaningful inside a single channel.

use std::sync::RwLock;

use super::hash::{hash_token, HashAlgorithm};

pub type DiffToken = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDifferentiationPair {
    pub operation_type: u32,
    pub operation_context: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Classifiers {
    operation_type: bool,
    operation_context: bool,
}

#[derive(Debug)]
pub struct ObjectHashingDifferentiation {
    algorithm: HashAlgorithm,
    classifiers: RwLock<Classifiers>,
}

impl ObjectHashingDifferentiation {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        ObjectHashingDifferentiation {
            algorithm,
            classifiers: RwLock::new(Classifiers {
                operation_type: true,
                operation_context: false,
            }),
        }
    }

    pub fn set_classifiers(&self, operation_type: bool, operation_context: bool) {
        let mut guard = self.classifiers.write().expect("differentiation lock poisoned");
        *guard = Classifiers {
            operation_type,
            operation_context,
        };
    }

    pub fn bind(&self) {}

    pub fn token(&self, operation_type: u32, operation_context: u32) -> DiffToken {
        let classifiers = *self.classifiers.read().expect("differentiation lock poisoned");
        let mut parts: Vec<String> = Vec::with_capacity(2);
        if classifiers.operation_type {
            parts.push(operation_type.to_string());
        }
        if classifiers.operation_context {
            parts.push(operation_context.to_string());
        }

        let canonical = if parts.is_empty() {
            "no_diff".to_string()
        } else {
            parts.join("|")
        };
        hash_token(self.algorithm, canonical.as_bytes())
    }

    pub fn token_from_pair(&self, pair: ObjectDifferentiationPair) -> DiffToken {
        self.token(pair.operation_type, pair.operation_context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_differentiates_by_operation_type() {
        let builder = ObjectHashingDifferentiation::new(HashAlgorithm::default());
        builder.bind();
        assert_ne!(builder.token(1, 0), builder.token(2, 0));
    }
}
