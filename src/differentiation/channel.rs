//! Channel-level differentiation: turns a subset of `(workflow, type, ctx)` into a 32-bit token.

use std::sync::RwLock;

use super::hash::{hash_token, HashAlgorithm};

pub type DiffToken = u32;

/// Input to channel creation: the full triple of classifiers, regardless of which are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDifferentiationTuple {
    pub workflow: u32,
    pub operation_type: u32,
    pub operation_context: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Classifiers {
    workflow: bool,
    operation_type: bool,
    operation_context: bool,
}

/// Turns a subset of classifiers into a fixed-width 32-bit token usable as a hash-table key.
///
/// `set_classifiers` records which inputs matter; `bind` materializes a dispatch choice. Both
/// are concurrency-safe against concurrent `token` calls via a write lock around rebinding.
#[derive(Debug)]
pub struct ChannelHashingDifferentiation {
    algorithm: HashAlgorithm,
    classifiers: RwLock<Classifiers>,
}

impl ChannelHashingDifferentiation {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        ChannelHashingDifferentiation {
            algorithm,
            classifiers: RwLock::new(Classifiers {
                workflow: true,
                operation_type: false,
                operation_context: false,
            }),
        }
    }

    pub fn set_classifiers(&self, workflow: bool, operation_type: bool, operation_context: bool) {
        let mut guard = self.classifiers.write().expect("differentiation lock poisoned");
        *guard = Classifiers {
            workflow,
            operation_type,
            operation_context,
        };
    }

    /// Materializes the dispatch choice. A no-op in this implementation (the formatter always
    /// re-reads `self.classifiers`), kept as an explicit call to preserve the two-step
    /// set-then-bind lifecycle the source exposes.
    pub fn bind(&self) {}

    pub fn token(&self, workflow: u32, operation_type: u32, operation_context: u32) -> DiffToken {
        let classifiers = *self.classifiers.read().expect("differentiation lock poisoned");
        let canonical = canonical_string(classifiers, workflow, operation_type, operation_context);
        hash_token(self.algorithm, canonical.as_bytes())
    }

    pub fn token_from_tuple(&self, tuple: ChannelDifferentiationTuple) -> DiffToken {
        self.token(tuple.workflow, tuple.operation_type, tuple.operation_context)
    }
}

fn canonical_string(
    classifiers: Classifiers,
    workflow: u32,
    operation_type: u32,
    operation_context: u32,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if classifiers.workflow {
        parts.push(workflow.to_string());
    }
    if classifiers.operation_type {
        parts.push(operation_type.to_string());
    }
    if classifiers.operation_context {
        parts.push(operation_context.to_string());
    }

    if parts.is_empty() {
        "no_diff".to_string()
    } else {
        parts.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_classifiers_hashes_no_diff_literal() {
        let builder = ChannelHashingDifferentiation::new(HashAlgorithm::default());
        builder.set_classifiers(false, false, false);
        builder.bind();
        let token_a = builder.token(1, 2, 3);
        let token_b = builder.token(9, 9, 9);
        assert_eq!(token_a, token_b);
    }

    #[test]
    fn distinct_workflows_distinct_tokens() {
        let builder = ChannelHashingDifferentiation::new(HashAlgorithm::default());
        builder.set_classifiers(true, false, false);
        builder.bind();
        assert_ne!(builder.token(1, 0, 0), builder.token(2, 0, 0));
    }

    #[test]
    fn disabled_classifier_is_skipped_not_defaulted() {
        let builder = ChannelHashingDifferentiation::new(HashAlgorithm::default());
        builder.set_classifiers(true, false, false);
        builder.bind();
        // operation_type/context vary but are disabled, so the token must not change.
        assert_eq!(builder.token(5, 1, 1), builder.token(5, 2, 2));
    }

    #[test]
    fn token_is_deterministic() {
        let builder = ChannelHashingDifferentiation::new(HashAlgorithm::default());
        builder.set_classifiers(true, true, true);
        builder.bind();
        assert_eq!(builder.token(1, 2, 3), builder.token(1, 2, 3));
    }
}
