//! Identifier generation for gambits and replies.
//!
//! Identifiers are content-addressed rather than random: the `n`th identifier
//! handed out for a given source is the first eight base-62 characters of
//! `SHA-256(SHA-256(source) || n)`. Compiling the same file twice therefore
//! yields the same identifiers, which keeps knowledge-base diffs small and
//! makes incremental rebuilds reproducible.
//!
//! Collisions inside one file are ruled out by the caller through
//! [`IdGenerator::next_unused`]; across files the merge step reports them.

use crate::Id;
use sha2::{Digest, Sha256};

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
pub(crate) const ID_LEN: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct IdGenerator {
    seed: [u8; 32],
    counter: u64,
}

impl IdGenerator {
    /// A generator whose sequence is determined by `scope` (normally the
    /// source path).
    pub(crate) fn scoped(scope: &str) -> Self {
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&Sha256::digest(scope.as_bytes()));
        IdGenerator { seed, counter: 0 }
    }

    pub(crate) fn next_id(&mut self) -> Id {
        let mut hasher = Sha256::new();
        hasher.update(self.seed);
        hasher.update(self.counter.to_le_bytes());
        self.counter += 1;

        let digest = hasher.finalize();
        let text: String = digest.iter().take(ID_LEN).map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char).collect();
        Id(text)
    }

    /// Next identifier for which `taken` is false.
    pub(crate) fn next_unused(&mut self, taken: impl Fn(&Id) -> bool) -> Id {
        loop {
            let id = self.next_id();
            if !taken(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_eight_alphanumerics() {
        let mut ids = IdGenerator::scoped("main.ss");
        for _ in 0..64 {
            let id = ids.next_id();
            assert_eq!(id.as_str().len(), ID_LEN);
            assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn same_scope_same_sequence() {
        let mut a = IdGenerator::scoped("chat/pets.ss");
        let mut b = IdGenerator::scoped("chat/pets.ss");
        let mut c = IdGenerator::scoped("chat/food.ss");
        let first_a: Vec<Id> = (0..10).map(|_| a.next_id()).collect();
        let first_b: Vec<Id> = (0..10).map(|_| b.next_id()).collect();
        let first_c: Vec<Id> = (0..10).map(|_| c.next_id()).collect();
        assert_eq!(first_a, first_b);
        assert_ne!(first_a, first_c);
    }

    #[test]
    fn next_unused_skips_taken_ids() {
        let mut probe = IdGenerator::scoped("x");
        let taken: HashSet<Id> = [probe.next_id()].into_iter().collect();

        let mut ids = IdGenerator::scoped("x");
        let id = ids.next_unused(|id| taken.contains(id));
        assert!(!taken.contains(&id));
    }
}
