//! Generation publication.
//!
//! A forest is built or rebuilt off to the side by a single writer, then
//! swapped in atomically. Event-processing threads snapshot the current
//! generation and traverse it lock-free for as long as they hold the
//! handle; superseded generations are reclaimed when the last in-flight
//! snapshot drops.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::forest::RuleForest;

/// One complete, immutable forest version.
#[derive(Debug)]
pub struct Generation {
    number: u64,
    forest: RuleForest,
}

impl Generation {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn forest(&self) -> &RuleForest {
        &self.forest
    }
}

/// Shared serving handle over the current rule generation.
#[derive(Debug)]
pub struct RuleEngine {
    current: RwLock<Arc<Generation>>,
}

impl RuleEngine {
    /// Engine serving an empty generation 0 until the first publish.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation {
                number: 0,
                forest: RuleForest::new(),
            })),
        }
    }

    /// Snapshot of the serving generation. Snapshots stay fully
    /// traversable across later publishes.
    pub fn current(&self) -> Arc<Generation> {
        self.current
            .read()
            .expect("generation lock poisoned")
            .clone()
    }

    /// Copy of the serving forest for a reconfiguration session to work
    /// on. Definitions stay shared; tree structure is copied.
    pub fn working_copy(&self) -> RuleForest {
        self.current().forest().clone()
    }

    /// Atomically swap in a fully built forest, returning the new
    /// generation number.
    pub fn publish(&self, forest: RuleForest) -> u64 {
        let mut current = self.current.write().expect("generation lock poisoned");
        let number = current.number + 1;
        let nodes = forest.len();
        *current = Arc::new(Generation { number, forest });
        info!(generation = number, nodes, "published rule generation");
        number
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
