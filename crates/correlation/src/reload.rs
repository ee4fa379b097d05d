//! Replacing a rule definition inside a forest under construction.
//!
//! Replacement is a structural operation: every node carrying the target
//! id is detached, the new definition is placed by its own directive, and
//! the distinct definitions salvaged from the detached subtrees are placed
//! again. Children that referenced the replaced id by signature are
//! remapped to the successor before re-placement. Wiring is not re-run
//! here; the reconfiguration session re-wires affected subscribers before
//! publishing.

use std::sync::Arc;

use tracing::{debug, info};

use loghound_core::RuleId;

use crate::definition::{PlacementDirective, RuleDefinition};
use crate::error::PlacementError;
use crate::forest::{NodeId, RuleForest};

impl RuleForest {
    /// Swap the definition carrying `target` for `replacement`.
    ///
    /// Returns `Ok(false)` when no node carries the target id; the forest
    /// is untouched. Re-placing a salvaged descendant can fail when its
    /// directive no longer resolves; the error is fatal for the forest
    /// being built, and callers discard it without publishing.
    pub fn replace(
        &mut self,
        target: RuleId,
        replacement: RuleDefinition,
    ) -> Result<bool, PlacementError> {
        let alias_nodes: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| node.definition().id() == target)
            .map(|(id, _)| id)
            .collect();
        if alias_nodes.is_empty() {
            debug!(rule = target, "replace target not in forest");
            return Ok(false);
        }

        // distinct descendant definitions across all detached subtrees,
        // preorder of first encounter so parents re-place before children
        let mut salvaged: Vec<Arc<RuleDefinition>> = Vec::new();
        for &alias in &alias_nodes {
            self.salvage_descendants(alias, target, &mut salvaged);
        }
        for &alias in &alias_nodes {
            self.remove_subtree(alias);
        }

        let replacement_id = replacement.id();
        self.place(replacement)?;

        let mut index = 0;
        while index < salvaged.len() {
            let definition = salvaged[index].clone();
            index += 1;

            let references_target = matches!(
                definition.placement(),
                PlacementDirective::BySignature(parents) if parents.contains(&target)
            );
            if references_target {
                // the definition moves under the successor; any attachment
                // that survived under another listed parent moves with it,
                // after its own descendants are salvaged
                let leftovers: Vec<NodeId> = self
                    .iter()
                    .filter(|(_, node)| Arc::ptr_eq(node.definition(), &definition))
                    .map(|(id, _)| id)
                    .collect();
                for &leftover in &leftovers {
                    self.salvage_descendants(leftover, target, &mut salvaged);
                }
                for leftover in leftovers {
                    self.remove_subtree(leftover);
                }

                let mut fresh = definition.clone_with_state();
                if fresh.remap_signature_target(target, replacement_id) {
                    debug!(
                        rule = fresh.id(),
                        from = target,
                        to = replacement_id,
                        "remapped parent signature"
                    );
                }
                self.place(fresh)?;
            } else {
                self.place_existing(definition)?;
            }
        }

        info!(
            old = target,
            new = replacement_id,
            descendants = salvaged.len(),
            "replaced rule definition"
        );
        Ok(true)
    }

    /// Append the distinct definitions below `root` to `out`, preorder,
    /// skipping the subtree root itself and any node carrying `skip_id`.
    fn salvage_descendants(
        &self,
        root: NodeId,
        skip_id: RuleId,
        out: &mut Vec<Arc<RuleDefinition>>,
    ) {
        for node_id in self.collect_subtree(root) {
            if node_id == root {
                continue;
            }
            let definition = self.occupied(node_id).definition();
            if definition.id() == skip_id {
                continue;
            }
            if !out.iter().any(|seen| Arc::ptr_eq(seen, definition)) {
                out.push(definition.clone());
            }
        }
    }
}
