//! Placement: one call per loaded definition, resolving its directive to a
//! set of parents against the forest as it stood before the call, then
//! attaching. A failed resolution leaves the forest untouched.

use std::sync::Arc;

use tracing::debug;

use loghound_core::RuleId;

use crate::definition::{PlacementDirective, RuleDefinition};
use crate::error::PlacementError;
use crate::forest::{NodeId, RuleForest};

impl RuleForest {
    /// Place a definition according to its directive.
    ///
    /// Directed modes resolve every parent first and fail without touching
    /// the forest when any is missing. Signature-directed rules inherit the
    /// matched parent's category before the definition is shared; with
    /// several listed parents the last one wins. Fan-out modes attach the
    /// same shared definition under every qualifying node, excluding nodes
    /// carrying the rule's own id.
    pub fn place(
        &mut self,
        mut definition: RuleDefinition,
    ) -> Result<Arc<RuleDefinition>, PlacementError> {
        let directive = definition.placement().clone();
        let parents = self.resolve_parents(definition.id(), &directive)?;

        if let (PlacementDirective::BySignature(_), Some(parents)) = (&directive, &parents) {
            if let Some(&last) = parents.last() {
                definition.set_category(self.occupied(last).definition().category());
            }
        }

        let definition = Arc::new(definition);
        match parents {
            None => {
                self.insert_root(definition.clone());
                debug!(
                    rule = definition.id(),
                    level = %definition.level(),
                    "placed rule as category root"
                );
            }
            Some(parents) => {
                for &parent in &parents {
                    self.insert_child(parent, definition.clone());
                }
                debug!(
                    rule = definition.id(),
                    parents = parents.len(),
                    "attached rule under matching parents"
                );
            }
        }
        Ok(definition)
    }

    /// Re-attach a definition that already lives in this forest, skipping
    /// parents that still hold it. Used when reconfiguration re-places the
    /// salvaged descendants of a removed rule.
    pub(crate) fn place_existing(
        &mut self,
        definition: Arc<RuleDefinition>,
    ) -> Result<(), PlacementError> {
        let directive = definition.placement().clone();
        let parents = self.resolve_parents(definition.id(), &directive)?;
        match parents {
            None => {
                let already_root = self
                    .roots()
                    .iter()
                    .any(|&root| Arc::ptr_eq(self.occupied(root).definition(), &definition));
                if !already_root {
                    self.insert_root(definition.clone());
                }
            }
            Some(parents) => {
                for &parent in &parents {
                    let duplicate = self
                        .occupied(parent)
                        .children()
                        .iter()
                        .any(|&child| Arc::ptr_eq(self.occupied(child).definition(), &definition));
                    if !duplicate {
                        self.insert_child(parent, definition.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolve a directive to parent nodes. `None` means the rule becomes
    /// a root. The scan runs against the current forest only; nothing is
    /// attached here.
    fn resolve_parents(
        &self,
        rule: RuleId,
        directive: &PlacementDirective,
    ) -> Result<Option<Vec<NodeId>>, PlacementError> {
        match directive {
            PlacementDirective::Category => Ok(None),
            PlacementDirective::BySignature(targets) => {
                let mut parents = Vec::with_capacity(targets.len());
                for &target in targets {
                    let parent = self
                        .find_by_signature(target)
                        .ok_or(PlacementError::SignatureNotFound { rule, target })?;
                    parents.push(parent);
                }
                Ok(Some(parents))
            }
            PlacementDirective::ByLevel(threshold) => {
                let parents: Vec<NodeId> = self
                    .iter()
                    .filter(|(_, node)| {
                        node.definition().level() >= *threshold && node.definition().id() != rule
                    })
                    .map(|(id, _)| id)
                    .collect();
                if parents.is_empty() {
                    return Err(PlacementError::LevelNotMatched {
                        rule,
                        threshold: *threshold,
                    });
                }
                Ok(Some(parents))
            }
            PlacementDirective::ByGroup(pattern) => {
                let parents: Vec<NodeId> = self
                    .iter()
                    .filter(|(_, node)| {
                        node.definition().id() != rule
                            && pattern.matches(node.definition().groups())
                    })
                    .map(|(id, _)| id)
                    .collect();
                if parents.is_empty() {
                    return Err(PlacementError::GroupNotMatched {
                        rule,
                        pattern: pattern.as_str().to_string(),
                    });
                }
                Ok(Some(parents))
            }
        }
    }
}
