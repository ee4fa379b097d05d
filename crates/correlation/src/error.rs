use thiserror::Error;

use loghound_core::{CoreError, RuleId, Severity};

/// Why a rule could not be attached to the forest. All variants are fatal
/// for the load or reconfiguration session that triggered them: the forest
/// being built must be discarded, the published generation is unaffected.
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("Rule {rule}: parent signature {target} not found")]
    SignatureNotFound { rule: RuleId, target: RuleId },

    #[error("Rule {rule}: no rule at level {threshold} or above to attach under")]
    LevelNotMatched { rule: RuleId, threshold: Severity },

    #[error("Rule {rule}: no rule group matches '{pattern}'")]
    GroupNotMatched { rule: RuleId, pattern: String },
}

/// Rejected rule definitions, caught at build time before the forest is
/// ever touched.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Rule {0}: more than one placement directive")]
    ConflictingPlacement(RuleId),

    #[error("Rule {0}: more than one backlink directive")]
    ConflictingBacklink(RuleId),

    #[error("Rule {0}: empty parent signature list")]
    EmptyParentList(RuleId),

    #[error("Rule {0}: level gate must be 1 or higher")]
    InvalidLevelGate(RuleId),

    #[error(transparent)]
    InvalidGroupPattern(#[from] CoreError),
}
