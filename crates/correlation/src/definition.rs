//! Rule definitions: the immutable payload shared by every node a rule
//! occupies, plus the interior correlation state mutated by wiring.

use std::sync::{Arc, RwLock};

use loghound_core::{Category, CorrelationConfig, Event, GroupPattern, GroupSet, RuleId, Severity};

use crate::error::DefinitionError;
use crate::history::MatchHistory;

// ── Directives ────────────────────────────────────────────────

/// Where a rule attaches in the forest. A definition carries exactly one.
#[derive(Debug, Clone)]
pub enum PlacementDirective {
    /// No explicit directive: the rule becomes a root of its category.
    Category,
    /// Attach under every listed parent signature.
    BySignature(Vec<RuleId>),
    /// Attach under every rule at or above the threshold.
    ByLevel(Severity),
    /// Attach under every rule with a matching group tag.
    ByGroup(GroupPattern),
}

/// Which earlier matches a rule correlates against at serving time.
#[derive(Debug, Clone)]
pub enum BacklinkDirective {
    /// Watch the match history of one specific rule.
    MatchedSignature(RuleId),
    /// Receive the matches of every rule carrying a matching group tag.
    MatchedGroup(GroupPattern),
}

// ── Correlation state ─────────────────────────────────────────

/// Interior-mutable part of a definition, touched by wiring and by the
/// serving path when the rule matches. Tree restructuring never reaches
/// in here.
#[derive(Debug, Default)]
struct CorrelationState {
    /// This rule's own matched-event list, created lazily the first time
    /// something subscribes to it.
    history: RwLock<Option<Arc<MatchHistory>>>,
    /// The history this rule watches, assigned by signature wiring.
    watched: RwLock<Option<Arc<MatchHistory>>>,
    /// Histories of rules subscribed to this rule by group. Every match of
    /// this rule is appended to each of them.
    subscriber_feeds: RwLock<Vec<Arc<MatchHistory>>>,
}

impl CorrelationState {
    /// Copy that shares the same history handles.
    fn share_handles(&self) -> Self {
        Self {
            history: RwLock::new(self.history.read().expect("history slot poisoned").clone()),
            watched: RwLock::new(self.watched.read().expect("watched slot poisoned").clone()),
            subscriber_feeds: RwLock::new(
                self.subscriber_feeds
                    .read()
                    .expect("feeds lock poisoned")
                    .clone(),
            ),
        }
    }
}

// ── Rule definition ───────────────────────────────────────────

/// One loaded rule. Nodes reference definitions through `Arc`: a rule
/// fanned out under many parents is one definition attached many times.
#[derive(Debug)]
pub struct RuleDefinition {
    id: RuleId,
    level: Severity,
    category: Category,
    groups: GroupSet,
    placement: PlacementDirective,
    backlink: Option<BacklinkDirective>,
    description: Option<String>,
    source_file: Option<String>,
    frequency: Option<u32>,
    timeframe_secs: Option<u32>,
    state: CorrelationState,
}

impl RuleDefinition {
    pub fn builder(id: RuleId, level: Severity, category: Category) -> DefinitionBuilder {
        DefinitionBuilder {
            id,
            level,
            category,
            groups: GroupSet::new(),
            parents: None,
            level_gate: None,
            group_gate: None,
            watch_signature: None,
            watch_group: None,
            description: None,
            source_file: None,
            frequency: None,
            timeframe_secs: None,
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn groups(&self) -> &GroupSet {
        &self.groups
    }

    pub fn placement(&self) -> &PlacementDirective {
        &self.placement
    }

    pub fn backlink(&self) -> Option<&BacklinkDirective> {
        self.backlink.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// How many watched matches must accumulate before this rule fires,
    /// when it correlates over a window.
    pub fn frequency(&self) -> Option<u32> {
        self.frequency
    }

    pub fn timeframe_secs(&self) -> Option<u32> {
        self.timeframe_secs
    }

    /// The rule's own window, or the configured global default.
    pub fn effective_timeframe(&self, config: &CorrelationConfig) -> u32 {
        self.timeframe_secs.unwrap_or(config.default_timeframe_secs)
    }

    /// Signature-directed placement inherits the parent's category; the
    /// assignment happens before the definition is shared with the forest.
    pub(crate) fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    /// Rewrite parent references to `from` so they point at `to`. Used when
    /// a replaced rule's children are re-attached under its successor.
    pub(crate) fn remap_signature_target(&mut self, from: RuleId, to: RuleId) -> bool {
        let PlacementDirective::BySignature(targets) = &mut self.placement else {
            return false;
        };
        let mut changed = false;
        for target in targets.iter_mut() {
            if *target == from {
                *target = to;
                changed = true;
            }
        }
        changed
    }

    /// Copy carrying the same field values and the same history handles.
    /// The copy is independently placeable; correlation continuity is kept
    /// because the handles still point at the live histories.
    pub(crate) fn clone_with_state(&self) -> RuleDefinition {
        RuleDefinition {
            id: self.id,
            level: self.level,
            category: self.category,
            groups: self.groups.clone(),
            placement: self.placement.clone(),
            backlink: self.backlink.clone(),
            description: self.description.clone(),
            source_file: self.source_file.clone(),
            frequency: self.frequency,
            timeframe_secs: self.timeframe_secs,
            state: self.state.share_handles(),
        }
    }

    // ── Correlation state access ──────────────────────────────

    /// This rule's own match history, if anything subscribed to it.
    pub fn history(&self) -> Option<Arc<MatchHistory>> {
        self.state
            .history
            .read()
            .expect("history slot poisoned")
            .clone()
    }

    /// Own match history, created on first use.
    pub(crate) fn history_handle(&self) -> Arc<MatchHistory> {
        let mut slot = self.state.history.write().expect("history slot poisoned");
        slot.get_or_insert_with(|| Arc::new(MatchHistory::new()))
            .clone()
    }

    /// The history this rule watches, once signature wiring assigned one.
    pub fn watched_history(&self) -> Option<Arc<MatchHistory>> {
        self.state
            .watched
            .read()
            .expect("watched slot poisoned")
            .clone()
    }

    pub(crate) fn set_watched(&self, history: Arc<MatchHistory>) {
        *self.state.watched.write().expect("watched slot poisoned") = Some(history);
    }

    /// Register a subscriber's history. Returns false when the same handle
    /// is already registered, so re-wiring never duplicates a feed.
    pub(crate) fn add_subscriber_feed(&self, feed: Arc<MatchHistory>) -> bool {
        let mut feeds = self
            .state
            .subscriber_feeds
            .write()
            .expect("feeds lock poisoned");
        if feeds.iter().any(|existing| Arc::ptr_eq(existing, &feed)) {
            return false;
        }
        feeds.push(feed);
        true
    }

    /// Snapshot of the registered subscriber feeds.
    pub fn subscriber_feeds(&self) -> Vec<Arc<MatchHistory>> {
        self.state
            .subscriber_feeds
            .read()
            .expect("feeds lock poisoned")
            .clone()
    }

    /// Record a match of this rule: the event lands in the rule's own
    /// history (if anything watches it) and in every subscriber feed.
    pub fn record_match(&self, event: Arc<Event>) {
        if let Some(history) = self.history() {
            history.push(event.clone());
        }
        let feeds = self
            .state
            .subscriber_feeds
            .read()
            .expect("feeds lock poisoned");
        for feed in feeds.iter() {
            feed.push(event.clone());
        }
    }
}

// ── Builder ───────────────────────────────────────────────────

/// Builds a validated `RuleDefinition`. Placement directives are mutually
/// exclusive, as are backlink directives; violations are rejected at
/// `build()` before the forest ever sees the rule.
#[derive(Debug)]
pub struct DefinitionBuilder {
    id: RuleId,
    level: Severity,
    category: Category,
    groups: GroupSet,
    parents: Option<Vec<RuleId>>,
    level_gate: Option<Severity>,
    group_gate: Option<String>,
    watch_signature: Option<RuleId>,
    watch_group: Option<String>,
    description: Option<String>,
    source_file: Option<String>,
    frequency: Option<u32>,
    timeframe_secs: Option<u32>,
}

impl DefinitionBuilder {
    pub fn group(mut self, tag: impl Into<String>) -> Self {
        self.groups.push(tag);
        self
    }

    pub fn groups(mut self, groups: GroupSet) -> Self {
        self.groups = groups;
        self
    }

    /// Place under every listed parent signature.
    pub fn under_signatures(mut self, parents: impl IntoIterator<Item = RuleId>) -> Self {
        self.parents = Some(parents.into_iter().collect());
        self
    }

    /// Place under every rule at or above the given level.
    pub fn under_level(mut self, threshold: Severity) -> Self {
        self.level_gate = Some(threshold);
        self
    }

    /// Place under every rule with a group tag matching the pattern.
    pub fn under_group(mut self, pattern: impl Into<String>) -> Self {
        self.group_gate = Some(pattern.into());
        self
    }

    /// Correlate against the match history of one rule.
    pub fn watch_signature(mut self, target: RuleId) -> Self {
        self.watch_signature = Some(target);
        self
    }

    /// Correlate against every rule with a matching group tag.
    pub fn watch_group(mut self, pattern: impl Into<String>) -> Self {
        self.watch_group = Some(pattern.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn frequency(mut self, frequency: u32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn timeframe_secs(mut self, timeframe_secs: u32) -> Self {
        self.timeframe_secs = Some(timeframe_secs);
        self
    }

    pub fn build(self) -> Result<RuleDefinition, DefinitionError> {
        let placement = match (self.parents, self.level_gate, self.group_gate) {
            (None, None, None) => PlacementDirective::Category,
            (Some(parents), None, None) => {
                if parents.is_empty() {
                    return Err(DefinitionError::EmptyParentList(self.id));
                }
                PlacementDirective::BySignature(parents)
            }
            (None, Some(threshold), None) => {
                if threshold.level() == 0 {
                    return Err(DefinitionError::InvalidLevelGate(self.id));
                }
                PlacementDirective::ByLevel(threshold)
            }
            (None, None, Some(pattern)) => {
                PlacementDirective::ByGroup(GroupPattern::new(&pattern)?)
            }
            _ => return Err(DefinitionError::ConflictingPlacement(self.id)),
        };

        let backlink = match (self.watch_signature, self.watch_group) {
            (None, None) => None,
            (Some(target), None) => Some(BacklinkDirective::MatchedSignature(target)),
            (None, Some(pattern)) => {
                Some(BacklinkDirective::MatchedGroup(GroupPattern::new(&pattern)?))
            }
            (Some(_), Some(_)) => return Err(DefinitionError::ConflictingBacklink(self.id)),
        };

        Ok(RuleDefinition {
            id: self.id,
            level: self.level,
            category: self.category,
            groups: self.groups,
            placement,
            backlink,
            description: self.description,
            source_file: self.source_file,
            frequency: self.frequency,
            timeframe_secs: self.timeframe_secs,
            state: CorrelationState::default(),
        })
    }
}
