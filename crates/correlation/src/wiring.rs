//! Backlink wiring: runs after placement, in the same single-writer load
//! pass. Wiring hands out match-history references; it never changes the
//! shape of the tree. Both operations are idempotent, so re-running the
//! wiring pass after a reconfiguration is safe.

use tracing::{debug, warn};

use crate::definition::{BacklinkDirective, RuleDefinition};
use crate::forest::RuleForest;

impl RuleForest {
    /// Give a signature-watching rule a reference to its target's match
    /// history, creating the target's history on first subscription. Every
    /// node carrying the target id is visited; the last one wins, which
    /// with unique signature ids is the only one.
    pub fn wire_by_id(&self, subscriber: &RuleDefinition) {
        let Some(BacklinkDirective::MatchedSignature(target)) = subscriber.backlink() else {
            return;
        };
        let target = *target;
        let mut wired = false;
        for (_, node) in self.iter() {
            if node.definition().id() == target {
                subscriber.set_watched(node.definition().history_handle());
                wired = true;
            }
        }
        if wired {
            debug!(
                rule = subscriber.id(),
                watched = target,
                "wired signature backlink"
            );
        } else {
            warn!(
                rule = subscriber.id(),
                watched = target,
                "backlink target not in forest"
            );
        }
    }

    /// Register the subscriber's own history as a feed on every rule with
    /// a matching group tag. Feeds already registered are skipped, so
    /// wiring the same subscriber twice never duplicates deliveries.
    pub fn wire_by_group(&self, subscriber: &RuleDefinition) {
        let Some(BacklinkDirective::MatchedGroup(pattern)) = subscriber.backlink() else {
            return;
        };
        let feed = subscriber.history_handle();
        let mut sources = 0usize;
        for (_, node) in self.iter() {
            if pattern.matches(node.definition().groups())
                && node.definition().add_subscriber_feed(feed.clone())
            {
                sources += 1;
            }
        }
        debug!(
            rule = subscriber.id(),
            sources,
            pattern = %pattern,
            "wired group backlink"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use loghound_core::{Category, Event, RuleId, Severity};

    use crate::definition::RuleDefinition;
    use crate::forest::RuleForest;

    fn builder(id: RuleId, level: u16) -> crate::definition::DefinitionBuilder {
        RuleDefinition::builder(id, Severity::from_level(level).unwrap(), Category::Syslog)
    }

    #[test]
    fn signature_wiring_creates_target_history_lazily() {
        let mut forest = RuleForest::new();
        let target = forest
            .place(builder(5716, 5).build().unwrap())
            .unwrap();
        let subscriber = forest
            .place(builder(5720, 10).watch_signature(5716).build().unwrap())
            .unwrap();

        assert!(target.history().is_none());
        forest.wire_by_id(&subscriber);

        let target_history = target.history().expect("history created by wiring");
        let watched = subscriber.watched_history().expect("watched assigned");
        assert!(Arc::ptr_eq(&target_history, &watched));
    }

    #[test]
    fn signature_wiring_is_idempotent() {
        let mut forest = RuleForest::new();
        forest.place(builder(5716, 5).build().unwrap()).unwrap();
        let subscriber = forest
            .place(builder(5720, 10).watch_signature(5716).build().unwrap())
            .unwrap();

        forest.wire_by_id(&subscriber);
        let first = subscriber.watched_history().unwrap();
        forest.wire_by_id(&subscriber);
        let second = subscriber.watched_history().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn signature_wiring_tolerates_missing_target() {
        let mut forest = RuleForest::new();
        let subscriber = forest
            .place(builder(5720, 10).watch_signature(4100).build().unwrap())
            .unwrap();

        forest.wire_by_id(&subscriber);
        assert!(subscriber.watched_history().is_none());
    }

    #[test]
    fn group_wiring_registers_feeds_on_matching_rules() {
        let mut forest = RuleForest::new();
        let sshd = forest
            .place(builder(5700, 5).group("sshd").build().unwrap())
            .unwrap();
        let apache = forest
            .place(builder(30100, 5).group("apache").build().unwrap())
            .unwrap();
        let subscriber = forest
            .place(builder(40500, 10).watch_group("sshd").build().unwrap())
            .unwrap();

        forest.wire_by_group(&subscriber);

        assert_eq!(sshd.subscriber_feeds().len(), 1);
        assert!(apache.subscriber_feeds().is_empty());
        let feed = subscriber.history().expect("subscriber history created");
        assert!(Arc::ptr_eq(&sshd.subscriber_feeds()[0], &feed));
    }

    #[test]
    fn group_wiring_is_idempotent() {
        let mut forest = RuleForest::new();
        let source = forest
            .place(builder(5700, 5).group("authentication_failed").build().unwrap())
            .unwrap();
        let subscriber = forest
            .place(
                builder(40501, 10)
                    .watch_group("authentication_*")
                    .build()
                    .unwrap(),
            )
            .unwrap();

        forest.wire_by_group(&subscriber);
        forest.wire_by_group(&subscriber);

        assert_eq!(source.subscriber_feeds().len(), 1);
    }

    #[test]
    fn matches_flow_through_wired_feeds() {
        let mut forest = RuleForest::new();
        let source = forest
            .place(builder(5700, 5).group("sshd").build().unwrap())
            .unwrap();
        let by_id = forest
            .place(builder(5710, 10).watch_signature(5700).build().unwrap())
            .unwrap();
        let by_group = forest
            .place(builder(5711, 10).watch_group("sshd").build().unwrap())
            .unwrap();
        forest.wire_by_id(&by_id);
        forest.wire_by_group(&by_group);

        source.record_match(Arc::new(Event::new("/var/log/auth.log", "Failed password")));

        assert_eq!(by_id.watched_history().unwrap().len(), 1);
        assert_eq!(by_group.history().unwrap().len(), 1);
    }
}
