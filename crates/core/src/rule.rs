use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Signature id of a rule, unique across the loaded rule set.
pub type RuleId = u32;

// ── Severity ──────────────────────────────────────────────────

/// Rule severity. Configured levels run 0-16; internally the value is
/// stored scaled by 100 so follow-up thresholds compare on the same axis
/// the placement engine sorts siblings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Severity(u16);

impl Severity {
    pub const SCALE: u16 = 100;
    pub const MAX_LEVEL: u16 = 16;

    /// Build from a configured level (0-16).
    pub fn from_level(level: u16) -> Result<Self, CoreError> {
        if level > Self::MAX_LEVEL {
            return Err(CoreError::SeverityOutOfRange(level));
        }
        Ok(Self(level * Self::SCALE))
    }

    /// Build from an already-scaled value, as produced by [`Self::scaled`].
    /// Values above the scaled maximum are a caller bug.
    pub const fn from_scaled(scaled: u16) -> Self {
        debug_assert!(scaled <= Self::MAX_LEVEL * Self::SCALE);
        Self(scaled)
    }

    /// The scaled value used for ordering and threshold comparison.
    pub const fn scaled(self) -> u16 {
        self.0
    }

    /// The configured level as users wrote it.
    pub const fn level(self) -> u16 {
        self.0 / Self::SCALE
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl TryFrom<u16> for Severity {
    type Error = CoreError;

    fn try_from(level: u16) -> Result<Self, Self::Error> {
        Severity::from_level(level)
    }
}

impl From<Severity> for u16 {
    fn from(severity: Severity) -> u16 {
        severity.level()
    }
}

// ── Category ──────────────────────────────────────────────────

/// Decoder family a rule belongs to. Partitions the forest at the root:
/// an event is only matched against rules of its own category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Syslog,
    Firewall,
    Ids,
    Weblog,
    Proxy,
    Windows,
    Internal,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Syslog => write!(f, "syslog"),
            Category::Firewall => write!(f, "firewall"),
            Category::Ids => write!(f, "ids"),
            Category::Weblog => write!(f, "weblog"),
            Category::Proxy => write!(f, "proxy"),
            Category::Windows => write!(f, "windows"),
            Category::Internal => write!(f, "internal"),
        }
    }
}

impl FromStr for Category {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syslog" => Ok(Category::Syslog),
            "firewall" => Ok(Category::Firewall),
            "ids" => Ok(Category::Ids),
            "weblog" => Ok(Category::Weblog),
            "proxy" => Ok(Category::Proxy),
            "windows" => Ok(Category::Windows),
            "internal" => Ok(Category::Internal),
            other => Err(CoreError::UnknownCategory(other.to_string())),
        }
    }
}

// ── Group tags ────────────────────────────────────────────────

/// Ordered list of group tags a rule declares ("syslog", "sshd",
/// "authentication_failed", ...). Order is preserved; tags are matched
/// one by one against group patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSet(Vec<String>);

impl GroupSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Parse a comma-separated tag list; empty segments are skipped.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn push(&mut self, tag: impl Into<String>) {
        self.0.push(tag.into());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

// ── Group patterns ────────────────────────────────────────────

/// Compiled group matcher: `|`-separated alternatives, each a case-sensitive
/// glob tested against every tag of a `GroupSet` in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPattern {
    raw: String,
    alternatives: Vec<glob::Pattern>,
}

impl GroupPattern {
    pub fn new(pattern: &str) -> Result<Self, CoreError> {
        let mut alternatives = Vec::new();
        for alt in pattern.split('|').map(str::trim).filter(|s| !s.is_empty()) {
            let compiled = glob::Pattern::new(alt).map_err(|e| CoreError::InvalidGroupPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            alternatives.push(compiled);
        }
        if alternatives.is_empty() {
            return Err(CoreError::InvalidGroupPattern {
                pattern: pattern.to_string(),
                reason: "no alternatives".to_string(),
            });
        }
        Ok(Self {
            raw: pattern.to_string(),
            alternatives,
        })
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        self.alternatives.iter().any(|p| p.matches(tag))
    }

    /// True when any tag of the set matches any alternative.
    pub fn matches(&self, groups: &GroupSet) -> bool {
        groups.iter().any(|tag| self.matches_tag(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for GroupPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_stores_scaled_value() {
        let sev = Severity::from_level(7).unwrap();
        assert_eq!(sev.scaled(), 700);
        assert_eq!(sev.level(), 7);
        assert_eq!(sev.to_string(), "7");
    }

    #[test]
    fn severity_level_zero_is_valid() {
        let sev = Severity::from_level(0).unwrap();
        assert_eq!(sev.scaled(), 0);
    }

    #[test]
    fn severity_rejects_out_of_range() {
        assert!(matches!(
            Severity::from_level(17),
            Err(CoreError::SeverityOutOfRange(17))
        ));
    }

    #[test]
    #[should_panic]
    fn from_scaled_rejects_values_above_the_scaled_maximum() {
        let _ = Severity::from_scaled(1700);
    }

    #[test]
    fn severity_orders_by_level() {
        let low = Severity::from_level(3).unwrap();
        let high = Severity::from_level(12).unwrap();
        assert!(high > low);
        assert_eq!(low, Severity::from_scaled(300));
    }

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            Category::Syslog,
            Category::Firewall,
            Category::Ids,
            Category::Weblog,
            Category::Proxy,
            Category::Windows,
            Category::Internal,
        ] {
            assert_eq!(cat.to_string().parse::<Category>().unwrap(), cat);
        }
        assert!("nonsense".parse::<Category>().is_err());
    }

    #[test]
    fn group_set_parses_comma_list() {
        let groups = GroupSet::parse("syslog, sshd,,authentication_failed");
        assert_eq!(groups.len(), 3);
        assert!(groups.contains("sshd"));
        assert_eq!(groups.to_string(), "syslog,sshd,authentication_failed");
    }

    #[test]
    fn pattern_matches_exact_word() {
        let pattern = GroupPattern::new("sshd").unwrap();
        let groups = GroupSet::from_tags(["syslog", "sshd"]);
        assert!(pattern.matches(&groups));
        assert!(!pattern.matches(&GroupSet::from_tags(["apache"])));
    }

    #[test]
    fn pattern_matches_wildcard() {
        let pattern = GroupPattern::new("authentication_*").unwrap();
        let groups = GroupSet::from_tags(["authentication_failed"]);
        assert!(pattern.matches(&groups));
        assert!(!pattern.matches_tag("authorization_failed"));
    }

    #[test]
    fn pattern_matches_alternatives() {
        let pattern = GroupPattern::new("sshd|telnetd").unwrap();
        assert!(pattern.matches_tag("telnetd"));
        assert!(pattern.matches_tag("sshd"));
        assert!(!pattern.matches_tag("ftpd"));
    }

    #[test]
    fn pattern_rejects_bad_glob() {
        assert!(matches!(
            GroupPattern::new("auth[unclosed"),
            Err(CoreError::InvalidGroupPattern { .. })
        ));
    }

    #[test]
    fn pattern_rejects_empty() {
        assert!(GroupPattern::new("").is_err());
        assert!(GroupPattern::new(" | ").is_err());
    }
}
