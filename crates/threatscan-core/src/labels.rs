//! The closed set of aggressive-language threat levels.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// Threat level labels the classification prompt asks the model to use,
/// ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatLevel {
    Negligible,
    Low,
    LowModerate,
    Moderate,
    ModerateHigh,
    High,
}

impl ThreatLevel {
    pub const ALL: [ThreatLevel; 6] = [
        Self::Negligible,
        Self::Low,
        Self::LowModerate,
        Self::Moderate,
        Self::ModerateHigh,
        Self::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Low => "low",
            Self::LowModerate => "low-moderate",
            Self::Moderate => "moderate",
            Self::ModerateHigh => "moderate-high",
            Self::High => "high",
        }
    }

    /// Match a label exactly as the model wrote it, ignoring ASCII case.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label counts over a result set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub counts: BTreeMap<ThreatLevel, usize>,
    /// Verdicts whose label is outside the closed set.
    pub unrecognized: usize,
}

impl LevelSummary {
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let mut summary = Self::default();
        for v in verdicts.iter().filter(|v| v.is_ok()) {
            match ThreatLevel::parse(&v.threat_level) {
                Some(level) => *summary.counts.entry(level).or_insert(0) += 1,
                None => summary.unrecognized += 1,
            }
        }
        summary
    }

    /// Most severe level present, if any.
    pub fn highest(&self) -> Option<ThreatLevel> {
        self.counts.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_labels() {
        for level in ThreatLevel::ALL {
            assert_eq!(ThreatLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(ThreatLevel::parse("HIGH"), Some(ThreatLevel::High));
        assert_eq!(ThreatLevel::parse("severe"), None);
        assert_eq!(ThreatLevel::parse(""), None);
    }

    #[test]
    fn ordering_follows_severity() {
        assert!(ThreatLevel::Negligible < ThreatLevel::LowModerate);
        assert!(ThreatLevel::ModerateHigh < ThreatLevel::High);
    }

    #[test]
    fn summary_counts_and_highest() {
        let v = |level: &str| Verdict::ok(level.into(), String::new(), String::new(), String::new());
        let verdicts = vec![
            v("low"),
            v("low"),
            v("moderate-high"),
            v("<unsure>"),
            Verdict::failed(String::new(), String::new(), "x".into()),
        ];
        let summary = LevelSummary::from_verdicts(&verdicts);
        assert_eq!(summary.counts[&ThreatLevel::Low], 2);
        assert_eq!(summary.unrecognized, 1);
        assert_eq!(summary.highest(), Some(ThreatLevel::ModerateHigh));
    }

    #[test]
    fn serde_uses_kebab_labels() {
        let json = serde_json::to_string(&ThreatLevel::LowModerate).unwrap();
        assert_eq!(json, "\"low-moderate\"");
    }
}
