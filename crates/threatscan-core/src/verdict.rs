//! Verdict records produced by classifying one window of text.

use serde::{Deserialize, Serialize};

/// Outcome of classifying a single window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// Files written before `status` existed only held successful verdicts.
    #[default]
    Ok,
    Error,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// A model verdict for one window of source text.
///
/// Persisted as one element of a result file. Field names on disk follow the
/// historical layout (`response`, `text`), hence the renames. Older files
/// carry only `threat_level`, `justification` and `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub threat_level: String,
    pub justification: String,
    #[serde(rename = "response", default)]
    pub raw_response: String,
    #[serde(default)]
    pub status: VerdictStatus,
    #[serde(rename = "text")]
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A successfully parsed verdict.
    pub fn ok(
        threat_level: String,
        justification: String,
        raw_response: String,
        source_text: String,
    ) -> Self {
        Self {
            threat_level,
            justification,
            raw_response,
            status: VerdictStatus::Ok,
            source_text,
            error: None,
        }
    }

    /// A failed classification. Level and justification are left empty.
    pub fn failed(raw_response: String, source_text: String, error: String) -> Self {
        Self {
            threat_level: String::new(),
            justification: String::new(),
            raw_response,
            status: VerdictStatus::Error,
            source_text,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == VerdictStatus::Ok
    }
}

/// Ordered verdicts for one source document, in source order.
pub type ResultSet = Vec<Verdict>;

/// Result of one `classify` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyReport {
    pub source_id: String,
    pub results: ResultSet,
    /// Windows submitted to the model during this call. Zero on a cache hit.
    pub windows: usize,
    /// Windows whose model call or reply parse failed.
    pub dropped_windows: usize,
    pub cache_hit: bool,
}

impl ClassifyReport {
    pub fn cached(source_id: &str, results: ResultSet) -> Self {
        Self {
            source_id: source_id.to_string(),
            results,
            windows: 0,
            dropped_windows: 0,
            cache_hit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_verdict_serializes_with_historical_field_names() {
        let v = Verdict::ok(
            "high".into(),
            " Because.".into(),
            "threat_level high threat_level_justification Because.".into(),
            "some text".into(),
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["threat_level"], "high");
        assert_eq!(json["status"], "ok");
        assert_eq!(json["text"], "some text");
        assert!(json.get("response").is_some());
        assert!(json.get("error").is_none(), "error omitted when absent");
    }

    #[test]
    fn failed_verdict_keeps_error() {
        let v = Verdict::failed(String::new(), "t".into(), "boom".into());
        assert!(!v.is_ok());
        let json = serde_json::to_string(&v).unwrap();
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error.as_deref(), Some("boom"));
        assert_eq!(back.status, VerdictStatus::Error);
    }

    #[test]
    fn reads_file_without_error_field() {
        let json = r#"[{
            "threat_level": "low",
            "justification": " context dependent",
            "response": "threat_level low threat_level_justification context dependent",
            "status": "ok",
            "text": "a window"
        }]"#;
        let set: ResultSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set[0].error.is_none());
        assert_eq!(set[0].source_text, "a window");
    }

    #[test]
    fn reads_three_field_legacy_file() {
        let json = r#"[{"threat_level": "low", "justification": " x", "text": "hello"}]"#;
        let set: ResultSet = serde_json::from_str(json).unwrap();
        assert_eq!(set[0].threat_level, "low");
        assert_eq!(set[0].source_text, "hello");
        assert_eq!(set[0].raw_response, "");
        assert!(set[0].is_ok());
    }
}
