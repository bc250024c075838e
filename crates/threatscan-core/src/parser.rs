//! Extract a threat level and justification from a model reply.
//!
//! The classification prompt asks the model for
//! `threat_level <label> threat_level_justification <sentences>`. Nothing
//! enforces that format, so parsing sits behind [`VerdictParser`] and the
//! pipeline can switch to [`JsonParser`] for schema-constrained replies.

use serde::Deserialize;
use thiserror::Error;

use crate::config::ParserKind;
use crate::labels::ThreatLevel;

/// Token separating the level from the justification in marker replies.
pub const JUSTIFICATION_MARKER: &str = "threat_level_justification";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("reply does not contain the `{JUSTIFICATION_MARKER}` marker")]
    MissingMarker,
    #[error("reply is not a verdict object: {0}")]
    Json(String),
    #[error("threat level `{0}` is not a recognized label")]
    UnknownLevel(String),
}

/// Level and justification pulled out of a raw reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParsedVerdict {
    pub threat_level: String,
    pub justification: String,
}

pub trait VerdictParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict, ParseError>;
}

/// Splits the reply on the first [`JUSTIFICATION_MARKER`].
///
/// The left side loses its first whitespace-delimited token (the literal
/// `threat_level` label word) and the remaining tokens are concatenated
/// without separators. The right side is kept verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerParser;

impl VerdictParser for MarkerParser {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict, ParseError> {
        let (left, right) = raw
            .split_once(JUSTIFICATION_MARKER)
            .ok_or(ParseError::MissingMarker)?;

        let threat_level: String = left.split_whitespace().skip(1).collect();

        Ok(ParsedVerdict {
            threat_level,
            justification: right.to_string(),
        })
    }
}

/// Reads `{"threat_level": ..., "justification": ...}`, tolerating a
/// surrounding Markdown code fence.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl VerdictParser for JsonParser {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict, ParseError> {
        let body = strip_code_fence(raw);
        let parsed: ParsedVerdict =
            serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;
        Ok(ParsedVerdict {
            threat_level: parsed.threat_level.trim().to_string(),
            justification: parsed.justification,
        })
    }
}

/// Rejects levels outside the closed [`ThreatLevel`] set.
pub struct Strict<P>(pub P);

impl<P: VerdictParser> VerdictParser for Strict<P> {
    fn parse(&self, raw: &str) -> Result<ParsedVerdict, ParseError> {
        let parsed = self.0.parse(raw)?;
        if ThreatLevel::parse(&parsed.threat_level).is_none() {
            return Err(ParseError::UnknownLevel(parsed.threat_level));
        }
        Ok(parsed)
    }
}

/// Build the parser selected by configuration.
pub fn parser_for(kind: ParserKind, strict_labels: bool) -> Box<dyn VerdictParser> {
    match (kind, strict_labels) {
        (ParserKind::Marker, false) => Box::new(MarkerParser),
        (ParserKind::Marker, true) => Box::new(Strict(MarkerParser)),
        (ParserKind::Json, false) => Box::new(JsonParser),
        (ParserKind::Json, true) => Box::new(Strict(JsonParser)),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening fence line.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_reply_splits_into_level_and_justification() {
        let parsed = MarkerParser
            .parse("threat_level high threat_level_justification Because of explicit threats.")
            .unwrap();
        assert_eq!(parsed.threat_level, "high");
        assert_eq!(parsed.justification, " Because of explicit threats.");
    }

    #[test]
    fn marker_missing_is_an_error() {
        assert_eq!(
            MarkerParser.parse("no marker present"),
            Err(ParseError::MissingMarker)
        );
    }

    #[test]
    fn marker_splits_on_first_occurrence_only() {
        let parsed = MarkerParser
            .parse("threat_level low threat_level_justification see threat_level_justification again")
            .unwrap();
        assert_eq!(parsed.threat_level, "low");
        assert_eq!(
            parsed.justification,
            " see threat_level_justification again"
        );
    }

    #[test]
    fn marker_rejoins_remaining_tokens_without_separators() {
        let parsed = MarkerParser
            .parse("threat_level < moderate - high > threat_level_justification x")
            .unwrap();
        assert_eq!(parsed.threat_level, "<moderate-high>");
    }

    #[test]
    fn marker_accepts_any_label_when_lenient() {
        let parsed = MarkerParser
            .parse("label whatever threat_level_justification text. more text.")
            .unwrap();
        assert_eq!(parsed.threat_level, "whatever");
        assert_eq!(parsed.justification, " text. more text.");
    }

    #[test]
    fn marker_with_only_label_word_gives_empty_level() {
        let parsed = MarkerParser
            .parse("threat_level threat_level_justification nothing")
            .unwrap();
        assert_eq!(parsed.threat_level, "");
    }

    #[test]
    fn strict_rejects_unknown_level() {
        let parser = Strict(MarkerParser);
        assert_eq!(
            parser.parse("threat_level severe threat_level_justification x"),
            Err(ParseError::UnknownLevel("severe".into()))
        );
        assert!(
            parser
                .parse("threat_level low-moderate threat_level_justification x")
                .is_ok()
        );
    }

    #[test]
    fn json_reply_parses() {
        let parsed = JsonParser
            .parse(r#"{"threat_level": " moderate ", "justification": "Explicit wording."}"#)
            .unwrap();
        assert_eq!(parsed.threat_level, "moderate");
        assert_eq!(parsed.justification, "Explicit wording.");
    }

    #[test]
    fn json_reply_in_code_fence_parses() {
        let raw = "```json\n{\"threat_level\": \"low\", \"justification\": \"ok\"}\n```";
        assert_eq!(JsonParser.parse(raw).unwrap().threat_level, "low");
    }

    #[test]
    fn json_garbage_is_an_error() {
        assert!(matches!(
            JsonParser.parse("threat_level high"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn parser_for_respects_strictness() {
        let lenient = parser_for(ParserKind::Marker, false);
        let strict = parser_for(ParserKind::Marker, true);
        let raw = "threat_level unclear threat_level_justification x";
        assert!(lenient.parse(raw).is_ok());
        assert!(strict.parse(raw).is_err());
    }
}
