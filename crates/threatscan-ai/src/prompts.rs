//! System prompts sent with every request.

use threatscan_core::ParserKind;

/// Label definitions shared by both classification reply formats.
const LABEL_DEFINITIONS: &str = "\
You are a diligent analyst. Your goal is to assign a label to a text, which describes a level of aggressive language.
You need to use one of the following labels:

negligible: may express prejudiced or bigoted opinions, but does not indicate commitment to or support for violence

low: Heavily reliant upon context to index stances supportive or prejudice or violence

low-moderate: Indexes ideations or support for violence in a context dependent manner

moderate: Indexes ideation or support for violence through explicit lexical choices and/or overt/repeated contextually engendered meanings

moderate-high: indexes emphatic support for violence through primarily explicit expressions which may be context dependent

high: Indexes through primarily explicit expressions of stance a desire or intent to attack
";

/// Asks for `threat_level <label> threat_level_justification <sentences>`.
pub fn marker_prompt() -> String {
    format!(
        "{LABEL_DEFINITIONS}
Instructions:

1. Identify the level of aggressive speech and the justification.
2. Respond using the following format:
threat_level < negligible | low | low-moderate | moderate | moderate-high | high > threat_level_justification < 2 or more sentences to justify the threat level >
"
    )
}

/// Asks for a bare JSON object with `threat_level` and `justification`.
pub fn json_prompt() -> String {
    format!(
        "{LABEL_DEFINITIONS}
Instructions:

1. Identify the level of aggressive speech and the justification.
2. Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:
{{\"threat_level\": \"one of the labels above\", \"justification\": \"2 or more sentences to justify the threat level\"}}
"
    )
}

pub fn classification_prompt(kind: ParserKind) -> String {
    match kind {
        ParserKind::Marker => marker_prompt(),
        ParserKind::Json => json_prompt(),
    }
}

pub const AD_COPY_PROMPT: &str = "\
Based on the following user message as a topic, generate advertisement copy that emphasizes the availability of \
anonymous, accessible, and affordable mental health resources. The ad should be no longer than four sentences. \
The ad should resonate with individuals experiencing increased distress about the following topic.";
