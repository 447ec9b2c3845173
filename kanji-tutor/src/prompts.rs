//! Instruction texts and response schemas sent to the model.

use serde_json::{json, Value};

/// Recognition instruction.
pub const RECOGNIZE: &str = "Identify the single Japanese Kanji character in this image. \
Respond with only the character itself and no other text or explanation.";

/// Strict verification instruction for `target`.
#[must_use]
pub fn verify(target: char) -> String {
    format!(
        "This image is a child's handwritten attempt at the kanji 「{target}」. \
Judge strictly whether it is an acceptable rendition. Reject it if any of these fail:
1. Stroke endings: no terminal stroke overshoots where it should stop.
2. Stroke lengths: the relative lengths of strokes match the model form, so a stroke \
that should be longer than another is longer.
3. Stroke finish: every hook (はね), stop (とめ) and sweep (はらい) is drawn as \
the character requires.
4. Proportion: the overall balance and proportion of the parts match the character.
5. Identity: the drawing cannot be mistaken for a different character.
Every stroke must be present and no extra strokes drawn. Answer in JSON."
    )
}

/// Correction instruction for `target`.
#[must_use]
pub fn correction(target: char) -> String {
    format!(
        "This image is an elementary school student's handwritten attempt at the kanji \
「{target}」. Explain kindly, in two or three short sentences of simple Japanese using \
hiragana, which parts differ from the correct shape and how to fix them. Mention \
missing, extra, touching or crossing strokes. Do not use markdown."
    )
}

/// Example word instruction for `character`.
#[must_use]
pub fn examples(character: char) -> String {
    format!(
        "List three common Japanese words that an elementary school student would know \
which use the kanji 「{character}」. Write each as the word followed by its reading in \
hiragana inside full-width parentheses, for example 一日（いちにち）."
    )
}

/// Quiz sentence instruction for `character`.
#[must_use]
pub fn quiz(character: char) -> String {
    format!(
        "Write one short, simple Japanese sentence for an elementary school student that \
uses the kanji 「{character}」. Replace 「{character}」 in the sentence with （　） and \
write the other kanji with their readings in hiragana. Return the sentence and the \
answer 「{character}」."
    )
}

/// Response schema for [`verify`].
#[must_use]
pub fn verdict_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "isCorrect": { "type": "BOOLEAN" }
        },
        "required": ["isCorrect"]
    })
}

/// Response schema for [`examples`].
#[must_use]
pub fn examples_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" }
    })
}

/// Response schema for [`quiz`].
#[must_use]
pub fn quiz_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sentence": { "type": "STRING" },
            "answer": { "type": "STRING" }
        },
        "required": ["sentence", "answer"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_names_every_criterion() {
        let text = verify('右');
        assert!(text.contains("「右」"));
        for criterion in [
            "overshoots",
            "relative lengths",
            "hook",
            "stop",
            "sweep",
            "proportion",
            "mistaken for a different character",
        ] {
            assert!(text.contains(criterion), "missing {criterion}");
        }
        assert!(!text.contains("Ignore"));
    }

    #[test]
    fn test_verdict_schema_requires_flag() {
        assert_eq!(verdict_schema()["required"], json!(["isCorrect"]));
    }
}
