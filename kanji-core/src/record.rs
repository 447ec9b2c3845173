//! Character records and example words.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{KanjiError, KanjiResult};

/// Elementary school grade (1-6) in the Japanese kanji curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    /// Lowest grade.
    pub const FIRST: Self = Self(1);
    /// Highest grade.
    pub const LAST: Self = Self(6);

    /// Create a grade, rejecting values outside 1-6.
    ///
    /// # Errors
    ///
    /// Returns [`KanjiError::UnknownGrade`] for values outside the curriculum.
    pub fn new(value: u8) -> KanjiResult<Self> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(KanjiError::UnknownGrade(value))
        }
    }

    /// Const constructor for static tables. Panics at compile time on an
    /// out-of-range grade.
    pub(crate) const fn const_new(value: u8) -> Self {
        assert!(value >= 1 && value <= 6, "grade must be 1-6");
        Self(value)
    }

    /// All grades in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::FIRST.0..=Self::LAST.0).map(Self)
    }

    /// Numeric value of the grade.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Grade {
    type Error = KanjiError;

    fn try_from(value: u8) -> KanjiResult<Self> {
        Self::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single curriculum entry.
///
/// Records live in static tables and are never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    /// The kanji itself.
    pub character: char,
    /// Grade in which the character is taught.
    pub grade: Grade,
    /// Primary reading in kana.
    pub reading: &'static str,
    /// English gloss.
    pub meaning: &'static str,
    /// Number of strokes, when known.
    pub stroke_count: Option<u8>,
    /// Example words annotated with furigana, e.g. `一日（いちにち）`.
    pub examples: &'static [&'static str],
}

impl CharacterRecord {
    /// Parsed example words.
    pub fn example_words(&self) -> impl Iterator<Item = ExampleWord<'static>> {
        self.examples.iter().map(|e| ExampleWord::parse(e))
    }
}

/// An example word split into its written form and furigana reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleWord<'a> {
    /// Written form, e.g. `一日`.
    pub word: &'a str,
    /// Reading from the parenthesised annotation, e.g. `いちにち`.
    pub reading: Option<&'a str>,
}

impl<'a> ExampleWord<'a> {
    /// Split `word（reading）` into its parts.
    ///
    /// Accepts full-width and ASCII parentheses. Text without an annotation
    /// becomes a word with no reading.
    #[must_use]
    pub fn parse(annotated: &'a str) -> Self {
        let annotated = annotated.trim();
        let open = annotated.find(['（', '(']);
        let Some(open) = open else {
            return Self {
                word: annotated,
                reading: None,
            };
        };

        let word = annotated[..open].trim_end();
        let rest = &annotated[open..];
        let rest = rest
            .strip_prefix('（')
            .or_else(|| rest.strip_prefix('('))
            .unwrap_or(rest);
        let reading = rest
            .trim_end()
            .trim_end_matches(['）', ')'])
            .trim();

        Self {
            word,
            reading: (!reading.is_empty()).then_some(reading),
        }
    }
}

impl fmt::Display for ExampleWord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reading {
            Some(reading) => write!(f, "{}（{reading}）", self.word),
            None => f.write_str(self.word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bounds() {
        assert!(Grade::new(0).is_err());
        assert!(Grade::new(7).is_err());
        assert_eq!(Grade::new(3).expect("grade").get(), 3);
        assert_eq!(Grade::all().count(), 6);
    }

    #[test]
    fn test_grade_serde_rejects_out_of_range() {
        let grade: Grade = serde_json::from_str("2").expect("grade");
        assert_eq!(grade.get(), 2);
        assert!(serde_json::from_str::<Grade>("9").is_err());
    }

    #[test]
    fn test_example_word_full_width() {
        let word = ExampleWord::parse("一年生（いちねんせい）");
        assert_eq!(word.word, "一年生");
        assert_eq!(word.reading, Some("いちねんせい"));
        assert_eq!(word.to_string(), "一年生（いちねんせい）");
    }

    #[test]
    fn test_example_word_ascii_parens() {
        let word = ExampleWord::parse("山 (やま)");
        assert_eq!(word.word, "山");
        assert_eq!(word.reading, Some("やま"));
    }

    #[test]
    fn test_example_word_without_reading() {
        let word = ExampleWord::parse("日本");
        assert_eq!(word.word, "日本");
        assert_eq!(word.reading, None);
        assert_eq!(word.to_string(), "日本");
    }
}
