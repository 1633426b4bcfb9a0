use crate::config::PipelineConfig;
use crate::foundation::core::UnitId;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::script::input::ScriptSection;

/// Lowercased abbreviations (without the final `.`) that never end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "ft", "vs", "fig", "figs",
    "approx", "dept", "est", "govt", "inc", "ltd", "co", "corp", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec", "e.g", "i.e", "cf", "al", "vol", "pp", "ed",
    "rev", "gen", "col", "capt", "lt", "sgt", "hon", "u.s", "u.k", "b.tech", "m.tech", "ph.d",
    "a.m", "p.m",
];

/// Abbreviations that end a sentence only when the next word is capitalized.
const SOFT_ABBREVIATIONS: &[&str] = &["etc"];

/// Abbreviations that stay attached only when a number follows ("No. 5").
const NUMBER_ABBREVIATIONS: &[&str] = &["no", "nos"];

/// Capitalized words that usually open a new sentence rather than continue a name.
const SENTENCE_OPENERS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "during", "for", "from", "he", "her", "his", "i",
    "if", "in", "it", "its", "later", "many", "now", "on", "one", "she", "since", "so", "some",
    "that", "the", "their", "then", "there", "these", "they", "this", "those", "thus", "today",
    "we", "when", "while", "with", "yet",
];

const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '\u{201d}', '\u{2019}'];

/// One sentence-level narration segment.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NarrationUnit {
    pub id: UnitId,
    pub text: String,
    /// Heuristic spoken duration in seconds (always `>= min_unit_duration`).
    pub estimated_duration: f64,
    /// Topic/subgroup key supplied with the script section, used for image lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Splits narration text into [`NarrationUnit`]s with estimated durations.
#[derive(Clone, Copy, Debug)]
pub struct Segmenter {
    words_per_second: f64,
    min_unit_duration: f64,
}

impl Segmenter {
    pub fn new(words_per_second: f64, min_unit_duration: f64) -> SlidecastResult<Self> {
        if !words_per_second.is_finite() || words_per_second <= 0.0 {
            return Err(SlidecastError::validation(
                "words_per_second must be finite and > 0",
            ));
        }
        if !min_unit_duration.is_finite() || min_unit_duration <= 0.0 {
            return Err(SlidecastError::validation(
                "min_unit_duration must be finite and > 0",
            ));
        }
        Ok(Self {
            words_per_second,
            min_unit_duration,
        })
    }

    pub fn from_config(cfg: &PipelineConfig) -> SlidecastResult<Self> {
        Self::new(cfg.words_per_second, cfg.min_unit_duration)
    }

    /// Estimated spoken duration for `text`, floored at the configured minimum.
    pub fn estimate_duration(&self, text: &str) -> f64 {
        let secs = count_words(text) as f64 / self.words_per_second;
        secs.max(self.min_unit_duration)
    }

    /// Segment a single untagged narration string.
    #[tracing::instrument(skip_all, fields(chars = text.len()))]
    pub fn segment(&self, text: &str) -> SlidecastResult<Vec<NarrationUnit>> {
        let sentences = split_sentences(text)?;
        let units = self.number(sentences.into_iter().map(|s| (s, None)), 1);
        tracing::debug!(units = units.len(), "segmented narration");
        Ok(units)
    }

    /// Segment topic-tagged sections, numbering units continuously across sections.
    #[tracing::instrument(skip_all, fields(sections = sections.len()))]
    pub fn segment_sections(&self, sections: &[ScriptSection]) -> SlidecastResult<Vec<NarrationUnit>> {
        let mut units = Vec::new();
        for (idx, section) in sections.iter().enumerate() {
            if section.text.trim().is_empty() {
                tracing::warn!(section = idx, "skipping empty script section");
                continue;
            }
            let sentences = split_sentences(&section.text)?;
            let next_id = units.len() as u32 + 1;
            let topic = section.topic.clone().filter(|t| !t.trim().is_empty());
            units.extend(self.number(
                sentences.into_iter().map(|s| (s, topic.clone())),
                next_id,
            ));
        }
        if units.is_empty() {
            return Err(SlidecastError::empty_input("script contains no narration text"));
        }
        tracing::debug!(units = units.len(), "segmented narration sections");
        Ok(units)
    }

    fn number(
        &self,
        sentences: impl Iterator<Item = (String, Option<String>)>,
        first_id: u32,
    ) -> Vec<NarrationUnit> {
        sentences
            .enumerate()
            .map(|(i, (text, topic))| NarrationUnit {
                id: UnitId(first_id + i as u32),
                estimated_duration: self.estimate_duration(&text),
                text,
                topic,
            })
            .collect()
    }
}

/// Count spoken words: whitespace-separated tokens containing at least one alphanumeric char.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Split `text` into trimmed sentences with whitespace collapsed.
///
/// Fails when the text is blank or has no sentence-ending punctuation at all.
pub fn split_sentences(text: &str) -> SlidecastResult<Vec<String>> {
    if text.trim().is_empty() {
        return Err(SlidecastError::empty_input("narration text is empty"));
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut saw_boundary = false;
    let mut i = 0usize;

    while i < chars.len() {
        if !is_terminal(chars[i]) {
            i += 1;
            continue;
        }

        let punct_start = i;
        let mut j = i;
        while j < chars.len() && is_terminal(chars[j]) {
            j += 1;
        }
        while j < chars.len() && CLOSERS.contains(&chars[j]) {
            j += 1;
        }

        let at_end = j >= chars.len();
        let followed_by_space = at_end || chars[j].is_whitespace();
        if followed_by_space && (at_end || ends_sentence(&chars, start, punct_start, j)) {
            saw_boundary = true;
            push_sentence(&mut out, &chars[start..j]);
            start = j;
        }
        i = j;
    }

    if !saw_boundary {
        return Err(SlidecastError::empty_input(
            "narration text contains no sentence boundaries",
        ));
    }
    if start < chars.len() {
        push_sentence(&mut out, &chars[start..]);
    }
    Ok(out)
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\u{2026}')
}

/// Decide whether the punctuation run `chars[punct_start..run_end]` closes a sentence.
fn ends_sentence(chars: &[char], sentence_start: usize, punct_start: usize, run_end: usize) -> bool {
    let run = &chars[punct_start..run_end];
    let single_period = run.iter().filter(|c| is_terminal(**c)).count() == 1 && run[0] == '.';
    if !single_period {
        return true;
    }

    let token = preceding_token(chars, sentence_start, punct_start);
    if token.is_empty() {
        return true;
    }
    let lower = token.to_lowercase();

    if ABBREVIATIONS.contains(&lower.as_str()) {
        return false;
    }
    if NUMBER_ABBREVIATIONS.contains(&lower.as_str()) {
        return !next_word(chars, run_end).starts_with(|c: char| c.is_ascii_digit());
    }
    if is_initial(&token) {
        return !continues_name(&next_word(chars, run_end));
    }
    if SOFT_ABBREVIATIONS.contains(&lower.as_str()) {
        return next_word_is_capitalized(chars, run_end);
    }
    true
}

/// A single uppercase letter such as "J." in "J. R. D. Tata". The pronoun "I" never is.
fn is_initial(token: &str) -> bool {
    let mut it = token.chars();
    matches!((it.next(), it.next()), (Some(c), None) if c.is_uppercase() && c != 'I')
}

/// Whether `next` reads as the rest of a name: another initial, or a capitalized word that is not
/// a common sentence opener.
fn continues_name(next: &str) -> bool {
    let bare = next.trim_end_matches(|c: char| !c.is_alphanumeric());
    if !bare.starts_with(char::is_uppercase) {
        return false;
    }
    if next.ends_with('.') && is_initial(bare) {
        return true;
    }
    !SENTENCE_OPENERS.contains(&bare.to_lowercase().as_str())
}

/// The whitespace-delimited word starting at or after `from`, without leading quotes/brackets.
fn next_word(chars: &[char], from: usize) -> String {
    chars[from..]
        .iter()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_start_matches(['(', '[', '{', '"', '\'', '\u{201c}', '\u{2018}'])
        .to_string()
}

/// Word immediately before `punct_start`, without leading brackets/quotes.
fn preceding_token(chars: &[char], sentence_start: usize, punct_start: usize) -> String {
    let mut k = punct_start;
    while k > sentence_start && !chars[k - 1].is_whitespace() {
        k -= 1;
    }
    chars[k..punct_start]
        .iter()
        .collect::<String>()
        .trim_start_matches(['(', '[', '{', '"', '\'', '\u{201c}', '\u{2018}'])
        .to_string()
}

fn next_word_is_capitalized(chars: &[char], from: usize) -> bool {
    chars[from..]
        .iter()
        .find(|c| !c.is_whitespace() && !matches!(c, '"' | '\'' | '(' | '\u{201c}'))
        .map(|c| c.is_uppercase() || c.is_numeric())
        .unwrap_or(true)
}

fn push_sentence(out: &mut Vec<String>, chars: &[char]) {
    let s: String = chars.iter().collect();
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        out.push(collapsed);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/script/segment.rs"]
mod tests;
