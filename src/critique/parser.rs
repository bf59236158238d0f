use log::debug;
use regex::RegexBuilder;
use thiserror::Error;

use crate::critique::score::Score;
use crate::critique::sections::{CritiqueSections, SectionKey};

/// How to treat content sections that fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Stop at the first missing section and reject the whole response.
    #[default]
    Strict,
    /// Keep every section that parsed and report the rest as missing.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("no valid <CVScore> tag with an integer between 0 and 100")]
    MissingScore,
    #[error("section <{0}> is missing, unterminated or out of order")]
    MissingSection(SectionKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCritique {
    pub score: Score,
    pub sections: CritiqueSections,
}

/// Returns the trimmed text between the first `start_tag` and the first
/// `end_tag` that follows it. Matching ignores case and spans lines.
pub fn extract_section(text: &str, start_tag: &str, end_tag: &str) -> Option<String> {
    let pattern = format!(
        "{}(.*?){}",
        regex::escape(start_tag),
        regex::escape(end_tag)
    );
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .ok()?;

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
}

/// Reads the `<CVScore>` tag as an integer in `0..=100`.
pub fn extract_score(text: &str) -> Option<Score> {
    let key = SectionKey::Score;
    let raw = extract_section(text, &key.start_tag(), &key.end_tag())?;

    raw.parse::<i64>().ok().and_then(Score::new)
}

/// Recovers the score and every content section from one backend response.
///
/// A missing score always fails. In [`ParseMode::Strict`] the first missing
/// content section fails too and later sections are not looked at.
pub fn parse_critique(text: &str, mode: ParseMode) -> Result<ParsedCritique, ContractViolation> {
    debug!("parsing critique response ({} chars, {:?})", text.len(), mode);

    let score = extract_score(text).ok_or(ContractViolation::MissingScore)?;

    let mut entries = Vec::with_capacity(SectionKey::CONTENT.len());
    for key in SectionKey::CONTENT {
        let body = extract_section(text, &key.start_tag(), &key.end_tag());

        if body.is_none() {
            debug!("section {} not found", key);
            if mode == ParseMode::Strict {
                return Err(ContractViolation::MissingSection(key));
            }
        }

        entries.push((key, body));
    }

    Ok(ParsedCritique {
        score,
        sections: CritiqueSections::from_entries(entries),
    })
}
