use serde::{Serialize, Serializer};

/// The closed set of tagged sections the backend is asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    Score,
    FirstImpression,
    AtsKeywords,
    ImpactQuantification,
    FormattingReadability,
    OverallRecommendation,
}

impl SectionKey {
    /// Every tag, in the order the prompt requests them.
    pub const ALL: [SectionKey; 6] = [
        SectionKey::Score,
        SectionKey::FirstImpression,
        SectionKey::AtsKeywords,
        SectionKey::ImpactQuantification,
        SectionKey::FormattingReadability,
        SectionKey::OverallRecommendation,
    ];

    /// The content sections, i.e. everything except the score.
    pub const CONTENT: [SectionKey; 5] = [
        SectionKey::FirstImpression,
        SectionKey::AtsKeywords,
        SectionKey::ImpactQuantification,
        SectionKey::FormattingReadability,
        SectionKey::OverallRecommendation,
    ];

    pub fn tag_name(&self) -> &'static str {
        match self {
            SectionKey::Score => "CVScore",
            SectionKey::FirstImpression => "FirstImpression",
            SectionKey::AtsKeywords => "ATSKeywords",
            SectionKey::ImpactQuantification => "ImpactQuantification",
            SectionKey::FormattingReadability => "FormattingReadability",
            SectionKey::OverallRecommendation => "OverallRecommendation",
        }
    }

    pub fn start_tag(&self) -> String {
        format!("<{}>", self.tag_name())
    }

    pub fn end_tag(&self) -> String {
        format!("</{}>", self.tag_name())
    }

    /// Heading shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKey::Score => "Compatibility Score",
            SectionKey::FirstImpression => "First Impression (5-Second Test)",
            SectionKey::AtsKeywords => "ATS & Keyword Alignment",
            SectionKey::ImpactQuantification => "Impact & Quantification",
            SectionKey::FormattingReadability => "Clarity, Formatting & Readability",
            SectionKey::OverallRecommendation => "Overall Recommendation",
        }
    }

    /// What the backend should write inside the tag.
    pub fn instruction(&self) -> &'static str {
        match self {
            SectionKey::Score => {
                "A single integer from 0 to 100 and nothing else: the sum of the three rubric scores."
            }
            SectionKey::FirstImpression => {
                "Your immediate impression of the candidate. What stands out, for better or worse?"
            }
            SectionKey::AtsKeywords => {
                "How well the resume is optimized for Applicant Tracking Systems. List the critical keywords for the role that are present and the ones that are missing."
            }
            SectionKey::ImpactQuantification => {
                "Identify 3-5 bullet points that could be stronger and rewrite them with the STAR method, adding metrics and quantifiable achievements."
            }
            SectionKey::FormattingReadability => {
                "Comment on structure and layout. Is it easy to read? Are there formatting issues?"
            }
            SectionKey::OverallRecommendation => {
                "A final summary and whether you would recommend this candidate for an interview, and why."
            }
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag_name())
    }
}

impl Serialize for SectionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag_name())
    }
}

/// Content sections recovered from one backend response.
///
/// Entries keep the order of [`SectionKey::CONTENT`]; a `None` body means the
/// tag pair was not found.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CritiqueSections {
    entries: Vec<(SectionKey, Option<String>)>,
}

impl CritiqueSections {
    pub(crate) fn from_entries(entries: Vec<(SectionKey, Option<String>)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: SectionKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, body)| body.as_deref())
    }

    /// Sections that parsed, in prompt order.
    pub fn present(&self) -> impl Iterator<Item = (SectionKey, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, body)| body.as_deref().map(|b| (*k, b)))
    }

    pub fn missing(&self) -> Vec<SectionKey> {
        self.entries
            .iter()
            .filter(|(_, body)| body.is_none())
            .map(|(k, _)| *k)
            .collect()
    }
}

impl Serialize for CritiqueSections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, body) in &self.entries {
            map.serialize_entry(key.tag_name(), body)?;
        }
        map.end()
    }
}
