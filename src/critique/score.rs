use serde::Serialize;

/// Rubric caps communicated to the backend. They must sum to [`Score::MAX`].
pub const ATS_ALIGNMENT_MAX: u8 = 35;
pub const IMPACT_MAX: u8 = 35;
pub const FORMATTING_MAX: u8 = 30;

/// A resume compatibility score, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const MAX: u8 = 100;

    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Score)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn band(&self) -> ScoreBand {
        match self.0 {
            80.. => ScoreBand::Strong,
            60.. => ScoreBand::Fair,
            _ => ScoreBand::Weak,
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong match",
            ScoreBand::Fair => "fair match",
            ScoreBand::Weak => "needs work",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_sums_to_max() {
        assert_eq!(ATS_ALIGNMENT_MAX + IMPACT_MAX + FORMATTING_MAX, Score::MAX);
    }

    #[test]
    fn boundaries_are_valid() {
        assert_eq!(Score::new(0).map(|s| s.value()), Some(0));
        assert_eq!(Score::new(100).map(|s| s.value()), Some(100));
        assert!(Score::new(101).is_none());
        assert!(Score::new(-1).is_none());
    }

    #[test]
    fn bands_follow_thresholds() {
        let band = |v| Score::new(v).unwrap().band();

        assert_eq!(band(100), ScoreBand::Strong);
        assert_eq!(band(80), ScoreBand::Strong);
        assert_eq!(band(79), ScoreBand::Fair);
        assert_eq!(band(60), ScoreBand::Fair);
        assert_eq!(band(59), ScoreBand::Weak);
        assert_eq!(band(0), ScoreBand::Weak);
    }
}
