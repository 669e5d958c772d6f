use std::borrow::Cow;

use crate::libs::error::FilterError;

/// Number of characters of an aligned string shown in a summary
pub const SUMMARY_WIDTH: usize = 75;

/// Appended to aligned strings cut at `SUMMARY_WIDTH`
pub const ELLIPSIS: &str = "...";

/// One database sequence matched against the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlignment {
    pub title: String,
    pub subject_length: usize,
    pub hits: Vec<RawHit>,
}

/// One local alignment segment (HSP) within a `RawAlignment`.
///
/// Coordinates are 1-based and inclusive, as reported by BLAST.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHit {
    pub identities: usize,
    pub align_length: usize, // aligned region, gaps included
    pub score: f64,
    pub bit_score: f64,
    pub expect_value: f64,
    pub query_start: usize,
    pub query_end: usize,
    pub subject_start: usize,
    pub subject_end: usize,
    pub query_segment: String,
    pub match_line: String,
    pub subject_segment: String,
}

/// Percentage of aligned positions that are identical.
///
/// Returns `None` for an empty alignment.
///
/// ```
/// use blastsift::libs::hit::identity_percent;
/// assert_eq!(identity_percent(90, 100), Some(90.0));
/// assert_eq!(identity_percent(3, 0), None);
/// ```
pub fn identity_percent(identities: usize, align_length: usize) -> Option<f64> {
    if align_length == 0 {
        None
    } else {
        Some(100.0 * identities as f64 / align_length as f64)
    }
}

/// Percentage of the query spanned by the aligned region.
///
/// ```
/// use blastsift::libs::hit::coverage_percent;
/// assert_eq!(coverage_percent(50, 200), Some(25.0));
/// assert_eq!(coverage_percent(50, 0), None);
/// ```
pub fn coverage_percent(align_length: usize, query_length: usize) -> Option<f64> {
    if query_length == 0 {
        None
    } else {
        Some(100.0 * align_length as f64 / query_length as f64)
    }
}

/// Cuts `s` to its first `SUMMARY_WIDTH` characters and marks the cut.
pub fn truncate_segment(s: &str) -> Cow<'_, str> {
    match s.char_indices().nth(SUMMARY_WIDTH) {
        Some((idx, _)) => Cow::Owned(format!("{}{}", &s[..idx], ELLIPSIS)),
        None => Cow::Borrowed(s),
    }
}

/// Minimum identity and coverage a hit needs to be kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    minimum_identity_percent: f64,
    minimum_coverage_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            minimum_identity_percent: 80.0,
            minimum_coverage_percent: 80.0,
        }
    }
}

impl Thresholds {
    pub fn new(identity: f64, coverage: f64) -> Result<Self, FilterError> {
        Ok(Self {
            minimum_identity_percent: check_percent("identity", identity)?,
            minimum_coverage_percent: check_percent("coverage", coverage)?,
        })
    }

    pub fn minimum_identity_percent(&self) -> f64 {
        self.minimum_identity_percent
    }

    pub fn minimum_coverage_percent(&self) -> f64 {
        self.minimum_coverage_percent
    }

    /// Both conditions are inclusive and both must hold.
    pub fn accepts(&self, identity: f64, coverage: f64) -> bool {
        identity >= self.minimum_identity_percent && coverage >= self.minimum_coverage_percent
    }
}

fn check_percent(name: &'static str, value: f64) -> Result<f64, FilterError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(FilterError::InvalidThreshold { name, value })
    }
}

/// A hit that passed the thresholds, with its derived percentages.
///
/// Holds copies of the raw fields; nothing refers back to the search result.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredHit {
    title: String,
    subject_length: usize,
    query_length: usize,
    identity_percent: f64,
    coverage_percent: f64,
    hit: RawHit,
}

/// Display form of the three aligned strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView<'a> {
    pub query_segment: Cow<'a, str>,
    pub match_line: Cow<'a, str>,
    pub subject_segment: Cow<'a, str>,
}

impl FilteredHit {
    pub(crate) fn new(
        alignment: &RawAlignment,
        hit: &RawHit,
        query_length: usize,
        identity_percent: f64,
        coverage_percent: f64,
    ) -> Self {
        Self {
            title: alignment.title.clone(),
            subject_length: alignment.subject_length,
            query_length,
            identity_percent,
            coverage_percent,
            hit: hit.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subject_length(&self) -> usize {
        self.subject_length
    }

    pub fn query_length(&self) -> usize {
        self.query_length
    }

    pub fn identity_percent(&self) -> f64 {
        self.identity_percent
    }

    pub fn coverage_percent(&self) -> f64 {
        self.coverage_percent
    }

    pub fn identities(&self) -> usize {
        self.hit.identities
    }

    pub fn align_length(&self) -> usize {
        self.hit.align_length
    }

    pub fn score(&self) -> f64 {
        self.hit.score
    }

    pub fn bit_score(&self) -> f64 {
        self.hit.bit_score
    }

    pub fn expect_value(&self) -> f64 {
        self.hit.expect_value
    }

    pub fn query_start(&self) -> usize {
        self.hit.query_start
    }

    pub fn query_end(&self) -> usize {
        self.hit.query_end
    }

    pub fn subject_start(&self) -> usize {
        self.hit.subject_start
    }

    pub fn subject_end(&self) -> usize {
        self.hit.subject_end
    }

    pub fn query_segment(&self) -> &str {
        &self.hit.query_segment
    }

    pub fn match_line(&self) -> &str {
        &self.hit.match_line
    }

    pub fn subject_segment(&self) -> &str {
        &self.hit.subject_segment
    }

    /// The aligned strings cut for display; the stored strings stay whole.
    pub fn summary_view(&self) -> SummaryView<'_> {
        SummaryView {
            query_segment: truncate_segment(&self.hit.query_segment),
            match_line: truncate_segment(&self.hit.match_line),
            subject_segment: truncate_segment(&self.hit.subject_segment),
        }
    }
}
