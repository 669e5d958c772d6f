use std::rc::Rc;

use crate::libs::error::FilterError;
use crate::libs::hit::{RawAlignment, RawHit};
use crate::libs::report::{BlastHit, BlastHsp, Search};

/// One (alignment, hit) pair of a search result.
///
/// The alignment is shared by all pairs it produces.
#[derive(Debug, Clone)]
pub struct HitPair {
    pub alignment: Rc<RawAlignment>,
    index: usize,
}

impl HitPair {
    /// Pairs `alignment` with its `index`-th hit, or `None` if there is no
    /// such hit.
    pub fn new(alignment: Rc<RawAlignment>, index: usize) -> Option<Self> {
        if index < alignment.hits.len() {
            Some(Self { alignment, index })
        } else {
            None
        }
    }

    /// Every hit of one alignment, in order.
    pub fn all(alignment: RawAlignment) -> impl Iterator<Item = HitPair> {
        let alignment = Rc::new(alignment);
        (0..alignment.hits.len()).map(move |index| HitPair {
            alignment: Rc::clone(&alignment),
            index,
        })
    }

    pub fn hit(&self) -> &RawHit {
        &self.alignment.hits[self.index]
    }
}

/// Hits of alignments built by the caller, ready for `engine::filter`.
///
/// ```
/// use blastsift::libs::accessor::from_alignments;
/// use blastsift::libs::engine::filter;
/// use blastsift::libs::hit::{RawAlignment, RawHit, Thresholds};
///
/// let hit = |identities, align_length| RawHit {
///     identities,
///     align_length,
///     query_start: 1,
///     query_end: align_length,
///     ..Default::default()
/// };
/// let alignments = vec![
///     RawAlignment {
///         title: "sbj1 first subject".to_string(),
///         subject_length: 900,
///         hits: vec![hit(90, 100), hit(30, 100)],
///     },
///     RawAlignment {
///         title: "sbj2 second subject".to_string(),
///         subject_length: 700,
///         hits: vec![hit(85, 0), hit(82, 85)],
///     },
/// ];
///
/// let kept = filter(from_alignments(alignments), 100, &Thresholds::default()).unwrap();
/// assert_eq!(kept.len(), 2);
/// assert_eq!(kept.skipped, 1);
/// assert_eq!(kept.hits[0].title(), "sbj1 first subject");
/// assert_eq!(kept.hits[1].identity_percent(), 100.0 * 82.0 / 85.0);
/// ```
pub fn from_alignments<I>(alignments: I) -> impl Iterator<Item = Result<HitPair, FilterError>>
where
    I: IntoIterator<Item = RawAlignment>,
{
    alignments
        .into_iter()
        .flat_map(HitPair::all)
        .map(Ok)
}

/// Read-only, flattened view over the alignments and hits of one search.
#[derive(Debug, Clone, Copy)]
pub struct ResultAccessor<'a> {
    search: &'a Search,
}

impl<'a> ResultAccessor<'a> {
    pub fn new(search: &'a Search) -> Self {
        Self { search }
    }

    pub fn query_name(&self) -> &'a str {
        self.search.query_name()
    }

    /// Query length as reported by the search service
    pub fn reported_query_len(&self) -> Option<usize> {
        self.search.query_len
    }

    /// Lazily yields every hit in report order: alignments first, then the
    /// hits within each alignment.
    ///
    /// A fresh iterator starts from the first alignment. After a malformed
    /// alignment is reported the iterator is exhausted.
    pub fn iterate_hits(&self) -> Hits<'a> {
        Hits {
            alignments: self.search.hits.iter(),
            current: None,
            next_idx: 0,
            failed: false,
        }
    }
}

pub struct Hits<'a> {
    alignments: std::slice::Iter<'a, BlastHit>,
    current: Option<Rc<RawAlignment>>,
    next_idx: usize,
    failed: bool,
}

impl Iterator for Hits<'_> {
    type Item = Result<HitPair, FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(alignment) = &self.current {
                if let Some(pair) = HitPair::new(Rc::clone(alignment), self.next_idx) {
                    self.next_idx += 1;
                    return Some(Ok(pair));
                }
            }

            let raw = self.alignments.next()?;
            match to_alignment(raw) {
                Ok(alignment) => {
                    self.current = Some(Rc::new(alignment));
                    self.next_idx = 0;
                }
                Err(e) => {
                    self.failed = true;
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn to_alignment(raw: &BlastHit) -> Result<RawAlignment, FilterError> {
    let label = match raw.num {
        Some(n) => format!("alignment {}", n),
        None => "alignment".to_string(),
    };

    let desc = raw
        .description
        .first()
        .ok_or_else(|| FilterError::malformed(format!("{} has no description", label)))?;
    let title = match (&desc.id, &desc.title) {
        (Some(id), Some(title)) => format!("{} {}", id, title),
        (None, Some(title)) => title.clone(),
        (Some(id), None) => id.clone(),
        (None, None) => {
            return Err(FilterError::malformed(format!("{} has no title", label)));
        }
    };

    let subject_length = raw
        .len
        .ok_or_else(|| FilterError::malformed(format!("{} ({}) has no len", label, title)))?;

    let hsps = raw
        .hsps
        .as_ref()
        .ok_or_else(|| FilterError::malformed(format!("{} ({}) has no hsps", label, title)))?;

    let hits = hsps
        .iter()
        .enumerate()
        .map(|(i, hsp)| to_hit(hsp).map_err(|field| missing(&label, &title, i, field)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawAlignment {
        title,
        subject_length,
        hits,
    })
}

fn missing(label: &str, title: &str, i: usize, field: &str) -> FilterError {
    FilterError::malformed(format!(
        "{} ({}), hsp {}: {}",
        label,
        title,
        i + 1,
        field
    ))
}

// Err carries a description of the first problem found
fn to_hit(hsp: &BlastHsp) -> Result<RawHit, &'static str> {
    let hit = RawHit {
        identities: hsp.identity.ok_or("missing identity")?,
        align_length: hsp.align_len.ok_or("missing align_len")?,
        score: hsp.score.ok_or("missing score")?,
        bit_score: hsp.bit_score.ok_or("missing bit_score")?,
        expect_value: hsp.evalue.ok_or("missing evalue")?,
        query_start: hsp.query_from.ok_or("missing query_from")?,
        query_end: hsp.query_to.ok_or("missing query_to")?,
        subject_start: hsp.hit_from.ok_or("missing hit_from")?,
        subject_end: hsp.hit_to.ok_or("missing hit_to")?,
        query_segment: hsp.qseq.clone().ok_or("missing qseq")?,
        match_line: hsp.midline.clone().ok_or("missing midline")?,
        subject_segment: hsp.hseq.clone().ok_or("missing hseq")?,
    };

    if hit.query_segment.len() != hit.subject_segment.len()
        || hit.match_line.len() != hit.query_segment.len()
    {
        return Err("aligned strings differ in length");
    }

    Ok(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::report::{parse_searches, Description};

    fn hsp(identity: usize, align_len: usize) -> BlastHsp {
        BlastHsp {
            bit_score: Some(50.0),
            score: Some(27.0),
            evalue: Some(1e-5),
            identity: Some(identity),
            query_from: Some(1),
            query_to: Some(align_len),
            hit_from: Some(11),
            hit_to: Some(10 + align_len),
            align_len: Some(align_len),
            qseq: Some("A".repeat(align_len)),
            hseq: Some("A".repeat(align_len)),
            midline: Some("|".repeat(align_len)),
        }
    }

    fn blast_hit(num: usize, hsps: Vec<BlastHsp>) -> BlastHit {
        BlastHit {
            num: Some(num),
            description: vec![Description {
                id: Some(format!("sbj{}", num)),
                title: Some(format!("subject {}", num)),
            }],
            len: Some(1000),
            hsps: Some(hsps),
        }
    }

    #[test]
    fn test_iterate_in_report_order() {
        let search = Search {
            query_len: Some(20),
            hits: vec![
                blast_hit(1, vec![hsp(20, 20), hsp(9, 10)]),
                blast_hit(2, vec![]),
                blast_hit(3, vec![hsp(5, 5)]),
            ],
            ..Default::default()
        };
        let accessor = ResultAccessor::new(&search);

        let pairs: Vec<HitPair> = accessor.iterate_hits().collect::<Result<_, _>>().unwrap();
        let got: Vec<(&str, usize)> = pairs
            .iter()
            .map(|p| (p.alignment.title.as_str(), p.hit().align_length))
            .collect();
        assert_eq!(
            got,
            vec![
                ("sbj1 subject 1", 20),
                ("sbj1 subject 1", 10),
                ("sbj3 subject 3", 5)
            ]
        );
        assert!(Rc::ptr_eq(&pairs[0].alignment, &pairs[1].alignment));

        // restartable
        assert_eq!(accessor.iterate_hits().count(), 3);
        assert_eq!(accessor.reported_query_len(), Some(20));
    }

    #[test]
    fn test_missing_hsps_is_malformed() {
        let mut broken = blast_hit(2, vec![]);
        broken.hsps = None;
        let search = Search {
            hits: vec![blast_hit(1, vec![hsp(5, 5)]), broken, blast_hit(3, vec![hsp(5, 5)])],
            ..Default::default()
        };

        let items: Vec<_> = ResultAccessor::new(&search).iterate_hits().collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(FilterError::MalformedResult(msg)) => assert!(msg.contains("has no hsps")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_hsp_field_is_malformed() {
        let mut bad = hsp(5, 5);
        bad.align_len = None;
        let search = Search {
            hits: vec![blast_hit(1, vec![hsp(5, 5), bad])],
            ..Default::default()
        };

        let err = ResultAccessor::new(&search)
            .iterate_hits()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::malformed("alignment 1 (sbj1 subject 1), hsp 2: missing align_len")
        );
    }

    #[test]
    fn test_uneven_segments_are_malformed() {
        let mut bad = hsp(5, 5);
        bad.midline = Some("||".to_string());
        let search = Search {
            hits: vec![blast_hit(1, vec![bad])],
            ..Default::default()
        };
        let first = ResultAccessor::new(&search).iterate_hits().next().unwrap();
        assert!(matches!(first, Err(FilterError::MalformedResult(_))));
    }

    #[test]
    fn test_title_without_id() {
        let text = r#"{"BlastOutput2": [{"report": {"results": {"search": {
            "query_len": 4,
            "hits": [ { "description": [ { "title": "only title" } ], "len": 10, "hsps": [
                { "bit_score": 8.0, "score": 4, "evalue": 2.0, "identity": 4,
                  "query_from": 1, "query_to": 4, "hit_from": 3, "hit_to": 6, "align_len": 4,
                  "qseq": "ACGT", "hseq": "ACGT", "midline": "||||" }
            ] } ]
        }}}}]}"#;
        let searches = parse_searches(text).unwrap();
        let pairs: Vec<_> = ResultAccessor::new(&searches[0])
            .iterate_hits()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].alignment.title, "only title");
        assert_eq!(pairs[0].alignment.subject_length, 10);
        assert_eq!(pairs[0].hit().subject_start, 3);
    }

    #[test]
    fn test_pairs_from_caller_alignments() {
        let alignment = RawAlignment {
            title: "sbj9 built by hand".to_string(),
            subject_length: 400,
            hits: vec![RawHit::default(), RawHit::default()],
        };

        let shared = Rc::new(alignment.clone());
        assert!(HitPair::new(Rc::clone(&shared), 1).is_some());
        assert!(HitPair::new(shared, 2).is_none());

        let pairs: Vec<HitPair> = from_alignments(vec![alignment.clone(), alignment])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(pairs.len(), 4);
        assert!(Rc::ptr_eq(&pairs[0].alignment, &pairs[1].alignment));
        assert!(!Rc::ptr_eq(&pairs[1].alignment, &pairs[2].alignment));
    }
}
