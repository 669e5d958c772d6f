use crate::libs::accessor::HitPair;
use crate::libs::error::FilterError;
use crate::libs::hit::{coverage_percent, identity_percent, FilteredHit, Thresholds};

/// Hits kept by `filter`, in search ranking order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filtered {
    pub hits: Vec<FilteredHit>,
    /// Hits dropped because their alignment length is zero
    pub skipped: usize,
}

impl Filtered {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Computes identity and coverage for every hit and keeps those meeting both
/// thresholds.
///
/// * `query_length` is the length of the submitted query; zero fails with
///   `FilterError::InvalidQuery` before any hit is read.
/// * Hits with a zero alignment length are skipped and counted.
/// * A malformed item aborts the call with that error.
/// * Kept hits stay in input order.
pub fn filter<I>(
    hits: I,
    query_length: usize,
    thresholds: &Thresholds,
) -> Result<Filtered, FilterError>
where
    I: IntoIterator<Item = Result<HitPair, FilterError>>,
{
    if query_length == 0 {
        return Err(FilterError::InvalidQuery(query_length));
    }

    let mut out = Filtered::default();

    for item in hits {
        let pair = item?;
        let hit = pair.hit();

        let identity = match identity_percent(hit.identities, hit.align_length) {
            Some(v) => v,
            None => {
                tracing::debug!(
                    title = %pair.alignment.title,
                    query_start = hit.query_start,
                    "skip hit with zero alignment length"
                );
                out.skipped += 1;
                continue;
            }
        };
        // query_length > 0 was checked above
        let coverage = coverage_percent(hit.align_length, query_length).unwrap_or_default();

        if thresholds.accepts(identity, coverage) {
            out.hits.push(FilteredHit::new(
                &pair.alignment,
                hit,
                query_length,
                identity,
                coverage,
            ));
        }
    }

    Ok(out)
}
