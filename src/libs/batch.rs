use crate::libs::accessor::ResultAccessor;
use crate::libs::engine::{filter, Filtered};
use crate::libs::error::{FilterError, SearchError};
use crate::libs::hit::Thresholds;
use crate::libs::qblast::{Program, SearchRequest, SearchService};
use crate::libs::query::Query;
use crate::libs::report::Search;

/// What happened to one query of a batch.
#[derive(Debug)]
pub enum Outcome {
    /// The search ran; `filtered` may hold no hits
    Hits { filtered: Filtered },
    /// The search service could not deliver a result
    Unavailable(SearchError),
    /// The result could not be filtered
    Failed(FilterError),
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub name: String,
    pub query_length: usize,
    pub outcome: Outcome,
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self.outcome, Outcome::Hits { .. })
    }
}

/// Filters one search result against a query of `query_length` letters.
pub fn filter_search(
    name: &str,
    search: &Search,
    query_length: usize,
    thresholds: &Thresholds,
) -> QueryOutcome {
    let accessor = ResultAccessor::new(search);
    let outcome = match filter(accessor.iterate_hits(), query_length, thresholds) {
        Ok(filtered) => {
            tracing::debug!(
                query = name,
                kept = filtered.len(),
                skipped = filtered.skipped,
                "filtered"
            );
            Outcome::Hits { filtered }
        }
        Err(e) => {
            tracing::warn!(query = name, error = %e, "filter failed");
            Outcome::Failed(e)
        }
    };

    QueryOutcome {
        name: name.to_string(),
        query_length,
        outcome,
    }
}

/// Searches and filters every query in turn, handing each outcome to
/// `on_outcome` as soon as it is ready.
///
/// Each query is independent: a failed search or a malformed result is
/// recorded for that query and the batch moves on. Returns the number of
/// failed queries; an error from `on_outcome` stops the batch.
pub fn run_batch<S, F, E>(
    service: &S,
    queries: &[Query],
    program: Program,
    database: &str,
    thresholds: &Thresholds,
    mut on_outcome: F,
) -> Result<usize, E>
where
    S: SearchService + ?Sized,
    F: FnMut(QueryOutcome) -> Result<(), E>,
{
    let mut failed = 0;
    for query in queries {
        let outcome = run_query(service, query, program, database, thresholds);
        if outcome.is_failure() {
            failed += 1;
        }
        on_outcome(outcome)?;
    }

    Ok(failed)
}

pub fn run_query<S: SearchService + ?Sized>(
    service: &S,
    query: &Query,
    program: Program,
    database: &str,
    thresholds: &Thresholds,
) -> QueryOutcome {
    // once per query, shared by all of its hits
    let query_length = query.len();

    let request = SearchRequest {
        program,
        database: database.to_string(),
        query: query.seq.clone(),
    };

    match service.submit(&request) {
        Ok(search) => filter_search(&query.name, &search, query_length, thresholds),
        Err(e) => {
            tracing::warn!(query = %query.name, error = %e, "search failed");
            QueryOutcome {
                name: query.name.clone(),
                query_length,
                outcome: Outcome::Unavailable(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::report::parse_searches;
    use std::cell::RefCell;

    // Replies with a canned report, or fails, per query sequence
    struct FakeService {
        calls: RefCell<Vec<SearchRequest>>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                calls: RefCell::new(vec![]),
            }
        }
    }

    fn report(hsps: &str) -> String {
        format!(
            r#"{{"BlastOutput2": [{{"report": {{"results": {{"search": {{
                "query_len": 10,
                "hits": [ {{ "num": 1, "description": [ {{ "id": "s1", "title": "subject" }} ], "len": 50, "hsps": [{}] }} ]
            }}}}}}}}]}}"#,
            hsps
        )
    }

    const GOOD_HSP: &str = r#"{ "bit_score": 20.0, "score": 10, "evalue": 0.01, "identity": 10,
        "query_from": 1, "query_to": 10, "hit_from": 5, "hit_to": 14, "align_len": 10,
        "qseq": "ACGTACGTAC", "hseq": "ACGTACGTAC", "midline": "||||||||||" }"#;

    impl SearchService for FakeService {
        fn submit(&self, request: &SearchRequest) -> Result<Search, SearchError> {
            self.calls.borrow_mut().push(request.clone());
            let text = match request.query.as_str() {
                "DOWN" => return Err(SearchError::Unavailable("connection refused".to_string())),
                "BROKEN" => report(r#"{ "score": 10 }"#),
                _ => report(GOOD_HSP),
            };
            Ok(parse_searches(&text)?.remove(0))
        }
    }

    fn query(name: &str, seq: &str) -> Query {
        Query {
            name: name.to_string(),
            seq: seq.to_string(),
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let service = FakeService::new();
        let queries = vec![
            query("q1", "ACGTACGTAC"),
            query("q2", "DOWN"),
            query("q3", "BROKEN"),
            query("q4", "ACGTACGTACGTACGTACGT"),
        ];

        let mut outcomes = vec![];
        let failed = run_batch(
            &service,
            &queries,
            Program::Blastn,
            "nt",
            &Thresholds::default(),
            |outcome| {
                outcomes.push(outcome);
                Ok::<_, std::io::Error>(())
            },
        )
        .unwrap();
        assert_eq!(failed, 2);
        assert_eq!(outcomes.len(), 4);
        assert_eq!(service.calls.borrow().len(), 4);
        assert_eq!(service.calls.borrow()[1].database, "nt");

        match &outcomes[0].outcome {
            Outcome::Hits { filtered } => {
                assert_eq!(filtered.len(), 1);
                assert_eq!(filtered.hits[0].coverage_percent(), 100.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(outcomes[1].outcome, Outcome::Unavailable(_)));
        assert!(matches!(
            outcomes[2].outcome,
            Outcome::Failed(FilterError::MalformedResult(_))
        ));

        // coverage uses this query's own length: 10 / 20
        match &outcomes[3].outcome {
            Outcome::Hits { filtered } => assert!(filtered.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(outcomes[3].query_length, 20);

        let failures: Vec<bool> = outcomes.iter().map(|o| o.is_failure()).collect();
        assert_eq!(failures, vec![false, true, true, false]);
    }

    #[test]
    fn test_batch_stops_on_output_error() {
        let service = FakeService::new();
        let queries = vec![query("q1", "ACGTACGTAC"), query("q2", "ACGTACGTAC")];

        let result = run_batch(
            &service,
            &queries,
            Program::Blastn,
            "nt",
            &Thresholds::default(),
            |_| Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")),
        );
        assert!(result.is_err());
        assert_eq!(service.calls.borrow().len(), 1);
    }

    #[test]
    fn test_filter_search_invalid_query() {
        let search = parse_searches(&report(GOOD_HSP)).unwrap().remove(0);
        let out = filter_search("q", &search, 0, &Thresholds::default());
        assert!(matches!(
            out.outcome,
            Outcome::Failed(FilterError::InvalidQuery(0))
        ));
    }
}
