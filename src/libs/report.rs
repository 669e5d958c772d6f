//! NCBI BLAST JSON reports (`-outfmt 15`, URL API `FORMAT_TYPE=JSON2_S`).
//!
//! Every field a hit needs is optional here. Presence is checked by
//! `ResultAccessor`, so an incomplete report still loads and fails only the
//! query it belongs to.

use serde::Deserialize;
use std::io::Read;

use crate::libs::error::SearchError;

#[derive(Debug, Clone, Deserialize)]
pub struct BlastOutput {
    #[serde(rename = "BlastOutput2")]
    pub blast_output2: OneOrMany<ReportEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(v) => vec![v],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportEntry {
    pub report: Report,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    pub results: Results,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Results {
    pub search: Search,
}

/// The result of one query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Search {
    pub query_id: Option<String>,
    pub query_title: Option<String>,
    pub query_len: Option<usize>,
    #[serde(default)]
    pub hits: Vec<BlastHit>,
}

/// One subject sequence with its HSPs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastHit {
    pub num: Option<usize>,
    #[serde(default)]
    pub description: Vec<Description>,
    pub len: Option<usize>,
    pub hsps: Option<Vec<BlastHsp>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Description {
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlastHsp {
    pub bit_score: Option<f64>,
    pub score: Option<f64>,
    pub evalue: Option<f64>,
    pub identity: Option<usize>,
    pub query_from: Option<usize>,
    pub query_to: Option<usize>,
    pub hit_from: Option<usize>,
    pub hit_to: Option<usize>,
    pub align_len: Option<usize>,
    pub qseq: Option<String>,
    pub hseq: Option<String>,
    pub midline: Option<String>,
}

impl Search {
    /// Name shown for this query: title, then id, then a placeholder.
    pub fn query_name(&self) -> &str {
        self.query_title
            .as_deref()
            .or(self.query_id.as_deref())
            .unwrap_or("query")
    }
}

/// Reads every query's `Search` from a BLAST JSON report.
pub fn read_searches<R: Read>(rdr: R) -> Result<Vec<Search>, SearchError> {
    let output: BlastOutput = serde_json::from_reader(rdr)?;
    Ok(output
        .blast_output2
        .into_vec()
        .into_iter()
        .map(|e| e.report.results.search)
        .collect())
}

/// `read_searches` over an in-memory report.
pub fn parse_searches(text: &str) -> Result<Vec<Search>, SearchError> {
    read_searches(text.as_bytes())
}
