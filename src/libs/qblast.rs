//! Remote searches through the NCBI BLAST URL API.
//!
//! A search is submitted with `CMD=Put`, polled with
//! `CMD=Get&FORMAT_OBJECT=SearchInfo` until ready, then fetched as a JSON
//! report (`FORMAT_TYPE=JSON2_S`).

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::libs::error::SearchError;
use crate::libs::report::{parse_searches, Search};

pub const NCBI_BLAST_URL: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";

lazy_static! {
    static ref RE_RID: Regex = Regex::new(r"(?m)^\s*RID = (\S+)").unwrap();
    static ref RE_RTOE: Regex = Regex::new(r"(?m)^\s*RTOE = (\d+)").unwrap();
    static ref RE_STATUS: Regex = Regex::new(r"(?m)^\s*Status=(\w+)").unwrap();
}

/// BLAST programs accepted by the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Blastn,
    Blastp,
    Blastx,
    Tblastn,
    Tblastx,
}

impl Program {
    pub const NAMES: [&'static str; 5] = ["blastn", "blastp", "blastx", "tblastn", "tblastx"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Program::Blastn => "blastn",
            Program::Blastp => "blastp",
            Program::Blastx => "blastx",
            Program::Tblastn => "tblastn",
            Program::Tblastx => "tblastx",
        }
    }

    /// Database searched when none is given: `nr` for protein databases,
    /// `nt` for nucleotide ones.
    pub fn default_database(&self) -> &'static str {
        match self {
            Program::Blastp | Program::Blastx => "nr",
            Program::Blastn | Program::Tblastn | Program::Tblastx => "nt",
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Program {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blastn" => Ok(Program::Blastn),
            "blastp" => Ok(Program::Blastp),
            "blastx" => Ok(Program::Blastx),
            "tblastn" => Ok(Program::Tblastn),
            "tblastx" => Ok(Program::Tblastx),
            _ => Err(anyhow::anyhow!("Unknown BLAST program: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub program: Program,
    pub database: String,
    pub query: String,
}

/// Anything that turns a query into a raw search result.
pub trait SearchService {
    fn submit(&self, request: &SearchRequest) -> Result<Search, SearchError>;
}

/// Connection settings of the URL API client.
#[derive(Debug, Clone)]
pub struct QBlastConfig {
    pub url: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub email: Option<String>,
    pub tool: String,
}

impl Default for QBlastConfig {
    fn default() -> Self {
        Self {
            url: NCBI_BLAST_URL.to_string(),
            poll_interval: Duration::from_secs(20),
            timeout: Duration::from_secs(900),
            email: None,
            tool: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Waiting,
    Ready,
    Failed,
    Unknown,
}

pub struct QBlast {
    config: QBlastConfig,
    client: reqwest::blocking::Client,
}

impl QBlast {
    pub fn new(config: QBlastConfig) -> Result<Self, SearchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { config, client })
    }

    fn identity_params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![("TOOL", self.config.tool.as_str())];
        if let Some(email) = &self.config.email {
            params.push(("EMAIL", email.as_str()));
        }
        params
    }

    fn put(&self, request: &SearchRequest) -> Result<(String, u64), SearchError> {
        let mut params = vec![
            ("CMD", "Put"),
            ("PROGRAM", request.program.as_str()),
            ("DATABASE", request.database.as_str()),
            ("QUERY", request.query.as_str()),
        ];
        params.extend(self.identity_params());

        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(encode_params(&params))
            .send()?;
        let text = checked_text(response)?;

        parse_qblast_info(&text)
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<String, SearchError> {
        let mut params = params.to_vec();
        params.extend(self.identity_params());

        let url = format!("{}?{}", self.config.url, encode_params(&params));
        let response = self.client.get(url).send()?;
        checked_text(response)
    }

    fn wait_ready(&self, rid: &str, rtoe: u64) -> Result<(), SearchError> {
        let start = Instant::now();
        std::thread::sleep(Duration::from_secs(rtoe).min(self.config.timeout));

        loop {
            let text = self.get(&[("CMD", "Get"), ("FORMAT_OBJECT", "SearchInfo"), ("RID", rid)])?;
            match parse_status(&text) {
                SearchStatus::Ready => return Ok(()),
                SearchStatus::Failed => {
                    return Err(SearchError::Service(format!("search {} failed", rid)));
                }
                SearchStatus::Unknown => {
                    return Err(SearchError::Service(format!(
                        "search {} expired or is unknown",
                        rid
                    )));
                }
                SearchStatus::Waiting => {
                    tracing::info!(rid, elapsed = start.elapsed().as_secs(), "search waiting");
                }
            }

            if start.elapsed() + self.config.poll_interval > self.config.timeout {
                return Err(SearchError::Timeout(
                    self.config.timeout.as_secs(),
                    rid.to_string(),
                ));
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }
}

impl SearchService for QBlast {
    fn submit(&self, request: &SearchRequest) -> Result<Search, SearchError> {
        tracing::info!(
            program = %request.program,
            database = %request.database,
            query_len = request.query.len(),
            "submit search"
        );

        let (rid, rtoe) = self.put(request)?;
        tracing::info!(rid = %rid, rtoe, "search accepted");

        self.wait_ready(&rid, rtoe)?;

        let text = self.get(&[("CMD", "Get"), ("FORMAT_TYPE", "JSON2_S"), ("RID", &rid)])?;
        let mut searches = parse_searches(&text)?;
        if searches.is_empty() {
            return Err(SearchError::Service(format!("search {} returned no report", rid)));
        }

        Ok(searches.swap_remove(0))
    }
}

fn checked_text(response: reqwest::blocking::Response) -> Result<String, SearchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Service(format!("HTTP {}", status)));
    }
    Ok(response.text()?)
}

/// `application/x-www-form-urlencoded` body or query string
pub fn encode_params(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Extracts `RID` and `RTOE` from the `QBlastInfo` block of a `Put` reply.
pub fn parse_qblast_info(text: &str) -> Result<(String, u64), SearchError> {
    let rid = RE_RID
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| SearchError::Service(put_failure_message(text)))?;
    let rtoe = RE_RTOE
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);

    Ok((rid, rtoe))
}

// NCBI reports rejected submissions inside an HTML message block
fn put_failure_message(text: &str) -> String {
    lazy_static! {
        static ref RE_MSG: Regex =
            Regex::new(r#"(?s)<p class="error">(.*?)</p>|<div class="error msInf">(.*?)</div>"#)
                .unwrap();
    }
    RE_MSG
        .captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| format!("submission rejected: {}", m.as_str().trim()))
        .unwrap_or_else(|| "no RID in submission reply".to_string())
}

/// Reads `Status=...` from a `SearchInfo` reply.
pub fn parse_status(text: &str) -> SearchStatus {
    match RE_STATUS.captures(text).map(|c| c[1].to_string()).as_deref() {
        Some("WAITING") => SearchStatus::Waiting,
        Some("READY") => SearchStatus::Ready,
        Some("FAILED") => SearchStatus::Failed,
        _ => SearchStatus::Unknown,
    }
}
