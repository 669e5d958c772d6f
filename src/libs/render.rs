use itertools::Itertools;
use std::io::Write;

use crate::libs::batch::{Outcome, QueryOutcome};
use crate::libs::error::SearchError;
use crate::libs::hit::FilteredHit;

pub const SEPARATOR: &str = "***";

const STAT_COLUMNS: [&str; 8] = [
    "Score",
    "Bit Score",
    "Identity (%)",
    "Coverage (%)",
    "E-Value",
    "Alignment Length",
    "Query Length",
    "Subject Length",
];

const TSV_COLUMNS: [&str; 14] = [
    "query",
    "title",
    "score",
    "bit_score",
    "identity",
    "coverage",
    "evalue",
    "align_len",
    "query_len",
    "subject_len",
    "q_start",
    "q_end",
    "s_start",
    "s_end",
];

/// E-value in the style of NCBI BLAST reports.
///
/// ```
/// use blastsift::libs::render::format_evalue;
/// assert_eq!(format_evalue(0.0), "0.0");
/// assert_eq!(format_evalue(3.2e-45), "3e-45");
/// assert_eq!(format_evalue(0.012), "0.012");
/// assert_eq!(format_evalue(4.56), "4.6");
/// ```
pub fn format_evalue(e_value: f64) -> String {
    if e_value < 1.0e-180 {
        "0.0".to_string()
    } else if e_value < 0.0009 {
        format!("{:.0e}", e_value)
    } else if e_value < 0.1 {
        format!("{:.3}", e_value)
    } else if e_value < 1.0 {
        format!("{:.2}", e_value)
    } else if e_value < 10.0 {
        format!("{:.1}", e_value)
    } else {
        format!("{:.0}", e_value)
    }
}

/// Bit score with one decimal below 100, as an integer above.
pub fn format_bit_score(bit_score: f64) -> String {
    if bit_score > 99.9 {
        format!("{:.0}", bit_score)
    } else {
        format!("{:.1}", bit_score)
    }
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

fn stat_values(hit: &FilteredHit) -> Vec<String> {
    vec![
        format_score(hit.score()),
        format_bit_score(hit.bit_score()),
        format!("{:.2}", hit.identity_percent()),
        format!("{:.2}", hit.coverage_percent()),
        format_evalue(hit.expect_value()),
        hit.align_length().to_string(),
        hit.query_length().to_string(),
        hit.subject_length().to_string(),
    ]
}

/// Writes one hit as a display block.
pub fn write_hit<W: Write + ?Sized>(writer: &mut W, hit: &FilteredHit) -> anyhow::Result<()> {
    let view = hit.summary_view();

    writeln!(writer, "Alignment: {}", hit.title())?;
    writeln!(writer, "{}", STAT_COLUMNS.iter().join("\t"))?;
    writeln!(writer, "{}", stat_values(hit).iter().join("\t"))?;
    writeln!(writer, "Query start: {}", hit.query_start())?;
    writeln!(writer, "Query end: {}", hit.query_end())?;
    writeln!(writer, "Query  {}", view.query_segment)?;
    writeln!(writer, "       {}", view.match_line)?;
    writeln!(writer, "Sbjct  {}", view.subject_segment)?;
    writeln!(writer, "Subject start: {}", hit.subject_start())?;
    writeln!(writer, "Subject end: {}", hit.subject_end())?;
    writeln!(writer, "{}", SEPARATOR)?;

    Ok(())
}

/// Writes a query's heading followed by its hits or its failure.
pub fn write_outcome<W: Write + ?Sized>(
    writer: &mut W,
    outcome: &QueryOutcome,
) -> anyhow::Result<()> {
    writeln!(
        writer,
        "# Query: {} ({} letters)",
        outcome.name, outcome.query_length
    )?;

    match &outcome.outcome {
        Outcome::Hits { filtered } if filtered.is_empty() => {
            writeln!(writer, "No hits found.")?;
        }
        Outcome::Hits { filtered } => {
            writeln!(writer, "{}", SEPARATOR)?;
            for hit in &filtered.hits {
                write_hit(writer, hit)?;
            }
        }
        // SearchError already reads "Search unavailable: ..." for transport failures
        Outcome::Unavailable(e) => match e {
            SearchError::Unavailable(_) => writeln!(writer, "{}", e)?,
            _ => writeln!(writer, "Search unavailable: {}", e)?,
        },
        Outcome::Failed(e) => {
            writeln!(writer, "{}", e)?;
        }
    }
    writeln!(writer)?;

    Ok(())
}

pub fn write_tsv_header<W: Write + ?Sized>(writer: &mut W) -> anyhow::Result<()> {
    writeln!(writer, "#{}", TSV_COLUMNS.iter().join("\t"))?;
    Ok(())
}

/// One row per kept hit; failed queries produce no rows.
pub fn write_tsv_rows<W: Write + ?Sized>(
    writer: &mut W,
    outcome: &QueryOutcome,
) -> anyhow::Result<()> {
    if let Outcome::Hits { filtered } = &outcome.outcome {
        for hit in &filtered.hits {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                outcome.name,
                hit.title(),
                format_score(hit.score()),
                format_bit_score(hit.bit_score()),
                hit.identity_percent(),
                hit.coverage_percent(),
                format_evalue(hit.expect_value()),
                hit.align_length(),
                hit.query_length(),
                hit.subject_length(),
                hit.query_start(),
                hit.query_end(),
                hit.subject_start(),
                hit.subject_end(),
            )?;
        }
    }
    Ok(())
}
