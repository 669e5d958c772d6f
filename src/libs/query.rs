use anyhow::{anyhow, bail};
use std::io::BufRead;

/// A query sequence as submitted to the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub name: String,
    pub seq: String,
}

impl Query {
    /// A sequence typed in directly: whitespace is dropped and letters are
    /// upper-cased.
    ///
    /// Text starting with a FASTA header is read as one FASTA record, and the
    /// record's name replaces `name`.
    ///
    /// ```
    /// use blastsift::libs::query::Query;
    ///
    /// let q = Query::from_text("input", "acgt\nacgt ").unwrap();
    /// assert_eq!(q.seq, "ACGTACGT");
    /// assert_eq!(q.len(), 8);
    ///
    /// let q = Query::from_text("input", ">q1 desc\nACGT").unwrap();
    /// assert_eq!(q.name, "q1");
    /// assert_eq!(q.len(), 4);
    /// ```
    pub fn from_text(name: &str, text: &str) -> anyhow::Result<Self> {
        let text = text.trim_start();
        if text.starts_with('>') {
            let mut records = read_records(text.as_bytes(), name)?;
            if records.len() > 1 {
                bail!("Please enter a single sequence, got {} records", records.len());
            }
            let record = records.remove(0);
            return Self::from_residues(&record.name, &record.seq);
        }

        Self::from_residues(name, text)
    }

    fn from_residues(name: &str, text: &str) -> anyhow::Result<Self> {
        let seq: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if seq.is_empty() {
            bail!("Please enter a sequence");
        }

        Ok(Self {
            name: name.to_string(),
            seq,
        })
    }

    /// Length of the full query, the denominator of coverage
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Reads every record of a FASTA file (`stdin` and `.gz` accepted).
pub fn read_fasta(infile: &str) -> anyhow::Result<Vec<Query>> {
    let reader = crate::reader(infile)?;
    read_records(reader, infile)
}

fn read_records<R: BufRead>(reader: R, source: &str) -> anyhow::Result<Vec<Query>> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);

    let mut queries = vec![];
    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let seq = String::from_utf8(record.sequence().as_ref().to_vec())?;
        if seq.is_empty() {
            bail!("Empty sequence for record {} in {}", name, source);
        }
        queries.push(Query { name, seq });
    }

    if queries.is_empty() {
        return Err(anyhow!("No FASTA records found in {}", source));
    }

    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_from_text() {
        let q = Query::from_text("input", "  acg tN\n\tgg ").unwrap();
        assert_eq!(q.name, "input");
        assert_eq!(q.seq, "ACGTNGG");
        assert_eq!(q.len(), 7);

        let err = Query::from_text("input", " \n ").unwrap_err();
        assert_eq!(err.to_string(), "Please enter a sequence");
    }

    #[test]
    fn test_from_text_with_header() {
        let q = Query::from_text("input", ">q1 desc\nACGT").unwrap();
        assert_eq!(q.name, "q1");
        assert_eq!(q.seq, "ACGT");
        assert_eq!(q.len(), 4);

        // pasted with leading blank lines and wrapped lower-case residues
        let q = Query::from_text("input", "\n  >q2\nacgtn\nacg\n").unwrap();
        assert_eq!(q.name, "q2");
        assert_eq!(q.seq, "ACGTNACG");

        let err = Query::from_text("input", ">a\nAC\n>b\nGT\n").unwrap_err();
        assert!(err.to_string().contains("single sequence"));

        assert!(Query::from_text("input", ">empty\n").is_err());
    }

    #[test]
    fn test_read_fasta() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("q.fa");
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, ">seq1 first").unwrap();
            writeln!(file, "ACGTACGT").unwrap();
            writeln!(file, "ACGT").unwrap();
            writeln!(file, ">seq2").unwrap();
            writeln!(file, "MKV").unwrap();
        }

        let queries = read_fasta(path.to_str().unwrap()).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].name, "seq1");
        assert_eq!(queries[0].len(), 12);
        assert_eq!(queries[1].seq, "MKV");
    }

    #[test]
    fn test_read_fasta_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.fa");
        std::fs::File::create(&path).unwrap();

        assert!(read_fasta(path.to_str().unwrap()).is_err());
    }
}
