use anyhow::Context;
use clap::*;
use rayon::prelude::*;
use std::io::Write;

use blastsift::libs::batch::{filter_search, QueryOutcome};
use blastsift::libs::query::read_fasta;
use blastsift::libs::render;
use blastsift::libs::report::{read_searches, Search};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("filter")
        .about("Filters saved BLAST JSON reports by identity and coverage")
        .after_help(
            r###"
Reads BLAST reports in JSON format (blast+ `-outfmt 15`, or the URL API's
FORMAT_TYPE=JSON2_S) and keeps the HSPs whose identity and query coverage reach
the thresholds. Each query of a report is filtered independently.

Query lengths:
* With --query, the i-th FASTA record gives the length of the i-th query
  over all reports, in order
* Otherwise the `query_len` recorded in the report is used

Notes:
* Supports both plain text and gzipped (.gz) files
* Reads from stdin if input file is 'stdin'
* A query with a malformed result is reported and the others proceed

Examples:
1. Filter a report with default thresholds (80% identity, 80% coverage):
   blastsift filter result.json

2. Lengths from the submitted FASTA, 4 threads:
   blastsift filter result.json --query genes.fa --parallel 4

3. Tab-separated output:
   blastsift filter a.json b.json.gz -i 90 -c 50 --tsv -o hits.tsv

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("BLAST JSON report(s) to filter"),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .num_args(1)
                .help("FASTA file of the submitted queries"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        );

    super::add_output_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let thresholds = super::thresholds(args)?;
    let is_tsv = args.get_flag("tsv");

    // Set the number of threads for rayon
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    //----------------------------
    // Load
    //----------------------------
    let mut searches: Vec<Search> = vec![];
    for infile in args.get_many::<String>("infiles").unwrap() {
        let reader = blastsift::reader(infile)?;
        let loaded =
            read_searches(reader).with_context(|| format!("could not read report {}", infile))?;
        tracing::debug!(infile = %infile, queries = loaded.len(), "report loaded");
        searches.extend(loaded);
    }

    // (name, query length) for every search
    let queries: Vec<(String, usize)> = match args.get_one::<String>("query") {
        Some(fasta) => {
            let records = read_fasta(fasta)?;
            if records.len() != searches.len() {
                anyhow::bail!(
                    "{} has {} records but the reports hold {} queries",
                    fasta,
                    records.len(),
                    searches.len()
                );
            }
            records.into_iter().map(|q| (q.name.clone(), q.len())).collect()
        }
        None => searches
            .iter()
            .map(|s| (s.query_name().to_string(), s.query_len.unwrap_or(0)))
            .collect(),
    };

    //----------------------------
    // Ops
    //----------------------------
    let outcomes: Vec<QueryOutcome> = searches
        .par_iter()
        .zip(queries.par_iter())
        .map(|(search, (name, len))| filter_search(name, search, *len, &thresholds))
        .collect();

    //----------------------------
    // Output
    //----------------------------
    let mut writer = blastsift::writer(args.get_one::<String>("outfile").unwrap())?;
    if is_tsv {
        render::write_tsv_header(&mut writer)?;
    }
    for outcome in &outcomes {
        if is_tsv {
            render::write_tsv_rows(&mut writer, outcome)?;
        } else {
            render::write_outcome(&mut writer, outcome)?;
        }
    }
    writer.flush()?;

    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} queries failed", failed, outcomes.len());
    }

    Ok(())
}
