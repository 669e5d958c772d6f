use clap::*;
use std::io::Write;
use std::time::Duration;

use blastsift::libs::batch::{run_batch, QueryOutcome};
use blastsift::libs::qblast::{Program, QBlast, QBlastConfig, NCBI_BLAST_URL};
use blastsift::libs::query::{read_fasta, Query};
use blastsift::libs::render;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("search")
        .about("Runs remote BLAST searches and shows the hits passing the thresholds")
        .after_help(
            r###"
Submits each query to the NCBI BLAST URL API, waits for the result, and keeps the
HSPs whose identity and query coverage reach the thresholds.

    identity = 100 * identities / alignment length
    coverage = 100 * alignment length / query length

Hits keep the ranking of the search. Each query is searched on its own; a query
whose search fails is reported as "Search unavailable" and the others proceed.

Notes:
* Queries come from FASTA file(s) or from --seq; 'stdin' reads FASTA from stdin
* Default databases: nt for blastn/tblastn/tblastx, nr for blastp/blastx
* Nucleotide databases: nt, est, tsa_nt, ...; protein databases: nr, env_nr, tsa_nr, ...
* NCBI asks for no more than one request per 10 seconds; keep --poll-secs >= 10

Examples:
1. Search a sequence typed in:
   blastsift search --seq ACGTGGCTAGCTAGCTAGGATCGATCG

2. Protein queries from a FASTA file, stricter identity:
   blastsift search -p blastp -d nr --identity 95 proteins.fa

3. Tab-separated output:
   blastsift search genes.fa --tsv -o hits.tsv

"###,
        )
        .arg(
            Arg::new("infiles")
                .num_args(1..)
                .index(1)
                .help("Query FASTA file(s)"),
        )
        .arg(
            Arg::new("seq")
                .long("seq")
                .num_args(1)
                .conflicts_with("infiles")
                .help("A query sequence given on the command line"),
        )
        .arg(
            Arg::new("program")
                .long("program")
                .short('p')
                .num_args(1)
                .default_value("blastn")
                .value_parser(Program::NAMES)
                .help("BLAST program"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .short('d')
                .num_args(1)
                .help("Database to search; defaults by program"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .num_args(1)
                .default_value(NCBI_BLAST_URL)
                .help("BLAST URL API endpoint"),
        )
        .arg(
            Arg::new("poll_secs")
                .long("poll-secs")
                .num_args(1)
                .default_value("20")
                .value_parser(value_parser!(u64))
                .help("Seconds between status checks"),
        )
        .arg(
            Arg::new("timeout_secs")
                .long("timeout-secs")
                .num_args(1)
                .default_value("900")
                .value_parser(value_parser!(u64))
                .help("Give up on a search after this many seconds"),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .num_args(1)
                .help("Contact address sent to NCBI with each request"),
        );

    super::add_output_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let thresholds = super::thresholds(args)?;
    let program: Program = args.get_one::<String>("program").unwrap().parse()?;
    let database = args
        .get_one::<String>("db")
        .map(|s| s.to_string())
        .unwrap_or_else(|| program.default_database().to_string());
    let is_tsv = args.get_flag("tsv");

    let config = QBlastConfig {
        url: args.get_one::<String>("url").unwrap().to_string(),
        poll_interval: Duration::from_secs(*args.get_one::<u64>("poll_secs").unwrap()),
        timeout: Duration::from_secs(*args.get_one::<u64>("timeout_secs").unwrap()),
        email: args.get_one::<String>("email").cloned(),
        ..Default::default()
    };

    let queries = if let Some(seq) = args.get_one::<String>("seq") {
        vec![Query::from_text("input", seq)?]
    } else if let Some(infiles) = args.get_many::<String>("infiles") {
        let mut queries = vec![];
        for infile in infiles {
            queries.extend(read_fasta(infile)?);
        }
        queries
    } else {
        anyhow::bail!("Please enter a sequence with --seq or give a FASTA file");
    };

    //----------------------------
    // Ops
    //----------------------------
    let service = QBlast::new(config)?;
    let mut writer = blastsift::writer(args.get_one::<String>("outfile").unwrap())?;

    if is_tsv {
        render::write_tsv_header(&mut writer)?;
    }

    // Searches run one after another; results are written as they arrive
    let failed = run_batch(
        &service,
        &queries,
        program,
        &database,
        &thresholds,
        |outcome: QueryOutcome| -> anyhow::Result<()> {
            if is_tsv {
                render::write_tsv_rows(&mut writer, &outcome)?;
            } else {
                render::write_outcome(&mut writer, &outcome)?;
            }
            writer.flush()?;
            Ok(())
        },
    )?;

    if failed > 0 {
        anyhow::bail!("{} of {} queries failed", failed, queries.len());
    }

    Ok(())
}
