//! Subcommand modules for the `blastsift` binary.

use clap::{Arg, ArgAction, ArgMatches, Command};

use blastsift::libs::hit::Thresholds;

pub mod filter;
pub mod search;

/// `--identity`, `--coverage`, `--tsv` and `--outfile`, shared by every
/// subcommand that prints hits.
pub fn add_output_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("identity")
            .long("identity")
            .short('i')
            .num_args(1)
            .default_value("80")
            .value_parser(parse_percent)
            .help("Minimum identity percentage of a hit, 0-100"),
    )
    .arg(
        Arg::new("coverage")
            .long("coverage")
            .short('c')
            .num_args(1)
            .default_value("80")
            .value_parser(parse_percent)
            .help("Minimum query coverage percentage of a hit, 0-100"),
    )
    .arg(
        Arg::new("tsv")
            .long("tsv")
            .action(ArgAction::SetTrue)
            .help("Write one tab-separated row per hit instead of display blocks"),
    )
    .arg(
        Arg::new("outfile")
            .long("outfile")
            .short('o')
            .num_args(1)
            .default_value("stdout")
            .help("Output filename. [stdout] for screen"),
    )
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if (0.0..=100.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{} is not within 0-100", v))
    }
}

pub fn thresholds(args: &ArgMatches) -> anyhow::Result<Thresholds> {
    let identity = *args.get_one::<f64>("identity").unwrap();
    let coverage = *args.get_one::<f64>("coverage").unwrap();
    Ok(Thresholds::new(identity, coverage)?)
}
