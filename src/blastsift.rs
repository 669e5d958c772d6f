extern crate clap;
use clap::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmd_blastsift;

fn main() -> anyhow::Result<()> {
    let app = Command::new("blastsift")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`blastsift` - Filter and summarize BLAST hits")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("More log output on stderr, may be repeated"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("No log output"),
        )
        .subcommand(cmd_blastsift::search::make_subcommand())
        .subcommand(cmd_blastsift::filter::make_subcommand())
        .after_help(
            r###"Subcommands:

* search - Remote BLAST through the NCBI URL API, then filter
* filter - Filter saved BLAST JSON reports

A hit (HSP) is kept when both hold:
    100 * identities / alignment length >= --identity
    100 * alignment length / query length >= --coverage

"###,
        );

    let matches = app.get_matches();
    init_tracing(&matches);

    // Check which subcommand the user ran...
    match matches.subcommand() {
        Some(("search", sub_matches)) => cmd_blastsift::search::execute(sub_matches),
        Some(("filter", sub_matches)) => cmd_blastsift::filter::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

fn init_tracing(matches: &ArgMatches) {
    if matches.get_flag("quiet") {
        return;
    }

    let filter = match matches.get_count("verbose") {
        0 => "warn",
        1 => "warn,blastsift=info",
        2 => "info,blastsift=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
