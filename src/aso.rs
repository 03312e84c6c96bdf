extern crate clap;
use clap::*;

mod cmd_aso;

fn main() -> anyhow::Result<()> {
    let app = Command::new("aso")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`aso` - Antisense oligo design against whole-genome alignments")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Log more; -v for progress, -vv for per-tile details"),
        )
        .subcommand(cmd_aso::maf::make_subcommand())
        .subcommand(cmd_aso::wobble::make_subcommand())
        .subcommand(cmd_aso::dist::make_subcommand())
        .subcommand(cmd_aso::gapmer::make_subcommand())
        .subcommand(cmd_aso::design::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Alignments:
    * maf    - Index a MAF file and fetch aligned text of regions

* Scoring:
    * wobble - Classify mismatches as tolerated wobble pairs
    * dist   - Average edit distance of sequences
    * gapmer - Wing/gap coordinates of a gapmer

* Pipelines:
    * design - Score tiled oligos against every target assembly

Logging goes to stderr. RUST_LOG overrides -v.

"###,
        );

    let matches = app.get_matches();

    env_logger::Builder::new()
        .filter_level(match matches.get_count("verbosity") {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("maf", sub_matches)) => cmd_aso::maf::execute(sub_matches),
        Some(("wobble", sub_matches)) => cmd_aso::wobble::execute(sub_matches),
        Some(("dist", sub_matches)) => cmd_aso::dist::execute(sub_matches),
        Some(("gapmer", sub_matches)) => cmd_aso::gapmer::execute(sub_matches),
        Some(("design", sub_matches)) => cmd_aso::design::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
