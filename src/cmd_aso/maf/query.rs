use asopipe::libs::locus::{Assembly, GenomicLocus};
use asopipe::libs::query::QueryEngine;
use clap::*;
use std::io::{BufRead, Write};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("query")
        .about("Extracts aligned text of regions from an indexed MAF file")
        .after_help(
            r###"
Fetches the aligned reference and query text of each region.

Regions are given on the reference as `chr(strand):start-end`, 1-based and
inclusive; the strand may be omitted. `--regions` reads one region per line
from a file instead.

Output is block FA: one `>name` line and the aligned text per species, then
an empty line. A region without alignment is reported as `#NoCoverage`.

Notes:
* The index `<infile>.index` is built first when it does not exist
* The first block covering the whole region is used; otherwise the region is
  assembled base by base and dropped when any base is missing
* --one-by-one always assembles base by base
* --verbose names rows by their full source (`hg38.chr1`) instead of the
  assembly

Examples:
1. One region:
   aso maf query tests/maf/example.maf "chr1(-):101-120" --ref hg38 --query mm39

2. Regions in a file, full row names:
   aso maf query tests/maf/example.maf --regions loci.txt --ref hg38 --query mm39 --verbose

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input MAF file"),
        )
        .arg(
            Arg::new("ranges")
                .num_args(0..)
                .index(2)
                .help("Regions on the reference"),
        )
        .arg(
            Arg::new("regions")
                .long("regions")
                .short('r')
                .num_args(1)
                .help("File of regions, one per line"),
        )
        .arg(
            Arg::new("ref")
                .long("ref")
                .num_args(1)
                .default_value("hg38")
                .help("Reference assembly"),
        )
        .arg(
            Arg::new("query")
                .long("query")
                .num_args(1)
                .required(true)
                .help("Query assembly"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Name rows by their full source"),
        )
        .arg(
            Arg::new("one_by_one")
                .long("one-by-one")
                .action(ArgAction::SetTrue)
                .help("Always assemble regions base by base"),
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

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let reference = Assembly::new(args.get_one::<String>("ref").unwrap());
    let query = Assembly::new(args.get_one::<String>("query").unwrap());
    let is_verbose = args.get_flag("verbose");
    let is_one_by_one = args.get_flag("one_by_one");

    let mut ranges: Vec<String> = match args.get_many::<String>("ranges") {
        Some(values) => values.cloned().collect(),
        None => vec![],
    };
    if let Some(file) = args.get_one::<String>("regions") {
        for line in asopipe::reader(file)?.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            ranges.push(line.to_string());
        }
    }

    let mut writer = asopipe::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let mut engine = QueryEngine::open(infile, &reference, &query)?;

    for range in &ranges {
        let locus = GenomicLocus::parse(range)?;
        let result = if is_one_by_one {
            engine.query_one_by_one(&locus, is_verbose)?
        } else {
            engine.query(&locus, is_verbose)?
        };

        //----------------------------
        // Output
        //----------------------------
        match result {
            Some(seqs) => {
                for (name, text) in &seqs {
                    writer.write_all(format!(">{}\n{}\n", name, text).as_ref())?;
                }
                writer.write_all("\n".as_ref())?;
            }
            None => {
                writer.write_all(format!("#NoCoverage {}\n", locus).as_ref())?;
            }
        }
    }

    Ok(())
}
