use asopipe::libs::locus::Assembly;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("index")
        .about("Builds the interval index of a MAF file")
        .after_help(
            r###"
Scans a MAF file and writes `<infile>.index`, which maps each source row
(`species.chrom`) to the byte offsets of the blocks covering it.

Notes:
* The MAF file must be plain text; indexed access seeks into it
* An existing index is overwritten
* `aso maf query` and `aso design` build the index themselves when it is missing,
  but never check whether it is older than the MAF file
* --species restricts the index to rows of these assemblies; by default every
  row is indexed

Examples:
1. Index all rows:
   aso maf index tests/maf/example.maf

2. Index only the human and mouse rows:
   aso maf index hg38.mm39.synNet.maf --species hg38,mm39

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
            Arg::new("species")
                .long("species")
                .short('s')
                .num_args(1)
                .value_delimiter(',')
                .help("Assemblies to index, comma separated"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let species: Vec<Assembly> = match args.get_many::<String>("species") {
        Some(values) => values.map(|s| Assembly::new(s)).collect(),
        None => vec![],
    };

    //----------------------------
    // Ops
    //----------------------------
    let path = asopipe::libs::maf_index::build_index(infile, &species)?;
    log::info!("Index written to {}", path.display());

    Ok(())
}
