use asopipe::libs::design::{check_gapmer, read_tiles, run, DesignOptions};
use asopipe::libs::gapmer::{KeepRule, WingCoord};
use asopipe::libs::locus::Assembly;
use clap::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("design")
        .about("Scores tiled oligos against the alignments of every target assembly")
        .after_help(
            r###"
Reads candidate oligos and looks each one up in the reference/query alignment
of every query assembly. The alignment of an assembly is
`<maf-dir>/<ref>.<query>.synNet.maf`.

Input: one tile per line, `chr(strand):start-end<TAB>SEQUENCE`, 1-based and
inclusive. The strand is that of the targeted transcript's antisense. Empty
lines and lines starting with `#` are skipped.

Output: a TSV table with the columns
    ASO_Locus ASO_Sequence Length CpG Gquad GC_Content
followed, for each query assembly, by
    maf_seq_<asm> coverage_<asm> wobble_<asm>
and with --gapmer also by
    gapmer_filtered_<asm> gapmer_coords_<asm>

Notes:
* Missing indexes are built before any tile is queried
* Tiles are sent to --parallel workers in --chunk rounds; the output keeps
  the input order
* A tile whose lookup fails gets empty columns; an assembly whose alignment
  can't be opened gets empty columns for every tile
* --gapmer keeps only tiles accepted for at least one assembly, or for all of
  them with --keep all

Examples:
1. Score against mouse:
   aso design tiles.tsv --maf-dir maf/ --ref hg38 --query mm39 -o out.tsv

2. Two assemblies with the gapmer filter:
   aso design tiles.tsv --maf-dir maf/ --query mm39 --query rn7 --gapmer

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Tiles file. [stdin] for standard input"),
        )
        .arg(
            Arg::new("maf_dir")
                .long("maf-dir")
                .short('d')
                .num_args(1)
                .default_value(".")
                .help("Directory of the alignment files"),
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
                .short('q')
                .num_args(1)
                .action(ArgAction::Append)
                .required(true)
                .help("Query assembly, repeatable"),
        )
        .arg(
            Arg::new("wobble")
                .long("wobble")
                .short('w')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("2")
                .help("Maximum number of wobble mismatches"),
        )
        .arg(
            Arg::new("gap")
                .long("gap")
                .short('g')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("10")
                .help("Length of the gapmer DNA gap"),
        )
        .arg(
            Arg::new("coords")
                .long("coords")
                .short('c')
                .num_args(1)
                .help("Explicit gapmer coordinates, as wing5_gap_wing3"),
        )
        .arg(
            Arg::new("chunk")
                .long("chunk")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("3")
                .help("Number of dispatch rounds per assembly"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("3")
                .help("Number of workers per assembly"),
        )
        .arg(
            Arg::new("gapmer")
                .long("gapmer")
                .action(ArgAction::SetTrue)
                .help("Add gapmer columns and drop rejected tiles"),
        )
        .arg(
            Arg::new("keep")
                .long("keep")
                .num_args(1)
                .value_parser(["any", "all"])
                .default_value("any")
                .help("How per-assembly gapmer decisions are combined"),
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
    let opts = DesignOptions {
        maf_dir: args.get_one::<String>("maf_dir").unwrap().to_string(),
        reference: Assembly::new(args.get_one::<String>("ref").unwrap()),
        queries: args
            .get_many::<String>("query")
            .unwrap()
            .map(|s| Assembly::new(s))
            .collect(),
        max_wobble: *args.get_one::<usize>("wobble").unwrap(),
        chunks: *args.get_one::<usize>("chunk").unwrap(),
        parallel: *args.get_one::<usize>("parallel").unwrap(),
    };
    let opt_gap = *args.get_one::<usize>("gap").unwrap();
    let explicit = match args.get_one::<String>("coords") {
        Some(s) => Some(s.parse::<WingCoord>()?),
        None => None,
    };
    let is_gapmer = args.get_flag("gapmer");
    let keep: KeepRule = args.get_one::<String>("keep").unwrap().parse()?;

    //----------------------------
    // Ops
    //----------------------------
    let tiles = read_tiles(args.get_one::<String>("infile").unwrap())?;
    log::info!("{} tiles", tiles.len());
    if is_gapmer {
        check_gapmer(&tiles, opt_gap, explicit)?;
    }

    let mut table = run(tiles, &opts)?;
    if is_gapmer {
        table.apply_gapmer(opt_gap, explicit, keep)?;
    }

    //----------------------------
    // Output
    //----------------------------
    let mut writer = asopipe::writer(args.get_one::<String>("outfile").unwrap())?;
    table.write_tsv(&mut writer)?;

    Ok(())
}
