use asopipe::libs::gapmer::{gapmer_coords, has_cpg, WingCoord};
use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("gapmer")
        .about("Wing and gap coordinates of a gapmer oligo")
        .after_help(
            r###"
Splits an oligo into 5' wing, central DNA gap and 3' wing.

Output is one line per candidate: `wing5_gap_wing3`, the gap sequence and
whether the gap contains a CpG.

Notes:
* Without --coords the wings share what is left around the gap; when that
  is odd, both placements of the extra base are printed
* --coords must add up to the length of the sequence

Examples:
1. A 20-mer with the default gap of 10:
   aso gapmer ACCTTGACTGGAAGCTTCAT

2. A 21-mer, two candidates:
   aso gapmer ACCTTGACTGGAAGCTTCATG --gap 10

3. Explicit coordinates:
   aso gapmer ACCTTGACTGGAAGCTTCAT --coords 3_10_7

"###,
        )
        .arg(
            Arg::new("sequence")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Oligo sequence"),
        )
        .arg(
            Arg::new("gap")
                .long("gap")
                .short('g')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("10")
                .help("Length of the DNA gap"),
        )
        .arg(
            Arg::new("coords")
                .long("coords")
                .short('c')
                .num_args(1)
                .help("Explicit coordinates, as wing5_gap_wing3"),
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
    let sequence = args.get_one::<String>("sequence").unwrap().to_ascii_uppercase();
    let opt_gap = *args.get_one::<usize>("gap").unwrap();
    let explicit = match args.get_one::<String>("coords") {
        Some(s) => Some(s.parse::<WingCoord>()?),
        None => None,
    };

    let mut writer = asopipe::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    for candidate in gapmer_coords(&sequence, opt_gap, explicit)? {
        writer.write_all(
            format!(
                "{}\t{}\t{}\n",
                candidate.coord,
                candidate.gap_seq,
                has_cpg(&candidate.gap_seq)
            )
            .as_ref(),
        )?;
    }

    Ok(())
}
