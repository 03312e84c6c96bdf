use asopipe::libs::locus::Strand;
use asopipe::libs::wobble::{check_wobble, WobbleResult};
use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("wobble")
        .about("Classifies mismatches between aligned reference and query text")
        .after_help(
            r###"
Compares two aligned texts of equal length and assigns every mismatch to the
wobble categories it satisfies (reference base / query base):

* GU_humanC   - C/T or A/G
* GU_otherC   - T/C or G/A
* I_humanC    - C / anything but G
* I_otherwise - neither G nor C / anything but G

The result is either the four position lists or `Reject`.

Notes:
* Trailing gaps are ignored; any other gap rejects
* With --strand + both texts are complemented first
* With --strand - positions count from the 3' end of the text
* More than --wobble mismatches, or one fitting no category, rejects

Examples:
1. A single G/U pair on the minus strand:
   aso wobble AAAAAAAAAA AAGAAAAAAA --strand -

2. Allow three mismatches:
   aso wobble ACGTACGTAC ACGTACGTAC --wobble 3

"###,
        )
        .arg(
            Arg::new("reference")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Aligned reference text"),
        )
        .arg(
            Arg::new("query")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Aligned query text"),
        )
        .arg(
            Arg::new("wobble")
                .long("wobble")
                .short('w')
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("2")
                .help("Maximum number of mismatches"),
        )
        .arg(
            Arg::new("strand")
                .long("strand")
                .short('s')
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(["+", "-"])
                .default_value("+")
                .help("Strand of the target locus"),
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
    let reference = args.get_one::<String>("reference").unwrap();
    let query = args.get_one::<String>("query").unwrap();
    let opt_wobble = *args.get_one::<usize>("wobble").unwrap();
    let strand: Strand = args.get_one::<String>("strand").unwrap().parse()?;

    let mut writer = asopipe::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let result = check_wobble(Some(reference.as_str()), Some(query.as_str()), opt_wobble, strand);
    if let WobbleResult::Pass(sites) = &result {
        log::info!("{} sites outside GU_humanC", sites.extra_sites().len());
    }

    //----------------------------
    // Output
    //----------------------------
    match &result {
        WobbleResult::Pass(sites) => {
            for (name, positions) in sites.categories() {
                writer.write_all(
                    format!("{}\t{}\n", name, itertools::join(positions.iter(), ",")).as_ref(),
                )?;
            }
        }
        WobbleResult::Reject => writer.write_all(format!("{}\n", result).as_ref())?,
    }

    Ok(())
}
