use asopipe::libs::coverage::average_edit_distance;
use clap::*;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("dist")
        .about("Average pairwise edit distance of sequences")
        .after_help(
            r###"
Computes the edit distance of every pair of the given sequences and prints the
average, truncated to an integer. Fewer than two sequences give 0.

Gap characters are compared like any other character, so aligned text of
unequal gap content counts as substitutions or indels.

Examples:
1. Two aligned texts:
   aso dist GTAC--GTAC GTACTTGTAC

2. Weighted operations:
   aso dist ACGT ACGTT AGT --sub 2 --ins 1 --del 1

"###,
        )
        .arg(
            Arg::new("seqs")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Sequences or aligned texts"),
        )
        .arg(
            Arg::new("sub")
                .long("sub")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("1")
                .help("Cost of a substitution"),
        )
        .arg(
            Arg::new("ins")
                .long("ins")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("1")
                .help("Cost of an insertion"),
        )
        .arg(
            Arg::new("del")
                .long("del")
                .value_parser(value_parser!(usize))
                .num_args(1)
                .default_value("1")
                .help("Cost of a deletion"),
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
    let seqs: Vec<&String> = args.get_many::<String>("seqs").unwrap().collect();
    let cost_sub = *args.get_one::<usize>("sub").unwrap();
    let cost_ins = *args.get_one::<usize>("ins").unwrap();
    let cost_del = *args.get_one::<usize>("del").unwrap();

    let mut writer = asopipe::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let dist = average_edit_distance(&seqs, cost_sub, cost_ins, cost_del);
    writer.write_all(format!("{}\n", dist).as_ref())?;

    Ok(())
}
