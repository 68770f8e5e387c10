use clap::Parser;

/// This is a tabulation program for award nominations and final ballots.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the award category: the counting method, the
    /// candidates and the ballot sources. See the manual of the award_tally crate for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the outcome of the count in JSON format. If provided,
    /// awardtally will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the count will be written in JSON
    /// format to the given location. Setting this option overrides the path that may be specified
    /// in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the ballots are read from this file instead of the first
    /// ballot source of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv, excel or json) The type of the input given with --input. Defaults to csv.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (number) For the nomination stage, overrides the number of finalists of the configuration.
    #[clap(long, value_parser)]
    pub finalist_count: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
