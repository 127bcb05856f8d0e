use clap::Parser;

/// This is a tabulation program that runs several voting rules over
/// ranked ballots.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file paths) The CSV ballot files to tabulate, one row per voter and one
    /// column per candidate, most preferred first, without a header row. Each
    /// file is one dataset and is processed independently.
    #[clap(value_parser, required = true)]
    pub datasets: Vec<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of all the
    /// elections will be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected election summary in
    /// JSON format. If provided, multivote will check that the tabulated output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard
    /// output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
