use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod tally;

fn main() {
    let args = args::Args::parse();
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let mut failed = false;
    let mut reports: Vec<tally::DatasetSummary> = Vec::new();
    for path in args.datasets.iter() {
        match tally::run_dataset(path) {
            Ok(summary) => reports.push(summary),
            Err(e) => {
                // A failed dataset does not stop the remaining ones.
                failed = true;
                warn!("Error occured {:?}", e);
                eprintln!("An error occured processing {}: {}", path, e);
                if let Some(bt) = ErrorCompat::backtrace(&e) {
                    eprintln!("trace: {}", bt);
                }
            }
        }
    }

    if let Err(e) = tally::write_summary(&reports, args.out.as_deref(), args.reference.as_deref()) {
        failed = true;
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
    }

    if failed {
        std::process::exit(1);
    }
}
