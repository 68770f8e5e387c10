use clap::Parser;
use log::warn;
use snafu::ErrorCompat;

mod args;
mod tally;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let res = tally::run_category(
        args.config.clone(),
        args.reference.clone(),
        args.out.clone(),
        args.input.clone(),
        args.input_type.clone(),
        args.finalist_count,
    );

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
