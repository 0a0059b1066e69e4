use clap::Parser;
use cli::driver::{self, CheckOptions};
use std::path::PathBuf;
use std::process;

/// Type checker for a Calculus of Constructions with pair types.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to check
    file: PathBuf,

    /// Print every checked global with its type
    #[arg(long)]
    dump_context: bool,

    /// Print the parser's debug trace
    #[arg(long)]
    trace: bool,
}

fn main() {
    let cli = Cli::parse();
    let options = CheckOptions {
        dump_context: cli.dump_context,
        trace: cli.trace,
    };
    match driver::check_file(&cli.file, &options) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("{err:#}");
            process::exit(2);
        }
    }
}
