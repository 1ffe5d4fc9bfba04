use clap::Parser;
use statarb::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
