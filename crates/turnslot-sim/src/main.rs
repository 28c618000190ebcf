use std::process;

use turnslot_sim::cli::{Command, USAGE, parse_args};
use turnslot_sim::error::SimError;
use turnslot_sim::{SimConfig, logging};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config = match parse_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return;
        }
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!();
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    logging::init_tracing();

    if let Err(e) = run(&config) {
        eprintln!("error: {e}");
        let code = if matches!(e, SimError::InvalidArgs(_) | SimError::Config(_)) {
            2
        } else {
            1
        };
        process::exit(code);
    }
}

fn run(config: &SimConfig) -> Result<(), SimError> {
    let report = turnslot_sim::run(config)?;
    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    Ok(())
}
