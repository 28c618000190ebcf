//! Command-line parsing for `turnslot-sim`.

use std::path::PathBuf;

use crate::config::SimConfig;

pub const USAGE: &str = "\
Usage: turnslot-sim [options]

Options:
  --config <file>       JSON simulation config (flags below override it)
  --groups <a,b,...>    Group names [default: cat,mouse]
  --actors <n>          Actors per group [default: 4]
  --slots <n>           Number of slots [default: 2]
  --iterations <n>      Uses per actor [default: 8]
  --hold-ms <n>         Time a slot is held [default: 1]
  --rest-ms <n>         Pause between uses [default: 1]
  --quota <policy>      released | strict [default: released]
  --handoff <policy>    round-robin | work-conserving [default: work-conserving]
  -h, --help            Print this help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(SimConfig),
    Help,
}

#[derive(Debug, Default)]
struct Overrides {
    groups: Option<Vec<String>>,
    actors: Option<usize>,
    slots: Option<usize>,
    iterations: Option<usize>,
    hold_ms: Option<u64>,
    rest_ms: Option<u64>,
    quota: Option<String>,
    handoff: Option<String>,
}

/// Parse `argv` (including the program name) into a command.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut o = Overrides::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => return Ok(Command::Help),
            "--config" => config_path = Some(PathBuf::from(value(args, &mut i, flag)?)),
            "--groups" => {
                let names = value(args, &mut i, flag)?
                    .split(',')
                    .map(|n| n.trim().to_string())
                    .collect();
                o.groups = Some(names);
            }
            "--actors" => o.actors = Some(number(args, &mut i, flag)?),
            "--slots" => o.slots = Some(number(args, &mut i, flag)?),
            "--iterations" => o.iterations = Some(number(args, &mut i, flag)?),
            "--hold-ms" => o.hold_ms = Some(number(args, &mut i, flag)?),
            "--rest-ms" => o.rest_ms = Some(number(args, &mut i, flag)?),
            "--quota" => o.quota = Some(value(args, &mut i, flag)?.to_string()),
            "--handoff" => o.handoff = Some(value(args, &mut i, flag)?.to_string()),
            arg if arg.starts_with('-') => return Err(format!("unknown flag: {arg}")),
            arg => return Err(format!("unexpected argument: {arg}")),
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => SimConfig::from_file(&path).map_err(|e| e.to_string())?,
        None => SimConfig::default(),
    };

    if let Some(groups) = o.groups {
        config.groups = groups;
    }
    if let Some(actors) = o.actors {
        config.actors_per_group = actors;
    }
    if let Some(slots) = o.slots {
        config.slots = slots;
    }
    if let Some(iterations) = o.iterations {
        config.iterations = iterations;
    }
    if let Some(hold_ms) = o.hold_ms {
        config.hold_ms = hold_ms;
    }
    if let Some(rest_ms) = o.rest_ms {
        config.rest_ms = rest_ms;
    }
    if let Some(quota) = o.quota {
        config.quota = quota.parse()?;
    }
    if let Some(handoff) = o.handoff {
        config.handoff = handoff.parse()?;
    }

    Ok(Command::Run(config))
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn number<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> Result<T, String> {
    let raw = value(args, i, flag)?;
    raw.parse()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{raw}'"))
}
