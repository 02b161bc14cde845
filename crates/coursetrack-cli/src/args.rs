//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{bail, Result};

pub const USAGE: &str = "\
Usage:
  coursetrack progress <enrollment-id>... [--json] [--offline <fixture.json>]
  coursetrack complete <enrollment-id> <lesson-id> [--offline <fixture.json>]

Options:
  --json               Print progress views as JSON
  --offline <file>     Serve data from a JSON fixture instead of the content store
  -h, --help           Show this help

Environment:
  COURSETRACK_URL, COURSETRACK_TOKEN, COURSETRACK_TIMEOUT_SECS override the config file.
  RUST_LOG controls log output (default: warn).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Progress { enrollment_ids: Vec<String> },
    Complete { enrollment_id: String, lesson_id: String },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub json: bool,
    pub offline: Option<PathBuf>,
}

impl Args {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut json = false;
        let mut offline = None;
        let mut positional = Vec::new();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--offline" => match iter.next() {
                    Some(path) => offline = Some(PathBuf::from(path)),
                    None => bail!("--offline needs a fixture path"),
                },
                "-h" | "--help" => {
                    return Ok(Self {
                        command: Command::Help,
                        json,
                        offline,
                    })
                }
                flag if flag.starts_with("--") => bail!("Unknown option {}", flag),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            Some("progress") => {
                let enrollment_ids: Vec<String> = positional.collect();
                if enrollment_ids.is_empty() {
                    bail!("progress needs at least one enrollment id");
                }
                Command::Progress { enrollment_ids }
            }
            Some("complete") => {
                let rest: Vec<String> = positional.collect();
                match <[String; 2]>::try_from(rest) {
                    Ok([enrollment_id, lesson_id]) => Command::Complete {
                        enrollment_id,
                        lesson_id,
                    },
                    Err(_) => bail!("complete needs an enrollment id and a lesson id"),
                }
            }
            Some(other) => bail!("Unknown command {}", other),
            None => Command::Help,
        };

        Ok(Self {
            command,
            json,
            offline,
        })
    }
}
