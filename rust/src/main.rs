//! Operator CLI for deriving partition keys by hand, e.g. when checking which
//! partition a replayed record will land on.

use std::env;
use std::fs;
use std::process::ExitCode;

use partition_key::config::load_policy;
use partition_key::crypto::integrity::create_sha3_hash;
use partition_key::partition::PartitionKeyDeriver;

fn print_usage() {
    eprintln!("Usage: partition-key [--policy <policy.json>] <command>\n\nCommands:\n  derive <json>\n  derive-file <path>\n  derive-lines <path>\n  hash [data]");
}

/// Strips a leading `--policy <path>` and builds the deriver it describes.
fn take_deriver(args: &mut Vec<String>) -> Result<PartitionKeyDeriver, String> {
    if args.first().map(String::as_str) != Some("--policy") {
        return Ok(PartitionKeyDeriver::default());
    }
    if args.len() < 2 {
        return Err("--policy requires a path".to_string());
    }
    let path = args.remove(1);
    args.remove(0);
    let policy = load_policy(&path).map_err(|e| format!("policy load failed: {e}"))?;
    PartitionKeyDeriver::new(policy).map_err(|e| format!("invalid policy: {e}"))
}

fn run(mut args: Vec<String>) -> Result<(), String> {
    let deriver = take_deriver(&mut args)?;
    log::debug!("using key policy {:?}", deriver.policy());
    let Some(command) = args.first() else {
        print_usage();
        return Err("missing command".to_string());
    };

    match (command.as_str(), args.len()) {
        ("derive", 2) => {
            let key = deriver
                .derive_from_json_str(&args[1])
                .map_err(|e| format!("derivation failed: {e}"))?;
            println!("{key}");
        }
        ("derive-file", 2) => {
            let text = fs::read_to_string(&args[1])
                .map_err(|e| format!("unable to read {}: {e}", args[1]))?;
            let key = deriver
                .derive_from_json_str(&text)
                .map_err(|e| format!("derivation failed: {e}"))?;
            println!("{key}");
        }
        ("derive-lines", 2) => {
            let text = fs::read_to_string(&args[1])
                .map_err(|e| format!("unable to read {}: {e}", args[1]))?;
            for (index, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let key = deriver
                    .derive_from_json_str(line)
                    .map_err(|e| format!("line {}: {e}", index + 1))?;
                println!("{key}");
            }
        }
        ("hash", 1) => println!("{}", create_sha3_hash(None)),
        ("hash", 2) => println!("{}", create_sha3_hash(Some(&args[1]))),
        _ => {
            print_usage();
            return Err(format!("unrecognised invocation: {}", args.join(" ")));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .format_timestamp_micros()
        .init();

    match run(env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
