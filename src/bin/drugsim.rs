use std::process::ExitCode;

use anyhow::Result;
use drugsim::*;

const USAGE: &str = "Usage: drugsim <base> [disease]";

fn main() -> Result<ExitCode> {
    init_logging(&std::env::var(LOG_ENV).unwrap_or_default());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(base) = args.first() else {
        println!("{USAGE}");
        return Ok(ExitCode::FAILURE);
    };
    let disease = args.get(1).map(String::as_str).unwrap_or(DEFAULT_DISEASE);

    let table = BaseTable::load()?;
    match derive_named(&table, base, disease) {
        Ok(report) => {
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if matches!(e.downcast_ref::<DeriveError>(), Some(DeriveError::UnknownBase(_))) => {
            println!("Unknown base");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}
