//! inkslate replay host
//!
//! Runs a scripted pointer session against the canvas engine and prints the
//! resulting state as JSON.
//!
//! ```text
//! inkslate-replay session.json [--document]
//! ```

mod error;
mod recognizer;
mod script;
mod session;

use error::ReplayError;
use script::Script;

fn run() -> Result<String, ReplayError> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or(ReplayError::Usage)?;
    let include_document = match args.next().as_deref() {
        None => false,
        Some("--document") => true,
        Some(_) => return Err(ReplayError::Usage),
    };

    let script = Script::load(&path)?;
    log::info!("Replaying {} ({} steps)", path, script.steps.len());
    let summary = session::replay(&script, include_document)?;
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn main() {
    env_logger::init();
    log::info!("Starting inkslate replay");

    match run() {
        Ok(output) => println!("{}", output),
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
