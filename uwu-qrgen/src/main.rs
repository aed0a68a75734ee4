mod cli;
mod error;
mod output;
mod page;
mod symbol;

use cli::Invocation;
use colored::Colorize;
use error::QrgenError;
use log::info;
use std::io;
use std::process::ExitCode;
use symbol::Symbol;

fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        // clap prints usage (or help) itself and picks the exit status
        Err(QrgenError::Usage(e)) => e.exit(),
        Err(e) => {
            eprintln!("{} {}", "「error」".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), QrgenError> {
    let invocation = Invocation::from_args(std::env::args_os())?;

    info!(
        "encoding {} byte(s) of content, page: {:?}",
        invocation.request.content.len(),
        invocation.request.page
    );
    let symbol = Symbol::new(&invocation.request)?;

    output::dispatch(
        symbol,
        &invocation.options,
        &invocation.target,
        &mut io::stdout().lock(),
    )
}
