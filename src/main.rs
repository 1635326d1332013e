use std::process::ExitCode;

use quill::cli;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    // Results go to stdout, diagnostics to stderr. --debug is what surfaces
    // the per-attempt provider traces.
    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);

    log::info!("quill starting up");

    cli::run(cli).await
}
