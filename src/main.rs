//! dsync binary entry point.

use std::process::ExitCode;

use designsync::cli::{self, Cli, ExitCodes};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    cli::init_logging(cli.debug, cli.quiet);

    match cli::run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            designsync::ui::output::error(format!("{e:#}"));
            ExitCode::from(ExitCodes::FAILED)
        }
    }
}
