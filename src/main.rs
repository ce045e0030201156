use clap::Parser;
use task_cycle::cli::commands::Cli;
use task_cycle::cli::handlers;
use task_cycle::util::logging::{LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();

    let format = match cli.log_format.parse::<LogFormat>() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("error: {} (expected one of: {})", e, LogFormat::variants().join(", "));
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logging(cli.log_level.as_deref(), format) {
        eprintln!("error: could not initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
