use clap::{CommandFactory, error::ErrorKind};
use console::style;
use ptyshift::{Cli, ConfigError, SessionConfig, cli::version_text, log, session};
use ptyshift_attach::PlatformBackend;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    if cli.version {
        print!("{}", version_text());
        return ExitCode::SUCCESS;
    }

    let config = match SessionConfig::try_from(cli) {
        Ok(config) => config,
        Err(err) => {
            report(&err);
            if err == ConfigError::MissingPid {
                eprintln!("{}", Cli::command().render_usage());
            }
            return ExitCode::FAILURE;
        }
    };

    log::init_tracing(config.verbosity);

    match session::run(&config, &PlatformBackend::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &dyn std::fmt::Display) {
    eprintln!("{} {err}", style("[!]").red().for_stderr());
}
