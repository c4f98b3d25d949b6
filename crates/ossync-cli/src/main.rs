use clap::Parser;
use colored::Colorize;
use tracing::Level;

mod cli;
mod commands;
mod config;
mod error;

#[tokio::main]
async fn main() {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match cli::usage_exit_code(&err) {
            None => err.exit(),
            Some(code) => {
                // rendering can only fail on a closed stderr
                let _ = err.print();
                std::process::exit(code);
            }
        },
    };
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match commands::run_command(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err.display_message());
            err.exit_code()
        }
    };
    std::process::exit(code);
}
