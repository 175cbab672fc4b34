// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use bmp_common::cli::cli_style;
use clap::{Parser, Subcommand};
use slog::Drain;
use slog::Logger;

mod db;
mod msglog;

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    styles = cli_style(),
    infer_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Message log inspection commands.
    #[command(subcommand)]
    Log(msglog::Commands),

    /// Monitoring database commands.
    #[command(subcommand)]
    Db(db::Commands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = init_logger();

    match cli.command {
        Commands::Log(command) => msglog::commands(command, log)?,
        Commands::Db(command) => db::commands(command, log)?,
    }
    Ok(())
}

fn init_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain).fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(0x2000)
        .build()
        .fuse();
    slog::Logger::root(drain, slog::o!())
}
