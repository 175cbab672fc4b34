// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use mdb::{Db, Table};
use slog::Logger;
use std::io::{stdout, Write};
use std::path::PathBuf;
use tabwriter::TabWriter;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the records stored in a table.
    Records {
        /// Path of the monitoring database.
        #[arg(long)]
        db: PathBuf,

        /// One of route_monitoring, statistics_report,
        /// peer_down_notification, peer_up_notification.
        table: Table,
    },

    /// Show how many records each table holds.
    Count {
        /// Path of the monitoring database.
        #[arg(long)]
        db: PathBuf,
    },
}

pub fn commands(command: Commands, log: Logger) -> Result<()> {
    match command {
        Commands::Records { db, table } => {
            records(&open(&db, log)?, table)?
        }
        Commands::Count { db } => count(&open(&db, log)?)?,
    }
    Ok(())
}

fn open(path: &std::path::Path, log: Logger) -> Result<Db> {
    Ok(Db::new(&path.to_string_lossy(), log)?)
}

fn records(db: &Db, table: Table) -> Result<()> {
    let records = db.records(table)?;
    let Some((_, first)) = records.first() else {
        println!("no records in {table}");
        return Ok(());
    };

    let mut tw = TabWriter::new(stdout());
    let header: Vec<String> = first
        .columns()
        .iter()
        .map(|(name, _)| name.dimmed().to_string())
        .collect();
    writeln!(&mut tw, "{}\t{}", "Id".dimmed(), header.join("\t"))?;

    for (id, record) in &records {
        let values: Vec<&str> =
            record.columns().iter().map(|(_, value)| *value).collect();
        writeln!(&mut tw, "{}\t{}", id, values.join("\t"))?;
    }
    tw.flush()?;
    Ok(())
}

fn count(db: &Db) -> Result<()> {
    let mut tw = TabWriter::new(stdout());
    writeln!(&mut tw, "{}\t{}", "Table".dimmed(), "Records".dimmed())?;
    for table in Table::ALL {
        writeln!(&mut tw, "{}\t{}", table, db.count(table)?)?;
    }
    tw.flush()?;
    Ok(())
}
