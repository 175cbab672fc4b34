// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{bail, Result};
use bmp::record::LogRecord;
use bmp::recovery::recover_next_sequence;
use bmp::session::log_files;
use clap::Subcommand;
use colored::Colorize;
use slog::Logger;
use std::fs::File;
use std::io::{stdout, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tabwriter::TabWriter;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the sequence number the collector would continue this log at.
    LastSeq {
        /// Message log file.
        file: PathBuf,
    },

    /// List the records of a message log file.
    Dump {
        /// Message log file.
        file: PathBuf,

        /// Also print record payloads.
        #[arg(long)]
        payload: bool,
    },

    /// Check that sequence numbers are contiguous across all log files of
    /// a peer.
    Verify {
        /// Peer directory, `<write_dir>/<device>/<peer>`.
        peer_dir: PathBuf,
    },
}

pub fn commands(command: Commands, log: Logger) -> Result<()> {
    match command {
        Commands::LastSeq { file } => {
            if !file.is_file() {
                bail!("{} is not a file", file.display());
            }
            println!("{}", recover_next_sequence(&file, &log));
        }
        Commands::Dump { file, payload } => dump(&file, payload)?,
        Commands::Verify { peer_dir } => {
            let v = verify(&peer_dir)?;
            print_verification(&v)?;
            if !v.is_contiguous() {
                bail!("sequence check failed for {}", peer_dir.display());
            }
        }
    }
    Ok(())
}

/// Lines of a log file, parsed. Line numbers start at 1.
fn records(
    path: &Path,
) -> Result<impl Iterator<Item = (usize, Result<LogRecord, bmp::error::Error>)>>
{
    let reader = BufReader::new(File::open(path)?);
    Ok(reader
        .split(b'\n')
        .map_while(|line| line.ok())
        .enumerate()
        .map(|(i, line)| {
            (i + 1, LogRecord::from_line(&String::from_utf8_lossy(&line)))
        }))
}

fn dump(path: &Path, payload: bool) -> Result<()> {
    let mut tw = TabWriter::new(stdout());
    writeln!(
        &mut tw,
        "{}\t{}\t{}\t{}\t{}",
        "Line".dimmed(),
        "Sequence".dimmed(),
        "Type".dimmed(),
        "Marker".dimmed(),
        "Captured".dimmed(),
    )?;
    for (line, record) in records(path)? {
        match record {
            Ok(r) => {
                writeln!(
                    &mut tw,
                    "{}\t{}\t{}\t({}, {})\t{:.6}",
                    line,
                    r.sequence,
                    r.type_code,
                    r.marker.0,
                    r.marker.1,
                    r.capture_time,
                )?;
                if payload {
                    writeln!(
                        &mut tw,
                        "\t{}",
                        serde_json::to_string(&r.payload)?
                    )?;
                }
            }
            Err(e) => {
                writeln!(&mut tw, "{}\t{}", line, e.to_string().red())?;
            }
        }
    }
    tw.flush()?;
    Ok(())
}

#[derive(Debug, PartialEq)]
pub struct Gap {
    pub file: PathBuf,
    pub line: usize,
    pub expected: u64,
    pub got: u64,
}

#[derive(Debug, Default)]
pub struct Verification {
    pub files: usize,
    pub records: u64,
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub gaps: Vec<Gap>,
    pub unparsable: Vec<(PathBuf, usize)>,
}

impl Verification {
    pub fn is_contiguous(&self) -> bool {
        self.gaps.is_empty() && self.unparsable.is_empty()
    }
}

/// Walk every log file of a peer in name order and check that each record
/// follows the previous one.
pub fn verify(peer_dir: &Path) -> Result<Verification> {
    let mut v = Verification::default();
    let mut prev: Option<u64> = None;

    for file in log_files(peer_dir)? {
        v.files += 1;
        for (line, record) in records(&file)? {
            let r = match record {
                Ok(r) => r,
                Err(_) => {
                    v.unparsable.push((file.clone(), line));
                    continue;
                }
            };
            if let Some(prev) = prev {
                let Some(expected) = prev.checked_add(1) else {
                    bail!(
                        "record after sequence {} at {}:{}",
                        prev,
                        file.display(),
                        line
                    );
                };
                if r.sequence != expected {
                    v.gaps.push(Gap {
                        file: file.clone(),
                        line,
                        expected,
                        got: r.sequence,
                    });
                }
            }
            prev = Some(r.sequence);
            v.first.get_or_insert(r.sequence);
            v.last = Some(r.sequence);
            v.records += 1;
        }
    }
    Ok(v)
}

fn print_verification(v: &Verification) -> Result<()> {
    let mut tw = TabWriter::new(stdout());
    writeln!(&mut tw, "{}\t{}", "Files".dimmed(), v.files)?;
    writeln!(&mut tw, "{}\t{}", "Records".dimmed(), v.records)?;
    if let (Some(first), Some(last)) = (v.first, v.last) {
        writeln!(&mut tw, "{}\t{}..={}", "Range".dimmed(), first, last)?;
    }
    for g in &v.gaps {
        writeln!(
            &mut tw,
            "{}\t{}:{} expected {} got {}",
            "Gap".red(),
            g.file.display(),
            g.line,
            g.expected,
            g.got,
        )?;
    }
    for (file, line) in &v.unparsable {
        writeln!(
            &mut tw,
            "{}\t{}:{}",
            "Unparsable".red(),
            file.display(),
            line,
        )?;
    }
    let status = if v.is_contiguous() {
        "contiguous".green()
    } else {
        "broken".red()
    };
    writeln!(&mut tw, "{}\t{}", "Status".dimmed(), status)?;
    tw.flush()?;
    Ok(())
}
