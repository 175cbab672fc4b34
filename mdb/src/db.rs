// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The monitoring database (mdb).
//!
//! Structured BMP records are kept in a sled key-value store with one tree
//! per [`Table`]. Keys are ids handed out by sled's monotonic id generator,
//! stored big-endian so that a tree iterates in insertion order. Values are
//! the JSON form of the record. Every insert is flushed before returning.
use crate::error::Error;
use crate::log::mdb_log;
use crate::types::{StructuredRecord, Table};
use slog::Logger;

#[derive(Clone)]
pub struct Db {
    /// A sled database handle where records are stored.
    persistent: sled::Db,

    log: Logger,
}

impl Db {
    /// Open (or create) a monitoring database stored at `path`.
    pub fn new(path: &str, log: Logger) -> Result<Self, Error> {
        Ok(Self {
            persistent: sled::open(path)?,
            log,
        })
    }

    /// Store a record in its table, returning the id it was stored under.
    pub fn insert(&self, record: &StructuredRecord) -> Result<u64, Error> {
        let table = record.table();
        let tree = self.persistent.open_tree(table.name())?;
        let id = self.persistent.generate_id()?;
        let value = record.to_json()?;
        tree.insert(id.to_be_bytes(), value.as_bytes())?;
        tree.flush()?;
        mdb_log!(self, trace, table, "inserted record {id}";
            "peer" => &record.peer().peer_address,
            "device" => &record.origin().device_ip
        );
        Ok(id)
    }

    /// All records of a table in insertion order. Entries that fail to
    /// decode are logged and skipped.
    pub fn records(
        &self,
        table: Table,
    ) -> Result<Vec<(u64, StructuredRecord)>, Error> {
        let tree = self.persistent.open_tree(table.name())?;
        let result = tree
            .iter()
            .filter_map(|item| {
                let (key, value) = match item {
                    Ok(item) => item,
                    Err(e) => {
                        mdb_log!(self, error, table,
                            "error fetching record: {e}";
                            "error" => format!("{e}")
                        );
                        return None;
                    }
                };
                let id = match db_key(&key) {
                    Ok(id) => id,
                    Err(e) => {
                        mdb_log!(self, error, table,
                            "error parsing record key: {e}";
                            "error" => format!("{e}")
                        );
                        return None;
                    }
                };
                let value = String::from_utf8_lossy(&value);
                match StructuredRecord::from_json(table, &value) {
                    Ok(record) => Some((id, record)),
                    Err(e) => {
                        mdb_log!(self, error, table,
                            "error parsing record {id}: {e}";
                            "error" => format!("{e}")
                        );
                        None
                    }
                }
            })
            .collect();
        Ok(result)
    }

    /// Number of records stored in a table.
    pub fn count(&self, table: Table) -> Result<usize, Error> {
        Ok(self.persistent.open_tree(table.name())?.len())
    }
}

fn db_key(key: &[u8]) -> Result<u64, Error> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| Error::DbKey(format!("bad key length {}", key.len())))?;
    Ok(u64::from_be_bytes(bytes))
}
