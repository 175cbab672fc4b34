// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Peer sessions and the registry that owns them.
//!
//! A [`PeerSession`] exists for every (device, peer) pair that has produced a
//! message since the device last connected. It owns the append handle of the
//! peer's current log file and the next sequence number to stamp on a record.
//!
//! Sessions live in [`SessionSlot`]s. The registry map is locked only long
//! enough to find or insert a slot, or to close a device's slots on
//! release; all file work happens under the slot's own mutex. That
//! serializes everything for one peer, including the one-time sequence
//! recovery, while leaving other peers free to proceed.

use crate::error::Error;
use crate::log::session_log;
use crate::record::{now_secs, LogRecord, PolicyMarker};
use crate::recovery::{recover_next_sequence, FIRST_SEQUENCE};
use crate::writer::LogWriter;
use bmp_common::lock;
use serde_json::Value;
use slog::Logger;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

const UNIT_REGISTRY: &str = "registry";

/// Extension of message log files.
pub const LOG_EXTENSION: &str = "msg";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerKey {
    /// Management address (or host name) of the monitored router.
    pub device: String,

    /// Address of the BGP peer being monitored on that router.
    pub peer: IpAddr,
}

impl PeerKey {
    pub fn new(device: impl Into<String>, peer: IpAddr) -> Self {
        Self {
            device: device.into(),
            peer,
        }
    }
}

impl Display for PeerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.peer)
    }
}

#[derive(Debug)]
pub struct PeerSession {
    pub key: PeerKey,
    next_sequence: u64,
    writer: LogWriter,
}

impl PeerSession {
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn log_path(&self) -> &Path {
        self.writer.path()
    }

    /// Stamp a record with the next sequence number and append it to the
    /// log. The sequence only advances once the line has been written.
    pub fn append(
        &mut self,
        type_code: u8,
        payload: Value,
        marker: PolicyMarker,
    ) -> Result<LogRecord, Error> {
        let next = self
            .next_sequence
            .checked_add(1)
            .ok_or_else(|| Error::SequenceExhausted(self.key.to_string()))?;
        let record = LogRecord {
            capture_time: now_secs(),
            sequence: self.next_sequence,
            type_code,
            payload,
            marker,
        };
        self.writer.append(&record)?;
        self.next_sequence = next;
        Ok(record)
    }
}

#[derive(Debug)]
pub enum SlotState {
    /// Registered but not opened yet, or the last open attempt failed.
    Vacant,

    Open(PeerSession),

    /// Released by a disconnect. A closed slot is no longer in the registry;
    /// anyone still holding it must look the key up again.
    Closed,
}

#[derive(Debug)]
pub struct SessionSlot {
    pub key: PeerKey,
    state: Mutex<SlotState>,
}

impl SessionSlot {
    fn new(key: PeerKey) -> Self {
        Self {
            key,
            state: Mutex::new(SlotState::Vacant),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*lock!(self.state), SlotState::Open(_))
    }

    /// Next sequence number of the session, if it is open.
    pub fn next_sequence(&self) -> Option<u64> {
        match &*lock!(self.state) {
            SlotState::Open(s) => Some(s.next_sequence()),
            _ => None,
        }
    }
}

pub struct SessionRegistry {
    /// Root of the log tree, `<root>/<device>/<peer>/<timestamp>.msg`.
    root: PathBuf,

    sessions: Mutex<BTreeMap<PeerKey, Arc<SessionSlot>>>,

    log: Logger,
}

impl SessionRegistry {
    pub fn new(root: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            root: root.into(),
            sessions: Mutex::new(BTreeMap::new()),
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn device_dir(&self, device: &str) -> Result<PathBuf, Error> {
        validate_device(device)?;
        Ok(self.root.join(device))
    }

    pub fn peer_dir(&self, key: &PeerKey) -> Result<PathBuf, Error> {
        Ok(self.device_dir(&key.device)?.join(key.peer.to_string()))
    }

    /// Make sure the directory for `device` exists.
    pub fn provision_device(&self, device: &str) -> Result<PathBuf, Error> {
        let dir = self.device_dir(device)?;
        create_dir(&dir)?;
        Ok(dir)
    }

    /// Get the session slot for `key`, opening its log if this is the first
    /// time the pair has been seen since it last connected.
    pub fn ensure_session(
        &self,
        key: &PeerKey,
    ) -> Result<Arc<SessionSlot>, Error> {
        loop {
            let slot = self.slot(key);
            let mut state = lock!(slot.state);
            match *state {
                SlotState::Open(_) => {}
                SlotState::Vacant => {
                    *state = SlotState::Open(self.open_session(key)?)
                }
                // released while we waited, try again with a fresh slot
                SlotState::Closed => continue,
            }
            drop(state);
            return Ok(slot);
        }
    }

    /// Run `f` with exclusive access to the open session for `key`.
    pub fn with_session<T>(
        &self,
        key: &PeerKey,
        f: impl FnOnce(&mut PeerSession) -> Result<T, Error>,
    ) -> Result<T, Error> {
        loop {
            let slot = self.ensure_session(key)?;
            let mut state = lock!(slot.state);
            if let SlotState::Open(session) = &mut *state {
                return f(session);
            }
        }
    }

    /// Close and forget every session belonging to `device`. Returns the
    /// keys of the sessions that were open.
    pub fn release_device(&self, device: &str) -> Vec<PeerKey> {
        // The map stays locked until every slot is closed, so no new session
        // for a released peer can open while an old one is still finishing.
        // Slot holders never take the map lock.
        let closed: Vec<(PeerKey, SlotState)> = {
            let mut sessions = lock!(self.sessions);
            let keys: Vec<PeerKey> = sessions
                .keys()
                .filter(|k| k.device == device)
                .cloned()
                .collect();
            keys.into_iter()
                .filter_map(|k| sessions.remove(&k))
                .map(|slot| {
                    // waits for any in-flight message on this peer
                    let mut state = lock!(slot.state);
                    let prev =
                        std::mem::replace(&mut *state, SlotState::Closed);
                    (slot.key.clone(), prev)
                })
                .collect()
        };

        let mut released = Vec::new();
        for (key, prev) in closed {
            if let SlotState::Open(session) = prev {
                session_log!(self.log, info, key,
                    "released session at sequence {}",
                    session.next_sequence();
                    "path" => session.log_path().display().to_string()
                );
                released.push(key);
            }
        }
        released
    }

    pub fn get(&self, key: &PeerKey) -> Option<Arc<SessionSlot>> {
        lock!(self.sessions).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<PeerKey> {
        lock!(self.sessions).keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock!(self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock!(self.sessions).is_empty()
    }

    fn slot(&self, key: &PeerKey) -> Arc<SessionSlot> {
        lock!(self.sessions)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(SessionSlot::new(key.clone())))
            .clone()
    }

    fn open_session(&self, key: &PeerKey) -> Result<PeerSession, Error> {
        let dir = self.peer_dir(key)?;
        let latest = match latest_log(&dir) {
            Ok(latest) => latest,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(source) => return Err(Error::Provision { path: dir, source }),
        };

        let (writer, next_sequence) = match latest {
            Some(path) => {
                let next = recover_next_sequence(&path, &self.log);
                (LogWriter::open(&path)?, next)
            }
            None => {
                create_dir(&dir)?;
                let path = dir.join(log_file_name(SystemTime::now()));
                (LogWriter::deferred(&path), FIRST_SEQUENCE)
            }
        };
        session_log!(self.log, info, key,
            "opened session log at sequence {}", next_sequence;
            "path" => writer.path().display().to_string()
        );
        Ok(PeerSession {
            key: key.clone(),
            next_sequence,
            writer,
        })
    }
}

/// Name of a log file opened at `t`: unix seconds with a fixed six digit
/// fraction, so that names sort in creation order.
pub fn log_file_name(t: SystemTime) -> String {
    let d = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:06}.{LOG_EXTENSION}", d.as_secs(), d.subsec_micros())
}

/// The lexicographically last log file in `dir`, if there is one. Files
/// without the log extension are ignored.
pub fn latest_log(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    Ok(log_files(dir)?.pop())
}

/// All log files in `dir`, sorted by name.
pub fn log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file()
            && path.extension().is_some_and(|e| e == LOG_EXTENSION)
        {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn create_dir(dir: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(dir).map_err(|source| Error::Provision {
        path: dir.to_owned(),
        source,
    })
}

fn validate_device(device: &str) -> Result<(), Error> {
    if device.is_empty()
        || device == "."
        || device == ".."
        || device.contains(['/', '\\', '\0'])
    {
        return Err(Error::InvalidDevice(device.to_owned()));
    }
    Ok(())
}
