// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The collector entry points called by the connection layer.

use crate::config::CollectorConfig;
use crate::error::{Error, ExpectationMismatch};
use crate::log::collector_log;
use crate::mapper::{map_message, Mapped};
use crate::messages::{Message, MessageType};
use crate::session::{PeerKey, SessionRegistry};
use crate::sink::PersistenceSink;
use slog::Logger;
use std::path::PathBuf;

const UNIT_COLLECTOR: &str = "collector";

/// What happened to a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The message type is not recorded.
    Ignored,

    /// Logged under `sequence` and handed to the persistence sink.
    Recorded { sequence: u64 },
}

pub struct Collector<S: PersistenceSink> {
    config: CollectorConfig,
    registry: SessionRegistry,
    sink: S,
    log: Logger,
}

impl<S: PersistenceSink> Collector<S> {
    /// Create a collector, provisioning the log root. An error here means
    /// there is nowhere to write logs and the process should not continue.
    pub fn new(
        config: CollectorConfig,
        sink: S,
        log: Logger,
    ) -> Result<Self, Error> {
        let root = &config.write_dir;
        if !root.exists() {
            std::fs::create_dir_all(root).map_err(|source| {
                Error::Provision {
                    path: root.clone(),
                    source,
                }
            })?;
            slog::info!(log, "created message output path {}", root.display();
                "component" => crate::COMPONENT_BMP,
                "module" => crate::MOD_COLLECTOR,
                "unit" => UNIT_COLLECTOR
            );
        }
        slog::info!(log, "collector started";
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_COLLECTOR,
            "unit" => UNIT_COLLECTOR,
            "write_dir" => root.display().to_string(),
            "write_msg_max_size" => config.write_msg_max_size
        );

        Ok(Self {
            registry: SessionRegistry::new(root.clone(), log.clone()),
            config,
            sink,
            log,
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Make sure the device directory exists. Failures are logged and
    /// returned; they never take down the process.
    pub fn on_connection_made(
        &self,
        device: &str,
        port: u16,
    ) -> Result<PathBuf, Error> {
        match self.registry.provision_device(device) {
            Ok(dir) => {
                collector_log!(self, info, device, "connection made";
                    "port" => port,
                    "path" => dir.display().to_string()
                );
                Ok(dir)
            }
            Err(e) => {
                collector_log!(self, error, device,
                    "failed to provision device directory: {}", e;
                    "port" => port
                );
                Err(e)
            }
        }
    }

    /// Release every session of `device`. Log files stay where they are.
    pub fn on_connection_lost(&self, device: &str, port: u16) {
        let released = self.registry.release_device(device);
        collector_log!(self, info, device, "connection lost";
            "port" => port,
            "released_sessions" => released.len()
        );
    }

    pub fn on_message_received(
        &self,
        device: &str,
        port: u16,
        msg: &Message,
        type_code: u8,
    ) -> Result<Disposition, Error> {
        let typ = MessageType::try_from(type_code)?;
        // unrecorded types are dropped on the code alone
        if !typ.is_recorded() {
            collector_log!(self, trace, device, "ignoring {} message", typ;
                "port" => port
            );
            return Ok(Disposition::Ignored);
        }
        let got = MessageType::from(msg);
        if typ != got {
            return Err(Error::MessageTypeMismatch(ExpectationMismatch {
                expected: typ,
                got,
            }));
        }

        let header = msg.peer_header().ok_or(Error::NoPeerHeader)?;
        let key = PeerKey::new(device, header.address);
        let Mapped { entry, record } = match map_message(device, msg)? {
            Some(mapped) => mapped,
            None => return Ok(Disposition::Ignored),
        };

        // Append and persist under the session lock so one peer's
        // messages reach the sink in sequence order.
        let sequence = self.registry.with_session(&key, |session| {
            let logged =
                session.append(entry.type_code, entry.payload, entry.marker)?;
            if let Err(e) = self.sink.insert(&record) {
                collector_log!(self, error, device,
                    "failed to persist {} record {}: {}",
                    record.table(), logged.sequence, e;
                    "peer" => key.peer.to_string()
                );
                return Err(e.into());
            }
            Ok(logged.sequence)
        });

        match sequence {
            Ok(sequence) => {
                collector_log!(self, trace, device, "recorded {} message", typ;
                    "peer" => key.peer.to_string(),
                    "sequence" => sequence
                );
                Ok(Disposition::Recorded { sequence })
            }
            Err(e) => {
                if !matches!(e, Error::Sink(_)) {
                    collector_log!(self, error, device,
                        "failed to record {} message: {}", typ, e;
                        "peer" => key.peer.to_string()
                    );
                }
                Err(e)
            }
        }
    }
}
