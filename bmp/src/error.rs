// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::messages::MessageType;
use num_enum::TryFromPrimitiveError;
use std::fmt::Display;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to provision {path}: {source}")]
    Provision {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("log record serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid message type {0}")]
    InvalidMessageType(u8),

    #[error("message type mismatch: {0}")]
    MessageTypeMismatch(ExpectationMismatch<MessageType>),

    #[error("invalid device identifier {0:?}")]
    InvalidDevice(String),

    #[error("message has no peer header")]
    NoPeerHeader,

    #[error("sequence numbers exhausted for {0}")]
    SequenceExhausted(String),

    #[error("persistence sink: {0}")]
    Sink(#[from] SinkError),
}

impl From<TryFromPrimitiveError<MessageType>> for Error {
    fn from(e: TryFromPrimitiveError<MessageType>) -> Self {
        Error::InvalidMessageType(e.number)
    }
}

#[derive(Debug)]
pub struct ExpectationMismatch<T: Display> {
    pub expected: T,
    pub got: T,
}

impl<T: Display> Display for ExpectationMismatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected: {} got: {}", self.expected, self.got)
    }
}

/// Failure reported by a persistence sink.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("datastore error: {0}")]
    Datastore(#[from] mdb::error::Error),

    #[error("record rejected: {0}")]
    Rejected(String),
}
