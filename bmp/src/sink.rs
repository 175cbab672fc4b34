// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::SinkError;
use mdb::StructuredRecord;

/// Destination for structured records.
///
/// The collector calls `insert` once per recorded message, after the
/// message has been written to the peer's log. Implementations are shared
/// by every peer and may be called concurrently.
pub trait PersistenceSink: Send + Sync {
    fn insert(&self, record: &StructuredRecord) -> Result<(), SinkError>;
}

impl PersistenceSink for mdb::Db {
    fn insert(&self, record: &StructuredRecord) -> Result<(), SinkError> {
        mdb::Db::insert(self, record)?;
        Ok(())
    }
}

impl<S: PersistenceSink + ?Sized> PersistenceSink for std::sync::Arc<S> {
    fn insert(&self, record: &StructuredRecord) -> Result<(), SinkError> {
        (**self).insert(record)
    }
}
