// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test utilities for mdb tests.

use crate::{error::Error, Db};
use bmp_common::test::TestDir;
use slog::Logger;
use std::ops::Deref;

/// A database living in its own scratch directory. The directory is removed
/// on drop when the test succeeded and kept for debugging otherwise.
pub struct TestDb {
    // Declared before `dir` so the sled handle closes before the directory is
    // removed.
    db: Db,
    dir: TestDir,
}

impl TestDb {
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

impl Deref for TestDb {
    type Target = Db;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Get a unique test database for use in tests.
///
/// ```no_run
/// use bmp_common::log::discard_logger;
/// use mdb::test::get_test_db;
/// use mdb::Table;
///
/// let db = get_test_db("my_test", discard_logger()).expect("create db");
/// assert_eq!(db.count(Table::RouteMonitoring).unwrap(), 0);
/// ```
pub fn get_test_db(test_name: &str, log: Logger) -> Result<TestDb, Error> {
    let dir = TestDir::new(test_name)
        .map_err(|e| Error::DataStore(sled::Error::Io(e)))?;
    let path = dir.path().join("mdb");
    let db = Db::new(&path.to_string_lossy(), log)?;
    Ok(TestDb { db, dir })
}
