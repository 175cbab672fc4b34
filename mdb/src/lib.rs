// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod db;
pub mod error;
pub mod log;
pub mod types;

pub use db::Db;
pub use types::*;

pub const COMPONENT_MDB: &str = "mdb";
pub const MOD_DB: &str = "database";

/// Test utilities for creating unique test databases
pub mod test;
