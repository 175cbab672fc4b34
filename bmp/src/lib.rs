// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod collector;
pub mod config;
pub mod error;
pub mod log;
pub mod mapper;
pub mod messages;
pub mod record;
pub mod recovery;
pub mod session;
pub mod sink;
pub mod writer;

#[cfg(test)]
mod proptest;


pub use collector::{Collector, Disposition};
pub use config::CollectorConfig;
pub use sink::PersistenceSink;

pub const COMPONENT_BMP: &str = "bmp";
pub const MOD_COLLECTOR: &str = "collector";
pub const MOD_SESSION: &str = "session";
