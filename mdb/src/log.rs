// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Log a database event against a specific table.
macro_rules! mdb_log {
    ($self:expr, $level:ident, $table:expr, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_MDB,
            "module" => crate::MOD_DB,
            "table" => $table.name(),
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $table:expr, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_MDB,
            "module" => crate::MOD_DB,
            "table" => $table.name(),
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $table:expr, $msg:expr) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_MDB,
            "module" => crate::MOD_DB,
            "table" => $table.name()
        )
    };
    ($self:expr, $level:ident, $table:expr, $msg:expr, $($args:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_MDB,
            "module" => crate::MOD_DB,
            "table" => $table.name()
        )
    };
}

pub(crate) use mdb_log;
