// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Log from the collector, tagging the device a callback came from.
macro_rules! collector_log {
    ($self:expr, $level:ident, $device:expr, $msg:expr; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_COLLECTOR,
            "unit" => UNIT_COLLECTOR,
            "device" => $device,
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $device:expr, $msg:expr, $($args:expr),*; $($key:expr => $value:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_COLLECTOR,
            "unit" => UNIT_COLLECTOR,
            "device" => $device,
            $($key => $value),*
        )
    };
    ($self:expr, $level:ident, $device:expr, $msg:expr) => {
        slog::$level!($self.log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_COLLECTOR,
            "unit" => UNIT_COLLECTOR,
            "device" => $device
        )
    };
    ($self:expr, $level:ident, $device:expr, $msg:expr, $($args:expr),*) => {
        slog::$level!($self.log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_COLLECTOR,
            "unit" => UNIT_COLLECTOR,
            "device" => $device
        )
    };
}

/// Log from the session registry, tagging the (device, peer) key.
macro_rules! session_log {
    ($log:expr, $level:ident, $key:expr, $msg:expr; $($k:expr => $v:expr),*) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_REGISTRY,
            "device" => $key.device.as_str(),
            "peer" => $key.peer.to_string(),
            $($k => $v),*
        )
    };
    ($log:expr, $level:ident, $key:expr, $msg:expr, $($args:expr),*; $($k:expr => $v:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_REGISTRY,
            "device" => $key.device.as_str(),
            "peer" => $key.peer.to_string(),
            $($k => $v),*
        )
    };
    ($log:expr, $level:ident, $key:expr, $msg:expr) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_REGISTRY,
            "device" => $key.device.as_str(),
            "peer" => $key.peer.to_string()
        )
    };
    ($log:expr, $level:ident, $key:expr, $msg:expr, $($args:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_REGISTRY,
            "device" => $key.device.as_str(),
            "peer" => $key.peer.to_string()
        )
    };
}

// recovery runs outside of any session, so it only has a path to go on
macro_rules! recovery_log {
    ($log:expr, $level:ident, $path:expr, $msg:expr; $($k:expr => $v:expr),*) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_RECOVERY,
            "path" => $path.display().to_string(),
            $($k => $v),*
        )
    };
    ($log:expr, $level:ident, $path:expr, $msg:expr, $($args:expr),*; $($k:expr => $v:expr),*) => {
        slog::$level!($log,
            $msg, $($args),*;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_RECOVERY,
            "path" => $path.display().to_string(),
            $($k => $v),*
        )
    };
    ($log:expr, $level:ident, $path:expr, $msg:expr) => {
        slog::$level!($log,
            $msg;
            "component" => crate::COMPONENT_BMP,
            "module" => crate::MOD_SESSION,
            "unit" => UNIT_RECOVERY,
            "path" => $path.display().to_string()
        )
    };
}

pub(crate) use {collector_log, recovery_log, session_log};
