// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Helper connection macros
//!
//! Components keep their ports in a `RefCell<Option<>>` so that `run` can
//! take ownership of them. A component exposes a `connect_port_<name>`
//! method for each output and a `port_<name>` method for each input, which
//! is what [`connect_port!`](crate::connect_port) relies on.

pub use paste::paste;

#[macro_export]
/// Connect an [OutPort](sluice_engine::channel::OutPort) of one component to
/// an [InPort](sluice_engine::channel::InPort) of another.
///
/// Evaluates to a `SimResult`.
macro_rules! connect_port {
    ($from:expr, $from_port_name:ident => $to:expr, $to_port_name:ident) => {{
        sluice_track::debug!($from.entity ; "Connect {}.{} => {}.{}",
            $from, stringify!($from_port_name), $to, stringify!($to_port_name));
        $crate::connect::paste! {
            $from.[< connect_port_ $from_port_name >]($to.[< port_ $to_port_name >]())
        }
    }};
}

#[macro_export]
/// Connect a tx port stored in a `RefCell<Option<>>`.
macro_rules! connect_tx {
    ($port:expr, $fn:ident ; $port_state:expr) => {
        match $port.borrow_mut().as_mut() {
            Some(port) => port.$fn($port_state),
            None => sluice_engine::sim_error!(format!("{} already taken", stringify!($port))),
        }
    };
}

#[macro_export]
/// Access an rx port stored in a `RefCell<Option<>>`.
macro_rules! port_rx {
    ($port:expr, $fn:ident) => {
        match $port.borrow().as_ref() {
            Some(port) => port.$fn(),
            None => sluice_engine::sim_error!(format!("{} already taken", stringify!($port))),
        }
    };
}

#[macro_export]
/// Take a port out of a `RefCell<Option<>>`, returning an error from the
/// enclosing function if it has already been taken.
macro_rules! take_option {
    ($var:expr) => {
        match $var.borrow_mut().take() {
            Some(value) => value,
            None => {
                return sluice_engine::sim_error!(format!("{} already taken", stringify!($var)));
            }
        }
    };
}
