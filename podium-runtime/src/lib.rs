//! Podium runtime: config bootstrap, ordered service startup with readiness
//! polling, fail-fast supervision, and the static asset server.

mod error;
pub mod paths;
pub mod readiness;
mod runtime;
pub mod service;
pub mod settings;
pub mod static_files;
pub mod supervisor;

pub use error::RuntimeError;
pub use readiness::{wait_ready, HttpProbe, Probe, Ready};
pub use runtime::{
    init_tracing, run, run_with, serve_static_blocking, shutdown_signal, start_blocking,
    wait_blocking,
};
pub use service::{ReadinessCheck, ServiceSpec};
pub use settings::{Mode, RuntimeSettings};
pub use static_files::{StaticError, StaticFile};
pub use supervisor::{Outcome, ProcessRef};
