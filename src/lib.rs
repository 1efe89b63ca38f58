pub mod config;
pub mod dedup;
pub mod doe;
pub mod error;
pub mod io;
pub mod profiler;
pub mod stats;

pub use error::{DoeError, ErrorKind, Result};

#[cfg(feature = "profiling")]
use once_cell::sync::Lazy;
#[cfg(feature = "profiling")]
use parking_lot::Mutex;

#[cfg(feature = "profiling")]
pub static PROFILER: Lazy<Mutex<profiler::Profiler>> =
    Lazy::new(|| Mutex::new(profiler::Profiler::new()));
