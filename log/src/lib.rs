// Copyright 2021 The BMW Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging crate used with mthttpd. Logging is done at the standard 5
//! levels plus fatal, through the [`trace`], [`debug`], [`info`], [`warn`],
//! [`error`] and [`fatal`] macros. Each file sets its log level by calling
//! the level macro with no arguments (for instance `info!();`) before any
//! logging is done; logging below that level is suppressed. Lines are
//! prefixed with a local timestamp of the form `[YYYY-MM-DD HH:MM:SS]: `.
//! A log file with size and age based rotation may be configured through
//! the [`log_config`] macro; by default lines go to standard output only.
//! The macros return errors, so callers add error handling which can be as
//! simple as using the question mark operator.
//!
//! # Examples
//!
//! ```
//! use mthttpd_log::*;
//! use mthttpd_err::Error;
//!
//! debug!(); // each file must set the log level before calling the macro.
//!
//! fn test() -> Result<(), Error> {
//!     let value = 1;
//!     info!("This will be logged. Value: {}", value)?;
//!     Ok(())
//! }
//! ```

use mthttpd_deps::chrono;
use mthttpd_deps::colored;
use mthttpd_deps::lazy_static;
use mthttpd_deps::rand;

mod logger;
mod macros;

pub use crate::logger::{do_log, Log, LogConfig, RotationStatus};
pub use crate::logger::{DEBUG, ERROR, FATAL, INFO, TRACE, WARN};
pub use crate::macros::{DEFAULT_LOG_NAME, STATIC_LOG};

#[doc(hidden)]
pub use mthttpd_deps;
#[doc(hidden)]
pub use mthttpd_err;
