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

use crate::lazy_static::lazy_static;
use crate::Log;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The name of the default logger used by the logging macros.
pub const DEFAULT_LOG_NAME: &str = "default";

lazy_static! {
		/// This is the static holder of all log objects. Generally this
		/// should not be called directly. See [`log`] instead.
		pub static ref STATIC_LOG: Arc<RwLock<HashMap<String, Log>>> = Arc::new(RwLock::new(HashMap::new()));
}

/// Log at the 'fatal' (5) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`trace`], [`debug`], [`info`], [`warn`], or [`error`].
/// # Examples
/// ```
/// use mthttpd_log::*;
/// use mthttpd_err::Error;
///
/// fatal!(); // set log level to fatal "5"
///
/// fn show(abc: u64) -> Result<(), Error> {
///     fatal!("my value = {}", abc)?;
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! fatal {
	() => {
		mthttpd_log::do_log!(mthttpd_log::FATAL);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::FATAL, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::FATAL, $a, $($b)*)
	};
}

/// Just like [`fatal`], but with no timestamp.
#[macro_export]
macro_rules! fatal_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::FATAL, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::FATAL, $a, $($b)*)
	};
}

/// Log at the 'error' (4) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`trace`], [`debug`], [`info`], [`warn`], or [`fatal`].
#[macro_export]
macro_rules! error {
	() => {
		mthttpd_log::do_log!(mthttpd_log::ERROR);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::ERROR, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::ERROR, $a, $($b)*)
	};
}

/// Just like [`error`], but with no timestamp.
#[macro_export]
macro_rules! error_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::ERROR, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::ERROR, $a, $($b)*)
	};
}

/// Log at the 'warn' (3) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`trace`], [`debug`], [`info`], [`error`], or [`fatal`].
#[macro_export]
macro_rules! warn {
	() => {
		mthttpd_log::do_log!(mthttpd_log::WARN);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::WARN, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::WARN, $a, $($b)*)
	};
}

/// Just like [`warn`], but with no timestamp.
#[macro_export]
macro_rules! warn_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::WARN, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::WARN, $a, $($b)*)
	};
}

/// Log at the 'info' (2) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`trace`], [`debug`], [`warn`], [`error`], or [`fatal`].
/// # Examples
/// ```
/// use mthttpd_log::*;
/// use mthttpd_err::Error;
///
/// info!(); // set log level to info "2"
///
/// fn show(abc: u64) -> Result<(), Error> {
///     info!("my value = {}", abc)?;
///     info!("hi")?;
///
///     // The output will look like this:
///     // [2022-08-09 19:41:37]: (INFO) my value = 123
///     // [2022-08-09 19:41:37]: (INFO) hi
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! info {
	() => {
		mthttpd_log::do_log!(mthttpd_log::INFO);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::INFO, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::INFO, $a, $($b)*)
	};
}

/// Just like [`info`], but with no timestamp.
#[macro_export]
macro_rules! info_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::INFO, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::INFO, $a, $($b)*)
	};
}

/// Log at the 'debug' (1) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`trace`], [`info`], [`warn`], [`error`], or [`fatal`].
#[macro_export]
macro_rules! debug {
	() => {
		mthttpd_log::do_log!(mthttpd_log::DEBUG);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::DEBUG, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::DEBUG, $a, $($b)*)
	};
}

/// Just like [`debug`], but with no timestamp.
#[macro_export]
macro_rules! debug_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::DEBUG, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::DEBUG, $a, $($b)*)
	};
}

/// Log at the 'trace' (0) log level. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. It is used like the println/format macros. Calling the macro
/// with no arguments sets the log level of the current scope instead.
/// Also see [`debug`], [`info`], [`warn`], [`error`], or [`fatal`].
#[macro_export]
macro_rules! trace {
	() => {
		mthttpd_log::do_log!(mthttpd_log::TRACE);
	};
	($a:expr) => {
		mthttpd_log::log!(mthttpd_log::TRACE, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log!(mthttpd_log::TRACE, $a, $($b)*)
	};
}

/// Just like [`trace`], but with no timestamp.
#[macro_export]
macro_rules! trace_no_ts {
	($a:expr) => {
		mthttpd_log::log_no_ts!(mthttpd_log::TRACE, $a)
	};
	($a:expr,$($b:tt)*)=>{
		mthttpd_log::log_no_ts!(mthttpd_log::TRACE, $a, $($b)*)
	};
}

/// The main logging macro. This macro calls the default logger. To configure this
/// logger, see [`log_config`]. The first parameter is the log level. To avoid specifying
/// level, see [`trace`], [`debug`], [`info`], [`warn`], [`error`], or [`fatal`].
#[macro_export]
macro_rules! log {
	($level:expr, $a:expr)=>{
		{
			let static_log = &mthttpd_log::STATIC_LOG;
			match static_log.write() {
				Ok(mut log_map) => {
					match log_map.get_mut(&mthttpd_log::DEFAULT_LOG_NAME.to_string()) {
						Some(log) => {
							mthttpd_log::do_log(log, $level, true, &format!($a), LOG_LEVEL)
						}
						None => {
							let mut log = mthttpd_log::Log::new();
							let res =
								mthttpd_log::do_log(&mut log, $level, true, &format!($a), LOG_LEVEL);
							log_map.insert(mthttpd_log::DEFAULT_LOG_NAME.to_string(), log);
							res
						}
					}
				}
				Err(e) => Err(mthttpd_err::ErrorKind::PoisonError(format!(
					"log generated poison error: {}",
					e
				))
				.into()),
			}
		}
	};
	($level:expr, $a:expr,$($b:tt)*)=>{
		{
			let static_log = &mthttpd_log::STATIC_LOG;
			match static_log.write() {
				Ok(mut log_map) => {
					match log_map.get_mut(&mthttpd_log::DEFAULT_LOG_NAME.to_string()) {
						Some(log) => {
							mthttpd_log::do_log(log, $level, true, &format!($a, $($b)*), LOG_LEVEL)
						}
						None => {
							let mut log = mthttpd_log::Log::new();
							let res = mthttpd_log::do_log(
								&mut log,
								$level,
								true,
								&format!($a, $($b)*),
								LOG_LEVEL,
							);
							log_map.insert(mthttpd_log::DEFAULT_LOG_NAME.to_string(), log);
							res
						}
					}
				}
				Err(e) => Err(mthttpd_err::ErrorKind::PoisonError(format!(
					"log generated poison error: {}",
					e
				))
				.into()),
			}
		}
	};
}

/// Log using the default logger and don't print a timestamp or level. See [`log`] for
/// more details on logging.
#[macro_export]
macro_rules! log_no_ts {
	($level:expr, $a:expr)=>{
		{
			let static_log = &mthttpd_log::STATIC_LOG;
			match static_log.write() {
				Ok(mut log_map) => {
					match log_map.get_mut(&mthttpd_log::DEFAULT_LOG_NAME.to_string()) {
						Some(log) => {
							mthttpd_log::do_log(log, $level, false, &format!($a), LOG_LEVEL)
						}
						None => {
							let mut log = mthttpd_log::Log::new();
							let res =
								mthttpd_log::do_log(&mut log, $level, false, &format!($a), LOG_LEVEL);
							log_map.insert(mthttpd_log::DEFAULT_LOG_NAME.to_string(), log);
							res
						}
					}
				}
				Err(e) => Err(mthttpd_err::ErrorKind::PoisonError(format!(
					"log generated poison error: {}",
					e
				))
				.into()),
			}
		}
	};
	($level:expr, $a:expr,$($b:tt)*)=>{
		{
			let static_log = &mthttpd_log::STATIC_LOG;
			match static_log.write() {
				Ok(mut log_map) => {
					match log_map.get_mut(&mthttpd_log::DEFAULT_LOG_NAME.to_string()) {
						Some(log) => {
							mthttpd_log::do_log(log, $level, false, &format!($a, $($b)*), LOG_LEVEL)
						}
						None => {
							let mut log = mthttpd_log::Log::new();
							let res = mthttpd_log::do_log(
								&mut log,
								$level,
								false,
								&format!($a, $($b)*),
								LOG_LEVEL,
							);
							log_map.insert(mthttpd_log::DEFAULT_LOG_NAME.to_string(), log);
							res
						}
					}
				}
				Err(e) => Err(mthttpd_err::ErrorKind::PoisonError(format!(
					"log generated poison error: {}",
					e
				))
				.into()),
			}
		}
	};
}

/// Generally, this macro should not be used directly. It is used by the other macros.
/// The single argument form declares the log level for the current scope.
#[macro_export]
macro_rules! do_log {
	($level:expr) => {
		const LOG_LEVEL: i32 = $level;
	};
}

/// This macro may be used to configure logging. If it is not called, the default LogConfig
/// is used. By default logging is only done to stdout.
/// A sample log_config! call might look something like this:
///
/// ```
/// use mthttpd_log::*;
///
/// info!();
///
/// fn configure() {
///     log_config!(mthttpd_log::LogConfig {
///         max_age_millis: 10000, // set log rotations to every 10 seconds
///         max_size: 10000, // set log rotations to every 10,000 bytes
///         ..Default::default()
///     }).expect("failed to configure log");
/// }
/// ```
/// For full details on all parameters of LogConfig see [`LogConfig`].
#[macro_export]
macro_rules! log_config {
	($a:expr) => {{
		let static_log = &mthttpd_log::STATIC_LOG;
		match static_log.write() {
			Ok(mut log_map) => {
				match log_map.get_mut(&mthttpd_log::DEFAULT_LOG_NAME.to_string()) {
					Some(log) => log.init($a),
					None => {
						let mut log = mthttpd_log::Log::new();
						let ret = log.init($a);
						log_map.insert(mthttpd_log::DEFAULT_LOG_NAME.to_string(), log);
						ret
					}
				}
			}
			Err(e) => Err(mthttpd_err::ErrorKind::PoisonError(format!(
				"log generated poison error: {}",
				e
			))
			.into()),
		}
	}};
}
