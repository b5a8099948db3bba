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

//! A logging library.

use crate::chrono::{DateTime, Local, Utc};
use crate::colored::Colorize;
use crate::rand::random;
use mthttpd_err::{Error, ErrorKind};
use std::fs::{canonicalize, metadata, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Trace level of logging. Should be used for very frequent logging that is only used to debug.
pub const TRACE: i32 = 0;
/// Debug level of logging. Should only be used for debugging information.
pub const DEBUG: i32 = 1;
/// Info level of logging. For displaying information that is generally useful to the user.
pub const INFO: i32 = 2;
/// Warn level of logging. Used to warn of a possible problem.
pub const WARN: i32 = 3;
/// Error level of logging. Used to indicate an error has occured that the user should know about.
pub const ERROR: i32 = 4;
/// Fatal level of logging. Used to indicate a fatal error has occured and that the program might
/// have halted.
pub const FATAL: i32 = 5;

const DISPLAY_ARRAY: [&str; 6] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "FATAL"];

/// The main logging object. Usually this is used through macros.
pub struct Log {
	log_impl: Option<LogImpl>,
}

/// The data that is held by the Log object.
struct LogImpl {
	file: Option<File>,
	cur_size: u64,
	last_rotation: Instant,
	config: LogConfig,
	has_rotated: bool,
}

/// Result of a [`Log::rotation_status`] function call.
#[derive(Debug, PartialEq)]
pub enum RotationStatus {
	/// A rotation is not needed.
	NotNeeded,
	/// A rotation is needed.
	Needed,
	/// A rotation has occurred automatically.
	AutoRotated,
}

/// Log Config object. Passed into the [`Log::init`] function. Also may be set via the
/// [`log_config`] macro.
#[derive(Debug, Clone)]
pub struct LogConfig {
	/// The path to the log file. By default, logging is only printed to standard output.
	/// This default behaviour is acheived by setting file_path to None.
	/// If you wish to log to a file, this parameter must be set to a valid path.
	pub file_path: Option<String>,
	/// The maximum size in bytes of the log file before a log rotation occurs. By default,
	/// this is set to 10485760 bytes (10 mb). After a log rotation, a new file named:
	/// <log_name>.r_<month>_<day>_<year>_<hour>-<minute>-<second>_<random_number>.log
	/// is created.
	pub max_size: u64,
	/// The maximum age in milliseconds before a log rotation occurs. By default, this is set to
	/// 3600000 ms (1 hour).
	pub max_age_millis: u128,
	/// The header (first line) of a log file. By default the header is not printed.
	pub file_header: String,
	/// Whether or not to show the timestamp. By default, this is set to true.
	pub show_timestamp: bool,
	/// Whether or not to print the log lines to standard output. Default is true.
	pub show_stdout: bool,
	/// delete the rotated log immidiately (only used for testing). Default is false.
	pub delete_rotation: bool,
	/// display the log level. Default is true.
	pub show_log_level: bool,
	/// automatically rotate the log file. Default is true.
	pub auto_rotate: bool,
}

/// Return a default logging object.
impl Default for LogConfig {
	fn default() -> Self {
		LogConfig {
			file_path: None,
			max_size: 1024 * 1024 * 10,     // 10 mb
			max_age_millis: 60 * 60 * 1000, // 1 hr
			file_header: "".to_string(),
			show_timestamp: true,
			show_stdout: true,
			delete_rotation: false,
			show_log_level: true,
			auto_rotate: true,
		}
	}
}

impl LogImpl {
	/// This function rotates logs
	pub fn rotate(&mut self) -> Result<(), Error> {
		// get date and create a custom rotation file name.
		let now: DateTime<Utc> = Utc::now();
		let rotation_string = now.format(".r_%m_%d_%Y_%T").to_string().replace(":", "-");
		let original_file_path = match &self.config.file_path {
			Some(file_path) => file_path,
			None => {
				// not logging to disk. No need to rotate
				return Ok(());
			}
		};
		let new_file_path = match original_file_path.rfind(".") {
			Some(pos) => &original_file_path[0..pos],
			_ => &original_file_path,
		};

		let new_file_path = format!(
			"{}{}_{}.log",
			new_file_path,
			rotation_string,
			random::<u64>(),
		);

		// if delete rotation is set (testing) the log rotation is deleted.
		if self.config.delete_rotation {
			std::fs::remove_file(&original_file_path)?;
		} else {
			std::fs::rename(&original_file_path, new_file_path.clone())?;
		}

		// open the original log file location which has been renamed and continue logging.
		self.file = Some(
			OpenOptions::new()
				.append(true)
				.create(true)
				.open(&original_file_path)?,
		);

		// we know it exists because we returned earlier if file_path is none.
		let mut file = self.file.as_ref().ok_or_else(|| {
			let error: Error =
				ErrorKind::InternalError("log file not open after rotation".to_string()).into();
			error
		})?;
		let line_bytes = self.config.file_header.as_bytes();
		if line_bytes.len() > 0 {
			file.write(line_bytes)?;
			file.write(&[10u8])?; // new line
			self.cur_size = line_bytes.len() as u64 + 1;
		} else {
			self.cur_size = 0;
		}
		self.last_rotation = Instant::now();

		Ok(())
	}

	/// Get the [`RotationStatus`] of the log.
	pub fn rotation_status(&mut self) -> Result<RotationStatus, Error> {
		let instant_now = Instant::now();
		if self.file.is_some()
			&& (self.cur_size >= self.config.max_size
				|| instant_now.duration_since(self.last_rotation).as_millis()
					> self.config.max_age_millis)
		{
			self.has_rotated = false;
			Ok(RotationStatus::Needed)
		} else if self.has_rotated {
			self.has_rotated = false;
			Ok(RotationStatus::AutoRotated)
		} else {
			Ok(RotationStatus::NotNeeded)
		}
	}

	/// The actual logging function, handles rotation if needed
	pub fn log(&mut self, line: &str, level: i32) -> Result<(), Error> {
		// get current time
		let instant_now = Instant::now();
		let time_since_rotation = instant_now.duration_since(self.last_rotation).as_millis();

		// check if rotation is needed
		if self.config.auto_rotate
			&& self.file.is_some()
			&& (self.cur_size >= self.config.max_size
				|| time_since_rotation > self.config.max_age_millis)
		{
			self.has_rotated = true;
			self.rotate()?;
		}

		let line_bytes = line.as_bytes(); // get line as bytes
		self.cur_size += line_bytes.len() as u64 + 1; // increment cur_size
		if self.config.show_timestamp {
			// timestamp is an additional 23 bytes
			self.cur_size += 23;
		}

		let show_level = self.config.show_log_level && level >= 0 && level <= FATAL;
		if show_level {
			self.cur_size += DISPLAY_ARRAY[level as usize].len() as u64 + 3;
		}

		// if we're showing the timestamp, print it
		if self.config.show_timestamp {
			let date = Local::now();
			let formatted_ts = date.format("%Y-%m-%d %H:%M:%S");
			if self.file.is_some() {
				match self.file.as_ref() {
					Some(mut file) => {
						file.write(format!("[{}]: ", formatted_ts).as_bytes())?;
					}
					None => {}
				}
			}
			if self.config.show_stdout {
				print!("[{}]: ", formatted_ts);
			}
		}

		if show_level {
			let display_level = DISPLAY_ARRAY[level as usize];
			if self.file.is_some() {
				match self.file.as_ref() {
					Some(mut file) => {
						file.write(format!("({}) ", display_level).as_bytes())?;
					}
					None => {}
				}
			}
			if self.config.show_stdout {
				// color the level on the terminal only
				let colored_level = match level {
					WARN => display_level.yellow(),
					ERROR | FATAL => display_level.red(),
					_ => display_level.normal(),
				};
				print!("({}) ", colored_level);
			}
		}

		// finally log the line followed by a newline.
		if self.file.is_some() {
			match self.file.as_ref() {
				Some(mut file) => {
					file.write(line_bytes)?;
					file.write(&[10u8])?; // newline
				}
				None => {}
			}
		}

		// if stdout is specified log to stdout too
		if self.config.show_stdout {
			println!("{}", line);
		}

		Ok(())
	}
}

impl Log {
	/// create a new Log object
	pub fn new() -> Log {
		Log { log_impl: None }
	}

	/// Check if the log is configured
	pub fn is_configured(&self) -> bool {
		self.log_impl.is_some()
	}

	pub fn get_config(&self) -> Result<LogConfig, Error> {
		match &self.log_impl {
			Some(log_impl) => Ok(log_impl.config.clone()),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Initialize the log file with the parameters in [`LogConfig`].
	pub fn init(&mut self, mut config: LogConfig) -> Result<(), Error> {
		if self.is_configured() {
			return Err(
				ErrorKind::LogConfigurationError("Log already configured".to_string()).into(),
			);
		}

		let has_rotated = false;

		let file = match config.file_path.clone() {
			Some(file_path) => Some(
				OpenOptions::new()
					.append(true)
					.create(true)
					.open(file_path)?,
			),
			None => None,
		};

		config.file_path = match config.file_path {
			Some(file_path) => Some(
				canonicalize(PathBuf::from(file_path))?
					.into_os_string()
					.into_string()?,
			),
			None => None,
		};

		// get current size of the file
		let mut cur_size = match config.file_path.clone() {
			Some(file_path) => metadata(file_path)?.len(),
			None => 0,
		};

		let file_header = config.file_header.to_string();
		if cur_size == 0 && config.file_path.is_some() {
			// add the header if the file is new
			let line_bytes = file_header.as_bytes();
			if line_bytes.len() > 0 {
				match file.as_ref() {
					Some(mut file) => {
						file.write(line_bytes)?;
						file.write(&[10u8])?; // new line
					}
					None => {}
				}
				cur_size = file_header.len() as u64 + 1;
			}
		}

		let last_rotation = Instant::now();

		self.log_impl = Some(LogImpl {
			config,
			file,
			cur_size,
			last_rotation,
			has_rotated,
		});

		Ok(())
	}

	/// Rotate the log
	pub fn rotate(&mut self) -> Result<(), Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => log_impl.rotate(),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Check if a rotation is needed
	pub fn rotation_status(&mut self) -> Result<RotationStatus, Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => log_impl.rotation_status(),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Entry point for logging
	pub fn log(&mut self, level: i32, line: &str) -> Result<(), Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => {
				log_impl.log(line, level)?;
				Ok(())
			}
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Change the show_log_level setting to the show value.
	pub fn update_show_log_level(&mut self, show: bool) -> Result<(), Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => {
				log_impl.config.show_log_level = show;
				Ok(())
			}
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Get the show_log_level setting value.
	pub fn get_show_log_level(&mut self) -> Result<bool, Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => Ok(log_impl.config.show_log_level),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Change the show_timestamp setting to the show value.
	pub fn update_show_timestamp(&mut self, show: bool) -> Result<(), Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => {
				log_impl.config.show_timestamp = show;
				Ok(())
			}
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Get the show_timestamp setting value.
	pub fn get_show_timestamp(&mut self) -> Result<bool, Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => Ok(log_impl.config.show_timestamp),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Change the show_stdout setting to the show value.
	pub fn update_show_stdout(&mut self, show: bool) -> Result<(), Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => {
				log_impl.config.show_stdout = show;
				Ok(())
			}
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}

	/// Get the show_stdout setting value.
	pub fn get_show_stdout(&mut self) -> Result<bool, Error> {
		match self.log_impl.as_mut() {
			Some(log_impl) => Ok(log_impl.config.show_stdout),
			None => Err(ErrorKind::LogConfigurationError("log_impl None".to_string()).into()),
		}
	}
}

// helper function for macros
pub fn do_log(
	log: &mut Log,
	level: i32,
	show_ts: bool,
	line: &str,
	config_level: i32,
) -> Result<(), Error> {
	if !log.is_configured() {
		log.init(LogConfig::default())?;
	}

	let cur_show_log_level = log.get_show_log_level()?;
	let cur_show_timestamp = log.get_show_timestamp()?;

	if show_ts == false {
		log.update_show_timestamp(show_ts)?;
		log.update_show_log_level(show_ts)?;
	}

	if level >= config_level {
		log.log(level, line)?;
	}

	log.update_show_log_level(cur_show_log_level)?;
	log.update_show_timestamp(cur_show_timestamp)?;

	Ok(())
}
