// Copyright (c) 2022, 37 Miners, LLC
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

use crate::failure::{Backtrace, Context, Fail};
#[cfg(unix)]
use crate::nix::errno::Errno;
use std::ffi::OsString;
use std::fmt;
use std::fmt::Display;
use std::net::AddrParseError;
use std::num::ParseIntError;
use std::str::Utf8Error;
use std::string::FromUtf8Error;
use std::time::SystemTimeError;

/// Base Error struct which is used throughout this crate and other crates
#[derive(Debug, Fail)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Kinds of errors that can occur
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// Application Error
	#[fail(display = "Application Error: {}", _0)]
	ApplicationError(String),
	/// IOError Error
	#[fail(display = "IOError Error: {}", _0)]
	IOError(String),
	/// Internal Error
	#[fail(display = "Internal Error: {}", _0)]
	InternalError(String),
	/// Setup Error
	#[fail(display = "Setup Error: {}", _0)]
	SetupError(String),
	/// WorkerPoolConfigurationError
	#[fail(display = "Worker pool configuration Error: {}", _0)]
	WorkerPoolConfigurationError(String),
	/// Log not configured
	#[fail(display = "Log configuration Error: {}", _0)]
	LogConfigurationError(String),
	/// OsString error
	#[fail(display = "OsString Error: {}", _0)]
	OsStringError(String),
	/// Poison error multiple locks
	#[fail(display = "Poison Error: {}", _0)]
	PoisonError(String),
	/// Capacity of a bounded structure exceeded
	#[fail(display = "CapacityExceeded: {}", _0)]
	CapacityExceeded(String),
	/// Array Index out of bounds
	#[fail(display = "ArrayIndexOutofBounds: {}", _0)]
	ArrayIndexOutofBounds(String),
	/// ParseIntError
	#[fail(display = "ParseIntError: {}", _0)]
	ParseIntError(String),
	/// AddrParseError
	#[fail(display = "AddrParseError: {}", _0)]
	AddrParseError(String),
	/// Utf8 Error
	#[fail(display = "Utf8 Error: {}", _0)]
	Utf8Error(String),
	/// SystemTime Error
	#[fail(display = "SystemTime Error: {}", _0)]
	SystemTimeError(String),
	/// Json Error
	#[fail(display = "Json Error: {}", _0)]
	JsonError(String),
	/// HttpError 400
	#[fail(display = "HttpError 400: {}", _0)]
	HttpError400(String),
	/// HttpError 403
	#[fail(display = "HttpError 403: {}", _0)]
	HttpError403(String),
	/// HttpError 404
	#[fail(display = "HttpError 404: {}", _0)]
	HttpError404(String),
	/// HttpError 405
	#[fail(display = "HttpError 405: {}", _0)]
	HttpError405(String),
	/// HttpError 413
	#[fail(display = "HttpError 413: {}", _0)]
	HttpError413(String),
	/// HttpError 415
	#[fail(display = "HttpError 415: {}", _0)]
	HttpError415(String),
	/// HttpError 500
	#[fail(display = "HttpError 500: {}", _0)]
	HttpError500(String),
	/// HttpError 505
	#[fail(display = "HttpError 505: {}", _0)]
	HttpError505(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cause = match self.cause() {
			Some(c) => format!("{}", c),
			None => String::from("Unknown"),
		};
		let backtrace = match self.backtrace() {
			Some(b) => format!("{}", b),
			None => String::from("Unknown"),
		};
		let output = format!(
			"{} \n Cause: {} \n Backtrace: {}",
			self.inner, cause, backtrace
		);
		Display::fmt(&output, f)
	}
}

impl Error {
	/// get kind
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
	/// get cause
	pub fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}
	/// get backtrace
	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<crate::failure::Context<ErrorKind>> for Error {
	fn from(e: crate::failure::Context<ErrorKind>) -> Error {
		Error {
			inner: Context::new(ErrorKind::InternalError(format!("InternalError: {}", e))),
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::IOError(format!("{}", e))),
		}
	}
}

#[cfg(unix)]
impl From<Errno> for Error {
	fn from(e: Errno) -> Error {
		Error {
			inner: Context::new(ErrorKind::IOError(format!("{}", e))),
		}
	}
}

impl From<Utf8Error> for Error {
	fn from(e: Utf8Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Utf8Error(format!("{}", e))),
		}
	}
}

impl From<FromUtf8Error> for Error {
	fn from(e: FromUtf8Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Utf8Error(format!("{}", e))),
		}
	}
}

impl From<OsString> for Error {
	fn from(e: OsString) -> Error {
		Error {
			inner: Context::new(ErrorKind::OsStringError(format!("{:?}", e))),
		}
	}
}

impl From<ParseIntError> for Error {
	fn from(e: ParseIntError) -> Error {
		Error {
			inner: Context::new(ErrorKind::ParseIntError(format!("{}", e))),
		}
	}
}

impl From<AddrParseError> for Error {
	fn from(e: AddrParseError) -> Error {
		Error {
			inner: Context::new(ErrorKind::AddrParseError(format!(
				"Error parsing address: {}",
				e
			))),
		}
	}
}

impl From<SystemTimeError> for Error {
	fn from(e: SystemTimeError) -> Error {
		Error {
			inner: Context::new(ErrorKind::SystemTimeError(format!(
				"system time error: {}",
				e
			))),
		}
	}
}

impl From<crate::serde_json::Error> for Error {
	fn from(e: crate::serde_json::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::JsonError(format!("{}", e))),
		}
	}
}
