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

use mthttpd_deps::chrono::Utc;
use mthttpd_err::{Error, ErrorKind};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Configuration of the [`crate::HttpServer`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
	/// The host the server binds to. A server bound to `0.0.0.0` answers
	/// for any Host header.
	pub host: String,
	/// The port the server binds to.
	pub port: u16,
	/// Number of worker threads serving connections.
	pub workers: usize,
	/// Backlog passed to listen. Also the capacity of the hand-off queue
	/// between the acceptor and the workers.
	pub listen_queue_size: usize,
	/// The document root. All served files resolve under this directory.
	/// A leading `~` is expanded to the home directory.
	pub root_dir: String,
	/// Subdirectory of the document root where JSON uploads are written.
	pub upload_dir: String,
	/// Seconds a keep-alive connection may sit idle between requests.
	pub idle_timeout: u64,
	/// Requests served on one connection before it is forcibly closed.
	pub max_requests_per_connection: usize,
	/// Hard cap in bytes on one request, head and body together.
	pub max_request_size: usize,
	/// Value of the Server response header.
	pub server_name: String,
	/// Optional log file. By default lines go to standard output only.
	pub mainlog: Option<String>,
	pub mainlog_max_age: u128,
	pub mainlog_max_size: u64,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8080,
			workers: 10,
			listen_queue_size: 50,
			root_dir: "resources".to_string(),
			upload_dir: "uploads".to_string(),
			idle_timeout: 30,
			max_requests_per_connection: 100,
			max_request_size: 8192,
			server_name: "Multi-threaded HTTP Server".to_string(),
			mainlog: None,
			mainlog_max_age: 6 * 60 * 60 * 1000, // 6 hours
			mainlog_max_size: 1024 * 1024,
		}
	}
}

impl HttpConfig {
	/// The set of Host header values this server answers for.
	pub fn authority(&self) -> Vec<String> {
		vec![
			format!("localhost:{}", self.port),
			format!("{}:{}", self.host, self.port),
			"localhost".to_string(),
			self.host.clone(),
			format!("127.0.0.1:{}", self.port),
			"127.0.0.1".to_string(),
		]
	}
}

/// Currently just support GET/POST. Anything else is kept for dispatch so
/// the driver can answer 405 with an Allow header.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpMethod {
	Get,
	Post,
	Other(String),
}

impl HttpMethod {
	fn from_token(token: &str) -> Self {
		match token {
			"GET" => HttpMethod::Get,
			"POST" => HttpMethod::Post,
			_ => HttpMethod::Other(token.to_string()),
		}
	}
}

impl Display for HttpMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HttpMethod::Get => write!(f, "GET"),
			HttpMethod::Post => write!(f, "POST"),
			HttpMethod::Other(token) => write!(f, "{}", token),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum HttpVersion {
	V10,
	V11,
}

impl Display for HttpVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HttpVersion::V10 => write!(f, "HTTP/1.0"),
			HttpVersion::V11 => write!(f, "HTTP/1.1"),
		}
	}
}

/// A parsed HTTP request. Read only once constructed.
#[derive(Debug)]
pub struct HttpRequest {
	pub method: HttpMethod,
	pub target: String,
	pub version: HttpVersion,
	headers: HashMap<String, String>,
	pub body: Vec<u8>,
	len: usize,
}

impl HttpRequest {
	/// Parse one request from the front of `buffer`. Returns `Ok(None)` when
	/// the buffer does not yet hold a complete request (head terminator not
	/// seen, or fewer body bytes than Content-Length declares). Errors carry
	/// the wire classification:
	///
	/// - no head terminator within `max_request_size` bytes, or declared
	///   head+body over that cap -> `HttpError413`
	/// - request line without exactly three space separated tokens, a
	///   chunked Transfer-Encoding, a non-numeric Content-Length, or a head
	///   that is not valid UTF-8 -> `HttpError400`
	/// - a version other than HTTP/1.0 or HTTP/1.1 -> `HttpError505`
	pub fn parse(buffer: &[u8], max_request_size: usize) -> Result<Option<Self>, Error> {
		let head_end = match Self::find_head_end(buffer) {
			Some(pos) => pos,
			None => {
				if buffer.len() >= max_request_size {
					return Err(ErrorKind::HttpError413(
						"Request Entity Too Large".to_string(),
					)
					.into());
				}
				return Ok(None);
			}
		};

		let head = std::str::from_utf8(&buffer[..head_end]).map_err(|_| {
			let error: Error = ErrorKind::HttpError400("Bad Request".to_string()).into();
			error
		})?;

		let mut lines = head.split("\r\n");
		let request_line = match lines.next() {
			Some(line) => line,
			None => return Err(ErrorKind::HttpError400("Bad Request".to_string()).into()),
		};

		// METHOD SP TARGET SP VERSION, single spaces. A leading CRLF before
		// the request line is not tolerated.
		let tokens: Vec<&str> = request_line.split(' ').collect();
		if tokens.len() != 3 {
			return Err(ErrorKind::HttpError400("Bad Request".to_string()).into());
		}
		let method = HttpMethod::from_token(&tokens[0].to_uppercase());
		let target = tokens[1].to_string();
		let version = match tokens[2] {
			"HTTP/1.0" => HttpVersion::V10,
			"HTTP/1.1" => HttpVersion::V11,
			_ => {
				return Err(ErrorKind::HttpError505(
					"HTTP Version Not Supported".to_string(),
				)
				.into())
			}
		};

		// case-folded keys, later duplicates win. Lines without a colon are
		// skipped; header names are accepted permissively.
		let mut headers = HashMap::new();
		for line in lines {
			match line.split_once(':') {
				Some((name, value)) => {
					headers.insert(name.trim().to_lowercase(), value.trim().to_string());
				}
				None => {}
			}
		}

		match headers.get("transfer-encoding") {
			Some(te) if te.to_lowercase().contains("chunked") => {
				return Err(ErrorKind::HttpError400("Bad Request".to_string()).into());
			}
			_ => {}
		}

		let content_length = match headers.get("content-length") {
			Some(value) => value.parse::<usize>().map_err(|_| {
				let error: Error = ErrorKind::HttpError400("Bad Request".to_string()).into();
				error
			})?,
			None => 0,
		};

		let len = head_end + HEAD_TERMINATOR.len() + content_length;
		if len > max_request_size {
			return Err(ErrorKind::HttpError413("Request Entity Too Large".to_string()).into());
		}
		if buffer.len() < len {
			return Ok(None);
		}
		let body = buffer[head_end + HEAD_TERMINATOR.len()..len].to_vec();

		Ok(Some(Self {
			method,
			target,
			version,
			headers,
			body,
			len,
		}))
	}

	/// Total bytes this request consumed from the receive buffer.
	pub fn len(&self) -> usize {
		self.len
	}

	/// Header lookup. `name` must already be lower case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(|value| value.as_str())
	}

	fn find_head_end(buffer: &[u8]) -> Option<usize> {
		if buffer.len() < HEAD_TERMINATOR.len() {
			return None;
		}
		buffer
			.windows(HEAD_TERMINATOR.len())
			.position(|window| window == HEAD_TERMINATOR)
	}
}

/// A response under construction: status line, insertion-ordered headers and
/// body bytes. [`HttpResponse::to_bytes`] injects the mandatory server
/// headers that have not been set explicitly.
#[derive(Debug)]
pub struct HttpResponse {
	status_code: u16,
	status_text: String,
	headers: Vec<(String, String)>,
	body: Vec<u8>,
}

impl HttpResponse {
	pub fn new(status_code: u16, status_text: &str) -> Self {
		Self::with_body(status_code, status_text, vec![])
	}

	pub fn with_body(status_code: u16, status_text: &str, body: Vec<u8>) -> Self {
		Self {
			status_code,
			status_text: status_text.to_string(),
			headers: vec![],
			body,
		}
	}

	pub fn status_code(&self) -> u16 {
		self.status_code
	}

	pub fn status_text(&self) -> &str {
		&self.status_text
	}

	pub fn body_len(&self) -> usize {
		self.body.len()
	}

	/// Set a header, replacing an existing value of the same name.
	pub fn set_header(&mut self, name: &str, value: &str) {
		for header in &mut self.headers {
			if header.0.eq_ignore_ascii_case(name) {
				header.1 = value.to_string();
				return;
			}
		}
		self.headers.push((name.to_string(), value.to_string()));
	}

	pub fn get_header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(header, _)| header.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Encode the response for the wire. The status line is always HTTP/1.1
	/// regardless of the request version. `Date`, `Server` and
	/// `Content-Length` are added if absent; `Connection` is the
	/// connection driver's decision and is expected to be set already.
	pub fn to_bytes(&mut self, server_name: &str) -> Vec<u8> {
		if self.get_header("Date").is_none() {
			let date = http_date();
			self.set_header("Date", &date);
		}
		if self.get_header("Server").is_none() {
			self.set_header("Server", server_name);
		}
		if self.get_header("Content-Length").is_none() {
			let len = format!("{}", self.body.len());
			self.set_header("Content-Length", &len);
		}

		let mut response =
			format!("HTTP/1.1 {} {}\r\n", self.status_code, self.status_text).into_bytes();
		for (name, value) in &self.headers {
			response.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
		}
		response.extend_from_slice(b"\r\n");
		response.extend_from_slice(&self.body);
		response
	}
}

/// RFC 7231 date, e.g. `Wed, 09 Mar 2022 22:03:11 GMT`.
pub fn http_date() -> String {
	Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
