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

use crate::handlers::{error_response, handle_get, handle_post};
use crate::http::{resolve_path, validate_host, HostCheck};
use crate::types::{HttpConfig, HttpMethod, HttpRequest, HttpResponse, HttpVersion};
use mthttpd_err::{Error, ErrorKind};
use mthttpd_log::*;
use mthttpd_util::lock;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

info!();

const BUFFER_SIZE: usize = 4096;

// statuses that force the connection closed regardless of what the client
// asked for
fn force_close(status_code: u16) -> bool {
	match status_code {
		400 | 403 | 413 | 500 | 505 => true,
		_ => false,
	}
}

/// Ownership of one accepted connection, in transfer from the acceptor to a
/// worker through the hand-off queue.
#[derive(Debug)]
pub struct HandoffItem {
	pub stream: TcpStream,
	pub peer: SocketAddr,
	pub accepted_at: Instant,
}

/// The per-connection state machine. Reads requests off the socket under
/// the idle deadline, runs the security gates, dispatches by method, writes
/// the response and decides whether the connection survives to the next
/// request. Request N is fully written before request N+1 is read.
pub(crate) fn process_connection(
	tid: usize,
	item: HandoffItem,
	config: &HttpConfig,
	total_requests: &Arc<Mutex<u64>>,
) -> Result<(), Error> {
	let thread_name = format!("Thread-{}", tid + 1);
	let HandoffItem {
		mut stream,
		peer,
		accepted_at,
	} = item;

	info!(
		"[{}] Connection from {}:{}",
		thread_name,
		peer.ip(),
		peer.port()
	)?;
	trace!(
		"[{}] connection waited {}ms in the hand-off queue",
		thread_name,
		accepted_at.elapsed().as_millis()
	)?;

	stream.set_read_timeout(Some(Duration::from_secs(config.idle_timeout)))?;

	let mut buffer: Vec<u8> = vec![];
	let mut chunk = [0u8; BUFFER_SIZE];
	let mut request_count = 0;
	let mut keep_alive = true;

	while keep_alive && request_count < config.max_requests_per_connection {
		let request = match HttpRequest::parse(&buffer, config.max_request_size) {
			Ok(Some(request)) => request,
			Ok(None) => {
				// not enough buffered bytes for a full request yet
				match stream.read(&mut chunk) {
					Ok(0) => {
						if !buffer.is_empty() {
							// peer went away mid-request
							send_error(&mut stream, config, &thread_name, 400, "Bad Request")?;
						}
						break;
					}
					Ok(n) => {
						buffer.extend_from_slice(&chunk[..n]);
						continue;
					}
					Err(e) => {
						match e.kind() {
							std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
								// idle deadline passed. No response.
								info!("[{}] Connection timeout", thread_name)?;
							}
							std::io::ErrorKind::ConnectionReset => {
								info!("[{}] Connection reset by client", thread_name)?;
							}
							std::io::ErrorKind::Interrupted => continue,
							_ => {
								warn!("[{}] Error reading request: {}", thread_name, e)?;
							}
						}
						break;
					}
				}
			}
			Err(e) => {
				let (status_code, status_text) = match e.kind() {
					ErrorKind::HttpError413(_) => (413, "Request Entity Too Large"),
					ErrorKind::HttpError505(_) => (505, "HTTP Version Not Supported"),
					_ => (400, "Bad Request"),
				};
				send_error(&mut stream, config, &thread_name, status_code, status_text)?;
				break;
			}
		};

		request_count += 1;
		{
			let mut total = lock!(total_requests)?;
			*total += 1;
		}

		info!(
			"[{}] Request: {} {} {}",
			thread_name, request.method, request.target, request.version
		)?;

		let drain = request.len();

		let mut response = match dispatch(&request, config, &thread_name) {
			Ok(response) => response,
			Err(e) => {
				error!("[{}] Error handling request: {}", thread_name, e)?;
				error_response(500, "Internal Server Error")
			}
		};

		// HTTP/1.1 stays open unless the client says close; HTTP/1.0 closes
		// unless the client says keep-alive
		let connection_header = match request.header("connection") {
			Some(connection_header) => connection_header.to_lowercase(),
			None => "".to_string(),
		};
		keep_alive = match request.version {
			HttpVersion::V10 => connection_header == "keep-alive",
			HttpVersion::V11 => connection_header != "close",
		};
		if force_close(response.status_code()) {
			keep_alive = false;
		}

		if keep_alive && request_count < config.max_requests_per_connection {
			response.set_header("Connection", "keep-alive");
			response.set_header(
				"Keep-Alive",
				&format!(
					"timeout={}, max={}",
					config.idle_timeout, config.max_requests_per_connection
				),
			);
			trace!("[{}] Connection: keep-alive", thread_name)?;
		} else {
			response.set_header("Connection", "close");
			keep_alive = false;
			trace!("[{}] Connection: close", thread_name)?;
		}

		let response_bytes = response.to_bytes(&config.server_name);
		match stream.write_all(&response_bytes) {
			Ok(_) => {}
			Err(e) => {
				warn!("[{}] Error sending response: {}", thread_name, e)?;
				break;
			}
		}

		info!(
			"[{}] Response: {} {} ({} bytes transferred)",
			thread_name,
			response.status_code(),
			response.status_text(),
			response.body_len()
		)?;

		buffer.drain(..drain);
	}

	info!(
		"[{}] Connection closed ({} requests served)",
		thread_name, request_count
	)?;
	Ok(())
}

/// Run the security gates, then the per-method handler. Both gates
/// short-circuit before any filesystem access. A panic below this frame is
/// trapped and surfaces as a 500.
fn dispatch(
	request: &HttpRequest,
	config: &HttpConfig,
	thread_name: &str,
) -> Result<HttpResponse, Error> {
	match validate_host(request, config) {
		HostCheck::Valid(host) => {
			info!("[{}] Host validation: {} \u{2713}", thread_name, host)?;
		}
		HostCheck::Missing => {
			warn!("[{}] Security: Missing Host header", thread_name)?;
			return Ok(error_response(400, "Bad Request"));
		}
		HostCheck::Mismatch(observed) => {
			warn!("[{}] Security: Host mismatch - {}", thread_name, observed)?;
			return Ok(error_response(403, "Forbidden"));
		}
	}

	let resolved = match resolve_path(&request.target, &config.root_dir) {
		Ok(resolved) => resolved,
		Err(_e) => {
			warn!(
				"[{}] Security: Path traversal attempt - {}",
				thread_name, request.target
			)?;
			return Ok(error_response(403, "Forbidden"));
		}
	};

	let result = catch_unwind(AssertUnwindSafe(|| match &request.method {
		HttpMethod::Get => handle_get(&resolved, thread_name),
		HttpMethod::Post => handle_post(request, config, thread_name),
		HttpMethod::Other(_) => {
			let mut response = error_response(405, "Method Not Allowed");
			response.set_header("Allow", "GET, POST");
			Ok(response)
		}
	}));

	match result {
		Ok(result) => result,
		Err(_) => Err(ErrorKind::HttpError500("handler panicked".to_string()).into()),
	}
}

// error responses emitted before dispatch (parse failures, truncated
// requests). These always close the connection.
fn send_error(
	stream: &mut TcpStream,
	config: &HttpConfig,
	thread_name: &str,
	status_code: u16,
	status_text: &str,
) -> Result<(), Error> {
	let mut response = error_response(status_code, status_text);
	response.set_header("Connection", "close");
	let response_bytes = response.to_bytes(&config.server_name);
	match stream.write_all(&response_bytes) {
		Ok(_) => {
			info!(
				"[{}] Response: {} {} ({} bytes transferred)",
				thread_name,
				status_code,
				status_text,
				response.body_len()
			)?;
		}
		Err(e) => {
			warn!("[{}] Error sending response: {}", thread_name, e)?;
		}
	}
	Ok(())
}
