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

use crate::conn::{process_connection, HandoffItem};
use crate::types::{HttpConfig, HttpRequest};
use mthttpd_deps::dirs;
use mthttpd_deps::libc;
use mthttpd_deps::nix::sys::socket::{
	bind, listen, socket, AddressFamily, InetAddr, SockAddr, SockFlag, SockType,
};
use mthttpd_deps::path_clean::clean;
use mthttpd_err::{Error, ErrorKind};
use mthttpd_log::*;
use mthttpd_pool::{WorkerPool, WorkerPoolConfig};
use mthttpd_util::lock;
use std::mem;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::FromRawFd;
use std::os::unix::prelude::RawFd;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

info!();

#[cfg(unix)]
type Handle = RawFd;

/// Outcome of the Host authority check.
pub(crate) enum HostCheck {
	Valid(String),
	Missing,
	Mismatch(String),
}

/// The server: owns the listening socket and the accept loop, hands
/// accepted connections to the worker pool.
pub struct HttpServer {
	config: HttpConfig,
	running: Arc<AtomicBool>,
	total_requests: Arc<Mutex<u64>>,
	acceptor: Option<JoinHandle<()>>,
}

impl HttpServer {
	pub fn new(mut config: HttpConfig) -> Self {
		let home_dir = match dirs::home_dir() {
			Some(p) => p,
			None => PathBuf::new(),
		}
		.as_path()
		.display()
		.to_string();

		let root_dir = config.root_dir.replace("~", &home_dir);
		config.root_dir = clean(&root_dir);

		Self {
			config,
			running: Arc::new(AtomicBool::new(true)),
			total_requests: Arc::new(Mutex::new(0)),
			acceptor: None,
		}
	}

	pub fn config(&self) -> &HttpConfig {
		&self.config
	}

	pub fn start(&mut self) -> Result<(), Error> {
		// the containment check compares normalized absolute paths
		if !self.config.root_dir.starts_with("/") {
			let cwd = std::env::current_dir()?.display().to_string();
			self.config.root_dir = clean(&format!("{}/{}", cwd, self.config.root_dir));
		}
		std::fs::create_dir_all(&self.config.root_dir)?;
		std::fs::create_dir_all(&format!(
			"{}/{}",
			self.config.root_dir, self.config.upload_dir
		))?;

		match &self.config.mainlog {
			Some(mainlog) => {
				log_config!(LogConfig {
					file_path: Some(mainlog.clone()),
					max_age_millis: self.config.mainlog_max_age,
					max_size: self.config.mainlog_max_size,
					..Default::default()
				})?;
			}
			None => {}
		}

		let addr = SocketAddr::from_str(&format!("{}:{}", self.config.host, self.config.port))?;
		let listener = self.bind_listener(&addr)?;

		let mut pool = WorkerPool::new(WorkerPoolConfig {
			workers: self.config.workers,
			queue_capacity: self.config.listen_queue_size,
		})?;
		let config = self.config.clone();
		let total_requests = self.total_requests.clone();
		pool.set_on_item(move |tid, item| process_connection(tid, item, &config, &total_requests))?;
		pool.set_on_panic(move || Ok(()))?;
		pool.start()?;

		info!(
			"HTTP Server started on http://{}:{}",
			self.config.host, self.config.port
		)?;
		info!("Thread pool size: {}", self.config.workers)?;
		info!("Serving files from '{}' directory", self.config.root_dir)?;

		let config = self.config.clone();
		let running = self.running.clone();
		let total_requests = self.total_requests.clone();
		let acceptor = std::thread::spawn(move || {
			match Self::accept_loop(listener, pool, config, running, total_requests) {
				Ok(_) => {}
				Err(e) => {
					let _ = fatal!("unexpected error in accept loop: {}", e);
				}
			}
		});
		self.acceptor = Some(acceptor);

		Ok(())
	}

	/// Stop accepting, let the workers drain and wait for the acceptor to
	/// exit.
	pub fn stop(&mut self) -> Result<(), Error> {
		self.running.store(false, Ordering::SeqCst);

		// wake the acceptor with a throwaway connection
		let host = if self.config.host == "0.0.0.0" {
			"127.0.0.1"
		} else {
			self.config.host.as_str()
		};
		match TcpStream::connect(format!("{}:{}", host, self.config.port)) {
			Ok(_) => {}
			Err(_) => {}
		}

		match self.acceptor.take() {
			Some(acceptor) => {
				let _ = acceptor.join();
			}
			None => {}
		}
		Ok(())
	}

	/// Total requests served across all connections so far.
	pub fn total_requests(&self) -> Result<u64, Error> {
		let total = lock!(self.total_requests)?;
		Ok(*total)
	}

	fn accept_loop<OnItem, OnPanic>(
		listener: TcpListener,
		pool: WorkerPool<HandoffItem, OnItem, OnPanic>,
		config: HttpConfig,
		running: Arc<AtomicBool>,
		total_requests: Arc<Mutex<u64>>,
	) -> Result<(), Error>
	where
		OnItem: Fn(usize, HandoffItem) -> Result<(), Error>
			+ Send
			+ 'static
			+ Clone
			+ Sync
			+ Unpin,
		OnPanic: Fn() -> Result<(), Error> + Send + 'static + Clone + Sync + Unpin,
	{
		loop {
			match listener.accept() {
				Ok((stream, peer)) => {
					if !running.load(Ordering::SeqCst) {
						drop(stream);
						break;
					}

					let active = pool.active_count()?;
					if active >= config.workers {
						warn!("Thread pool saturated, queuing connection")?;
					}

					pool.submit(HandoffItem {
						stream,
						peer,
						accepted_at: Instant::now(),
					})?;

					let total = {
						let total = lock!(total_requests)?;
						*total
					};
					if total % 10 == 0 && active > 0 {
						info!("Thread pool status: {}/{} active", active, config.workers)?;
					}
				}
				Err(e) => {
					if !running.load(Ordering::SeqCst) {
						break;
					}
					if e.kind() == std::io::ErrorKind::Interrupted {
						continue;
					}
					error!("Error accepting connection: {}", e)?;
				}
			}
		}

		pool.stop()?;
		info!("Server stopped")?;
		Ok(())
	}

	fn bind_listener(&self, addr: &SocketAddr) -> Result<TcpListener, Error> {
		let handle = Self::get_handle()?;
		let inet_addr = InetAddr::from_std(addr);
		let sock_addr = SockAddr::new_inet(inet_addr);
		bind(handle, &sock_addr)?;
		listen(handle, self.config.listen_queue_size)?;
		let listener = unsafe { TcpListener::from_raw_fd(handle) };
		Ok(listener)
	}

	fn get_handle() -> Result<Handle, Error> {
		let raw_fd = socket(
			AddressFamily::Inet,
			SockType::Stream,
			SockFlag::empty(),
			None,
		)?;

		let optval: libc::c_int = 1;
		unsafe {
			libc::setsockopt(
				raw_fd,
				libc::SOL_SOCKET,
				libc::SO_REUSEADDR,
				&optval as *const _ as *const libc::c_void,
				mem::size_of_val(&optval) as libc::socklen_t,
			)
		};

		Ok(raw_fd)
	}
}

/// Check the request's Host header against the authority set. A server
/// bound to all interfaces answers for any host.
pub(crate) fn validate_host(request: &HttpRequest, config: &HttpConfig) -> HostCheck {
	let host = match request.header("host") {
		Some(host) => host,
		None => return HostCheck::Missing,
	};

	if config.host == "0.0.0.0" {
		return HostCheck::Valid(host.to_string());
	}

	if config.authority().iter().any(|valid| valid == host) {
		HostCheck::Valid(host.to_string())
	} else {
		HostCheck::Mismatch(host.to_string())
	}
}

/// Resolve a request target to an absolute path under the document root, or
/// refuse it. Two independent layers: a substring blocklist on the raw
/// target, then containment of the normalized absolute path. Either failure
/// alone rejects the target. Existence of the file is the GET handler's
/// business, not the guard's.
pub(crate) fn resolve_path(target: &str, root_dir: &str) -> Result<String, Error> {
	if target.contains("..") || target.starts_with("//") {
		return Err(ErrorKind::HttpError403("Forbidden".to_string()).into());
	}

	let relative = target.trim_start_matches('/');
	let relative = if relative.is_empty() {
		"index.html"
	} else {
		relative
	};

	let mut path = format!("{}/{}", root_dir, relative).into_bytes();
	clean_path(&mut path)?;
	check_path(&path, root_dir.as_bytes())?;

	Ok(String::from_utf8(path)?)
}

// normalize an absolute path in place: collapse empty and `.` components,
// fold `..` into its parent. A `..` that would climb above the first
// component is refused.
fn clean_path(path: &mut Vec<u8>) -> Result<(), Error> {
	let text = std::str::from_utf8(path).map_err(|_| {
		let error: Error = ErrorKind::HttpError403("Forbidden".to_string()).into();
		error
	})?;

	let mut components: Vec<&str> = vec![];
	for component in text.split('/') {
		match component {
			"" | "." => {}
			".." => match components.pop() {
				Some(_) => {}
				None => {
					return Err(ErrorKind::HttpError403("Forbidden".to_string()).into());
				}
			},
			component => components.push(component),
		}
	}

	let mut cleaned = vec![];
	for component in &components {
		cleaned.push('/' as u8);
		cleaned.extend_from_slice(component.as_bytes());
	}
	if cleaned.len() == 0 {
		cleaned.push('/' as u8);
	}

	*path = cleaned;
	Ok(())
}

// the normalized path must equal the root or continue it at a component
// boundary, so /var/wwwx cannot pass for /var/www
fn check_path(path: &[u8], root_dir: &[u8]) -> Result<(), Error> {
	let root_dir_len = root_dir.len();
	if path.len() < root_dir_len {
		return Err(ErrorKind::HttpError403("Forbidden".to_string()).into());
	}

	for i in 0..root_dir_len {
		if path[i] != root_dir[i] {
			return Err(ErrorKind::HttpError403("Forbidden".to_string()).into());
		}
	}

	if path.len() > root_dir_len && path[root_dir_len] != '/' as u8 {
		return Err(ErrorKind::HttpError403("Forbidden".to_string()).into());
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use crate::http::{check_path, clean_path, resolve_path, validate_host, HostCheck, HttpServer};
	use crate::test::test::init_logger;
	use crate::types::{HttpConfig, HttpRequest};
	use mthttpd_deps::portpicker::pick_unused_port;
	use mthttpd_deps::serde_json;
	use mthttpd_err::{Error, ErrorKind};
	use mthttpd_log::*;
	use std::io::{Read, Write};
	use std::net::TcpStream;
	use std::time::Duration;

	debug!();

	#[test]
	fn test_clean_path() -> Result<(), Error> {
		let mut path = "/abc".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/abc".as_bytes(), path);

		let mut path = "/abc/".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/abc".as_bytes(), path);

		let mut path = "/abc/def/../ok".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/abc/ok", std::str::from_utf8(&path)?);

		let mut path = "/abc/def/./ok".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/abc/def/ok", std::str::from_utf8(&path)?);

		let mut path = "/abc/def/././ghi".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/abc/def/ghi", std::str::from_utf8(&path)?);

		let mut path = "/x/abcdef/../ghi/def/abc/../xyz".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/x/ghi/def/xyz", std::str::from_utf8(&path)?);

		let mut path = "/x/abcdef/../ghi/def/abc/../xyz/".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/x/ghi/def/xyz", std::str::from_utf8(&path)?);

		let mut path = "/abcdefghji/../xyz".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/xyz", std::str::from_utf8(&path)?);

		let mut path = "/../abcdefghji/../xyz".as_bytes().to_vec();
		assert!(clean_path(&mut path).is_err());

		let mut path = "/abcdefghji/../xyz/.././ok/1/2/".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/ok/1/2", std::str::from_utf8(&path)?);

		let mut path = "/home/abc/.mthttpd/1".as_bytes().to_vec();
		clean_path(&mut path)?;
		assert_eq!("/home/abc/.mthttpd/1", std::str::from_utf8(&path)?);

		Ok(())
	}

	#[test]
	fn test_check_path() -> Result<(), Error> {
		assert!(check_path(b"/var/www/index.html", b"/var/www").is_ok());
		assert!(check_path(b"/var/www", b"/var/www").is_ok());
		assert!(check_path(b"/var/wwwx/index.html", b"/var/www").is_err());
		assert!(check_path(b"/var", b"/var/www").is_err());
		assert!(check_path(b"/etc/passwd", b"/var/www").is_err());
		Ok(())
	}

	#[test]
	fn test_resolve_path() -> Result<(), Error> {
		let root = "/var/www";

		// root target substitutes index.html
		assert_eq!(resolve_path("/", root)?, "/var/www/index.html");
		assert_eq!(resolve_path("/logo.png", root)?, "/var/www/logo.png");
		assert_eq!(resolve_path("/a/./b.txt", root)?, "/var/www/a/b.txt");

		// substring blocklist on the raw target
		assert!(resolve_path("/../etc/passwd", root).is_err());
		assert!(resolve_path("/a/../../etc/passwd", root).is_err());
		assert!(resolve_path("/..", root).is_err());
		assert!(resolve_path("//etc/passwd", root).is_err());

		match resolve_path("/../etc/passwd", root) {
			Err(e) => assert_eq!(e.kind(), ErrorKind::HttpError403("Forbidden".to_string())),
			Ok(_) => panic!("expected Err"),
		}
		Ok(())
	}

	#[test]
	fn test_validate_host() -> Result<(), Error> {
		let config = HttpConfig::default();

		let request = |host: Option<&str>| -> Result<HttpRequest, Error> {
			let raw = match host {
				Some(host) => format!("GET / HTTP/1.1\r\nHost: {}\r\n\r\n", host),
				None => "GET / HTTP/1.1\r\n\r\n".to_string(),
			};
			match HttpRequest::parse(raw.as_bytes(), config.max_request_size)? {
				Some(request) => Ok(request),
				None => Err(ErrorKind::ApplicationError("incomplete".to_string()).into()),
			}
		};

		for host in &[
			"localhost:8080",
			"127.0.0.1:8080",
			"localhost",
			"127.0.0.1",
		] {
			match validate_host(&request(Some(host))?, &config) {
				HostCheck::Valid(observed) => assert_eq!(&observed, host),
				_ => panic!("expected Valid for {}", host),
			}
		}

		match validate_host(&request(Some("evil.com"))?, &config) {
			HostCheck::Mismatch(observed) => assert_eq!(observed, "evil.com"),
			_ => panic!("expected Mismatch"),
		}
		match validate_host(&request(Some("localhost:9999"))?, &config) {
			HostCheck::Mismatch(_) => {}
			_ => panic!("expected Mismatch"),
		}
		match validate_host(&request(None)?, &config) {
			HostCheck::Missing => {}
			_ => panic!("expected Missing"),
		}

		// bound to all interfaces, any host is answered
		let mut config = HttpConfig::default();
		config.host = "0.0.0.0".to_string();
		match validate_host(&request(Some("evil.com"))?, &config) {
			HostCheck::Valid(_) => {}
			_ => panic!("expected Valid"),
		}
		Ok(())
	}

	// -------------------- full server scenarios --------------------

	fn setup_webroot(name: &str) -> Result<String, Error> {
		let dir = format!(".test_http_{}.mth", name);
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(format!("{}/www", dir))?;
		std::fs::write(
			format!("{}/www/index.html", dir),
			"<html><body>Hello</body></html>",
		)?;
		let mut logo = vec![0x89u8, 0x50, 0x4e, 0x47];
		for i in 0..4096 {
			logo.push((i % 251) as u8);
		}
		std::fs::write(format!("{}/www/logo.png", dir), &logo)?;
		std::fs::write(format!("{}/www/notes.txt", dir), "some notes\n")?;
		std::fs::write(format!("{}/www/data.bin", dir), &[1u8, 2, 3])?;
		Ok(format!("{}/www", dir))
	}

	fn start_server(name: &str) -> Result<(HttpServer, u16), Error> {
		init_logger()?;
		let root_dir = setup_webroot(name)?;
		let port = match pick_unused_port() {
			Some(port) => port,
			None => {
				return Err(ErrorKind::SetupError("no free port".to_string()).into());
			}
		};
		let config = HttpConfig {
			port,
			root_dir,
			..Default::default()
		};
		let mut server = HttpServer::new(config);
		server.start()?;
		Ok((server, port))
	}

	fn connect(port: u16) -> Result<TcpStream, Error> {
		let stream = TcpStream::connect(format!("127.0.0.1:{}", port))?;
		stream.set_read_timeout(Some(Duration::from_secs(10)))?;
		Ok(stream)
	}

	// read exactly one response off the stream. Leftover pipelined bytes
	// stay in `carry` for the next call.
	fn read_response(
		stream: &mut TcpStream,
		carry: &mut Vec<u8>,
	) -> Result<(String, Vec<(String, String)>, Vec<u8>), Error> {
		let mut buffer = std::mem::replace(carry, vec![]);
		let mut chunk = [0u8; 4096];

		let head_end = loop {
			match buffer.windows(4).position(|window| window == b"\r\n\r\n") {
				Some(pos) => break pos,
				None => {
					let n = stream.read(&mut chunk)?;
					if n == 0 {
						return Err(ErrorKind::ApplicationError(
							"eof before response head".to_string(),
						)
						.into());
					}
					buffer.extend_from_slice(&chunk[..n]);
				}
			}
		};

		let head = std::str::from_utf8(&buffer[..head_end])?.to_string();
		let mut lines = head.split("\r\n");
		let status_line = match lines.next() {
			Some(line) => line.to_string(),
			None => {
				return Err(ErrorKind::ApplicationError("no status line".to_string()).into());
			}
		};
		let mut headers = vec![];
		for line in lines {
			match line.split_once(':') {
				Some((name, value)) => {
					headers.push((name.trim().to_lowercase(), value.trim().to_string()));
				}
				None => {}
			}
		}
		let content_length: usize = match headers
			.iter()
			.find(|(name, _)| name == "content-length")
		{
			Some((_, value)) => value.parse()?,
			None => 0,
		};

		let total = head_end + 4 + content_length;
		while buffer.len() < total {
			let n = stream.read(&mut chunk)?;
			if n == 0 {
				break;
			}
			buffer.extend_from_slice(&chunk[..n]);
		}

		let body = buffer[head_end + 4..total.min(buffer.len())].to_vec();
		*carry = if buffer.len() > total {
			buffer[total..].to_vec()
		} else {
			vec![]
		};
		Ok((status_line, headers, body))
	}

	fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
		headers
			.iter()
			.find(|(header, _)| header == name)
			.map(|(_, value)| value.as_str())
	}

	fn read_eof(stream: &mut TcpStream) -> bool {
		let mut chunk = [0u8; 64];
		match stream.read(&mut chunk) {
			Ok(0) => true,
			_ => false,
		}
	}

	#[test]
	fn test_get_index_keep_alive() -> Result<(), Error> {
		let (mut server, port) = start_server("index")?;
		let mut stream = connect(port)?;
		let mut carry = vec![];

		let request = format!("GET / HTTP/1.1\r\nHost: localhost:{}\r\n\r\n", port);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, body) = read_response(&mut stream, &mut carry)?;

		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(
			header(&headers, "content-type"),
			Some("text/html; charset=utf-8")
		);
		assert_eq!(body, b"<html><body>Hello</body></html>");
		assert_eq!(header(&headers, "server"), Some("Multi-threaded HTTP Server"));
		assert!(header(&headers, "date").is_some());
		assert_eq!(header(&headers, "connection"), Some("keep-alive"));
		assert_eq!(header(&headers, "keep-alive"), Some("timeout=30, max=100"));

		// two pipelined requests on the same connection come back in order,
		// each complete before the next
		let request = format!(
			"GET / HTTP/1.1\r\nHost: localhost:{}\r\n\r\nGET /notes.txt HTTP/1.1\r\nHost: localhost:{}\r\n\r\n",
			port, port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(body, b"<html><body>Hello</body></html>");
		let (status_line, headers, body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(
			header(&headers, "content-disposition"),
			Some("attachment; filename=\"notes.txt\"")
		);
		assert_eq!(body, b"some notes\n");

		// Connection: close is honored
		let request = format!(
			"GET / HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(header(&headers, "connection"), Some("close"));
		assert!(header(&headers, "keep-alive").is_none());
		assert!(read_eof(&mut stream));

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_get_binary_download() -> Result<(), Error> {
		let (mut server, port) = start_server("binary")?;
		let mut stream = connect(port)?;
		let mut carry = vec![];

		let request = format!("GET /logo.png HTTP/1.1\r\nHost: 127.0.0.1:{}\r\n\r\n", port);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, body) = read_response(&mut stream, &mut carry)?;

		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(
			header(&headers, "content-type"),
			Some("application/octet-stream")
		);
		assert_eq!(
			header(&headers, "content-disposition"),
			Some("attachment; filename=\"logo.png\"")
		);

		// byte identical to what is on disk
		let on_disk = std::fs::read(".test_http_binary.mth/www/logo.png")?;
		assert_eq!(body, on_disk);
		assert_eq!(
			header(&headers, "content-length"),
			Some(format!("{}", on_disk.len()).as_str())
		);

		// unsupported extension is not served
		let request = format!("GET /data.bin HTTP/1.1\r\nHost: 127.0.0.1:{}\r\n\r\n", port);
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 415 Unsupported Media Type");

		// unknown path
		let request = format!("GET /nope.html HTTP/1.1\r\nHost: 127.0.0.1:{}\r\n\r\n", port);
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 404 Not Found");

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_post_upload() -> Result<(), Error> {
		let (mut server, port) = start_server("post")?;
		let mut stream = connect(port)?;
		let mut carry = vec![];

		let body = "{\"test\":\"data\"}";
		let request = format!(
			"POST /upload HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
			port,
			body.len(),
			body
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, body) = read_response(&mut stream, &mut carry)?;

		assert_eq!(status_line, "HTTP/1.1 201 Created");
		assert_eq!(header(&headers, "content-type"), Some("application/json"));

		let response: serde_json::Value = serde_json::from_slice(&body)?;
		assert_eq!(response["status"], "success");
		assert_eq!(response["message"], "File created successfully");
		let filepath = match response["filepath"].as_str() {
			Some(filepath) => filepath.to_string(),
			None => panic!("filepath missing"),
		};
		assert!(filepath.starts_with("/uploads/upload_"));
		assert!(filepath.ends_with(".json"));

		// the upload is on disk, pretty printed with 2 space indent
		let on_disk =
			std::fs::read_to_string(format!(".test_http_post.mth/www{}", filepath))?;
		assert_eq!(on_disk, "{\n  \"test\": \"data\"\n}");

		// wrong media type
		let request = format!(
			"POST /upload HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nhi!",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 415 Unsupported Media Type");

		// body that is not JSON. The 400 also closes the connection.
		let request = format!(
			"POST /upload HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: 9\r\n\r\nnot json!",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 400 Bad Request");
		assert_eq!(header(&headers, "connection"), Some("close"));
		assert!(read_eof(&mut stream));

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_security_gates() -> Result<(), Error> {
		let (mut server, port) = start_server("security")?;

		// path traversal
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = format!(
			"GET /../etc/passwd HTTP/1.1\r\nHost: localhost:{}\r\n\r\n",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 403 Forbidden");
		assert_eq!(header(&headers, "connection"), Some("close"));
		assert!(read_eof(&mut stream));

		// host mismatch
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = "GET / HTTP/1.1\r\nHost: evil.com\r\n\r\n";
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 403 Forbidden");
		assert!(read_eof(&mut stream));

		// missing host
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = "GET / HTTP/1.1\r\n\r\n";
		stream.write_all(request.as_bytes())?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 400 Bad Request");
		assert!(read_eof(&mut stream));

		// unsupported method gets an Allow header and honors keep-alive
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = format!(
			"PUT /index.html HTTP/1.1\r\nHost: localhost:{}\r\n\r\n",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 405 Method Not Allowed");
		assert_eq!(header(&headers, "allow"), Some("GET, POST"));
		assert_eq!(header(&headers, "connection"), Some("keep-alive"));

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_parse_errors_close_connection() -> Result<(), Error> {
		let (mut server, port) = start_server("parse")?;

		// malformed request line
		let mut stream = connect(port)?;
		let mut carry = vec![];
		stream.write_all(b"GET /\r\n\r\n")?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 400 Bad Request");
		assert!(read_eof(&mut stream));

		// unsupported version
		let mut stream = connect(port)?;
		let mut carry = vec![];
		stream.write_all(b"GET / HTTP/2.0\r\n\r\n")?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 505 HTTP Version Not Supported");
		assert!(read_eof(&mut stream));

		// request over the total cap
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let mut request = format!("GET / HTTP/1.1\r\nHost: localhost:{}\r\nX-Fill: ", port)
			.into_bytes();
		request.resize(9000, 'a' as u8);
		stream.write_all(&request)?;
		let (status_line, _headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 413 Request Entity Too Large");
		assert!(read_eof(&mut stream));

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_http10_connection_policy() -> Result<(), Error> {
		let (mut server, port) = start_server("http10")?;

		// HTTP/1.0 closes by default
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = format!("GET / HTTP/1.0\r\nHost: localhost:{}\r\n\r\n", port);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(header(&headers, "connection"), Some("close"));
		assert!(read_eof(&mut stream));

		// HTTP/1.0 with an explicit keep-alive stays open
		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = format!(
			"GET / HTTP/1.0\r\nHost: localhost:{}\r\nConnection: keep-alive\r\n\r\n",
			port
		);
		stream.write_all(request.as_bytes())?;
		let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
		assert_eq!(status_line, "HTTP/1.1 200 OK");
		assert_eq!(header(&headers, "connection"), Some("keep-alive"));

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_request_cap() -> Result<(), Error> {
		init_logger()?;
		let root_dir = setup_webroot("cap")?;
		let port = match pick_unused_port() {
			Some(port) => port,
			None => {
				return Err(ErrorKind::SetupError("no free port".to_string()).into());
			}
		};
		let config = HttpConfig {
			port,
			root_dir,
			max_requests_per_connection: 3,
			..Default::default()
		};
		let mut server = HttpServer::new(config);
		server.start()?;

		let mut stream = connect(port)?;
		let mut carry = vec![];
		let request = format!("GET / HTTP/1.1\r\nHost: localhost:{}\r\n\r\n", port);

		for i in 0..3 {
			stream.write_all(request.as_bytes())?;
			let (status_line, headers, _body) = read_response(&mut stream, &mut carry)?;
			assert_eq!(status_line, "HTTP/1.1 200 OK");
			if i < 2 {
				assert_eq!(header(&headers, "connection"), Some("keep-alive"));
			} else {
				// the final allowed request carries the close
				assert_eq!(header(&headers, "connection"), Some("close"));
			}
		}
		assert!(read_eof(&mut stream));
		assert_eq!(server.total_requests()?, 3);

		server.stop()?;
		Ok(())
	}

	#[test]
	fn test_idle_timeout() -> Result<(), Error> {
		init_logger()?;
		let root_dir = setup_webroot("idle")?;
		let port = match pick_unused_port() {
			Some(port) => port,
			None => {
				return Err(ErrorKind::SetupError("no free port".to_string()).into());
			}
		};
		let config = HttpConfig {
			port,
			root_dir,
			idle_timeout: 1,
			..Default::default()
		};
		let mut server = HttpServer::new(config);
		server.start()?;

		// an idle keep-alive connection is closed by the server, silently
		let mut stream = connect(port)?;
		let mut chunk = [0u8; 64];
		let n = stream.read(&mut chunk)?;
		assert_eq!(n, 0);

		server.stop()?;
		Ok(())
	}
}
