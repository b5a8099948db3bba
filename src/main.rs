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

use mthttpd_deps::nix::sys::signal::{
	sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal,
};
use mthttpd_err::{Error, ErrorKind};
use mthttpd_http::{HttpConfig, HttpServer};
use mthttpd_log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

info!();

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: i32) {
	STOP.store(true, Ordering::SeqCst);
}

fn main() {
	match run() {
		Ok(_) => {}
		Err(e) => {
			let _ = fatal!("{}", e);
			std::process::exit(1);
		}
	}
}

fn run() -> Result<(), Error> {
	let config = parse_args()?;

	let sig_action = SigAction::new(
		SigHandler::Handler(handle_sigint),
		SaFlags::empty(),
		SigSet::empty(),
	);
	unsafe { sigaction(Signal::SIGINT, &sig_action) }?;

	let mut server = HttpServer::new(config);
	server.start()?;
	info!("Press Ctrl+C to stop the server")?;

	while !STOP.load(Ordering::SeqCst) {
		std::thread::park_timeout(Duration::from_millis(200));
	}

	info!("Shutting down server...")?;
	server.stop()?;
	Ok(())
}

// positional surface: <port> [<host> [<workers>]]
fn parse_args() -> Result<HttpConfig, Error> {
	let args: Vec<String> = std::env::args().collect();
	let mut config = HttpConfig::default();

	if args.len() > 1 {
		config.port = args[1].parse().map_err(|_| {
			let error: Error =
				ErrorKind::SetupError(format!("Invalid port: {}", args[1])).into();
			error
		})?;
	}
	if args.len() > 2 {
		config.host = args[2].clone();
	}
	if args.len() > 3 {
		config.workers = args[3].parse().map_err(|_| {
			let error: Error =
				ErrorKind::SetupError(format!("Invalid thread pool size: {}", args[3])).into();
			error
		})?;
	}

	Ok(config)
}
