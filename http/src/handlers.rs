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

use crate::types::{HttpConfig, HttpRequest, HttpResponse};
use mthttpd_deps::chrono::Local;
use mthttpd_deps::rand;
use mthttpd_deps::serde_json;
use mthttpd_deps::serde_json::json;
use mthttpd_err::Error;
use mthttpd_log::*;
use std::path::Path;

info!();

/// Serve a GET for `path`, the already resolved absolute path under the
/// document root. The file extension decides the treatment: html renders in
/// the browser, the known binary extensions download as attachments, and
/// anything else is not served.
pub(crate) fn handle_get(path: &str, thread_name: &str) -> Result<HttpResponse, Error> {
	if !Path::new(path).is_file() {
		return Ok(error_response(404, "Not Found"));
	}

	let ext = match Path::new(path).extension() {
		Some(ext) => ext.to_string_lossy().to_lowercase(),
		None => "".to_string(),
	};

	match ext.as_str() {
		"html" => {
			let content = std::fs::read(path)?;
			info!(
				"[{}] Serving HTML file: {} ({} bytes)",
				thread_name,
				path,
				content.len()
			)?;
			let mut response = HttpResponse::with_body(200, "OK", content);
			response.set_header("Content-Type", "text/html; charset=utf-8");
			Ok(response)
		}
		"txt" | "png" | "jpg" | "jpeg" => {
			let content = std::fs::read(path)?;
			let filename = match Path::new(path).file_name() {
				Some(filename) => filename.to_string_lossy().to_string(),
				None => "download".to_string(),
			};
			info!(
				"[{}] Sending binary file: {} ({} bytes)",
				thread_name,
				filename,
				content.len()
			)?;
			let mut response = HttpResponse::with_body(200, "OK", content);
			response.set_header("Content-Type", "application/octet-stream");
			response.set_header(
				"Content-Disposition",
				&format!("attachment; filename=\"{}\"", filename),
			);
			Ok(response)
		}
		_ => Ok(error_response(415, "Unsupported Media Type")),
	}
}

/// Accept a JSON document upload. The body must parse as JSON; it is
/// re-serialized pretty-printed into a fresh file under the upload
/// directory.
pub(crate) fn handle_post(
	request: &HttpRequest,
	config: &HttpConfig,
	thread_name: &str,
) -> Result<HttpResponse, Error> {
	let content_type = match request.header("content-type") {
		Some(content_type) => content_type,
		None => "",
	};
	if !content_type.to_lowercase().contains("application/json") {
		return Ok(error_response(415, "Unsupported Media Type"));
	}

	let json_data: serde_json::Value = match serde_json::from_slice(&request.body) {
		Ok(json_data) => json_data,
		Err(e) => {
			warn!("[{}] Error parsing JSON: {}", thread_name, e)?;
			return Ok(error_response(400, "Bad Request"));
		}
	};

	let filename = upload_filename();
	let filepath = format!(
		"{}/{}/{}",
		config.root_dir, config.upload_dir, filename
	);
	std::fs::write(&filepath, serde_json::to_string_pretty(&json_data)?)?;
	info!("[{}] Created file: {}", thread_name, filepath)?;

	let response_data = json!({
		"status": "success",
		"message": "File created successfully",
		"filepath": format!("/{}/{}", config.upload_dir, filename),
	});
	let mut response =
		HttpResponse::with_body(201, "Created", response_data.to_string().into_bytes());
	response.set_header("Content-Type", "application/json");
	Ok(response)
}

/// Upload file names carry a local timestamp and a short random token,
/// `upload_<YYYYMMDD_HHMMSS>_<rand4>.json`. The token comes from the OS
/// seeded thread RNG rather than the clock, so two uploads within the same
/// second still get distinct names with overwhelming probability.
pub(crate) fn upload_filename() -> String {
	let timestamp = Local::now().format("%Y%m%d_%H%M%S");
	let token: u16 = rand::random();
	format!("upload_{}_{:04x}.json", timestamp, token)
}

/// Every error status gets a small self-describing HTML page.
pub(crate) fn error_response(status_code: u16, status_text: &str) -> HttpResponse {
	let body = format!(
		"<!DOCTYPE html>\n\
<html>\n\
<head>\n\
    <title>{} {}</title>\n\
    <style>\n\
        body {{ font-family: Arial, sans-serif; margin: 50px; }}\n\
        h1 {{ color: #d32f2f; }}\n\
    </style>\n\
</head>\n\
<body>\n\
    <h1>{} {}</h1>\n\
    <p>The server encountered an error processing your request.</p>\n\
    <hr>\n\
    <p><em>Multi-threaded HTTP Server</em></p>\n\
</body>\n\
</html>",
		status_code, status_text, status_code, status_text
	);
	let mut response = HttpResponse::with_body(status_code, status_text, body.into_bytes());
	response.set_header("Content-Type", "text/html; charset=utf-8");
	response
}

#[cfg(test)]
mod test {
	use crate::handlers::{error_response, handle_get, upload_filename};
	use mthttpd_err::Error;
	use mthttpd_log::*;

	debug!();

	fn setup_test_dir(name: &str) -> Result<String, Error> {
		let dir = format!(".test_handlers_{}.mth", name);
		let _ = std::fs::remove_dir_all(&dir);
		std::fs::create_dir_all(&dir)?;
		Ok(dir)
	}

	#[test]
	fn test_upload_filename_shape() -> Result<(), Error> {
		for _ in 0..100 {
			let filename = upload_filename();
			// upload_YYYYMMDD_HHMMSS_xxxx.json
			assert_eq!(filename.len(), 32);
			assert!(filename.starts_with("upload_"));
			assert!(filename.ends_with(".json"));
			let parts: Vec<&str> = filename[7..filename.len() - 5].split('_').collect();
			assert_eq!(parts.len(), 3);
			assert_eq!(parts[0].len(), 8);
			assert!(parts[0].chars().all(|c| c.is_ascii_digit()));
			assert_eq!(parts[1].len(), 6);
			assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
			assert_eq!(parts[2].len(), 4);
			assert!(parts[2]
				.chars()
				.all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
		}
		Ok(())
	}

	#[test]
	fn test_get_policy_table() -> Result<(), Error> {
		let dir = setup_test_dir("get")?;
		std::fs::write(format!("{}/page.html", dir), "<html></html>")?;
		std::fs::write(format!("{}/notes.txt", dir), "notes")?;
		std::fs::write(format!("{}/data.bin", dir), &[0u8, 1, 2])?;

		let response = handle_get(&format!("{}/page.html", dir), "Thread-0")?;
		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.get_header("Content-Type"),
			Some("text/html; charset=utf-8")
		);
		assert_eq!(response.get_header("Content-Disposition"), None);

		let response = handle_get(&format!("{}/notes.txt", dir), "Thread-0")?;
		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.get_header("Content-Type"),
			Some("application/octet-stream")
		);
		assert_eq!(
			response.get_header("Content-Disposition"),
			Some("attachment; filename=\"notes.txt\"")
		);

		let response = handle_get(&format!("{}/data.bin", dir), "Thread-0")?;
		assert_eq!(response.status_code(), 415);

		let response = handle_get(&format!("{}/absent.html", dir), "Thread-0")?;
		assert_eq!(response.status_code(), 404);

		// a directory is not a regular file
		let response = handle_get(&dir, "Thread-0")?;
		assert_eq!(response.status_code(), 404);

		std::fs::remove_dir_all(&dir)?;
		Ok(())
	}

	#[test]
	fn test_error_response_page() -> Result<(), Error> {
		let mut response = error_response(404, "Not Found");
		assert_eq!(response.status_code(), 404);
		assert_eq!(response.status_text(), "Not Found");
		assert_eq!(
			response.get_header("Content-Type"),
			Some("text/html; charset=utf-8")
		);
		let bytes = response.to_bytes("srv");
		let text = std::str::from_utf8(&bytes)?;
		assert!(text.contains("<h1>404 Not Found</h1>"));
		Ok(())
	}
}
