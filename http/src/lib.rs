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

//! A multi-threaded HTTP/1.1 origin server implemented directly over TCP.
//! The server serves static HTML and binary assets from a configured
//! document root, accepts JSON document uploads, validates the request
//! target and Host header before any filesystem access, and sustains
//! persistent connections under a bounded worker pool.

mod conn;
mod handlers;
mod http;
mod types;

pub use crate::conn::HandoffItem;
pub use crate::http::HttpServer;
pub use crate::types::{HttpConfig, HttpMethod, HttpRequest, HttpResponse, HttpVersion};
