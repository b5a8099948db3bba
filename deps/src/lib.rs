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

//! Re-exports of the third party dependencies used by the mthttpd crates.
//! Keeping them in one place means a single version of each crate is used
//! across the whole workspace.

#[cfg(unix)]
pub use nix;

pub use chrono;
pub use colored;
pub use dirs;
pub use failure;
pub use lazy_static;
pub use libc;
pub use path_clean;
pub use portpicker;
pub use rand;
pub use serde_json;
