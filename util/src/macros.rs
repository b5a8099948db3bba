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

/// A macro that is used to lock a mutex and return the appropriate error if the lock is poisoned.
/// This code was used in many places, and this macro simplifies it. The caller must have
/// `Error` and `ErrorKind` from mthttpd_err in scope.
#[macro_export]
macro_rules! lock {
	($a:expr) => {
		$a.lock().map_err(|e| {
			let error: Error =
				ErrorKind::PoisonError(format!("Poison Error: {}", e.to_string())).into();
			error
		})
	};
}

