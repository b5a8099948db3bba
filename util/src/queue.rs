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

use mthttpd_err::{Error, ErrorKind};
use mthttpd_log::*;

info!();

/// A fixed capacity FIFO queue. Items are moved in on [`BoundedQueue::enqueue`]
/// and moved out on [`BoundedQueue::dequeue`], so the queue can carry items
/// that own resources (sockets in particular). Enqueueing into a full queue
/// is an error; callers that want blocking behaviour pair the queue with a
/// condvar.
pub struct BoundedQueue<T> {
	data: Vec<Option<T>>,
	first: usize,
	last: usize,
	size: usize,
}

impl<T> BoundedQueue<T> {
	pub fn new(capacity: usize) -> Self {
		let mut data = Vec::with_capacity(capacity);
		for _ in 0..capacity {
			data.push(None);
		}
		Self {
			data,
			first: 0,
			last: 0,
			size: 0,
		}
	}

	pub fn enqueue(&mut self, item: T) -> Result<(), Error> {
		if self.size == self.capacity() {
			return Err(ErrorKind::CapacityExceeded(format!(
				"Queue capacity exceeded: {}",
				self.capacity()
			))
			.into());
		}
		self.size += 1;
		self.data[self.first] = Some(item);
		debug!("enqueue insert item into slot {}", self.first)?;
		self.first += 1;
		if self.first >= self.capacity() {
			self.first = 0;
		}
		Ok(())
	}

	pub fn dequeue(&mut self) -> Result<Option<T>, Error> {
		if self.size == 0 {
			return Ok(None);
		}
		self.size -= 1;
		let ret = self.data[self.last].take();
		self.last += 1;
		if self.last >= self.capacity() {
			self.last = 0;
		}
		Ok(ret)
	}

	pub fn capacity(&self) -> usize {
		self.data.len()
	}

	pub fn size(&self) -> usize {
		self.size
	}

	pub fn peek(&self, index: usize) -> Result<Option<&T>, Error> {
		if index >= self.size {
			return Err(ErrorKind::ArrayIndexOutofBounds(format!(
				"peek requested index {}. Size = {}.",
				index, self.size
			))
			.into());
		}
		let mut offset = self.last + index;
		if offset >= self.capacity() {
			offset -= self.capacity();
		}
		debug!("ret offset={}, last={}", offset, self.last)?;
		Ok(self.data[offset].as_ref())
	}

	pub fn clear(&mut self) -> Result<(), Error> {
		for slot in &mut self.data {
			*slot = None;
		}
		self.last = 0;
		self.first = 0;
		self.size = 0;
		Ok(())
	}
}
