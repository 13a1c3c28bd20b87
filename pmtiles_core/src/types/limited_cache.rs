//! This module provides a generic least-recently-used cache bounded by a byte budget.
//!
//! Each value reports its own weight through [`CacheWeight`]. Adding a value evicts the
//! least recently used entries until the new value fits. A value heavier than the whole
//! budget is returned to the caller but not retained.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::{CacheWeight, LimitedCache};
//!
//! #[derive(Clone)]
//! struct Chunk(Vec<u8>);
//! impl CacheWeight for Chunk {
//! 	fn cache_weight(&self) -> usize {
//! 		self.0.len()
//! 	}
//! }
//!
//! let mut cache = LimitedCache::<u32, Chunk>::with_maximum_size(100);
//! cache.add(1, Chunk(vec![0; 60]));
//! cache.add(2, Chunk(vec![0; 60]));
//! assert!(cache.get(&1).is_none());
//! assert!(cache.get(&2).is_some());
//! ```

use std::{
	collections::{BTreeMap, HashMap},
	fmt::Debug,
	hash::Hash,
	sync::Arc,
};

/// Approximate number of bytes a cached value occupies.
pub trait CacheWeight {
	fn cache_weight(&self) -> usize;
}

impl<T: CacheWeight> CacheWeight for Arc<T> {
	fn cache_weight(&self) -> usize {
		self.as_ref().cache_weight()
	}
}

/// A generic cache that stores key-value pairs up to a total weight.
pub struct LimitedCache<K, V> {
	cache: HashMap<K, (V, u64)>,
	access_order: BTreeMap<u64, K>,
	current_size: usize,
	maximum_size: usize,
	last_index: u64,
}

impl<K, V> LimitedCache<K, V>
where
	V: Clone + CacheWeight,
	K: Clone + Eq + Hash,
{
	/// Creates a new `LimitedCache` holding at most `maximum_size` bytes.
	/// A budget of `0` caches nothing.
	pub fn with_maximum_size(maximum_size: usize) -> Self {
		Self {
			cache: HashMap::new(),
			access_order: BTreeMap::new(),
			current_size: 0,
			maximum_size,
			last_index: 0,
		}
	}

	/// Retrieves a value and marks it as most recently used.
	pub fn get(&mut self, key: &K) -> Option<V> {
		let (value, index) = self.cache.get_mut(key)?;
		self.last_index += 1;
		let previous = std::mem::replace(index, self.last_index);
		self.access_order.remove(&previous);
		self.access_order.insert(self.last_index, key.clone());
		Some(value.clone())
	}

	/// Adds a key-value pair, evicting least recently used entries until it fits.
	///
	/// Returns the value just inserted (for chaining or further manipulation).
	pub fn add(&mut self, key: K, value: V) -> V {
		self.remove(&key);

		let weight = value.cache_weight();
		if weight > self.maximum_size {
			return value;
		}

		while self.current_size + weight > self.maximum_size {
			if !self.evict_oldest() {
				break;
			}
		}

		self.last_index += 1;
		self.current_size += weight;
		self.access_order.insert(self.last_index, key.clone());
		self.cache.insert(key, (value.clone(), self.last_index));
		value
	}

	/// Removes an entry, returning its value.
	pub fn remove(&mut self, key: &K) -> Option<V> {
		let (value, index) = self.cache.remove(key)?;
		self.access_order.remove(&index);
		self.current_size -= value.cache_weight();
		Some(value)
	}

	/// Sum of the weights of all cached values.
	pub fn size(&self) -> usize {
		self.current_size
	}

	pub fn len(&self) -> usize {
		self.cache.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	fn evict_oldest(&mut self) -> bool {
		match self.access_order.pop_first() {
			Some((_, key)) => {
				if let Some((value, _)) = self.cache.remove(&key) {
					self.current_size -= value.cache_weight();
				}
				true
			}
			None => false,
		}
	}
}

impl<K, V> Debug for LimitedCache<K, V> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LimitedCache")
			.field("length", &self.cache.len())
			.field("current_size", &self.current_size)
			.field("maximum_size", &self.maximum_size)
			.finish()
	}
}
