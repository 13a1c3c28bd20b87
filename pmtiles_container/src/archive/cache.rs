//! A byte-budgeted cache of decoded directories, shared by every archive of a process.
//!
//! Entries are keyed by `(archive id, absolute byte offset)`. Concurrent misses on the same
//! key are collapsed: the first caller fetches, the others wait for it and then read the
//! cache. If the fetching request fails or is dropped, one of the waiters takes over.
//! Failed fetches are never cached.
//!
//! ```rust
//! use pmtiles_container::{Directory, DirectoryCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = DirectoryCache::new(1 << 20);
//!     let directory = cache.get_or_fetch((1, 127), || async { Ok(Directory::new()) }).await?;
//!     assert!(directory.is_empty());
//!     assert_eq!(cache.stats().misses, 1);
//!
//!     cache.get_or_fetch((1, 127), || async { unreachable!() }).await?;
//!     assert_eq!(cache.stats().hits, 1);
//!     Ok(())
//! }
//! ```

use super::Directory;
use anyhow::Result;
use parking_lot::Mutex;
use pmtiles_core::LimitedCache;
use std::{
	collections::HashMap,
	fmt::Debug,
	future::Future,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
use tokio::sync::watch;

/// `(archive id, absolute byte offset of the directory)`
pub type DirectoryKey = (u64, u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub entries: usize,
	pub bytes: usize,
}

pub struct DirectoryCache {
	cache: Mutex<LimitedCache<DirectoryKey, Arc<Directory>>>,
	in_flight: Mutex<HashMap<DirectoryKey, watch::Receiver<()>>>,
	hits: AtomicU64,
	misses: AtomicU64,
	maximum_size: usize,
}

impl DirectoryCache {
	/// Creates a cache holding at most `maximum_size` bytes of decoded directories.
	/// `0` disables caching; concurrent fetches are still collapsed.
	pub fn new(maximum_size: usize) -> DirectoryCache {
		DirectoryCache {
			cache: Mutex::new(LimitedCache::with_maximum_size(maximum_size)),
			in_flight: Mutex::new(HashMap::new()),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			maximum_size,
		}
	}

	pub fn get(&self, key: &DirectoryKey) -> Option<Arc<Directory>> {
		self.cache.lock().get(key)
	}

	/// Inserts a directory, evicting the least recently used ones until it fits.
	pub fn put(&self, key: DirectoryKey, directory: Arc<Directory>) {
		self.cache.lock().add(key, directory);
	}

	/// Returns the cached directory for `key`, or runs `fetch` once for all concurrent callers.
	pub async fn get_or_fetch<F, Fut>(&self, key: DirectoryKey, fetch: F) -> Result<Arc<Directory>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Directory>>,
	{
		loop {
			if let Some(directory) = self.get(&key) {
				self.hits.fetch_add(1, Ordering::Relaxed);
				return Ok(directory);
			}

			let role = {
				let mut in_flight = self.in_flight.lock();
				// the leader may have finished between the first check and taking the lock
				if let Some(directory) = self.get(&key) {
					self.hits.fetch_add(1, Ordering::Relaxed);
					return Ok(directory);
				}
				match in_flight.get(&key) {
					Some(receiver) => Role::Follow(receiver.clone()),
					None => {
						let (sender, receiver) = watch::channel(());
						in_flight.insert(key, receiver);
						Role::Lead(sender)
					}
				}
			};

			match role {
				Role::Lead(sender) => {
					self.misses.fetch_add(1, Ordering::Relaxed);
					return self.lead(key, sender, fetch).await;
				}
				Role::Follow(mut receiver) => {
					log::trace!("waiting for directory fetch {key:?}");
					// resolves with an error once the leader's sender is dropped
					let _ = receiver.changed().await;
				}
			}
		}
	}

	async fn lead<F, Fut>(&self, key: DirectoryKey, sender: watch::Sender<()>, fetch: F) -> Result<Arc<Directory>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Directory>>,
	{
		let _guard = InFlightGuard {
			cache: self,
			key,
			_sender: sender,
		};
		let directory = Arc::new(fetch().await?);
		self.put(key, directory.clone());
		Ok(directory)
	}

	pub fn stats(&self) -> CacheStats {
		let cache = self.cache.lock();
		CacheStats {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			entries: cache.len(),
			bytes: cache.size(),
		}
	}

	pub fn maximum_size(&self) -> usize {
		self.maximum_size
	}
}

impl Debug for DirectoryCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DirectoryCache")
			.field("maximum_size", &self.maximum_size)
			.field("stats", &self.stats())
			.finish()
	}
}

enum Role {
	Lead(watch::Sender<()>),
	Follow(watch::Receiver<()>),
}

/// Clears the in-flight slot when the leading fetch completes, fails or is dropped.
/// Dropping the sender afterwards wakes every waiter.
struct InFlightGuard<'a> {
	cache: &'a DirectoryCache,
	key: DirectoryKey,
	_sender: watch::Sender<()>,
}

impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		self.cache.in_flight.lock().remove(&self.key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Entry;
	use anyhow::bail;
	use pmtiles_core::ByteRange;
	use std::{sync::atomic::AtomicUsize, time::Duration};
	use tokio::time::sleep;

	fn directory(entries: u64) -> Directory {
		Directory::from(
			(0..entries)
				.map(|i| Entry::new(i, ByteRange::new(i * 10, 10), 1))
				.collect::<Vec<_>>(),
		)
	}

	#[tokio::test]
	async fn budget_evicts_least_recently_used() {
		let weight = pmtiles_core::CacheWeight::cache_weight(&directory(10));
		let cache = DirectoryCache::new(weight * 2);
		cache.put((1, 0), Arc::new(directory(10)));
		cache.put((1, 100), Arc::new(directory(10)));
		assert!(cache.get(&(1, 0)).is_some());
		cache.put((2, 0), Arc::new(directory(10)));

		assert!(cache.get(&(1, 100)).is_none());
		assert!(cache.get(&(1, 0)).is_some());
		assert!(cache.get(&(2, 0)).is_some());
		assert_eq!(cache.stats().entries, 2);
		assert_eq!(cache.stats().bytes, weight * 2);
	}

	#[tokio::test]
	async fn zero_budget_disables_caching() -> Result<()> {
		let cache = DirectoryCache::new(0);
		for _ in 0..3 {
			cache.get_or_fetch((1, 127), || async { Ok(directory(2)) }).await?;
		}
		let stats = cache.stats();
		assert_eq!((stats.hits, stats.misses, stats.entries), (0, 3, 0));
		Ok(())
	}

	#[tokio::test]
	async fn failures_are_not_cached() -> Result<()> {
		let cache = DirectoryCache::new(1 << 20);
		let result = cache.get_or_fetch((1, 127), || async { bail!("network down") }).await;
		assert_eq!(result.unwrap_err().to_string(), "network down");
		assert!(cache.get(&(1, 127)).is_none());

		let directory = cache.get_or_fetch((1, 127), || async { Ok(directory(3)) }).await?;
		assert_eq!(directory.len(), 3);
		Ok(())
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_misses_fetch_once() -> Result<()> {
		let cache = Arc::new(DirectoryCache::new(1 << 20));
		let fetches = Arc::new(AtomicUsize::new(0));

		let tasks = (0..16)
			.map(|_| {
				let cache = cache.clone();
				let fetches = fetches.clone();
				tokio::spawn(async move {
					cache
						.get_or_fetch((7, 500), || async {
							fetches.fetch_add(1, Ordering::SeqCst);
							sleep(Duration::from_millis(50)).await;
							Ok(directory(4))
						})
						.await
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			assert_eq!(task.await??.len(), 4);
		}
		assert_eq!(fetches.load(Ordering::SeqCst), 1);
		assert_eq!(cache.stats().misses, 1);
		Ok(())
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
	async fn dropped_leader_hands_over() -> Result<()> {
		let cache = Arc::new(DirectoryCache::new(1 << 20));

		let leader = {
			let cache = cache.clone();
			tokio::spawn(async move {
				cache
					.get_or_fetch((1, 127), || async {
						sleep(Duration::from_secs(60)).await;
						Ok(directory(1))
					})
					.await
			})
		};
		sleep(Duration::from_millis(50)).await;

		let follower = {
			let cache = cache.clone();
			tokio::spawn(async move { cache.get_or_fetch((1, 127), || async { Ok(directory(2)) }).await })
		};
		sleep(Duration::from_millis(50)).await;
		leader.abort();

		let directory = tokio::time::timeout(Duration::from_secs(5), follower).await???;
		assert_eq!(directory.len(), 2);
		Ok(())
	}
}
