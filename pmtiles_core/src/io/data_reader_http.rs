//! This module provides functionality for reading byte ranges from HTTP(S) endpoints.
//!
//! # Overview
//!
//! `DataReaderHttp` issues `Range` requests through `reqwest`, insists on `206 Partial Content`
//! and checks the returned `Content-Range`. Connection failures and timeouts are retried with
//! exponential backoff. Object stores (S3, GCS, Azure) are reached through their HTTPS endpoints,
//! public or pre-signed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pmtiles_core::{io::{DataReaderHttp, DataReaderTrait}, ByteRange};
//! use anyhow::Result;
//! use reqwest::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let url = Url::parse("https://example.com/world.pmtiles")?;
//!     let reader = DataReaderHttp::from_url(url)?;
//!     let header = reader.read_range(&ByteRange::new(0, 127)).await?;
//!     println!("read {} bytes", header.len());
//!     Ok(())
//! }
//! ```

use super::{DataReaderTrait, storage_fetch_error};
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, anyhow, bail, ensure};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use reqwest::{Client, Method, Request, StatusCode, Url};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
pub struct DataReaderHttp {
	client: Client,
	name: String,
	url: Url,
}

impl DataReaderHttp {
	pub fn from_url(url: Url) -> Result<Box<DataReaderHttp>> {
		match url.scheme() {
			"http" | "https" => (),
			other => bail!("unsupported URL scheme '{other}' in '{url}', expected 'http' or 'https'"),
		}

		let client = Client::builder()
			.tcp_keepalive(Duration::from_secs(600))
			.connect_timeout(Duration::from_secs(10))
			.build()?;

		Ok(Box::new(DataReaderHttp {
			client,
			name: url.to_string(),
			url,
		}))
	}

	async fn fetch_range(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(range.length > 0, "cannot request an empty range");
		let request_range = format!("bytes={}-{}", range.offset, range.end() - 1);

		for attempt in 0..=MAX_RETRIES {
			if attempt > 0 {
				let backoff = Duration::from_secs(1 << (attempt - 1));
				log::warn!(
					"retry attempt {attempt}/{MAX_RETRIES} reading {range} from '{}', waiting {backoff:?}",
					self.url
				);
				sleep(backoff).await;
			}

			let mut request = Request::new(Method::GET, self.url.clone());
			request.headers_mut().append("range", request_range.parse()?);

			let response = match self.client.execute(request).await {
				Ok(r) => r,
				Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
					log::warn!("retryable error: {e}");
					continue;
				}
				Err(e) => return Err(e.into()),
			};

			if response.status() != StatusCode::PARTIAL_CONTENT {
				bail!("expected HTTP 206 (Partial Content), got {}", response.status());
			}

			let content_range = response
				.headers()
				.get("content-range")
				.ok_or_else(|| anyhow!("response is missing Content-Range header"))?
				.to_str()?
				.to_string();
			check_content_range(&content_range, range)?;

			let bytes = match response.bytes().await {
				Ok(b) => b,
				Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
					log::warn!("retryable error reading response body: {e}");
					continue;
				}
				Err(e) => return Err(e.into()),
			};

			ensure!(
				bytes.len() as u64 == range.length,
				"expected {} bytes, received {}",
				range.length,
				bytes.len()
			);
			return Ok(Blob::from(&*bytes));
		}

		bail!("request failed after {MAX_RETRIES} retries")
	}
}

const MAX_RETRIES: u32 = 3;

fn is_retryable_error(err: &reqwest::Error) -> bool {
	err.is_connect() || err.is_timeout() || err.is_body()
}

fn check_content_range(content_range: &str, range: &ByteRange) -> Result<()> {
	static RE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
		RegexBuilder::new(r"^bytes (\d+)-(\d+)/(\d+|\*)$")
			.case_insensitive(true)
			.build()
			.expect("static regex is valid")
	});

	let caps = RE_RANGE.captures(content_range).ok_or_else(|| {
		anyhow!("unexpected Content-Range format: '{content_range}', expected 'bytes <start>-<end>/<total>'")
	})?;
	let start: u64 = caps[1].parse().context("parsing Content-Range start")?;
	let end: u64 = caps[2].parse().context("parsing Content-Range end")?;

	ensure!(
		start == range.offset,
		"Content-Range start mismatch: expected {}, got {start}",
		range.offset
	);
	let expected_end = range.end() - 1;
	ensure!(
		end == expected_end,
		"Content-Range end mismatch: expected {expected_end}, got {end}"
	);
	Ok(())
}

#[async_trait]
impl DataReaderTrait for DataReaderHttp {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		self
			.fetch_range(range)
			.await
			.map_err(|e| storage_fetch_error(&self.name, range, &e))
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_url_checks_scheme() {
		assert!(DataReaderHttp::from_url(Url::parse("https://www.example.com").unwrap()).is_ok());
		assert!(DataReaderHttp::from_url(Url::parse("http://www.example.com").unwrap()).is_ok());
		assert_eq!(
			DataReaderHttp::from_url(Url::parse("ftp://www.example.com/").unwrap())
				.unwrap_err()
				.to_string(),
			"unsupported URL scheme 'ftp' in 'ftp://www.example.com/', expected 'http' or 'https'"
		);
	}

	#[test]
	fn get_name() -> Result<()> {
		let url = "https://www.example.com/tiles.pmtiles";
		let reader = DataReaderHttp::from_url(Url::parse(url)?)?;
		assert_eq!(reader.get_name(), url);
		Ok(())
	}

	#[test]
	fn content_range_validation() {
		let range = ByteRange::new(127, 100);
		assert!(check_content_range("bytes 127-226/5000", &range).is_ok());
		assert!(check_content_range("BYTES 127-226/*", &range).is_ok());
		assert_eq!(
			check_content_range("bytes 0-99/5000", &range).unwrap_err().to_string(),
			"Content-Range start mismatch: expected 127, got 0"
		);
		assert_eq!(
			check_content_range("bytes 127-200/5000", &range).unwrap_err().to_string(),
			"Content-Range end mismatch: expected 226, got 200"
		);
		assert!(check_content_range("127-226", &range).is_err());
	}
}
