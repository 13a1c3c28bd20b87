//! An in-memory `DataReaderTrait` backend, used for small archives and tests.

use super::{DataReaderTrait, storage_fetch_error};
use crate::{Blob, ByteRange};
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug)]
pub struct DataReaderBlob {
	name: String,
	blob: Blob,
}

impl DataReaderBlob {
	pub fn new(name: &str, blob: Blob) -> DataReaderBlob {
		DataReaderBlob {
			name: name.to_string(),
			blob,
		}
	}

	pub fn len(&self) -> u64 {
		self.blob.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blob.is_empty()
	}
}

impl From<Blob> for DataReaderBlob {
	fn from(blob: Blob) -> Self {
		DataReaderBlob::new("memory", blob)
	}
}

impl From<Vec<u8>> for DataReaderBlob {
	fn from(data: Vec<u8>) -> Self {
		DataReaderBlob::from(Blob::from(data))
	}
}

#[async_trait]
impl DataReaderTrait for DataReaderBlob {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		self
			.blob
			.read_range(range)
			.map_err(|e| storage_fetch_error(&self.name, range, &e))
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ArchiveError;

	#[tokio::test]
	async fn read_inside_and_outside() -> Result<()> {
		let reader = DataReaderBlob::from(vec![1, 2, 3, 4, 5]);
		assert_eq!(reader.len(), 5);
		assert_eq!(reader.get_name(), "memory");
		assert_eq!(reader.read_range(&ByteRange::new(3, 2)).await?.as_slice(), &[4, 5]);

		let err = reader.read_range(&ByteRange::new(3, 3)).await.unwrap_err();
		assert!(matches!(
			ArchiveError::find(&err),
			Some(ArchiveError::StorageFetch { .. })
		));
		Ok(())
	}
}
