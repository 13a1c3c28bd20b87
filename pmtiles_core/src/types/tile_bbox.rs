//! This module defines the `TileBBox` struct, an inclusive rectangle of tiles on one zoom level.
//!
//! A `TileBBox` also answers containment for tiles on *other* levels: a tile is
//! contained when its footprint intersects the rectangle. Lower-zoom ancestors of
//! covered tiles are therefore contained, as are all descendants.

use super::{GeoBBox, TileCoord, tile_coord::MAX_LEVEL};
use anyhow::{Context, Result, ensure};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TileBBox {
	pub level: u8,
	pub x_min: u32,
	pub y_min: u32,
	pub x_max: u32,
	pub y_max: u32,
}

impl TileBBox {
	/// Creates a new inclusive `TileBBox`.
	///
	/// # Errors
	///
	/// - If `level` > 31.
	/// - If any coordinate exceeds the maximum allowed by the zoom level.
	/// - If `x_min > x_max` or `y_min > y_max`.
	pub fn new(level: u8, x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Result<TileBBox> {
		ensure!(level <= MAX_LEVEL, "level ({level}) must be <= {MAX_LEVEL}");

		let max = ((1u64 << level) - 1) as u32;

		ensure!(x_max <= max, "x_max ({x_max}) must be <= max ({max})");
		ensure!(y_max <= max, "y_max ({y_max}) must be <= max ({max})");
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");

		Ok(TileBBox {
			level,
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// The whole level.
	pub fn new_full(level: u8) -> Result<TileBBox> {
		let max = ((1u64 << level.min(MAX_LEVEL)) - 1) as u32;
		TileBBox::new(level, 0, 0, max, max)
	}

	/// All tiles at `level` touched by a geographic bounding box.
	pub fn from_geo(level: u8, bbox: &GeoBBox) -> Result<TileBBox> {
		let p_min = TileCoord::from_geo(bbox.x_min, bbox.y_max, level)?;
		let p_max = TileCoord::from_geo(bbox.x_max, bbox.y_min, level)?;
		TileBBox::new(level, p_min.x, p_min.y, p_max.x, p_max.y)
			.with_context(|| format!("converting {bbox:?} to tiles at level {level}"))
	}

	#[must_use]
	pub fn count_tiles(&self) -> u64 {
		u64::from(self.x_max - self.x_min + 1) * u64::from(self.y_max - self.y_min + 1)
	}

	/// Whether the footprint of `coord` intersects this rectangle.
	///
	/// ```
	/// use pmtiles_core::{TileBBox, TileCoord};
	///
	/// let bbox = TileBBox::new(2, 1, 1, 2, 2).unwrap();
	/// assert!(bbox.contains(&TileCoord::new(2, 1, 2).unwrap()));
	/// assert!(!bbox.contains(&TileCoord::new(2, 0, 2).unwrap()));
	/// // the root covers everything
	/// assert!(bbox.contains(&TileCoord::new(0, 0, 0).unwrap()));
	/// // descendants of covered tiles
	/// assert!(bbox.contains(&TileCoord::new(4, 4, 11).unwrap()));
	/// assert!(!bbox.contains(&TileCoord::new(4, 12, 11).unwrap()));
	/// ```
	#[must_use]
	pub fn contains(&self, coord: &TileCoord) -> bool {
		if coord.level <= self.level {
			let shift = self.level - coord.level;
			let (x_min, y_min) = (self.x_min >> shift, self.y_min >> shift);
			let (x_max, y_max) = (self.x_max >> shift, self.y_max >> shift);
			coord.x >= x_min && coord.x <= x_max && coord.y >= y_min && coord.y <= y_max
		} else {
			let shift = coord.level - self.level;
			let (x, y) = (coord.x >> shift, coord.y >> shift);
			x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
		}
	}

	/// The geographic area covered by this rectangle.
	#[must_use]
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [west, north] = TileCoord::coord_to_geo(self.level, self.x_min, self.y_min);
		let [east, south] = TileCoord::coord_to_geo(self.level, self.x_max + 1, self.y_max + 1);
		GeoBBox::from_corners(west, south, east, north)
	}
}

impl fmt::Debug for TileBBox {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}: [{},{},{},{}] ({})",
			self.level,
			self.x_min,
			self.y_min,
			self.x_max,
			self.y_max,
			self.count_tiles()
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn new_validates() {
		assert!(TileBBox::new(2, 0, 0, 3, 3).is_ok());
		assert_eq!(
			TileBBox::new(2, 0, 0, 4, 3).unwrap_err().to_string(),
			"x_max (4) must be <= max (3)"
		);
		assert_eq!(
			TileBBox::new(2, 2, 0, 1, 3).unwrap_err().to_string(),
			"x_min (2) must be <= x_max (1)"
		);
		assert!(TileBBox::new(32, 0, 0, 0, 0).is_err());
	}

	#[test]
	fn full_levels() {
		assert_eq!(TileBBox::new_full(0).unwrap().count_tiles(), 1);
		assert_eq!(TileBBox::new_full(3).unwrap().count_tiles(), 64);
		assert_eq!(TileBBox::new_full(31).unwrap().x_max, (1u32 << 31) - 1);
	}

	#[rstest]
	#[case(3, 2, 2, true)]
	#[case(3, 5, 5, true)]
	#[case(3, 6, 5, false)]
	#[case(3, 1, 3, false)]
	#[case(2, 1, 1, true)]
	#[case(2, 3, 3, false)]
	#[case(1, 0, 0, true)]
	#[case(1, 1, 1, true)]
	#[case(0, 0, 0, true)]
	#[case(5, 8, 8, true)]
	#[case(5, 23, 23, true)]
	#[case(5, 24, 8, false)]
	fn contains_across_levels(#[case] level: u8, #[case] x: u32, #[case] y: u32, #[case] expected: bool) {
		let bbox = TileBBox::new(3, 2, 2, 5, 5).unwrap();
		assert_eq!(bbox.contains(&TileCoord::new(level, x, y).unwrap()), expected);
	}

	#[test]
	fn from_geo_world_and_back() {
		let world = GeoBBox::new(-180.0, -85.0, 180.0, 85.0).unwrap();
		assert_eq!(TileBBox::from_geo(2, &world).unwrap(), TileBBox::new_full(2).unwrap());

		let bbox = TileBBox::new(1, 1, 0, 1, 0).unwrap();
		let geo = bbox.to_geo_bbox();
		assert_eq!(geo.x_min, 0.0);
		assert_eq!(geo.x_max, 180.0);
		assert!(geo.y_min.abs() < 1e-9);
	}

	#[test]
	fn debug_format() {
		let bbox = TileBBox::new(4, 1, 2, 3, 4).unwrap();
		assert_eq!(format!("{bbox:?}"), "4: [1,2,3,4] (9)");
	}
}
