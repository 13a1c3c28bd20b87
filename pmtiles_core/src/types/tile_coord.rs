//! Three-dimensional tile coordinates in a Web Mercator pyramid and their tile ids.
//!
//! A tile id is the position of a tile on the Hilbert curve of its level, plus the
//! number of tiles on all lower levels. Ids are therefore contiguous per level,
//! levels are ordered, and neighbouring tiles tend to get neighbouring ids.
//!
//! # Examples
//!
//! ```
//! use pmtiles_core::TileCoord;
//!
//! let coord = TileCoord::new(3, 5, 3).unwrap();
//! assert_eq!(coord.tile_id(), 73);
//! assert_eq!(TileCoord::from_tile_id(73).unwrap(), coord);
//!
//! let zoomed = coord.at_level(5);
//! assert_eq!((zoomed.x, zoomed.y), (20, 12));
//! ```

use super::GeoBBox;
use anyhow::{Context, Result, bail, ensure};
use std::{
	f64::consts::PI,
	fmt::{self, Debug},
};

/// Highest zoom level whose tile ids fit into 64 bits.
pub const MAX_LEVEL: u8 = 31;

/// A tile coordinate: zoom `level`, column `x` and row `y` (XYZ scheme, y grows southwards).
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub level: u8,
	pub x: u32,
	pub y: u32,
}

impl TileCoord {
	/// Create a new `TileCoord`.
	///
	/// # Errors
	/// Returns an error if `level` > 31 or `x`/`y` lie outside the level.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= MAX_LEVEL, "level ({level}) must be <= {MAX_LEVEL}");
		let max = 1u64 << level;
		ensure!(u64::from(x) < max, "x ({x}) out of bounds for level {level}");
		ensure!(u64::from(y) < max, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// Create a `TileCoord` from a longitude/latitude position at zoom level `z`.
	///
	/// Positions outside the Mercator square are clamped onto the border tiles.
	///
	/// ```
	/// use pmtiles_core::TileCoord;
	///
	/// let coord = TileCoord::from_geo(13.404954, 52.520008, 10).unwrap();
	/// assert_eq!((coord.x, coord.y), (550, 335));
	/// ```
	pub fn from_geo(lon: f64, lat: f64, z: u8) -> Result<TileCoord> {
		ensure!(z <= MAX_LEVEL, "z ({z}) must be <= {MAX_LEVEL}");
		ensure!((-180.0..=180.0).contains(&lon), "longitude ({lon}) must be within [-180, 180]");
		ensure!((-90.0..=90.0).contains(&lat), "latitude ({lat}) must be within [-90, 90]");

		let zoom = 2.0f64.powi(i32::from(z));
		let x = zoom * (lon / 360.0 + 0.5);
		let y = zoom * (0.5 - 0.5 * (lat * PI / 360.0 + PI / 4.0).tan().ln() / PI);

		// NaN (lat = ±90) falls through max/min to the border
		let clamp = |v: f64| v.min(zoom - 1.0).max(0.0).floor() as u32;
		TileCoord::new(z, clamp(x), clamp(y)).with_context(|| format!("converting ({lon}, {lat}) at zoom {z}"))
	}

	/// The north-west corner of tile (`x`, `y`) at `level`, as `[lon, lat]` in degrees.
	pub fn coord_to_geo(level: u8, x: u32, y: u32) -> [f64; 2] {
		let zoom = 2.0f64.powi(i32::from(level));
		[
			(f64::from(x) / zoom - 0.5) * 360.0,
			((PI * (1.0 - 2.0 * f64::from(y) / zoom)).exp().atan() / PI - 0.25) * 360.0,
		]
	}

	#[must_use]
	pub fn as_geo(&self) -> [f64; 2] {
		TileCoord::coord_to_geo(self.level, self.x, self.y)
	}

	/// The geographic extent of this tile.
	#[must_use]
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [west, north] = self.as_geo();
		let [east, south] = TileCoord::coord_to_geo(self.level, self.x + 1, self.y + 1);
		GeoBBox::from_corners(west, south, east, north)
	}

	/// This coordinate moved to another zoom `level`. Going up returns the
	/// north-west descendant, going down returns the ancestor.
	#[must_use]
	pub fn at_level(&self, level: u8) -> TileCoord {
		if level > self.level {
			let shift = level - self.level;
			TileCoord {
				level,
				x: self.x << shift,
				y: self.y << shift,
			}
		} else {
			let shift = self.level - level;
			TileCoord {
				level,
				x: self.x >> shift,
				y: self.y >> shift,
			}
		}
	}

	/// Largest valid x or y on this level.
	#[must_use]
	pub fn max_value(&self) -> u32 {
		((1u64 << self.level) - 1) as u32
	}

	/// Converts between TMS (y grows northwards) and XYZ rows.
	pub fn flip_y(&mut self) {
		self.y = self.max_value() - self.y;
	}

	/// The tile id of this coordinate.
	#[must_use]
	pub fn tile_id(&self) -> u64 {
		tiles_below_level(self.level) + hilbert_index(self.x, self.y, self.level)
	}

	/// Inverse of [`TileCoord::tile_id`].
	///
	/// # Errors
	/// Returns an error for ids beyond level 31.
	pub fn from_tile_id(tile_id: u64) -> Result<TileCoord> {
		let mut acc: u64 = 0;
		for level in 0..=MAX_LEVEL {
			let num_tiles = 1u64 << (2 * u32::from(level));
			if tile_id - acc < num_tiles {
				let (x, y) = hilbert_coord(tile_id - acc, level);
				return Ok(TileCoord { level, x, y });
			}
			acc += num_tiles;
		}
		bail!("tile id {tile_id} exceeds the 64-bit zoom limit")
	}

	/// Range of tile ids `first..=last` used by `level`.
	#[must_use]
	pub fn level_id_range(level: u8) -> (u64, u64) {
		let first = tiles_below_level(level);
		(first, first + (1u64 << (2 * u32::from(level))) - 1)
	}
}

/// Number of tiles on all levels below `level`: `(4^level - 1) / 3`.
fn tiles_below_level(level: u8) -> u64 {
	((1u64 << (2 * u32::from(level))) - 1) / 3
}

fn hilbert_index(x: u32, y: u32, level: u8) -> u64 {
	let mut tx = u64::from(x);
	let mut ty = u64::from(y);
	let mut d: u64 = 0;
	let n = 1u64 << level;
	let mut s = n / 2;
	while s > 0 {
		let rx = u64::from(tx & s > 0);
		let ry = u64::from(ty & s > 0);
		d += s * s * ((3 * rx) ^ ry);
		// reflect within the whole grid, tx and ty may still exceed s
		rotate(n, &mut tx, &mut ty, rx, ry);
		s /= 2;
	}
	d
}

fn hilbert_coord(index: u64, level: u8) -> (u32, u32) {
	let n = 1u64 << level;
	let mut t = index;
	let mut tx: u64 = 0;
	let mut ty: u64 = 0;
	let mut s: u64 = 1;
	while s < n {
		let rx = (t / 2) & 1;
		let ry = (t ^ rx) & 1;
		rotate(s, &mut tx, &mut ty, rx, ry);
		tx += s * rx;
		ty += s * ry;
		t /= 4;
		s *= 2;
	}
	(tx as u32, ty as u32)
}

fn rotate(s: u64, tx: &mut u64, ty: &mut u64, rx: u64, ry: u64) {
	if ry == 0 {
		if rx == 1 {
			*tx = s - 1 - *tx;
			*ty = s - 1 - *ty;
		}
		std::mem::swap(tx, ty);
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

impl fmt::Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}
