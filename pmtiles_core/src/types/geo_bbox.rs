use anyhow::{Context, Result, ensure};
use std::{fmt::Debug, str::FromStr};

/// Latitude limit of the Web Mercator square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A geographic bounding box in degrees, `[west, south, east, north]`.
///
/// ```
/// use pmtiles_core::GeoBBox;
///
/// let mut bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
/// bbox.extend(&GeoBBox::new(-12.0, -3.0, 8.0, 6.0).unwrap());
/// assert_eq!(bbox.as_array(), [-12.0, -5.0, 10.0, 6.0]);
///
/// let parsed: GeoBBox = "13.0,52.0,14.0,53.0".parse().unwrap();
/// assert_eq!(parsed.center(), [13.5, 52.5]);
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl GeoBBox {
	/// Creates a validated bounding box from `west, south, east, north`.
	///
	/// # Errors
	/// Fails if a value leaves the WGS84 range or min exceeds max.
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
		.checked()
	}

	/// Creates a bounding box from two arbitrary corners, ordering and clamping them.
	#[must_use]
	pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> GeoBBox {
		GeoBBox {
			x_min: x0.min(x1).clamp(-180.0, 180.0),
			y_min: y0.min(y1).clamp(-90.0, 90.0),
			x_max: x0.max(x1).clamp(-180.0, 180.0),
			y_max: y0.max(y1).clamp(-90.0, 90.0),
		}
	}

	/// Clamps the box to the Web Mercator square.
	pub fn limit_to_mercator(&mut self) {
		self.y_min = self.y_min.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
		self.y_max = self.y_max.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
	}

	/// Grows this box to include `other`.
	pub fn extend(&mut self, other: &GeoBBox) {
		self.x_min = self.x_min.min(other.x_min);
		self.y_min = self.y_min.min(other.y_min);
		self.x_max = self.x_max.max(other.x_max);
		self.y_max = self.y_max.max(other.y_max);
	}

	#[must_use]
	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	/// The midpoint as `[lon, lat]`.
	#[must_use]
	pub fn center(&self) -> [f64; 2] {
		[(self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0]
	}

	fn checked(self) -> Result<Self> {
		ensure!(self.x_min >= -180., "x_min ({}) must be >= -180", self.x_min);
		ensure!(self.y_min >= -90., "y_min ({}) must be >= -90", self.y_min);
		ensure!(self.x_max <= 180., "x_max ({}) must be <= 180", self.x_max);
		ensure!(self.y_max <= 90., "y_max ({}) must be <= 90", self.y_max);
		ensure!(
			self.x_min <= self.x_max,
			"x_min ({}) must be <= x_max ({})",
			self.x_min,
			self.x_max
		);
		ensure!(
			self.y_min <= self.y_max,
			"y_min ({}) must be <= y_max ({})",
			self.y_min,
			self.y_max
		);
		Ok(self)
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"GeoBBox({}, {}, {}, {})",
			self.x_min, self.y_min, self.x_max, self.y_max
		)
	}
}

impl TryFrom<Vec<f64>> for GeoBBox {
	type Error = anyhow::Error;

	fn try_from(input: Vec<f64>) -> Result<Self> {
		ensure!(input.len() == 4, "bbox must contain exactly 4 numbers, got {}", input.len());
		GeoBBox::new(input[0], input[1], input[2], input[3])
	}
}

/// Parses `"west,south,east,north"`.
impl FromStr for GeoBBox {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		let values = s
			.split(',')
			.map(|part| {
				part
					.trim()
					.parse::<f64>()
					.with_context(|| format!("invalid number '{}' in bbox", part.trim()))
			})
			.collect::<Result<Vec<f64>>>()?;
		GeoBBox::try_from(values).with_context(|| format!("parsing bbox '{s}'"))
	}
}
