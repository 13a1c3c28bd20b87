//! Testing and assertion macros

/// Asserts that the string representation of an expression matches a given wildcard pattern.
///
/// # Example
/// ```
/// use pmtiles_core::assert_wildcard;
/// let value = "archive_0001.pmtiles";
/// assert_wildcard!(value, "archive_*.pmtiles");
/// ```
#[macro_export]
macro_rules! assert_wildcard {
	($expression:expr, $wildcard:expr) => {
		let expression = format!("{}", $expression);
		if !wildmatch::WildMatch::new($wildcard).matches(&expression) {
			panic!(
				"assertion failed: expression \"{expression:?}\" does not match wildcard \"{}\"",
				$wildcard
			)
		}
	};
}
