//! Immutable flattened configuration.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::Bound;

use crate::ScalarValue;
use crate::path::{self, KEY_DELIMITER};

/// One complete version of the flat key/value mapping.
///
/// Snapshots are built off to the side and published whole by
/// [`SnapshotStore`](crate::SnapshotStore); readers never observe a partially
/// rebuilt mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
	entries: BTreeMap<String, ScalarValue>,
	generation: u64,
}

impl Snapshot {
	pub fn new(entries: BTreeMap<String, ScalarValue>, generation: u64) -> Self {
		Self { entries, generation }
	}

	/// Empty snapshot at generation 0.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Publication counter; 0 until the first load.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn get(&self, key: &str) -> Option<&ScalarValue> {
		self.entries.get(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, ScalarValue> {
		self.entries.iter()
	}

	/// Immediate child segments of `parent`, merged with `earlier`.
	///
	/// `None` or an empty parent lists top-level segments. The result is
	/// de-duplicated and ordered with [`path::compare_segments`].
	pub fn child_keys<I, S>(&self, earlier: I, parent: Option<&str>) -> Vec<String>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut keys: Vec<String> = earlier.into_iter().map(Into::into).collect();

		match parent.filter(|p| !p.is_empty()) {
			None => keys.extend(self.entries.keys().map(|key| path::segment_at(key, 0).to_string())),
			Some(parent) => {
				let prefix = path::child(parent, "");
				// Keys sharing the prefix are contiguous in the ordered map.
				keys.extend(
					self.entries
						.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
						.map(|(key, _)| key)
						.take_while(|key| key.starts_with(&prefix))
						.map(|key| path::segment_at(key, prefix.len()).to_string()),
				);
			}
		}

		keys.sort_by(|a, b| path::compare_segments(a, b));
		keys.dedup();
		keys
	}

	/// Every key under `prefix`, with the prefix and its delimiter stripped.
	pub fn section<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a ScalarValue)> + 'a {
		self.entries.iter().filter_map(move |(key, value)| {
			key.strip_prefix(prefix)
				.and_then(|rest| rest.strip_prefix(KEY_DELIMITER))
				.map(|rest| (rest, value))
		})
	}
}

impl<'a> IntoIterator for &'a Snapshot {
	type Item = (&'a String, &'a ScalarValue);
	type IntoIter = btree_map::Iter<'a, String, ScalarValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

#[cfg(test)]
mod tests;
