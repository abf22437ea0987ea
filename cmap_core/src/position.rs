use std::ops::Range;

use serde::Deserialize;
use serde::Serialize;

/// A point in a source file: 1-indexed `line` and `column` plus the 0-indexed
/// byte `offset`. Columns count bytes, not characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Point {
	pub fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// The first point of any document.
	pub fn start() -> Self {
		Self::new(1, 1, 0)
	}
}

/// A half-open span in a source file, from `start` (inclusive) to `end`
/// (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

impl Position {
	pub fn new(
		start_line: usize,
		start_column: usize,
		start_offset: usize,
		end_line: usize,
		end_column: usize,
		end_offset: usize,
	) -> Self {
		Self {
			start: Point::new(start_line, start_column, start_offset),
			end: Point::new(end_line, end_column, end_offset),
		}
	}

	/// The byte range covered by this position.
	pub fn to_range(&self) -> Range<usize> {
		self.start.offset..self.end.offset
	}

	/// Whether the given byte offset falls inside this position.
	pub fn contains_offset(&self, offset: usize) -> bool {
		offset >= self.start.offset && offset < self.end.offset
	}
}

/// Pre-computed table of line-start byte offsets for efficient offset-to-point
/// conversion. Instead of scanning the entire string for each offset (O(n*m)),
/// we build this table once (O(n)) and use binary search (O(log n)) per lookup.
#[derive(Debug)]
pub struct LineTable {
	/// Byte offsets of the start of each line. `line_starts[0]` is always 0.
	line_starts: Vec<usize>,
}

impl LineTable {
	pub fn new(content: &str) -> Self {
		let mut line_starts = vec![0];
		for (i, byte) in content.bytes().enumerate() {
			if byte == b'\n' {
				line_starts.push(i + 1);
			}
		}
		Self { line_starts }
	}

	/// Convert a byte offset to a [`Point`] (1-indexed line/column). Uses
	/// binary search over the pre-computed line table.
	pub fn point(&self, offset: usize) -> Point {
		// Binary search for the line containing this offset.
		let line_idx = match self.line_starts.binary_search(&offset) {
			Ok(exact) => exact,
			Err(insert) => insert.saturating_sub(1),
		};
		let line = line_idx + 1; // 1-indexed
		let column = offset - self.line_starts[line_idx] + 1; // 1-indexed

		Point {
			line,
			column,
			offset,
		}
	}

	/// Convert a byte range to a [`Position`].
	pub fn position(&self, range: Range<usize>) -> Position {
		Position {
			start: self.point(range.start),
			end: self.point(range.end),
		}
	}
}
