//! Order-preserving split of a sequence into fixed-capacity segments.
//!
//! The remote service caps how many operations one batch write may carry.
//! Splitting produces the fewest segments that respect the cap: every segment
//! but the last holds exactly `capacity` items, and concatenating the segments
//! in order yields the input unchanged.

use cloudhook_core::{Error, Result};

/// Number of segments `split` produces for `len` items: `ceil(len / capacity)`.
pub fn segment_count(len: usize, capacity: usize) -> Result<usize> {
  check_capacity(capacity)?;
  Ok(len.div_ceil(capacity))
}

/// Split `items` into segments of at most `capacity` items, cloning them.
///
/// An empty input yields no segments (not one empty segment).
pub fn split<T: Clone>(items: &[T], capacity: usize) -> Result<Vec<Vec<T>>> {
  check_capacity(capacity)?;
  Ok(items.chunks(capacity).map(<[T]>::to_vec).collect())
}

/// Same contract as [`split`], moving the items instead of cloning them.
pub fn split_owned<T>(items: Vec<T>, capacity: usize) -> Result<Vec<Vec<T>>> {
  check_capacity(capacity)?;

  let mut segments = Vec::with_capacity(items.len().div_ceil(capacity));
  let mut iter = items.into_iter().peekable();
  while iter.peek().is_some() {
    segments.push(iter.by_ref().take(capacity).collect());
  }
  Ok(segments)
}

fn check_capacity(capacity: usize) -> Result<()> {
  if capacity == 0 {
    return Err(Error::InvalidCapacity { capacity });
  }
  Ok(())
}
