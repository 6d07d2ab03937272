//! Formatted dump/parse for [`crate::Bitmap`], used by the step-record
//! serializer (C7) to persist `core_bitmap` as a compact range string
//! instead of a raw word dump.

use crate::Bitmap;

pub use crate::BitmapError;

/// Render as comma-separated ranges, e.g. `0-3,5,7-9`. An empty bitmap
/// renders as the empty string.
pub fn dump(bitmap: &Bitmap) -> String {
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev = 0usize;

    for i in bitmap.iter_set() {
        match start {
            None => start = Some(i),
            Some(s) => {
                if i != prev + 1 {
                    push_range(&mut ranges, s, prev);
                    start = Some(i);
                }
            }
        }
        prev = i;
    }
    if let Some(s) = start {
        push_range(&mut ranges, s, prev);
    }
    ranges.join(",")
}

fn push_range(out: &mut Vec<String>, first: usize, last: usize) {
    if first == last {
        out.push(first.to_string());
    } else {
        out.push(format!("{first}-{last}"));
    }
}

/// Parse the inverse of [`dump`] into a bitmap of the given length.
///
/// Rejects indices outside `[0, len)` and malformed ranges (`hi < lo`,
/// non-numeric tokens) with [`BitmapError::Parse`].
pub fn parse(s: &str, len: usize) -> Result<Bitmap, BitmapError> {
    let mut bitmap = Bitmap::zeros(len);
    let s = s.trim();
    if s.is_empty() {
        return Ok(bitmap);
    }

    for token in s.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(BitmapError::Parse(format!("empty token in {s:?}")));
        }
        match token.split_once('-') {
            Some((lo, hi)) => {
                let lo: usize = lo
                    .trim()
                    .parse()
                    .map_err(|_| BitmapError::Parse(format!("bad range start in {token:?}")))?;
                let hi: usize = hi
                    .trim()
                    .parse()
                    .map_err(|_| BitmapError::Parse(format!("bad range end in {token:?}")))?;
                if hi < lo {
                    return Err(BitmapError::Parse(format!(
                        "descending range in {token:?}"
                    )));
                }
                if hi >= len {
                    return Err(BitmapError::Parse(format!(
                        "range {token:?} exceeds bitmap length {len}"
                    )));
                }
                bitmap.set_range(lo, hi);
            }
            None => {
                let i: usize = token
                    .parse()
                    .map_err(|_| BitmapError::Parse(format!("bad index {token:?}")))?;
                if i >= len {
                    return Err(BitmapError::Parse(format!(
                        "index {i} exceeds bitmap length {len}"
                    )));
                }
                bitmap.set(i);
            }
        }
    }
    Ok(bitmap)
}
