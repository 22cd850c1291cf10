//! Byte-range resolution for media delivery
//!
//! Turns an optional `Range` header value plus the total size of a resource into a
//! [`ServingPlan`]. Pure logic with no I/O, so it is safe to call from any number of
//! request handlers concurrently.
//!
//! Only the single-range form `bytes=<start>-<end>` is understood. Either bound may be
//! omitted, but not both:
//!
//! - a missing start means `0` (this is *not* the RFC 7233 suffix form),
//! - a missing end means the last byte of the resource,
//! - an end past the resource is clamped to the last byte,
//! - a start at or past the end of the resource is rejected.
//!
//! Anything else, multi-range requests included, is unsatisfiable.

use std::sync::LazyLock;

use regex::Regex;

static SINGLE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^bytes=([0-9]*)-([0-9]*)$").expect("single-range pattern is valid")
});

/// Bounds parsed from a `Range` header, before they are checked against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeRequest {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl ByteRangeRequest {
    /// Parse a header value against the single-range grammar.
    ///
    /// Returns `None` when the value does not match, including `bytes=-` and any
    /// comma-separated list of ranges. Digit runs too long for `u64` saturate to
    /// `u64::MAX`, which the resolver then clamps (end) or rejects (start).
    pub fn parse(header: &str) -> Option<Self> {
        let captures = SINGLE_RANGE.captures(header)?;
        let start = parse_bound(captures.get(1).map_or("", |m| m.as_str()));
        let end = parse_bound(captures.get(2).map_or("", |m| m.as_str()));

        if start.is_none() && end.is_none() {
            return None;
        }

        Some(Self { start, end })
    }
}

fn parse_bound(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    // The pattern only admits ASCII digits, so overflow is the only way to fail.
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// How a single request for a resource of known size should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingPlan {
    /// No range requested: the whole resource, which may be empty.
    Full { total: u64 },
    /// A satisfiable range; `end` is inclusive and `start <= end < total`.
    Partial { start: u64, end: u64, total: u64 },
    /// The range could not be parsed or does not overlap the resource.
    Unsatisfiable { total: u64 },
}

impl ServingPlan {
    pub fn status_code(&self) -> u16 {
        match self {
            ServingPlan::Full { .. } => 200,
            ServingPlan::Partial { .. } => 206,
            ServingPlan::Unsatisfiable { .. } => 416,
        }
    }

    pub fn is_satisfiable(&self) -> bool {
        !matches!(self, ServingPlan::Unsatisfiable { .. })
    }

    pub fn total(&self) -> u64 {
        match *self {
            ServingPlan::Full { total }
            | ServingPlan::Partial { total, .. }
            | ServingPlan::Unsatisfiable { total } => total,
        }
    }

    /// First byte offset and number of bytes to send, or `None` when nothing is sent.
    pub fn window(&self) -> Option<(u64, u64)> {
        match *self {
            ServingPlan::Full { total } => Some((0, total)),
            ServingPlan::Partial { start, end, .. } => Some((start, end - start + 1)),
            ServingPlan::Unsatisfiable { .. } => None,
        }
    }

    /// Value of the `Content-Length` header for this plan.
    pub fn content_length(&self) -> u64 {
        self.window().map_or(0, |(_, len)| len)
    }

    /// Value of the `Content-Range` header, if the plan carries one.
    pub fn content_range(&self) -> Option<String> {
        match *self {
            ServingPlan::Full { .. } => None,
            ServingPlan::Partial { start, end, total } => {
                Some(format!("bytes {}-{}/{}", start, end, total))
            }
            ServingPlan::Unsatisfiable { total } => Some(format!("bytes */{}", total)),
        }
    }
}

/// Compute the serving plan for a resource of `total` bytes.
pub fn resolve(range_header: Option<&str>, total: u64) -> ServingPlan {
    let Some(header) = range_header else {
        return ServingPlan::Full { total };
    };

    let Some(request) = ByteRangeRequest::parse(header) else {
        return ServingPlan::Unsatisfiable { total };
    };

    let start = request.start.unwrap_or(0);
    let end = request.end.unwrap_or_else(|| total.saturating_sub(1));

    if end < start {
        return ServingPlan::Unsatisfiable { total };
    }

    // Checked before clamping: a start exactly at `total` is rejected, not clamped.
    if start >= total {
        return ServingPlan::Unsatisfiable { total };
    }

    ServingPlan::Partial {
        start,
        end: end.min(total - 1),
        total,
    }
}
