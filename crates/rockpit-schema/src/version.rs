//! Rock version ordering.
//!
//! Versions are dotted segments with an optional numeric revision after the
//! last dash (`3.1.3-0`). A segment is a number with an optional alphabetic
//! suffix; a suffixed segment is a pre-release and orders before the bare
//! number (`2.0rc1 < 2.0`). A non-numeric dash suffix is a pre-release of the
//! last segment (`1.0-beta < 1.0`). Missing trailing segments count as zero.
//! `scm` and `dev` name development heads and order above every release.

use crate::dependency::ParseError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone)]
struct Segment {
    number: u64,
    pre: Option<String>,
}

const ZERO: Segment = Segment {
    number: 0,
    pre: None,
};

impl Segment {
    fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        let digits = raw.chars().take_while(char::is_ascii_digit).count();
        let number = if digits == 0 {
            0
        } else {
            raw[..digits].parse().ok()?
        };
        let pre = &raw[digits..];
        Some(Self {
            number,
            pre: (!pre.is_empty()).then(|| pre.to_ascii_lowercase()),
        })
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_pre(a, b),
            })
    }
}

// `rc9 < rc10`: the alphabetic tag first, then its trailing number.
fn compare_pre(a: &str, b: &str) -> Ordering {
    let (a_tag, a_num) = split_pre(a);
    let (b_tag, b_num) = split_pre(b);
    a_tag.cmp(b_tag).then_with(|| a_num.cmp(&b_num))
}

fn split_pre(pre: &str) -> (&str, Option<u64>) {
    let tag_len = pre.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (tag, digits) = pre.split_at(tag_len);
    (tag, digits.parse().ok())
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A parsed rock version. Equality follows the ordering, so `1.0` equals
/// `1.0.0`; [`RockVersion::as_str`] keeps the original spelling.
#[derive(Debug, Clone)]
pub struct RockVersion {
    original: String,
    head: bool,
    segments: Vec<Segment>,
    revision: u32,
}

impl RockVersion {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::Version(input.to_owned());
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (body, revision, dash_pre) = match trimmed.rsplit_once('-') {
            Some((body, rev)) if !rev.is_empty() && rev.chars().all(|c| c.is_ascii_digit()) => {
                (body, rev.parse().map_err(|_| invalid())?, None)
            }
            Some((body, pre)) => (body, 0, Some(pre)),
            None => (trimmed, 0, None),
        };

        let lowered = body.to_ascii_lowercase();
        if lowered == "scm" || lowered == "dev" {
            if dash_pre.is_some() {
                return Err(invalid());
            }
            return Ok(Self {
                original: trimmed.to_owned(),
                head: true,
                segments: Vec::new(),
                revision,
            });
        }

        if !body.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut segments = body
            .split('.')
            .map(Segment::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        if let Some(pre) = dash_pre {
            let last = segments.last_mut().ok_or_else(invalid)?;
            if last.pre.is_some() || pre.is_empty() || !pre.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(invalid());
            }
            last.pre = Some(pre.to_ascii_lowercase());
        }

        Ok(Self {
            original: trimmed.to_owned(),
            head: false,
            segments,
            revision,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_head(&self) -> bool {
        self.head
    }

    /// True when the first `prefix.len()` segments of `self` equal those of
    /// `prefix` (missing segments count as zero). Used by `~>`.
    pub fn has_prefix(&self, prefix: &RockVersion) -> bool {
        if self.head || prefix.head {
            return self.head == prefix.head;
        }
        prefix.segments.iter().enumerate().all(|(i, seg)| {
            self.segments.get(i).unwrap_or(&ZERO).cmp(seg) == Ordering::Equal
        })
    }
}

impl Ord for RockVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.head, other.head) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (true, true) => return self.revision.cmp(&other.revision),
            (false, false) => {}
        }
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&ZERO);
            let b = other.segments.get(i).unwrap_or(&ZERO);
            match a.cmp(b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for RockVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RockVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RockVersion {}

impl fmt::Display for RockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for RockVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns true iff `remote` is strictly newer than `local`.
///
/// Unparseable versions never compare as newer.
pub fn compare_versions(local: &str, remote: &str) -> bool {
    match (RockVersion::parse(local), RockVersion::parse(remote)) {
        (Ok(local), Ok(remote)) => remote > local,
        _ => false,
    }
}
