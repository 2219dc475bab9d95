//! Split validation and the split operator record

use crate::common::{Error, Result};
use crate::coordinator::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checks that `left` and `right` are the two halves of a well-formed split.
///
/// The halves must be exactly adjacent (`left.end_key == right.start_key`),
/// and `right` must either be the unbounded tail or end after `left` starts.
/// On success both halves are handed back.
pub fn validate_split<'a>(
    left: Option<&'a Region>,
    right: Option<&'a Region>,
) -> Result<(&'a Region, &'a Region)> {
    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => (left, right),
        _ => return Err(invalid_split(left, right)),
    };

    if left.end_key != right.start_key {
        return Err(invalid_split(Some(left), Some(right)));
    }

    if right.end_key.is_empty() || left.start_key < right.end_key {
        return Ok((left, right));
    }

    Err(invalid_split(Some(left), Some(right)))
}

fn invalid_split(left: Option<&Region>, right: Option<&Region>) -> Error {
    let describe = |r: Option<&Region>| match r {
        Some(r) => format!("{} {}", r.id, r.range_display()),
        None => "none".to_string(),
    };
    Error::InvalidSplit {
        left: describe(left),
        right: describe(right),
    }
}

/// Rebuilds the undivided region from a reported split.
///
/// The result is `left` stretched to `right.end_key` with no epoch. It only
/// exists for the audit record and is never put back into the directory.
pub fn origin_region(left: &Region, right: &Region) -> Region {
    let mut origin = left.clone();
    origin.region_epoch = None;
    origin.end_key = right.end_key.clone();
    origin
}

/// Audit record of one completed split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOperator {
    pub origin: Region,
    pub left: Region,
    pub right: Region,
    pub created_at: DateTime<Utc>,
}

impl SplitOperator {
    pub fn new(origin: Region, left: Region, right: Region) -> Self {
        Self {
            origin,
            left,
            right,
            created_at: Utc::now(),
        }
    }

    /// Id of the region the split started from.
    pub fn region_id(&self) -> u64 {
        self.origin.id
    }

    pub fn kind(&self) -> &'static str {
        "split"
    }
}

impl std::fmt::Display for SplitOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "split region {} {} into {} {} and {} {}",
            self.origin.id,
            self.origin.range_display(),
            self.left.id,
            self.left.range_display(),
            self.right.id,
            self.right.range_display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::region::RegionEpoch;

    fn region(id: u64, start: &str, end: &str) -> Region {
        Region::new(
            id,
            start.as_bytes().to_vec(),
            end.as_bytes().to_vec(),
            RegionEpoch::new(2, 1),
            vec![],
        )
    }

    fn is_invalid<T>(res: Result<T>) -> bool {
        matches!(res, Err(Error::InvalidSplit { .. }))
    }

    #[test]
    fn test_adjacent_with_unbounded_right() {
        let left = region(1, "a", "m");
        let right = region(2, "m", "");
        assert!(validate_split(Some(&left), Some(&right)).is_ok());
    }

    #[test]
    fn test_adjacent_with_bounded_right() {
        let left = region(1, "a", "m");
        let right = region(2, "m", "z");
        assert!(validate_split(Some(&left), Some(&right)).is_ok());
    }

    #[test]
    fn test_gap_with_unbounded_right() {
        let left = region(1, "a", "m");
        let right = region(2, "n", "");
        assert!(is_invalid(validate_split(Some(&left), Some(&right))));
    }

    #[test]
    fn test_gap_with_bounded_right() {
        let left = region(1, "a", "m");
        let right = region(2, "n", "z");
        assert!(is_invalid(validate_split(Some(&left), Some(&right))));
    }

    #[test]
    fn test_right_end_behind_left_start() {
        let left = region(1, "a", "m");
        let right = region(2, "m", "g");
        // "g" is past "a", so the range check alone accepts this pair
        assert!(validate_split(Some(&left), Some(&right)).is_ok());

        let left = region(1, "h", "m");
        let right = region(2, "m", "g");
        assert!(is_invalid(validate_split(Some(&left), Some(&right))));

        let left = region(1, "g", "m");
        let right = region(2, "m", "g");
        assert!(is_invalid(validate_split(Some(&left), Some(&right))));
    }

    #[test]
    fn test_unbounded_right_accepted_regardless_of_left_start() {
        let left = region(1, "", "");
        let right = region(2, "", "");
        assert!(validate_split(Some(&left), Some(&right)).is_ok());
    }

    #[test]
    fn test_missing_half() {
        let left = region(1, "a", "m");
        assert!(is_invalid(validate_split(Some(&left), None)));
        assert!(is_invalid(validate_split(None, Some(&left))));
        assert!(is_invalid(validate_split(None, None)));

        let err = validate_split(Some(&left), None).unwrap_err();
        assert!(err.to_string().contains("right: none"));
    }

    #[test]
    fn test_origin_region() {
        let left = region(1, "a", "m");
        let right = region(2, "m", "");
        let origin = origin_region(&left, &right);

        assert_eq!(origin.id, 1);
        assert_eq!(origin.start_key, b"a".to_vec());
        assert!(origin.end_key.is_empty());
        assert!(origin.region_epoch.is_none());
        // inputs untouched
        assert_eq!(left.end_key, b"m".to_vec());
        assert!(left.region_epoch.is_some());
    }

    #[test]
    fn test_operator_region_id() {
        let left = region(4, "a", "m");
        let right = region(5, "m", "");
        let op = SplitOperator::new(origin_region(&left, &right), left, right);
        assert_eq!(op.region_id(), 4);
        assert_eq!(op.kind(), "split");
        assert!(op.to_string().starts_with("split region 4"));
    }
}
