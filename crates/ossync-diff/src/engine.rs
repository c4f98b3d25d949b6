//! One-directional set difference between two record lists.
//!
//! Names are compared after dropping a per-side prefix of `offset` bytes, so
//! `/home/me/photos/a.jpg` (offset of `/home/me/photos`) matches the remote
//! `/backup/a.jpg` (offset of `/backup`).

use std::collections::HashSet;

use ossync_types::{Digest, ObjectRecord};

use crate::error::{DiffError, DiffResult};

/// One enumerated side of a comparison.
#[derive(Clone, Copy, Debug)]
pub struct Side<'a> {
    pub label: &'static str,
    pub records: &'a [ObjectRecord],
    /// Byte length of the name prefix ignored during comparison.
    pub offset: usize,
}

impl<'a> Side<'a> {
    pub fn new(label: &'static str, records: &'a [ObjectRecord], offset: usize) -> Self {
        Self {
            label,
            records,
            offset,
        }
    }

    /// Records whose enumeration failed.
    pub fn failures(&self) -> impl Iterator<Item = &'a ObjectRecord> {
        self.records.iter().filter(|r| r.is_failed())
    }

    /// Fail if any record on this side could not be read.
    pub fn ensure_complete(&self) -> DiffResult<()> {
        match self.failures().count() {
            0 => Ok(()),
            failures => Err(DiffError::IncompleteSide {
                side: self.label,
                failures,
            }),
        }
    }
}

#[derive(Hash, PartialEq, Eq)]
struct MatchKey<'a> {
    name: &'a str,
    size: u64,
    digest: Option<Digest>,
}

impl<'a> MatchKey<'a> {
    fn of(record: &'a ObjectRecord, offset: usize, check_digest: bool) -> Self {
        Self {
            name: record.relative_name(offset),
            size: record.size,
            digest: if check_digest { record.digest } else { None },
        }
    }
}

/// Records of `left` that have no counterpart in `right`.
///
/// A left record has a counterpart when some right record has the same
/// relative name and size, and with `check_digest` also the same digest.
/// Left records repeating an already reported (relative name, size) pair are
/// dropped. Output keeps left order.
pub fn diff(
    left: &[ObjectRecord],
    right: &[ObjectRecord],
    left_offset: usize,
    right_offset: usize,
    check_digest: bool,
) -> Vec<ObjectRecord> {
    let present: HashSet<MatchKey<'_>> = right
        .iter()
        .map(|r| MatchKey::of(r, right_offset, check_digest))
        .collect();

    let mut emitted: HashSet<(&str, u64)> = HashSet::new();
    left.iter()
        .filter(|l| {
            let key = MatchKey::of(*l, left_offset, check_digest);
            !present.contains(&key) && emitted.insert((key.name, key.size))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn records(names: &[&str]) -> Vec<ObjectRecord> {
        names.iter().map(|n| ObjectRecord::new(*n, 0)).collect()
    }

    fn names(records: &[ObjectRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn identical_single_entry() {
        let l = records(&["/a"]);
        let r = records(&["/a"]);
        assert!(diff(&l, &r, 0, 0, false).is_empty());
        assert!(diff(&r, &l, 0, 0, false).is_empty());
    }

    #[test]
    fn disjoint_single_entries() {
        let l = records(&["/a"]);
        let r = records(&["/b"]);
        assert_eq!(names(&diff(&l, &r, 0, 0, false)), ["/a"]);
        assert_eq!(names(&diff(&r, &l, 0, 0, false)), ["/b"]);
    }

    #[test]
    fn disjoint_keeps_input_order() {
        let l = records(&["/b", "/a"]);
        let r = records(&["/d", "/c"]);
        assert_eq!(names(&diff(&l, &r, 0, 0, false)), ["/b", "/a"]);
        assert_eq!(names(&diff(&r, &l, 0, 0, false)), ["/d", "/c"]);
    }

    #[test]
    fn partial_overlap() {
        let l = records(&["/b", "/c", "/a"]);
        let r = records(&["/d", "/e", "/c"]);
        assert_eq!(names(&diff(&l, &r, 0, 0, false)), ["/b", "/a"]);
        assert_eq!(names(&diff(&r, &l, 0, 0, false)), ["/d", "/e"]);
    }

    #[test]
    fn offsets_strip_roots() {
        let l = vec![ObjectRecord::new("/home/me/photos/a.jpg", 3)];
        let r = vec![ObjectRecord::new("/backup/a.jpg", 3)];
        assert!(diff(&l, &r, "/home/me/photos".len(), "/backup".len(), false).is_empty());
    }

    #[test]
    fn size_mismatch_is_a_difference() {
        let l = vec![ObjectRecord::new("/a", 1)];
        let r = vec![ObjectRecord::new("/a", 2)];
        assert_eq!(diff(&l, &r, 0, 0, false).len(), 1);
    }

    #[test]
    fn digest_only_counts_when_checked() {
        let l = vec![ObjectRecord::new("/a", 1).with_digest(Digest::from_md5([1; 16]))];
        let r = vec![ObjectRecord::new("/a", 1).with_digest(Digest::from_md5([2; 16]))];
        assert!(diff(&l, &r, 0, 0, false).is_empty());
        assert_eq!(diff(&l, &r, 0, 0, true).len(), 1);
    }

    #[test]
    fn repeated_left_entries_reported_once() {
        let l = vec![
            ObjectRecord::new("/x/a", 1),
            ObjectRecord::new("/y/a", 1),
            ObjectRecord::new("/y/a", 2),
        ];
        let out = diff(&l, &[], 2, 0, false);
        assert_eq!(names(&out), ["/x/a", "/y/a"]);
        assert_eq!(out[1].size, 2);
    }

    #[test]
    fn incomplete_side() {
        let recs = vec![ObjectRecord::new("/a", 0), ObjectRecord::new("/b", 0).with_error("denied")];
        let side = Side::new("local", &recs, 0);
        assert_eq!(
            side.ensure_complete(),
            Err(DiffError::IncompleteSide {
                side: "local",
                failures: 1
            })
        );
        assert!(Side::new("remote", &recs[..1], 0).ensure_complete().is_ok());
    }

    fn arb_records() -> impl Strategy<Value = Vec<ObjectRecord>> {
        prop::collection::vec(("/[a-d]{1,3}", 0u64..4), 0..24)
            .prop_map(|v| v.into_iter().map(|(n, s)| ObjectRecord::new(n, s)).collect())
    }

    proptest! {
        #[test]
        fn self_diff_is_empty(x in arb_records()) {
            prop_assert!(diff(&x, &x, 0, 0, true).is_empty());
        }

        #[test]
        fn shared_items_appear_in_neither_direction(l in arb_records(), r in arb_records()) {
            let left_only = diff(&l, &r, 0, 0, false);
            let right_only = diff(&r, &l, 0, 0, false);
            for rec in left_only.iter().chain(right_only.iter()) {
                let on_left = l.iter().any(|x| x.name == rec.name && x.size == rec.size);
                let on_right = r.iter().any(|x| x.name == rec.name && x.size == rec.size);
                prop_assert!(on_left != on_right);
            }
        }

        #[test]
        fn output_is_ordered_subsequence_of_left(l in arb_records(), r in arb_records()) {
            let out = diff(&l, &r, 0, 0, false);
            let mut it = l.iter();
            for rec in &out {
                prop_assert!(it.any(|x| x == rec));
            }
        }
    }
}
