//! Duplicate grouping over tracked records.
//!
//! Two records are duplicates when their **baseline** hash pair
//! `(base_hash_strong, base_hash_fast)` is identical. Grouping on the
//! baseline keeps the result stable when one copy later drifts.
//!
//! # Example
//!
//! ```
//! use fixity::integrity::group_records;
//! use fixity::store::FileRecord;
//! use chrono::Utc;
//!
//! let rec = |name: &str, strong: &str| FileRecord {
//!     id: 0,
//!     path: "/data".into(),
//!     filename: name.into(),
//!     extension: "TXT".into(),
//!     date_added: Utc::now(),
//!     date_updated: Utc::now(),
//!     base_hash_strong: strong.into(),
//!     base_hash_fast: "f".into(),
//!     latest_hash_strong: strong.into(),
//!     latest_hash_fast: "f".into(),
//! };
//!
//! let groups = group_records(vec![rec("x.txt", "a"), rec("y.txt", "a"), rec("z.txt", "b")]);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].member_count(), 2);
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::FileRecord;

/// A set of at least two tracked files with identical baseline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Shared baseline strong digest
    pub hash_strong: String,
    /// Shared baseline fast checksum
    pub hash_fast: String,
    /// Member records, ordered by location
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// One exported row per duplicate group member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRow {
    /// 1-based group number in output order
    pub group_id: usize,
    /// Containing directory
    pub path: String,
    /// File name
    pub filename: String,
    /// Shared baseline strong digest
    pub base_hash_strong: String,
    /// Shared baseline fast checksum
    pub base_hash_fast: String,
}

/// Group records by baseline hash pair, keeping groups with 2+ members.
///
/// Groups come out ordered by `(hash_strong, hash_fast)`; members within a
/// group are ordered by `(path, filename)`. Input order does not matter.
#[must_use]
pub fn group_records(records: Vec<FileRecord>) -> Vec<DuplicateGroup> {
    let mut by_key: BTreeMap<(String, String), Vec<FileRecord>> = BTreeMap::new();

    for record in records {
        let key = (
            record.base_hash_strong.clone(),
            record.base_hash_fast.clone(),
        );
        by_key.entry(key).or_default().push(record);
    }

    by_key
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|((hash_strong, hash_fast), mut members)| {
            members.sort_by(|a, b| (&a.path, &a.filename).cmp(&(&b.path, &b.filename)));
            DuplicateGroup {
                hash_strong,
                hash_fast,
                members,
            }
        })
        .collect()
}

/// Flatten groups into contiguous export rows.
#[must_use]
pub fn duplicate_rows(groups: &[DuplicateGroup]) -> Vec<DuplicateRow> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(idx, group)| {
            group.members.iter().map(move |m| DuplicateRow {
                group_id: idx + 1,
                path: m.path.clone(),
                filename: m.filename.clone(),
                base_hash_strong: group.hash_strong.clone(),
                base_hash_fast: group.hash_fast.clone(),
            })
        })
        .collect()
}
