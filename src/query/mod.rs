//! Derived views over store snapshots: filtering, sorting, grouping, search.
//!
//! Every query site memoizes through a [`Memo`] keyed by a [`QueryKey`] that
//! includes the store revision, so results stay O(1) amortized across UI
//! refreshes and invalidate automatically whenever the store mutates. Any new
//! dimension that affects a query's result MUST be added to its key, or the
//! cache will serve stale results.

mod memo;

pub use memo::Memo;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::record::{ProcessingStatus, Record};

/// Which records a query admits. Soft-deleted records are always excluded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOption {
    #[default]
    All,
    Status(ProcessingStatus),
}

/// Ordering applied to query results (and within grouping buckets).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOption {
    #[default]
    NewestFirst,
    OldestFirst,
    TitleAz,
    TitleZa,
}

/// How grouped queries form their buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOption {
    /// One bucket per processing status, in pipeline order.
    Status,
    /// One bucket per calendar month of creation, newest month first.
    Month,
}

/// Memoization key for a query site. Structural equality; two reads with an
/// identical key always yield an identical result because every input that
/// can change the result set is captured here, the store revision included.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryKey {
    pub revision: u64,
    pub search: Option<String>,
    pub filter: FilterOption,
    pub group: Option<GroupOption>,
    pub sort: SortOption,
}

impl QueryKey {
    pub fn filtered(revision: u64, filter: FilterOption, sort: SortOption) -> Self {
        QueryKey {
            revision,
            search: None,
            filter,
            group: None,
            sort,
        }
    }

    pub fn grouped(revision: u64, filter: FilterOption, group: GroupOption, sort: SortOption) -> Self {
        QueryKey {
            group: Some(group),
            ..Self::filtered(revision, filter, sort)
        }
    }

    pub fn search(revision: u64, text: &str, filter: FilterOption, sort: SortOption) -> Self {
        QueryKey {
            search: Some(text.to_lowercase()),
            ..Self::filtered(revision, filter, sort)
        }
    }
}

fn admits(record: &Record, filter: FilterOption) -> bool {
    if record.deleted {
        return false;
    }
    match filter {
        FilterOption::All => true,
        FilterOption::Status(status) => record.status == status,
    }
}

fn compare(a: &Record, b: &Record, sort: SortOption) -> Ordering {
    let ordering = match sort {
        SortOption::NewestFirst => b.created_at.cmp(&a.created_at),
        SortOption::OldestFirst => a.created_at.cmp(&b.created_at),
        SortOption::TitleAz => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortOption::TitleZa => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
    };
    // Identity tiebreak keeps results deterministic.
    ordering.then_with(|| a.id.cmp(&b.id))
}

/// Filter and sort a snapshot.
pub fn filtered(records: &[Record], filter: FilterOption, sort: SortOption) -> Vec<Record> {
    let mut out: Vec<Record> = records
        .iter()
        .filter(|r| admits(r, filter))
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, sort));
    out
}

/// Filter, sort, then bucket a snapshot. Status buckets follow pipeline
/// order; month buckets are labeled `YYYY-MM` and ordered newest first.
pub fn grouped(
    records: &[Record],
    filter: FilterOption,
    group: GroupOption,
    sort: SortOption,
) -> Vec<(String, Vec<Record>)> {
    let flat = filtered(records, filter, sort);
    match group {
        GroupOption::Status => {
            let order = [
                ProcessingStatus::Pending,
                ProcessingStatus::Processing,
                ProcessingStatus::Ready,
                ProcessingStatus::Failed,
            ];
            order
                .iter()
                .filter_map(|status| {
                    let bucket: Vec<Record> =
                        flat.iter().filter(|r| r.status == *status).cloned().collect();
                    if bucket.is_empty() {
                        None
                    } else {
                        Some((status.label().to_string(), bucket))
                    }
                })
                .collect()
        }
        GroupOption::Month => {
            let mut buckets: Vec<(String, Vec<Record>)> = Vec::new();
            for record in flat {
                let label = record.created_at.format("%Y-%m").to_string();
                match buckets.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, bucket)) => bucket.push(record),
                    None => buckets.push((label, vec![record])),
                }
            }
            buckets.sort_by(|(a, _), (b, _)| b.cmp(a));
            buckets
        }
    }
}

/// Case-insensitive substring search over titles, then filter and sort.
pub fn searched(
    records: &[Record],
    text: &str,
    filter: FilterOption,
    sort: SortOption,
) -> Vec<Record> {
    let needle = text.to_lowercase();
    let mut out: Vec<Record> = records
        .iter()
        .filter(|r| admits(r, filter) && r.title.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, sort));
    out
}
