//! Merges list-objects pages gathered from multiple targets into a single
//! sorted, deduplicated page (spec.md §7), grounded in `objlist_utils.go`'s
//! `MergeLso`/`SortLso`/`DedupLso`.

use std::collections::HashMap;

use cryostore_common::CustomMeta;
use serde::{Deserialize, Serialize};

/// Directories sort before files; present (cached) entries win over absent
/// ones when names collide.
pub const FLAG_IS_DIR: u16 = 1 << 0;
pub const FLAG_IS_CACHED: u16 = 1 << 1;
pub const FLAG_IN_ARCHIVE: u16 = 1 << 2;
pub const FLAG_IS_ARCHIVE: u16 = 1 << 3;
/// Low 4 bits are reserved for a target-reported status code (0 == ok);
/// bits above [`FLAG_STATUS_MASK`] are the boolean flags above.
pub const FLAG_STATUS_MASK: u16 = 0x0f << 4;
const STATUS_SHIFT: u32 = 4;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub size: u64,
    pub checksum: String,
    pub atime_unix_nanos: i64,
    pub version: String,
    pub location: String,
    pub custom: CustomMeta,
    pub flags: u16,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.flags & FLAG_IS_DIR != 0
    }

    pub fn is_present(&self) -> bool {
        self.flags & FLAG_IS_CACHED != 0
    }

    pub fn set_present(&mut self) {
        self.flags |= FLAG_IS_CACHED;
    }

    pub fn is_inside_archive(&self) -> bool {
        self.flags & FLAG_IN_ARCHIVE != 0
    }

    pub fn is_listed_archive(&self) -> bool {
        self.flags & FLAG_IS_ARCHIVE != 0
    }

    pub fn status(&self) -> u16 {
        (self.flags & FLAG_STATUS_MASK) >> STATUS_SHIFT
    }

    pub fn is_status_ok(&self) -> bool {
        self.status() == 0
    }

    pub fn set_status(&mut self, status: u16) {
        debug_assert!(status <= 0x0f, "status code must fit in 4 bits");
        self.flags = (self.flags & !FLAG_STATUS_MASK) | ((status << STATUS_SHIFT) & FLAG_STATUS_MASK);
    }

    /// Directory-before-file, then name, then status — the ordering
    /// `LsoEnt.less` defines.
    fn sort_key(&self) -> (bool, &str, u16) {
        (!self.is_dir(), self.name.as_str(), self.status())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub continuation_token: String,
    pub flags: u16,
}

/// Merges `pages` (one per responding target) into a single page: entries
/// are combined by name (present entries and the shorter of two reported
/// locations/versions win), sorted directory-first then by name, truncated
/// to `max_size` entries if positive, and the continuation token is the
/// lexicographic maximum across pages.
///
/// `no_dirs` is carried through as a debug-only invariant check, mirroring
/// the Go implementation's `debug.Assert` that backends already filtered
/// directories out when the caller asked for none.
pub fn merge_listings(pages: Vec<ListingPage>, no_dirs: bool, max_size: usize) -> ListingPage {
    if pages.is_empty() {
        return ListingPage::default();
    }
    if pages.len() == 1 {
        let mut page = pages.into_iter().next().unwrap();
        sort_and_dedup(&mut page.entries, no_dirs, max_size);
        return page;
    }

    let mut token = String::new();
    let mut flags = 0u16;
    let mut merged: HashMap<String, ListingEntry> = HashMap::new();

    for page in pages {
        flags |= page.flags;
        if page.continuation_token > token {
            token = page.continuation_token;
        }
        for entry in page.entries {
            debug_assert!(!(no_dirs && entry.is_dir()), "backend returned a directory despite no_dirs");
            match merged.remove(&entry.name) {
                None => {
                    merged.insert(entry.name.clone(), entry);
                }
                Some(existing) => {
                    merged.insert(entry.name.clone(), merge_entry(existing, entry));
                }
            }
        }
    }

    let mut entries: Vec<ListingEntry> = merged.into_values().collect();
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    if max_size > 0 && entries.len() > max_size {
        entries.truncate(max_size);
    }

    ListingPage {
        entries,
        continuation_token: token,
        flags,
    }
}

/// Resolves two pages' entries for the same name. A lower status code wins
/// outright (an errored report from one target never shadows a clean one
/// from another); only when both report the same status does presence break
/// the tie, same as the single-page dedup order.
fn merge_entry(existing: ListingEntry, incoming: ListingEntry) -> ListingEntry {
    if existing.status() != incoming.status() {
        let (mut winner, loser) = if existing.status() < incoming.status() { (existing, incoming) } else { (incoming, existing) };
        winner.location = left_nonempty(&winner.location, &loser.location);
        winner.version = left_nonempty(&winner.version, &loser.version);
        return winner;
    }

    if !existing.is_present() && incoming.is_present() {
        let mut winner = incoming;
        winner.version = left_nonempty(&winner.version, &existing.version);
        winner
    } else {
        let mut winner = existing;
        winner.location = left_nonempty(&winner.location, &incoming.location);
        winner.version = left_nonempty(&winner.version, &incoming.version);
        winner
    }
}

/// Picks the first non-empty string, preferring `a`; mirrors `cos.Left`.
fn left_nonempty(a: &str, b: &str) -> String {
    if !a.is_empty() {
        a.to_string()
    } else {
        b.to_string()
    }
}

fn sort_and_dedup(entries: &mut Vec<ListingEntry>, no_dirs: bool, max_size: usize) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut kept: Vec<ListingEntry> = Vec::with_capacity(entries.len());
    for entry in entries.drain(..) {
        debug_assert!(!(no_dirs && entry.is_dir()), "backend returned a directory despite no_dirs");
        if kept.last().is_some_and(|last: &ListingEntry| last.name == entry.name) {
            continue;
        }
        kept.push(entry);
        if max_size > 0 && kept.len() == max_size {
            break;
        }
    }
    *entries = kept;
}

/// True if `token` already covers `obj_name` lexicographically, meaning the
/// object was listed in a prior page and must be skipped.
pub fn token_covers(token: &str, obj_name: &str) -> bool {
    token >= obj_name
}

/// A directory participates in the walk for `prefix` if it contains the
/// prefix or is contained by it (so `SkipDir` is never applied to an
/// ancestor of the prefix being searched for).
pub fn dir_has_or_is_prefix(dir_path: &str, prefix: &str) -> bool {
    debug_assert!(!prefix.is_empty());
    prefix.starts_with(dir_path) || dir_path.starts_with(prefix)
}

pub fn obj_has_prefix(obj_name: &str, prefix: &str) -> bool {
    debug_assert!(!prefix.is_empty());
    obj_name.starts_with(prefix)
}
