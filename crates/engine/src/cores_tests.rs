// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[test]
fn allocates_lowest_free_index_first() {
    let mut table = CoreTable::new(4);
    assert_eq!(table.allocate(JobId(1), now()), Some(0));
    assert_eq!(table.allocate(JobId(2), now()), Some(1));
    assert_eq!(table.allocate(JobId(3), now()), Some(2));
}

#[test]
fn allocate_returns_none_when_full() {
    let mut table = CoreTable::new(1);
    assert_eq!(table.allocate(JobId(1), now()), Some(0));
    assert_eq!(table.allocate(JobId(2), now()), None);
}

#[test]
fn released_slot_is_reused() {
    let mut table = CoreTable::new(2);
    table.allocate(JobId(1), now());
    table.allocate(JobId(2), now());
    table.release(0);
    assert_eq!(table.allocate(JobId(3), now()), Some(0));
}

#[test]
fn release_is_idempotent() {
    let mut table = CoreTable::new(2);
    table.allocate(JobId(1), now());
    table.release(0);
    let available = table.available();
    table.release(0);
    assert_eq!(table.available(), available);
}

#[test]
fn release_out_of_range_is_a_no_op() {
    let mut table = CoreTable::new(2);
    table.release(99);
    assert_eq!(table.available(), 2);
}

#[test]
fn allocate_n_is_all_or_nothing() {
    let mut table = CoreTable::new(3);
    table.allocate(JobId(1), now());

    // Only 2 free; asking for 3 must not touch the table
    assert_eq!(table.allocate_n(JobId(2), 3, now()), None);
    assert_eq!(table.available(), 2);

    assert_eq!(table.allocate_n(JobId(2), 2, now()), Some(vec![1, 2]));
    assert_eq!(table.available(), 0);
}

#[test]
fn release_all_frees_every_listed_slot() {
    let mut table = CoreTable::new(4);
    let cores = table.allocate_n(JobId(1), 3, now()).unwrap();
    table.release_all(&cores);
    assert_eq!(table.available(), 4);
}

#[test]
fn allocation_records_owner_and_timestamp() {
    let mut table = CoreTable::new(2);
    let t = now();
    let idx = table.allocate(JobId(7), t).unwrap();
    assert_eq!(table.owner(idx), Some(JobId(7)));
    assert_eq!(table.last_used(idx), Some(t));

    table.release(idx);
    assert_eq!(table.owner(idx), None);
    // last_used survives release
    assert_eq!(table.last_used(idx), Some(t));
}

#[test]
fn counts_track_allocations() {
    let mut table = CoreTable::new(3);
    assert_eq!(table.available(), 3);
    assert_eq!(table.allocated(), 0);
    table.allocate(JobId(1), now());
    table.allocate(JobId(2), now());
    assert_eq!(table.available(), 1);
    assert_eq!(table.allocated(), 2);
}
