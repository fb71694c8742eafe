use super::*;
use crate::test_support::{categories, keys, RecordingStore};

#[test]
fn move_item_shifts_only_the_items_between() {
    let items = vec!["a", "b", "c", "d", "e"];
    assert_eq!(
        move_item(&items, 1, 3).expect("move"),
        vec!["a", "c", "d", "b", "e"]
    );
    assert_eq!(
        move_item(&items, 4, 0).expect("move"),
        vec!["e", "a", "b", "c", "d"]
    );
}

#[test]
fn move_item_to_same_index_is_identity() {
    let items = vec![1, 2, 3];
    assert_eq!(move_item(&items, 1, 1).expect("move"), items);
}

#[test]
fn move_item_rejects_out_of_range_indices() {
    let items = vec![1, 2, 3];
    assert!(matches!(
        move_item(&items, 3, 0),
        Err(ReorderError::IndexOutOfRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        move_item(&items, 0, 5),
        Err(ReorderError::IndexOutOfRange { index: 5, len: 3 })
    ));
}

#[test]
fn move_preserves_relative_order_of_other_items() {
    let items: Vec<usize> = (0..8).collect();
    for origin in 0..items.len() {
        for destination in 0..items.len() {
            let moved = move_item(&items, origin, destination).expect("move");
            assert_eq!(moved[destination], origin);
            let rest: Vec<_> = moved.iter().copied().filter(|v| *v != origin).collect();
            let expected: Vec<_> = items.iter().copied().filter(|v| *v != origin).collect();
            assert_eq!(rest, expected);
        }
    }
}

#[test]
fn moving_head_to_tail_rewrites_every_position() {
    let reordered = move_item(&categories(&["a", "b", "c", "d", "e"]), 0, 4).expect("move");
    assert_eq!(keys(&reordered), vec!["b", "c", "d", "e", "a"]);

    let plan: Vec<_> = plan_sort_order_writes(&reordered)
        .into_iter()
        .map(|w| (w.key.0, w.position))
        .collect();
    assert_eq!(
        plan,
        vec![
            ("b".to_string(), 0),
            ("c".to_string(), 1),
            ("d".to_string(), 2),
            ("e".to_string(), 3),
            ("a".to_string(), 4),
        ]
    );
}

#[test]
fn plan_skips_items_that_kept_their_index() {
    // Swap of neighbours in the middle touches exactly two items.
    let reordered = move_item(&categories(&["a", "b", "c", "d", "e"]), 2, 3).expect("move");
    let plan = plan_sort_order_writes(&reordered);
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].key.as_str(), "d");
    assert_eq!(plan[0].previous, 3);
    assert_eq!(plan[1].key.as_str(), "c");
    assert_eq!(plan[1].position, 3);
}

#[test]
fn plan_is_empty_for_consistent_list() {
    assert!(plan_sort_order_writes(&categories(&["a", "b", "c"])).is_empty());
}

#[test]
fn consistency_policy_parses_config_spellings() {
    assert_eq!(
        "revert-on-failure".parse::<ConsistencyPolicy>(),
        Ok(ConsistencyPolicy::RevertOnFailure)
    );
    assert_eq!(
        "Optimistic".parse::<ConsistencyPolicy>(),
        Ok(ConsistencyPolicy::Optimistic)
    );
    assert!("sometimes".parse::<ConsistencyPolicy>().is_err());
}

#[tokio::test]
async fn writes_are_sequential_in_ascending_position() {
    let store = RecordingStore::default();
    let reconciler = OrderReconciler::new(ConsistencyPolicy::Optimistic);

    // [a,b,c,d,e] with e dropped at index 2 leaves positions 2, 3 and 4 to rewrite.
    let reordered = move_item(&categories(&["a", "b", "c", "d", "e"]), 4, 2).expect("move");
    let writes = plan_sort_order_writes(&reordered);

    let batch = reconciler.try_begin().expect("batch");
    let report = batch.persist(&store, &writes).await;

    assert!(report.is_success());
    assert_eq!(
        store.calls(),
        vec![
            ("e".to_string(), 2),
            ("c".to_string(), 3),
            ("d".to_string(), 4)
        ]
    );
    assert_eq!(
        store.log(),
        vec!["start:e", "end:e", "start:c", "end:c", "start:d", "end:d"]
    );
}

#[tokio::test]
async fn failed_write_does_not_stop_later_writes() {
    let store = RecordingStore::default().failing_on(&["c"]);
    let reconciler = OrderReconciler::new(ConsistencyPolicy::Optimistic);
    let reordered = move_item(&categories(&["a", "b", "c", "d"]), 0, 3).expect("move");
    let writes = plan_sort_order_writes(&reordered);

    let report = reconciler
        .try_begin()
        .expect("batch")
        .persist(&store, &writes)
        .await;

    assert!(!report.is_success());
    assert!(!report.reverted);
    assert_eq!(report.attempted(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].write.key.as_str(), "c");
    assert!(report.failures[0].message.contains("simulated failure"));
    assert_eq!(store.calls().len(), 4);
}

#[tokio::test]
async fn revert_policy_writes_back_applied_ordinals() {
    let store = RecordingStore::default().failing_on(&["d"]);
    let reconciler = OrderReconciler::new(ConsistencyPolicy::RevertOnFailure);
    let reordered = move_item(&categories(&["a", "b", "c", "d"]), 0, 3).expect("move");
    let writes = plan_sort_order_writes(&reordered);

    let report = reconciler
        .try_begin()
        .expect("batch")
        .persist(&store, &writes)
        .await;

    assert!(report.reverted);
    assert!(report.compensation_failures.is_empty());
    assert_eq!(
        store.calls(),
        vec![
            ("b".to_string(), 0),
            ("c".to_string(), 1),
            ("d".to_string(), 2),
            ("a".to_string(), 3),
            // compensation for the writes that landed
            ("b".to_string(), 1),
            ("c".to_string(), 2),
            ("a".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn only_one_batch_may_hold_the_gate() {
    let reconciler = OrderReconciler::new(ConsistencyPolicy::Optimistic);
    let batch = reconciler.try_begin().expect("first batch");
    assert!(reconciler.is_busy());
    assert!(matches!(
        reconciler.try_begin(),
        Err(ReorderError::PersistInFlight)
    ));
    drop(batch);
    assert!(!reconciler.is_busy());
    assert!(reconciler.try_begin().is_ok());
}
