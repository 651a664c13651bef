mod helpers;

use convoy::domain::models::WorkPriority;
use convoy::services::SlingRequest;
use helpers::database::{setup_test_db, work_queue};
use proptest::prelude::*;

fn priority_strategy() -> impl Strategy<Value = WorkPriority> {
    prop_oneof![
        Just(WorkPriority::Urgent),
        Just(WorkPriority::High),
        Just(WorkPriority::Normal),
        Just(WorkPriority::Low),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: peek returns pending items most urgent first, and in
    /// submission order within one priority.
    #[test]
    fn prop_peek_is_priority_then_fifo(
        priorities in prop::collection::vec(priority_strategy(), 1..24),
        claimed in prop::collection::vec(any::<bool>(), 24),
    ) {
        let (peeked, expected) = tokio_test::block_on(async {
            let pool = setup_test_db().await;
            let queue = work_queue(&pool);

            let mut expected = Vec::new();
            for (n, priority) in priorities.iter().enumerate() {
                let id = queue
                    .sling(SlingRequest::new("A", "job", n.to_string()).with_priority(*priority))
                    .await
                    .unwrap();
                if claimed[n] {
                    queue.claim("A", id).await.unwrap();
                } else {
                    expected.push((*priority, n));
                }
            }
            expected.sort();

            let peeked: Vec<(WorkPriority, usize)> = queue
                .peek("A", None)
                .await
                .unwrap()
                .into_iter()
                .map(|item| (item.priority, item.work_ref.parse().unwrap()))
                .collect();
            (peeked, expected)
        });

        prop_assert_eq!(peeked, expected);
    }

    /// Property: a limit returns a prefix of the unlimited order.
    #[test]
    fn prop_peek_limit_is_prefix(
        priorities in prop::collection::vec(priority_strategy(), 0..16),
        limit in 0usize..20,
    ) {
        let (limited, full) = tokio_test::block_on(async {
            let pool = setup_test_db().await;
            let queue = work_queue(&pool);
            for (n, priority) in priorities.iter().enumerate() {
                queue
                    .sling(SlingRequest::new("A", "job", n.to_string()).with_priority(*priority))
                    .await
                    .unwrap();
            }
            let ids = |items: Vec<convoy::WorkItem>| items.into_iter().map(|i| i.id).collect::<Vec<_>>();
            (
                ids(queue.peek("A", Some(limit)).await.unwrap()),
                ids(queue.peek("A", None).await.unwrap()),
            )
        });

        prop_assert_eq!(limited.len(), limit.min(full.len()));
        prop_assert_eq!(&limited[..], &full[..limited.len()]);
    }
}
