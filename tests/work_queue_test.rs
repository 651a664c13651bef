mod helpers;

use convoy::domain::errors::DomainError;
use convoy::domain::models::{WorkItemState, WorkPriority};
use convoy::services::SlingRequest;
use helpers::database::{setup_test_db, work_queue};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_peek_orders_urgent_before_earlier_normal() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);

    queue
        .sling(SlingRequest::new("A", "review", "124").with_priority(WorkPriority::Normal))
        .await
        .unwrap();
    queue
        .sling(SlingRequest::new("A", "hotfix", "123").with_priority(WorkPriority::Urgent))
        .await
        .unwrap();

    let refs: Vec<String> = queue.peek("A", None).await.unwrap().into_iter().map(|i| i.work_ref).collect();
    assert_eq!(refs, vec!["123".to_string(), "124".to_string()]);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);

    let id = queue
        .sling(
            SlingRequest::new("builder", "build", "pr-42")
                .with_priority(WorkPriority::High)
                .requested_by("ci")
                .with_reason("merge train"),
        )
        .await
        .unwrap();

    assert!(queue.claim("builder", id).await.unwrap());
    assert!(queue.peek("builder", None).await.unwrap().is_empty());

    assert!(queue
        .begin_execution("builder", id, Some(json!({"worktree": "/tmp/pr-42"})))
        .await
        .unwrap());
    queue.complete("builder", id, Some(json!({"artifact": "pr-42.tar"}))).await.unwrap();

    let item = queue.get("builder", id).await.unwrap();
    assert_eq!(item.state, WorkItemState::Completed);
    assert_eq!(item.requested_by, "ci");
    assert_eq!(item.reason.as_deref(), Some("merge train"));
    assert_eq!(item.context, Some(json!({"worktree": "/tmp/pr-42"})));
    assert_eq!(item.result, Some(json!({"artifact": "pr-42.tar"})));

    let status = queue.status("builder").await.unwrap();
    assert_eq!(status.count(WorkItemState::Completed), 1);
    assert_eq!(status.total(), 1);
    assert_eq!(status.recent[0].id, id);
}

#[tokio::test]
async fn test_claimed_item_can_complete_without_execution() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);
    let id = queue.sling(SlingRequest::new("A", "lint", "1")).await.unwrap();

    assert!(queue.claim("A", id).await.unwrap());
    queue.complete("A", id, None).await.unwrap();
    assert_eq!(queue.get("A", id).await.unwrap().state, WorkItemState::Completed);
}

#[tokio::test]
async fn test_fail_records_error_and_counts_retry() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);
    let id = queue.sling(SlingRequest::new("A", "test", "suite")).await.unwrap();

    queue.fail("A", id, json!({"message": "flaky"})).await.unwrap();

    let item = queue.get("A", id).await.unwrap();
    assert_eq!(item.state, WorkItemState::Failed);
    assert_eq!(item.retry_count, 1);
    assert_eq!(item.error, Some(json!({"message": "flaky"})));

    let err = queue.fail("A", id, json!({"message": "again"})).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));
}

#[tokio::test]
async fn test_wrong_state_and_missing_items() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);
    let id = queue.sling(SlingRequest::new("A", "build", "7")).await.unwrap();

    // Pending items cannot be completed or started directly.
    let err = queue.complete("A", id, None).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));
    assert!(!queue.begin_execution("A", id, None).await.unwrap());

    assert!(queue.claim("A", id).await.unwrap());
    assert!(!queue.claim("A", id).await.unwrap());

    let ghost = Uuid::new_v4();
    assert!(matches!(queue.claim("A", ghost).await.unwrap_err(), DomainError::NotFound { .. }));
    assert!(matches!(queue.complete("A", ghost, None).await.unwrap_err(), DomainError::NotFound { .. }));

    // Items are scoped to their agent's hook.
    assert!(matches!(queue.get("B", id).await.unwrap_err(), DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_sling_validates_input() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);

    for request in [
        SlingRequest::new("", "build", "1"),
        SlingRequest::new("A", "", "1"),
        SlingRequest::new("A", "build", ""),
    ] {
        let err = queue.sling(request).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }
    assert!(queue.list_agents().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prune_only_removes_finished_items() {
    let pool = setup_test_db().await;
    let queue = work_queue(&pool);
    let done = queue.sling(SlingRequest::new("A", "build", "1")).await.unwrap();
    let failed = queue.sling(SlingRequest::new("A", "build", "2")).await.unwrap();
    let waiting = queue.sling(SlingRequest::new("A", "build", "3")).await.unwrap();

    queue.claim("A", done).await.unwrap();
    queue.complete("A", done, None).await.unwrap();
    queue.fail("A", failed, json!("boom")).await.unwrap();

    assert_eq!(queue.prune(30).await.unwrap(), 0);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(queue.prune(0).await.unwrap(), 2);

    let remaining = queue.status("A").await.unwrap();
    assert_eq!(remaining.total(), 1);
    assert_eq!(queue.get("A", waiting).await.unwrap().state, WorkItemState::Pending);
}
