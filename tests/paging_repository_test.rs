//! Integration tests for the paging and sorting capability

mod common;

use common::{ids, seeded_store, MemoryUserRepository, User};
use lightrepo::prelude::*;
use serde_json::json;

#[test]
fn test_third_page_ascending() {
    let store = seeded_store(25);
    let repo = MemoryUserRepository::open(&store);

    let page = repo
        .find_all_paged_sorted(
            PaginationRequest::new(2, 10),
            &OrderKey::new("id"),
            SortDirection::Ascending,
            false,
        )
        .unwrap();

    assert_eq!(ids(&page), vec![21, 22, 23, 24, 25]);
}

#[test]
fn test_third_page_descending() {
    let store = seeded_store(25);
    let repo = MemoryUserRepository::open(&store);

    let page = repo
        .find_all_paged_sorted(
            PaginationRequest::new(2, 10),
            &OrderKey::new("id"),
            SortDirection::Descending,
            false,
        )
        .unwrap();

    assert_eq!(ids(&page), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_find_all_is_repeatable() {
    let store = seeded_store(12);
    let repo = MemoryUserRepository::open(&store);

    let first = repo.find_all(false).unwrap();
    let second = repo.find_all(false).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 12);
}

#[test]
fn test_invalid_page_size_is_rejected() {
    let store = seeded_store(3);
    let repo = MemoryUserRepository::open(&store);

    for offset in [0, -1] {
        let result = repo.find_all_paged(PaginationRequest::new(0, offset), false);
        assert!(matches!(
            result,
            Err(RepositoryError::InvalidPageSize(size)) if size == offset
        ));
    }
}

#[test]
fn test_paged_where_and_sorted_where() {
    let store = seeded_store(20);
    let repo = MemoryUserRepository::open(&store);
    let even = QueryFilter::in_values(
        "id",
        (1..=20).filter(|id| id % 2 == 0).map(|id| json!(id)).collect(),
    );

    let page = repo
        .find_all_paged_where(PaginationRequest::new(1, 3), &even, false)
        .unwrap();
    assert_eq!(ids(&page), vec![8, 10, 12]);

    let page = repo
        .find_all_paged_where_sorted(
            PaginationRequest::new(0, 4),
            &even,
            &OrderKey::new("id"),
            SortDirection::Descending,
            false,
        )
        .unwrap();
    assert_eq!(ids(&page), vec![20, 18, 16, 14]);

    let past_end = repo
        .find_all_paged_where(PaginationRequest::new(5, 4), &even, false)
        .unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn test_nulls_sort_last_ascending() {
    let store = MemoryStore::new();
    let repo = MemoryUserRepository::open(&store);
    repo.add_many(vec![
        User::new(1, "a", None),
        User::new(2, "b", Some(50)),
        User::new(3, "c", Some(20)),
    ])
    .unwrap();
    repo.save_changes().unwrap();

    let ascending = repo
        .find_all_paged_sorted(
            PaginationRequest::new(0, 10),
            &OrderKey::new("age"),
            SortDirection::Ascending,
            false,
        )
        .unwrap();
    assert_eq!(ids(&ascending), vec![3, 2, 1]);

    let descending = repo
        .find_all_paged_sorted(
            PaginationRequest::new(0, 10),
            &OrderKey::new("age"),
            SortDirection::Descending,
            false,
        )
        .unwrap();
    assert_eq!(ids(&descending), vec![1, 2, 3]);
}

#[test]
fn test_staged_rows_are_paged_with_committed_rows() {
    let store = seeded_store(4);
    let repo = MemoryUserRepository::open(&store);

    repo.add(User::new(0, "staged", None)).unwrap();
    repo.delete_by_id(&4).unwrap();

    let page = repo
        .find_all_paged_sorted(
            PaginationRequest::new(0, 3),
            &OrderKey::new("id"),
            SortDirection::Ascending,
            false,
        )
        .unwrap();
    assert_eq!(ids(&page), vec![0, 1, 2]);
    assert_eq!(ids(&repo.find_all(false).unwrap()), vec![1, 2, 3, 0]);
}

#[test]
fn test_tracked_reads_attach_rows() {
    let store = seeded_store(3);
    let repo = MemoryUserRepository::open(&store);

    let users = repo.find_all(true).unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(repo.base().context().pending_changes(), 0);

    assert_eq!(
        repo.find_all(false).unwrap().len(),
        3,
        "attached rows are not staged changes"
    );

    let untracked = MemoryUserRepository::open(&store);
    untracked.find_all(false).unwrap();
    assert_eq!(untracked.base().context().pending_changes(), 0);
}

#[tokio::test]
async fn test_async_paging_and_cancellation() {
    let store = seeded_store(25);
    let repo = MemoryUserRepository::open(&store);
    let cancel = CancellationToken::new();

    let page = repo
        .find_all_paged_sorted_async(
            PaginationRequest::new(2, 10),
            &OrderKey::new("id"),
            SortDirection::Ascending,
            false,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![21, 22, 23, 24, 25]);

    assert_eq!(repo.find_all_async(false, &cancel).await.unwrap().len(), 25);

    cancel.cancel();
    let result = repo
        .find_all_paged_async(PaginationRequest::new(0, 5), false, &cancel)
        .await;
    assert!(matches!(result, Err(RepositoryError::OperationCancelled)));
}

#[test]
fn test_user_repository_as_trait_object() {
    let store = seeded_store(5);
    let repo: Box<dyn common::UserRepository> = Box::new(MemoryUserRepository::open(&store));

    let descriptor = QueryDescriptor::new()
        .filter(QueryFilter::gt("id", json!(1)))
        .filter(QueryFilter::lt("id", json!(5)))
        .order_by("id", SortDirection::Descending)
        .page(PaginationRequest::new(0, 2));

    assert_eq!(ids(&repo.find_all_by(&descriptor).unwrap()), vec![4, 3]);
    assert_eq!(repo.count().unwrap(), 5);
}
