//! Session and transaction contract tests over the document store:
//! nested scopes, optimistic conflicts and read-your-writes.

mod common;

use common::{create_user, manager};
use futures_util::FutureExt;
use lexicross::db::records::UserUpdate;
use lexicross::db::DbError;
use lexicross::error::CoreError;

#[tokio::test]
async fn nested_scope_buffers_until_commit() {
    let manager = manager().await;
    let writer = manager.open().await.expect("session");
    let reader = manager.open().await.expect("session");
    create_user(&writer, "u", "Uggi").await;

    writer.begin().await.expect("begin");
    writer
        .users()
        .update(
            "u",
            UserUpdate {
                nickname: Some("Changed".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    // The writer sees its own buffered write
    let seen = writer.users().get("u").await.expect("load").expect("user");
    assert_eq!(seen.nickname, "Changed");

    // Another request does not, until the scope commits
    let other = reader.users().get("u").await.expect("load").expect("user");
    assert_eq!(other.nickname, "Uggi");

    writer.commit_nested().await.expect("commit");
    let other = reader.users().get("u").await.expect("load").expect("user");
    assert_eq!(other.nickname, "Changed");
}

#[tokio::test]
async fn rolled_back_scope_leaves_no_trace() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "u", "Uggi").await;

    session.begin().await.expect("begin");
    session
        .users()
        .update(
            "u",
            UserUpdate {
                nickname: Some("Changed".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    session.rollback_nested().await.expect("rollback");

    let user = session.users().get("u").await.expect("load").expect("user");
    assert_eq!(user.nickname, "Uggi");
}

#[tokio::test]
async fn concurrent_scopes_conflict_on_the_same_document() {
    let manager = manager().await;
    let first = manager.open().await.expect("session");
    let second = manager.open().await.expect("session");
    create_user(&first, "u", "Uggi").await;

    first.begin().await.expect("begin");
    second.begin().await.expect("begin");

    first
        .users()
        .update(
            "u",
            UserUpdate {
                location: Some("Reykjavik".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    second
        .users()
        .update(
            "u",
            UserUpdate {
                location: Some("Akureyri".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    // First writer wins; the second scope fails its version check
    first.commit_nested().await.expect("commit");
    let result = second.commit_nested().await;
    assert!(matches!(result, Err(DbError::Conflict(_))));

    let user = first.users().get("u").await.expect("load").expect("user");
    assert_eq!(user.location, "Reykjavik");
}

#[tokio::test]
async fn buffered_scope_conflicts_with_an_interleaved_write() {
    let manager = manager().await;
    let first = manager.open().await.expect("session");
    let second = manager.open().await.expect("session");
    create_user(&first, "u", "Uggi").await;

    // Interleave: the second scope buffers against the pre-commit
    // version, then the first scope lands its write
    second.begin().await.expect("begin");
    second
        .users()
        .update(
            "u",
            UserUpdate {
                location: Some("Akureyri".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    first
        .users()
        .update(
            "u",
            UserUpdate {
                location: Some("Reykjavik".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");

    let result = second.commit_nested().await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

#[tokio::test]
async fn run_commits_on_success_and_rolls_back_on_error() {
    let manager = manager().await;

    let result: Result<(), CoreError> = manager
        .run(|session| {
            async move {
                create_user(session, "ok", "Okay").await;
                Ok(())
            }
            .boxed()
        })
        .await;
    assert!(result.is_ok());

    let session = manager.open().await.expect("session");
    assert!(session.users().get("ok").await.expect("load").is_some());
}
