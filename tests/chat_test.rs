//! Chat protocol tests: the read-marker semantics, conversation
//! listing with markers, history filtering, and channel authorization.

mod common;

use chrono::{Duration, Utc};
use common::{create_user, finished_game, manager};
use lexicross::error::CoreError;
use lexicross::services::{chat::user_channel, ChatService, NullNotifier};
use std::collections::HashSet;
use std::sync::Arc;

fn chat_service() -> ChatService {
    ChatService::new(Arc::new(NullNotifier))
}

#[tokio::test]
async fn unread_flag_follows_read_markers() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "alice", "Alice").await;
    create_user(&session, "bob", "Bob").await;

    // A live game channel with both players as participants
    let mut game = finished_game("g1", Some("alice"), Some("bob"), 0, 0, Utc::now(), false);
    game.over = false;
    session.games().create(&game).await.expect("game");

    let chat = chat_service();
    let t0 = Utc::now();

    // Oldest to newest: Bob "hi", Alice read marker, Bob "hello"
    chat.add_msg(&session, "game:g1", "bob", Some("alice"), "hi", Some(t0))
        .await
        .expect("send");
    chat.add_msg(
        &session,
        "game:g1",
        "alice",
        Some("bob"),
        "",
        Some(t0 + Duration::seconds(1)),
    )
    .await
    .expect("marker");
    chat.add_msg(
        &session,
        "game:g1",
        "bob",
        Some("alice"),
        "hello",
        Some(t0 + Duration::seconds(2)),
    )
    .await
    .expect("send");

    // The newest message is from Bob, so Alice has unread chat
    assert!(chat
        .check_unread(&session, "game:g1", "alice")
        .await
        .expect("check"));
    // ...while Bob has seen everything he didn't write himself
    assert!(!chat
        .check_unread(&session, "game:g1", "bob")
        .await
        .expect("check"));

    // Alice marks the channel as read
    chat.add_msg(
        &session,
        "game:g1",
        "alice",
        Some("bob"),
        "",
        Some(t0 + Duration::seconds(3)),
    )
    .await
    .expect("marker");
    assert!(!chat
        .check_unread(&session, "game:g1", "alice")
        .await
        .expect("check"));
}

#[tokio::test]
async fn empty_channel_has_no_unread() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let chat = chat_service();
    assert!(!chat
        .check_unread(&session, "game:nonexistent", "alice")
        .await
        .expect("check"));
}

#[tokio::test]
async fn conversation_listing_counts_only_real_messages() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "alice", "Alice").await;
    create_user(&session, "bob", "Bob").await;

    let mut game = finished_game("g2", Some("alice"), Some("bob"), 0, 0, Utc::now(), false);
    game.over = false;
    session.games().create(&game).await.expect("game");

    let chat = chat_service();
    let t0 = Utc::now();
    let sends = [
        ("bob", "one"),
        ("alice", ""),
        ("bob", "two"),
        ("alice", "three"),
    ];
    for (ix, (from, text)) in sends.iter().enumerate() {
        let to = if *from == "bob" { "alice" } else { "bob" };
        chat.add_msg(
            &session,
            "game:g2",
            from,
            Some(to),
            text,
            Some(t0 + Duration::seconds(ix as i64)),
        )
        .await
        .expect("send");
    }

    // Two real messages requested: the marker between them is still
    // included, newest first
    let listing = chat
        .list_conversation(&session, "game:g2", Some(2))
        .await
        .expect("list");
    let texts: Vec<&str> = listing.iter().map(|m| m.msg.as_str()).collect();
    assert_eq!(texts, vec!["three", "two"]);

    let listing = chat
        .list_conversation(&session, "game:g2", Some(3))
        .await
        .expect("list");
    let texts: Vec<&str> = listing.iter().map(|m| m.msg.as_str()).collect();
    assert_eq!(texts, vec!["three", "two", "", "one"]);
}

#[tokio::test]
async fn game_chat_requires_participation() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    create_user(&session, "alice", "Alice").await;
    create_user(&session, "bob", "Bob").await;
    create_user(&session, "mallory", "Mallory").await;

    let mut game = finished_game("g3", Some("alice"), Some("bob"), 0, 0, Utc::now(), false);
    game.over = false;
    session.games().create(&game).await.expect("game");

    let chat = chat_service();
    let result = chat
        .add_msg(&session, "game:g3", "mallory", Some("alice"), "hi", None)
        .await;
    assert!(matches!(result, Err(CoreError::Forbidden)));
}

#[tokio::test]
async fn direct_channels_are_normalized() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let chat = chat_service();

    let t0 = Utc::now();
    // Sent through the un-normalized channel name; both directions land
    // on the same conversation
    chat.add_msg(&session, "user:x", "zoe", Some("adam"), "hi", Some(t0))
        .await
        .expect("send");
    chat.add_msg(
        &session,
        "user:x",
        "adam",
        Some("zoe"),
        "hello",
        Some(t0 + Duration::seconds(1)),
    )
    .await
    .expect("send");

    let channel = user_channel("zoe", "adam");
    assert_eq!(channel, "user:adam:zoe");
    let listing = chat
        .list_conversation(&session, &channel, Some(10))
        .await
        .expect("list");
    assert_eq!(listing.len(), 2);
}

#[tokio::test]
async fn history_groups_by_correspondent_and_filters_blocked() {
    let manager = manager().await;
    let session = manager.open().await.expect("session");
    let chat = chat_service();

    let t0 = Utc::now();
    chat.add_msg(&session, "user:x", "alice", Some("bob"), "to bob", Some(t0))
        .await
        .expect("send");
    chat.add_msg(
        &session,
        "user:x",
        "carol",
        Some("alice"),
        "from carol",
        Some(t0 + Duration::seconds(1)),
    )
    .await
    .expect("send");
    chat.add_msg(
        &session,
        "user:x",
        "bob",
        Some("alice"),
        "bob again",
        Some(t0 + Duration::seconds(2)),
    )
    .await
    .expect("send");

    let history = chat
        .history(&session, "alice", 10, &HashSet::new())
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
    // Newest correspondent first, one row per correspondent
    assert_eq!(history[0].user, "bob");
    assert_eq!(history[0].last_msg, "bob again");
    assert!(history[0].unread);
    assert_eq!(history[1].user, "carol");

    let blocked: HashSet<String> = [String::from("bob")].into_iter().collect();
    let history = chat
        .history(&session, "alice", 10, &blocked)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user, "carol");
}
