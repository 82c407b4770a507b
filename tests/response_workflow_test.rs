mod common;

use axum::http::StatusCode;
use common::*;
use marketplace_backend::entities::prelude::*;
use marketplace_backend::services::notify::NotificationKind;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use tower::ServiceExt;

async fn seeded_post(t: &TestApp, token: &str) {
    let category = any_category_id(&t.state.db).await;
    let res = create_post_request(&t.app, token, &category, "Sword", 100, vec![]).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn one_response_per_author_and_post() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", Some("alice@example.com")).await;
    let (bob, _) = register_user(&t.app, "bob", Some("bob@example.com")).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Still available?"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["is_accepted"], false);

    // The post author was notified about the new response.
    assert_eq!(
        t.notifier.sent_to(),
        vec![(NotificationKind::NewResponse, "alice@example.com".into())]
    );

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Asking again!"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(Responses::find().count(&t.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn accept_and_reject_are_owner_gated_transitions() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", Some("alice@example.com")).await;
    let (bob, _) = register_user(&t.app, "bob", Some("bob@example.com")).await;
    let (carol, _) = register_user(&t.app, "carol", None).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Still available?"})),
        ))
        .await
        .unwrap();
    let response_id = body_json(res).await["id"].as_str().unwrap().to_string();

    // Carol is not the post author.
    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/responses/{response_id}/accept"),
            Some(carol.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let row = Responses::find_by_id(response_id.as_str())
        .one(&t.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.is_accepted);

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/responses/{response_id}/accept"),
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["is_accepted"], true);

    // Bob got the acceptance email.
    assert!(
        t.notifier
            .sent_to()
            .contains(&(NotificationKind::ResponseAccepted, "bob@example.com".into()))
    );
    let notifications_so_far = t.notifier.sent_to().len();

    // Reject flips the flag back and sends nothing.
    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/responses/{response_id}/reject"),
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["is_accepted"], false);
    assert_eq!(t.notifier.sent_to().len(), notifications_so_far);
}

#[tokio::test]
async fn acceptance_notification_skipped_without_email() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", None).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Trade?"})),
        ))
        .await
        .unwrap();
    let response_id = body_json(res).await["id"].as_str().unwrap().to_string();

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/responses/{response_id}/accept"),
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Neither party has an email, so nothing was dispatched at all.
    assert!(t.notifier.sent_to().is_empty());
}

#[tokio::test]
async fn notifier_failure_never_fails_the_operation() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", Some("alice@example.com")).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    seeded_post(&t, &alice).await;

    t.notifier
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Still available?"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(Responses::find().count(&t.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn moderation_delete_is_post_owner_only() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", None).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "Offer: 80"})),
        ))
        .await
        .unwrap();
    let response_id = body_json(res).await["id"].as_str().unwrap().to_string();

    // Even the responder cannot withdraw it; deletion is moderation only.
    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/responses/{response_id}"),
            Some(bob.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/responses/{response_id}"),
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(Responses::find().count(&t.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn owner_listing_and_public_accepted_view() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", None).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    let (carol, _) = register_user(&t.app, "carol", None).await;
    let category = any_category_id(&t.state.db).await;

    for title in ["Sword", "Shield"] {
        let res = create_post_request(&t.app, &alice, &category, title, 100, vec![]).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    for (token, slug, content) in [
        (&bob, "sword", "Offer: 90"),
        (&carol, "sword", "Offer: 95"),
        (&bob, "shield", "Trade for helmet?"),
    ] {
        let res = t
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/posts/{slug}/responses"),
                Some(token.as_str()),
                Some(json!({"content": content})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = t
        .app
        .clone()
        .oneshot(json_request("GET", "/my/responses", Some(alice.as_str()), None))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "GET",
            "/my/responses?post=sword",
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Accept one response; only it shows on the public detail page.
    let accepted_id = body[1]["id"].as_str().unwrap().to_string();
    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/responses/{accepted_id}/accept"),
            Some(alice.as_str()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = t
        .app
        .clone()
        .oneshot(json_request("GET", "/posts/sword", None, None))
        .await
        .unwrap();
    let body = body_json(res).await;
    let accepted = body["accepted_responses"].as_array().unwrap();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0]["id"], accepted_id.as_str());
}

#[tokio::test]
async fn author_may_respond_to_their_own_post() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", Some("alice@example.com")).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(alice.as_str()),
            Some(json!({"content": "Bumping my own listing"})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn response_length_limit_counts_characters_not_bytes() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", None).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    seeded_post(&t, &alice).await;

    // 200 Cyrillic characters are 400 bytes; still within the 255 limit.
    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "д".repeat(200)})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(Responses::find().count(&t.state.db).await.unwrap(), 1);
}

#[tokio::test]
async fn overlong_response_content_is_rejected() {
    let t = setup().await;
    let (alice, _) = register_user(&t.app, "alice", None).await;
    let (bob, _) = register_user(&t.app, "bob", None).await;
    seeded_post(&t, &alice).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/posts/sword/responses",
            Some(bob.as_str()),
            Some(json!({"content": "x".repeat(256)})),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(Responses::find().count(&t.state.db).await.unwrap(), 0);
}
