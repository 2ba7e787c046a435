//! Feed projection.
//!
//! Every view is rebuilt from the store on each call: post rows with their
//! like aggregates, poll tallies and rendered bodies are read inside one
//! snapshot, then shaped into `PostView`s. No caching, so a view is exactly
//! as fresh as the snapshot it was read from.

use anyhow::Result;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use rusqlite::Connection;

use chirp_db::ledger::query_poll_tally;
use chirp_db::models::FeedRow;
use chirp_db::posts::{FeedScope, query_feed_row, query_feed_rows, query_poll_question};
use chirp_db::users::{query_post_count, query_user_by_id};
use chirp_db::wordlist::query_censored_words;
use chirp_types::api::{FeedResponse, PostBody, PostView};
use chirp_types::models::{PostKind, display_name};
use chirp_types::time::display_time;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::polls::option_views;
use crate::render::Renderer;
use crate::state::{AppState, run_db};

/// Shape one post row for `viewer_id`.
pub fn project(
    conn: &Connection,
    renderer: &Renderer,
    viewer_id: i64,
    row: FeedRow,
) -> Result<PostView> {
    let body = match row.kind {
        PostKind::Text => PostBody::Text {
            content: renderer.render(&row.content),
        },
        PostKind::Poll => PostBody::Poll {
            question: query_poll_question(conn, row.id)?,
            options: option_views(query_poll_tally(conn, row.id, viewer_id)?),
        },
    };

    Ok(PostView {
        id: row.id,
        user_id: row.user_id,
        username: display_name(row.user_id, row.username.as_deref(), row.author_deleted),
        is_deleted_user: row.author_deleted,
        author_is_admin: row.author_is_admin,
        time: display_time(&row.created_at),
        is_public: row.is_public,
        like_count: row.like_count,
        liked_by_me: row.liked_by_me,
        body,
    })
}

/// All posts in `scope` as seen by `viewer_id`, newest first.
pub fn build_feed(conn: &Connection, viewer_id: i64, scope: FeedScope) -> Result<Vec<PostView>> {
    let renderer = Renderer::new(&query_censored_words(conn)?);
    query_feed_rows(conn, viewer_id, scope)?
        .into_iter()
        .map(|row| project(conn, &renderer, viewer_id, row))
        .collect()
}

/// A single post as `viewer_id` would see it in the feed.
pub fn build_post(conn: &Connection, viewer_id: i64, post_id: i64) -> Result<Option<PostView>> {
    let renderer = Renderer::new(&query_censored_words(conn)?);
    query_feed_row(conn, viewer_id, post_id)?
        .map(|row| project(conn, &renderer, viewer_id, row))
        .transpose()
}

/// GET /feed
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = ctx.viewer_id;
    let (posts, post_count, username) = run_db(&state, move |db| {
        db.with_snapshot(|conn| {
            let posts = build_feed(conn, viewer, FeedScope::Visible)?;
            let post_count = query_post_count(conn, viewer)?;
            let username = query_user_by_id(conn, viewer)?.and_then(|u| u.username);
            Ok((posts, post_count, username))
        })
    })
    .await?;

    Ok(Json(FeedResponse {
        viewer_id: viewer,
        username: username.unwrap_or_default(),
        is_admin: ctx.is_admin,
        post_count,
        posts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirp_db::testutil::{temp_db, user};

    const T0: &str = "2024-03-05T08:37:00.000000+00:00";
    const T1: &str = "2024-03-05T09:00:00.000000+00:00";

    #[test]
    fn feed_joins_likes_polls_and_rendered_text() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        db.add_censored_word("darn").unwrap();

        let text = db.create_text_post(alice, "[b]darn[/b] <x>", true, T0).unwrap();
        let opts = vec!["yes".to_string(), "no".to_string()];
        let poll = db.create_poll(bob, "lunch?", &opts, true, T1).unwrap();
        db.toggle_like(bob, text).unwrap();

        let tally = db.with_conn(|c| query_poll_tally(c, poll, alice)).unwrap();
        db.cast_vote(alice, tally[0].option_id).unwrap();
        db.cast_vote(bob, tally[0].option_id).unwrap();
        db.cast_vote(user(&db, "carol"), tally[1].option_id).unwrap();

        let feed = db.with_snapshot(|c| build_feed(c, alice, FeedScope::Visible)).unwrap();
        assert_eq!(feed.len(), 2);

        assert_eq!(feed[0].id, poll);
        match &feed[0].body {
            PostBody::Poll { question, options } => {
                assert_eq!(question, "lunch?");
                assert_eq!(options[0].votes, 2);
                assert_eq!(options[0].percent, 66.7);
                assert!(options[0].voted_by_me);
                assert_eq!(options[1].percent, 33.3);
                assert!(!options[1].voted_by_me);
            }
            other => panic!("expected poll, got {:?}", other),
        }

        assert_eq!(feed[1].id, text);
        assert_eq!(feed[1].like_count, 1);
        assert!(!feed[1].liked_by_me);
        assert_eq!(feed[1].time, "05/03/2024 - 02:07 pm");
        assert_eq!(
            feed[1].body,
            PostBody::Text {
                content: "<strong>d***</strong> &lt;x&gt;".to_string()
            }
        );
    }

    #[test]
    fn private_posts_only_reach_their_author() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let hidden = db.create_text_post(alice, "diary", false, T0).unwrap();

        let mine = db.with_snapshot(|c| build_feed(c, alice, FeedScope::Visible)).unwrap();
        assert!(mine.iter().any(|p| p.id == hidden));

        let theirs = db.with_snapshot(|c| build_feed(c, bob, FeedScope::Visible)).unwrap();
        assert!(theirs.iter().all(|p| p.id != hidden));
    }

    #[test]
    fn soft_deleted_author_is_anonymised() {
        let db = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        db.create_text_post(alice, "hello from alice", true, T0).unwrap();
        db.soft_delete_user(alice).unwrap();

        let feed = db.with_snapshot(|c| build_feed(c, bob, FeedScope::Visible)).unwrap();
        assert_eq!(feed[0].username, format!("Deleted User [{}]", alice));
        assert!(feed[0].is_deleted_user);

        let json = serde_json::to_string(&feed).unwrap();
        assert!(!json.contains("\"alice\""));
    }
}
