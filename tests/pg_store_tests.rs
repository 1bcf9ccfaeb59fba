// tests/pg_store_tests.rs
//
// Exercises the Postgres adapters against a real database. Each test is
// skipped when DATABASE_URL is not set.

use std::sync::Arc;

use sqlx::{PgPool, postgres::PgPoolOptions};
use videotube::{
    models::{
        pagination::PaginateOptions,
        user::{NewUser, User, UserChanges},
        video::{NewVideo, SortType, VideoQuery, VideoSortField},
    },
    store::{PgUserStore, PgVideoStore, UserStore, VideoStore},
};

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(pool)
}

/// Lowercase identity unique to one test run.
fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
}

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        full_name: "Store Test".to_string(),
        avatar: "http://media/avatar.png".to_string(),
        cover_image: String::new(),
        password: "not-a-real-hash".to_string(),
    }
}

async fn count_users(pool: &PgPool, username: &str, email: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = $1 OR email = $2")
            .bind(username)
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap();
    count
}

#[tokio::test]
async fn duplicate_insert_is_a_conflict() {
    let Some(pool) = test_pool().await else { return };
    let store = PgUserStore::new(pool.clone());

    let username = unique("dup");
    let email = format!("{}@example.com", username);
    store.insert(new_user(&username, &email)).await.unwrap();

    let other = unique("other");
    let err = store
        .insert(new_user(&username, &format!("{}@example.com", other)))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.message(), "User Already Exist");

    let err = store.insert(new_user(&other, &email)).await.unwrap_err();
    assert_eq!(err.status_code(), 409);

    assert_eq!(count_users(&pool, &username, &email).await, 1);
}

#[tokio::test]
async fn concurrent_inserts_leave_one_row() {
    let Some(pool) = test_pool().await else { return };
    let store = Arc::new(PgUserStore::new(pool.clone()));

    let username = unique("race");
    let mut handles = Vec::new();
    for i in 0..6 {
        let store = store.clone();
        let user = new_user(&username, &format!("{}{}@example.com", username, i));
        handles.push(tokio::spawn(async move { store.insert(user).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.status_code(), 409),
        }
    }
    assert_eq!(created, 1);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = $1")
        .bind(&username)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn lookup_prefers_username_match() {
    let Some(pool) = test_pool().await else { return };
    let store = PgUserStore::new(pool);

    let first = unique("first");
    let second = unique("second");
    store
        .insert(new_user(&first, &format!("{}@example.com", first)))
        .await
        .unwrap();
    store
        .insert(new_user(&second, &format!("{}@example.com", second)))
        .await
        .unwrap();

    let found = store
        .find_by_username_or_email(&second, &format!("{}@example.com", first))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.username, second);
}

#[tokio::test]
async fn refresh_token_is_set_then_cleared() {
    let Some(pool) = test_pool().await else { return };
    let store = PgUserStore::new(pool.clone());

    let username = unique("token");
    let user = store
        .insert(new_user(&username, &format!("{}@example.com", username)))
        .await
        .unwrap();

    let updated = User::update(
        &store,
        user.id,
        UserChanges {
            refresh_token: Some(Some("r1".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.refresh_token.as_deref(), Some("r1"));

    // Untouched when the change set leaves it out.
    let renamed = User::update(
        &store,
        user.id,
        UserChanges {
            full_name: Some("Renamed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(renamed.refresh_token.as_deref(), Some("r1"));
    assert_eq!(renamed.password, user.password);

    User::update(
        &store,
        user.id,
        UserChanges {
            refresh_token: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    let (stored,): (Option<String>,) =
        sqlx::query_as("SELECT refresh_token FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, None);

    assert!(store.update(-1, UserChanges::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn paginates_and_counts_past_the_end() {
    let Some(pool) = test_pool().await else { return };
    let users = PgUserStore::new(pool.clone());
    let videos = PgVideoStore::new(pool);

    let username = unique("owner");
    let owner = users
        .insert(new_user(&username, &format!("{}@example.com", username)))
        .await
        .unwrap();

    for i in 0..5 {
        videos
            .insert(NewVideo {
                video_file: format!("http://media/v{i}.mp4"),
                thumbnail: format!("http://media/v{i}.png"),
                title: format!("video {i}"),
                description: String::new(),
                duration: 10.0 + i as f64,
                is_published: Some(i != 4),
                owner: owner.id,
            })
            .await
            .unwrap();
    }

    let query = |page: u64, is_published: Option<bool>| VideoQuery {
        owner: Some(owner.id),
        is_published,
        sort_by: VideoSortField::Duration,
        sort_type: SortType::Desc,
        options: PaginateOptions::new(Some(page), Some(2)),
    };

    let page = videos.paginate(query(1, None)).await.unwrap();
    assert_eq!(page.total_docs, 5);
    assert_eq!(page.total_pages, 3);
    let titles: Vec<_> = page.docs.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, ["video 4", "video 3"]);

    let published = videos.paginate(query(2, Some(true))).await.unwrap();
    assert_eq!(published.total_docs, 4);
    let titles: Vec<_> = published.docs.iter().map(|v| v.title.as_str()).collect();
    assert_eq!(titles, ["video 1", "video 0"]);

    let past_end = videos.paginate(query(9, None)).await.unwrap();
    assert!(past_end.docs.is_empty());
    assert_eq!(past_end.total_docs, 5);
    assert!(!past_end.has_next_page);

    let huge = videos.paginate(query(u64::MAX, None)).await.unwrap();
    assert!(huge.docs.is_empty());
    assert_eq!(huge.total_docs, 5);
}
