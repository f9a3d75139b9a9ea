use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgListener;

use roster::application::clients::ClientService;
use roster::application::error::ErrorKind;
use roster::application::events::{CLIENT_CREATED, CLIENT_DELETED, EventPublisher};
use roster::application::repos::{ClientsRepo, ClientsWriteRepo, RepoError};
use roster::domain::clients::{ClientId, ClientPatch, NewClient};
use roster::domain::entities::ClientRecord;
use roster::infra::cache::LruTtlCache;
use roster::infra::db::PostgresRepositories;
use roster::infra::events::PgNotifyPublisher;

fn record(name: &str, email: &str) -> ClientRecord {
    ClientRecord::new(NewClient::new(name, email, "11223344556").expect("valid client"))
}

#[sqlx::test(migrations = "./migrations")]
async fn create_then_find_round_trips_every_column(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let created = repos
        .create(record("Ana", "ana@example.com"))
        .await
        .expect("create");

    let found = repos
        .find_by_id(&created.id)
        .await
        .expect("find")
        .expect("row exists");

    assert_eq!(found.id, created.id);
    assert_eq!(found.name, "Ana");
    assert_eq!(found.email, "ana@example.com");
    assert_eq!(found.phone, "11223344556");
}

#[sqlx::test(migrations = "./migrations")]
async fn find_by_unknown_id_is_none(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let id = ClientId::parse("missing").expect("id");

    assert!(repos.find_by_id(&id).await.expect("query").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn find_all_orders_by_creation(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let first = repos
        .create(record("Ana", "ana@example.com"))
        .await
        .expect("first");
    let second = repos
        .create(record("Bea", "bea@example.com"))
        .await
        .expect("second");

    let ids: Vec<ClientId> = repos
        .find_all()
        .await
        .expect("list")
        .into_iter()
        .map(|client| client.id)
        .collect();

    assert_eq!(ids, vec![first.id, second.id]);
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_maps_to_duplicate(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    repos
        .create(record("Ana", "ana@example.com"))
        .await
        .expect("first");

    let err = repos
        .create(record("Other", "ana@example.com"))
        .await
        .expect_err("duplicate email");

    assert!(
        matches!(err, RepoError::Duplicate { ref constraint } if constraint == "clients_email_key"),
        "unexpected error: {err:?}"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn update_changes_only_supplied_fields(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let created = repos
        .create(record("Ana", "ana@example.com"))
        .await
        .expect("create");

    let patch = ClientPatch {
        name: Some("Bea".into()),
        ..ClientPatch::default()
    };
    let updated = repos.update(&created.id, patch).await.expect("update");

    assert_eq!(updated.name, "Bea");
    assert_eq!(updated.email, "ana@example.com");
}

#[sqlx::test(migrations = "./migrations")]
async fn update_and_delete_of_unknown_id_are_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let id = ClientId::parse("missing").expect("id");

    let err = repos
        .update(&id, ClientPatch::default())
        .await
        .expect_err("update missing");
    assert!(matches!(err, RepoError::NotFound));

    let err = repos.delete(&id).await.expect_err("delete missing");
    assert!(matches!(err, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_returns_the_removed_row(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let created = repos
        .create(record("Ana", "ana@example.com"))
        .await
        .expect("create");

    let deleted = repos.delete(&created.id).await.expect("delete");

    assert_eq!(deleted.id, created.id);
    assert!(repos.find_by_id(&created.id).await.expect("find").is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn pg_notify_publisher_reaches_listeners(pool: PgPool) {
    let mut listener = PgListener::connect_with(&pool).await.expect("listener");
    listener.listen(CLIENT_DELETED).await.expect("listen");

    let publisher = PgNotifyPublisher::new(pool);
    publisher
        .publish(CLIENT_DELETED, &json!({ "id": "abc" }))
        .await
        .expect("publish");

    let notification = tokio::time::timeout(Duration::from_secs(5), listener.recv())
        .await
        .expect("notification before timeout")
        .expect("notification");

    assert_eq!(notification.channel(), CLIENT_DELETED);
    assert_eq!(notification.payload(), r#"{"id":"abc"}"#);
}

#[sqlx::test(migrations = "./migrations")]
async fn service_over_postgres_publishes_and_reads_through(pool: PgPool) {
    let mut listener = PgListener::connect_with(&pool).await.expect("listener");
    listener.listen(CLIENT_CREATED).await.expect("listen");

    let repos = Arc::new(PostgresRepositories::new(pool.clone()));
    let cache = Arc::new(LruTtlCache::new(NonZeroUsize::new(16).expect("capacity")));
    let service = ClientService::new(
        repos.clone(),
        repos,
        cache.clone(),
        Arc::new(PgNotifyPublisher::new(pool)),
    );

    let created = service
        .create(NewClient::new("Ana", "ana@example.com", "1").expect("valid"))
        .await
        .expect("create");

    let notification = tokio::time::timeout(Duration::from_secs(5), listener.recv())
        .await
        .expect("notification before timeout")
        .expect("notification");
    let payload: serde_json::Value =
        serde_json::from_str(notification.payload()).expect("json payload");
    assert_eq!(payload, json!({ "id": created.id.as_str(), "name": "Ana" }));

    let fetched = service
        .get_by_id(created.id.as_str())
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.email, "ana@example.com");
    assert_eq!(cache.len(), 1);

    let err = service
        .create(NewClient::new("Dup", "ana@example.com", "2").expect("valid"))
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
