use tinytoken::session::{Settings, TinyToken};
use tinytoken::store::{KvStore, MemoryStore, Ttl};

type Facade = TinyToken<MemoryStore, u64>;

fn facade() -> (MemoryStore, Facade) {
    let store = MemoryStore::new();
    let tinytoken = TinyToken::new(store.clone(), Settings::default()).unwrap();
    (store, tinytoken)
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (_, tinytoken) = facade();

    let token = tinytoken.set_token_with_timeout(&42, 100).await.unwrap();
    assert!(tinytoken.exists_by_token(&token).await.unwrap());
    assert!(tinytoken.exists_by_id(&42).await.unwrap());

    let info = tinytoken.get_info_by_token(&token).await.unwrap().unwrap();
    assert_eq!(info.id, Some(42));
    assert!(info.timeout > 0 && info.timeout <= 100);

    assert!(tinytoken.persist(&token).await.unwrap());
    let info = tinytoken.get_info_by_token(&token).await.unwrap().unwrap();
    assert_eq!(info.timeout, -1);

    assert!(tinytoken.delete_by_token(&token).await.unwrap());
    assert!(!tinytoken.exists_by_token(&token).await.unwrap());
    assert!(!tinytoken.delete_by_token(&token).await.unwrap());
    assert_eq!(tinytoken.get_info_by_token(&token).await.unwrap(), None);
}

#[tokio::test]
async fn test_expire_non_positive_ends_session() {
    let (_, tinytoken) = facade();
    let token = tinytoken.set_token(&1).await.unwrap();

    assert!(tinytoken.expire(&token, 0).await.unwrap());
    assert!(!tinytoken.exists_by_token(&token).await.unwrap());
    assert!(!tinytoken.expire(&token, 10).await.unwrap());
}

#[tokio::test]
async fn test_bulk_delete_by_id() {
    let (_, tinytoken) = facade();
    let mut tokens = Vec::new();
    for _ in 0..3 {
        tokens.push(tinytoken.set_token(&7).await.unwrap());
    }
    tinytoken.set_token(&9).await.unwrap();

    let mut listed = tinytoken.get_tokens(&7).await.unwrap();
    listed.sort();
    tokens.sort();
    assert_eq!(listed, tokens);

    assert_eq!(tinytoken.delete_by_id(&7).await.unwrap(), 3);
    assert_eq!(tinytoken.delete_by_id(&8).await.unwrap(), 0);
    assert!(tinytoken.get_tokens(&7).await.unwrap().is_empty());
    assert!(tinytoken.exists_by_id(&9).await.unwrap());
}

#[tokio::test]
async fn test_listings_skip_foreign_keys() {
    let (store, tinytoken) = facade();
    let first = tinytoken.set_token(&1).await.unwrap();
    let second = tinytoken.set_token(&2).await.unwrap();
    let anonymous = tinytoken.set_anonymous_token(-1).await.unwrap();

    store.set("tinytoken:a:b:c", "", None).await.unwrap();
    store.set("tinytoken", "", None).await.unwrap();
    store.set("tinytoken:x:tok", "", None).await.unwrap();
    store.set("other:1:tok", "", None).await.unwrap();

    let mut expected = vec![first, second, anonymous, "tok".to_string()];
    expected.sort();
    let mut listed = tinytoken.get_token_list().await.unwrap();
    listed.sort();
    assert_eq!(listed, expected);

    assert_eq!(tinytoken.get_ids().await.unwrap(), vec![1, 2]);

    // "x" is not a u64 id, so its record is left out of typed reports
    let infos = tinytoken.get_info().await.unwrap();
    assert_eq!(infos.len(), 3);
    assert_eq!(tinytoken.get_info_persist().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_extra_round_trip_by_id() {
    let (store, tinytoken) = facade();
    let token = tinytoken.set_token_with_timeout(&5, 100).await.unwrap();
    assert!(tinytoken.set_extra(&token, "{\"role\":\"admin\"}").await.unwrap());

    let infos = tinytoken.get_info_extra_by_id(&5).await.unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].extra.as_deref(), Some("{\"role\":\"admin\"}"));

    let key = format!("tinytoken:5:{token}");
    assert!(matches!(store.ttl(&key).await.unwrap(), Ttl::Expires(1..=100)));
}
