//! Relation-map merging, orphan sweeps and pruning of dangling references.

use tempfile::TempDir;

use repograph::config::Config;
use repograph::metadata::{prune_compilation, sweep_orphans};
use repograph::storage::{load, save};
use repograph::{
    create_store, Collection, Compilation, DocumentStore, Institution, InstitutionRelation,
    MetadataService, ObjectId, Person, PersonRelation, Reference, StrippedUser,
};

fn create_test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.store.data_dir = data_dir.to_string_lossy().to_string();
    config
}

fn creator(institution: &str) -> PersonRelation {
    PersonRelation {
        roles: vec!["CREATOR".to_string()],
        institutions: Some(vec![Reference::stub(institution)]),
        contact_reference: None,
    }
}

#[tokio::test]
async fn test_link_unlink_and_sweep() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    let service = MetadataService::new(store.clone(), &config.metadata);

    save(store.as_ref(), &Person::new("p1", "Ada", "Lovelace"), None)
        .await
        .unwrap();
    save(store.as_ref(), &Institution::new("i1", "Museum"), None)
        .await
        .unwrap();

    let p1 = ObjectId::new("p1");
    let (a, b) = (ObjectId::new("d-a"), ObjectId::new("d-b"));

    assert!(service.link::<Person>(&p1, &a, creator("i1")).await.unwrap().is_none());
    assert!(service.link::<Person>(&p1, &b, creator("i1")).await.unwrap().is_none());
    service
        .link::<Institution>(
            &ObjectId::new("i1"),
            &a,
            InstitutionRelation {
                roles: vec!["RIGHTS_OWNER".to_string()],
                note: Some("loan".to_string()),
                address: None,
            },
        )
        .await
        .unwrap();

    let unlinked = service.unlink::<Person>(&p1, &a).await.unwrap();
    assert_eq!(unlinked.removed, Some(creator("i1")));
    assert!(!unlinked.orphan);

    let stored = load::<Person>(store.as_ref(), &p1).await.unwrap().unwrap();
    assert!(!stored.document.roles.contains_key(&a));
    assert!(!stored.document.institutions.contains_key(&a));
    assert!(stored.document.roles.contains_key(&b));

    let unlinked = service.unlink::<Person>(&p1, &b).await.unwrap();
    assert!(unlinked.orphan);
    assert!(service.is_orphan::<Person>(&p1).await.unwrap());

    // Unlinking twice is a no-op.
    let again = service.unlink::<Person>(&p1, &b).await.unwrap();
    assert!(again.removed.is_none());

    let dry = sweep_orphans(store.as_ref(), true).await.unwrap();
    assert_eq!(dry.orphans, vec![(Collection::Person, p1.clone())]);
    assert_eq!(dry.deleted, 0);

    let swept = sweep_orphans(store.as_ref(), false).await.unwrap();
    assert_eq!(swept.checked, 2);
    assert_eq!(swept.deleted, 1);
    assert!(store.get_by_id(Collection::Person, &p1).await.unwrap().is_none());
    assert!(store
        .get_by_id(Collection::Institution, &ObjectId::new("i1"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_link_missing_record_fails() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    let service = MetadataService::new(store, &config.metadata);

    let err = service
        .link::<Person>(&ObjectId::new("p404"), &ObjectId::new("d-a"), creator("i1"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("p404"));

    let unlinked = service
        .unlink::<Person>(&ObjectId::new("p404"), &ObjectId::new("d-a"))
        .await
        .unwrap();
    assert!(unlinked.orphan);
}

#[tokio::test]
async fn test_prune_after_entity_removed() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();

    let mut compilation = Compilation::new("c1", "Vessels", StrippedUser::new("u1", "alice"));
    compilation.entities = vec![
        Some(Reference::stub("e-gone")),
        None,
        Some(Reference::stub("e-gone-too")),
    ];
    save(store.as_ref(), &compilation, None).await.unwrap();

    let id = ObjectId::new("c1");
    let removed = prune_compilation(store.as_ref(), &id, config.metadata.max_retries)
        .await
        .unwrap();
    assert_eq!(removed, Some(3));

    let stored = load::<Compilation>(store.as_ref(), &id).await.unwrap().unwrap();
    assert!(stored.document.entities.is_empty());
    assert_eq!(stored.revision, 2);

    // Nothing left to prune: no further write.
    prune_compilation(store.as_ref(), &id, config.metadata.max_retries)
        .await
        .unwrap();
    let stored = load::<Compilation>(store.as_ref(), &id).await.unwrap().unwrap();
    assert_eq!(stored.revision, 2);

    assert_eq!(
        prune_compilation(store.as_ref(), &ObjectId::new("c404"), 1)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_prune_keeps_unknown_nested_fields() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();

    let id = ObjectId::new("c1");
    let raw = serde_json::json!({
        "_id": "c1",
        "name": "Vessels",
        "relatedOwner": {"_id": "u1", "username": "alice", "mail": "a@example.org"},
        "entities": [null],
        "whitelist": {
            "enabled": true,
            "persons": [],
            "groups": [{"_id": "g1", "name": "Curators", "color": "teal"}],
            "note": "x"
        },
        "featured": true
    });
    store
        .put_by_id(Collection::Compilation, &id, raw, None)
        .await
        .unwrap();

    let removed = prune_compilation(store.as_ref(), &id, config.metadata.max_retries)
        .await
        .unwrap();
    assert_eq!(removed, Some(1));

    let stored = store
        .get_by_id(Collection::Compilation, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.revision, 2);
    assert_eq!(stored.body["whitelist"]["note"], "x");
    assert_eq!(stored.body["whitelist"]["groups"][0]["color"], "teal");
    assert_eq!(stored.body["relatedOwner"]["mail"], "a@example.org");
    assert_eq!(stored.body["featured"], true);
    assert_eq!(stored.body["entities"], serde_json::json!([]));
}
