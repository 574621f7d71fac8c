//! Reference resolution against a file-backed store.

use std::sync::Arc;

use tempfile::TempDir;

use repograph::config::Config;
use repograph::storage::{load, save};
use repograph::{
    create_store, Collection, DigitalEntity, DocumentStore, Entity, Institution, ObjectId, Person,
    Reference, RepoError, ResolveOptions, Resolver, StrippedUser,
};

/// Create a test configuration with a file store under `data_dir`.
fn create_test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.store.data_dir = data_dir.to_string_lossy().to_string();
    config
}

/// Entity e1 -> d1 -> [p1, p-gone], [i1]; p1 and i1 reference each other.
async fn seed(store: &dyn DocumentStore) {
    let mut person = Person::new("p1", "Ada", "Lovelace");
    person.roles.insert(ObjectId::new("d1"), vec!["CREATOR".to_string()]);
    person
        .institutions
        .insert(ObjectId::new("d1"), vec![Reference::stub("i1")]);

    let mut institution = Institution::new("i1", "Museum");
    institution.roles.insert(ObjectId::new("d1"), vec!["RIGHTS_OWNER".to_string()]);
    institution.persons.push(Some(Reference::stub("p1")));

    let mut digital = DigitalEntity::new("d1", "Amphora");
    digital.persons = vec![Some(Reference::stub("p1")), Some(Reference::stub("p-gone"))];
    digital.institutions = vec![Some(Reference::stub("i1"))];

    let entity = Entity::new(
        "e1",
        "Amphora",
        Reference::stub("d1"),
        StrippedUser::new("u1", "alice"),
    );

    save(store, &person, None).await.unwrap();
    save(store, &institution, None).await.unwrap();
    save(store, &digital, None).await.unwrap();
    save(store, &entity, None).await.unwrap();
}

#[tokio::test]
async fn test_deep_resolution_breaks_cycles() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    seed(store.as_ref()).await;

    let resolver = Resolver::new(store, ResolveOptions::deep());
    let resolution = resolver
        .fetch::<Entity>(&ObjectId::new("e1"))
        .await
        .unwrap()
        .expect("entity should exist");

    let digital = resolution
        .document
        .related_digital_entity
        .as_resolved()
        .expect("digital entity should be resolved");
    assert_eq!(digital.persons.len(), 2, "array positions are kept");
    let person = digital.persons[0]
        .as_ref()
        .and_then(Reference::as_resolved)
        .expect("person should be resolved");
    assert_eq!(person.full_name(), "Ada Lovelace");
    assert!(digital.persons[1].is_none(), "missing person becomes null");

    assert_eq!(resolution.report.fetched, 3);
    assert_eq!(resolution.report.missing, 1);
    assert!(resolution.report.cycles_broken >= 1);
}

#[tokio::test]
async fn test_shallow_resolution_stops_after_one_hop() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    seed(store.as_ref()).await;

    let resolver = Resolver::new(store, ResolveOptions::shallow());
    let resolution = resolver
        .fetch::<Entity>(&ObjectId::new("e1"))
        .await
        .unwrap()
        .unwrap();

    let digital = resolution
        .document
        .related_digital_entity
        .as_resolved()
        .unwrap();
    assert!(digital.persons.iter().flatten().all(Reference::is_stub));
    assert_eq!(resolution.report.fetched, 1);
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());

    {
        let store = create_store(&config).await.unwrap();
        seed(store.as_ref()).await;
    }

    let store: Arc<dyn DocumentStore> = create_store(&config).await.unwrap();
    let person = load::<Person>(store.as_ref(), &ObjectId::new("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.revision, 1);
    assert_eq!(person.document.name, "Lovelace");
    assert_eq!(store.list_ids(Collection::Entity).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_only_write_conflicts() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();

    let person = Person::new("p1", "Ada", "Lovelace");
    assert_eq!(save(store.as_ref(), &person, Some(0)).await.unwrap(), 1);

    let err = save(store.as_ref(), &person, Some(0)).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(matches!(err, RepoError::Storage(_)));
}
