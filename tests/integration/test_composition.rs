//! Access control, compilation composition and live annotation sharing.

use std::sync::Arc;

use tempfile::TempDir;

use repograph::access;
use repograph::annotation::load_list;
use repograph::broadcast::whitelist_changed;
use repograph::config::Config;
use repograph::storage::save;
use repograph::{
    create_store, AccessError, AccessGuard, AccessPolicy, Agent, Annotation, Collection, Compilation,
    ComposedEntry, Composer, DenyReason, DigitalEntity, DocumentStore, Entity, Group, ObjectId,
    Password, Principal, Reference, RepoError, RepositoryEvent, ResolveOptions, Resolver,
    RoomRegistry, SocketUser, StrippedUser, TargetOwner, TokioBroadcast, UserRank, Verdict,
};

fn create_test_config(data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.store.data_dir = data_dir.to_string_lossy().to_string();
    config
}

fn alice() -> StrippedUser {
    StrippedUser::new("u1", "alice")
}

/// c1 (password "secret") holds [e1 public, e2 whitelisted for group g1, null].
async fn seed(store: &dyn DocumentStore) {
    save(store, &DigitalEntity::new("d1", "Amphora"), None)
        .await
        .unwrap();

    let public = Entity::new("e1", "Amphora", Reference::stub("d1"), alice());

    let mut group = Group::new("g1", "Curators", alice());
    group.members.push(StrippedUser::new("u3", "carol"));
    let mut private = Entity::new("e2", "Krater", Reference::stub("d1"), alice());
    access::enable(&mut private.whitelist);
    access::add_group(&mut private.whitelist, group);

    let mut compilation = Compilation::new("c1", "Vessels", alice());
    compilation.password = Some(Password::Secret("secret".to_string()));
    compilation.entities = vec![
        Some(Reference::stub("e1")),
        Some(Reference::stub("e2")),
        None,
    ];

    save(store, &public, None).await.unwrap();
    save(store, &private, None).await.unwrap();
    save(store, &compilation, None).await.unwrap();
}

async fn composer(data_dir: &TempDir) -> Composer {
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    seed(store.as_ref()).await;
    Composer::new(
        Resolver::from_config(store, &config.resolver),
        AccessPolicy::new(&config.access),
    )
}

#[tokio::test]
async fn test_anonymous_with_password_sees_public_entities() {
    let data_dir = TempDir::new().unwrap();
    let composer = composer(&data_dir).await;

    let view = composer
        .compose_by_id(&ObjectId::new("c1"), &Principal::Anonymous, Some("secret"))
        .await
        .unwrap()
        .into_view(composer.policy(), &Principal::Anonymous)
        .unwrap();

    assert_eq!(view.entries.len(), 3);
    assert!(view.entries[0].is_visible());
    assert_eq!(
        view.entries[1],
        ComposedEntry::Hidden {
            id: ObjectId::new("e2"),
            verdict: Verdict::DenyWhitelist
        }
    );
    assert_eq!(view.entries[2], ComposedEntry::Missing { id: None });

    let wire = serde_json::to_value(&view).unwrap();
    assert_eq!(wire["entities"][1], serde_json::json!({"_id": "e2"}));
    assert_eq!(wire["entities"][2], serde_json::json!({"_id": null}));
}

#[tokio::test]
async fn test_group_member_sees_whitelisted_entity() {
    let data_dir = TempDir::new().unwrap();
    let composer = composer(&data_dir).await;
    let carol = Principal::user("u3", UserRank::User);

    let view = composer
        .compose_by_id(&ObjectId::new("c1"), &carol, Some("secret"))
        .await
        .unwrap()
        .into_view(composer.policy(), &carol)
        .unwrap();

    assert_eq!(view.visible_count(), 2);
    assert_eq!(view.missing_count(), 1);
}

#[tokio::test]
async fn test_wrong_password_disclosure_depends_on_role() {
    let data_dir = TempDir::new().unwrap();
    let composer = composer(&data_dir).await;
    let id = ObjectId::new("c1");

    let stranger = Principal::user("u2", UserRank::User);
    let err = composer
        .compose_by_id(&id, &stranger, Some("guess"))
        .await
        .unwrap()
        .into_view(composer.policy(), &stranger)
        .unwrap_err();
    assert!(matches!(err, RepoError::Access(AccessError::Forbidden)));

    let admin = Principal::user("u9", UserRank::Admin);
    let err = composer
        .compose_by_id(&id, &admin, Some("guess"))
        .await
        .unwrap()
        .into_view(composer.policy(), &admin)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Access(AccessError::Denied(DenyReason::Password))
    ));
}

#[tokio::test]
async fn test_guard_hides_existence_from_strangers() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    seed(store.as_ref()).await;
    let guard = AccessGuard::new(
        Resolver::new(store, ResolveOptions::shallow()),
        AccessPolicy::new(&config.access),
    );
    let stranger = Principal::user("u2", UserRank::User);

    let hidden = guard
        .view::<Entity>(&stranger, &ObjectId::new("e2"), None)
        .await
        .unwrap_err();
    let missing = guard
        .view::<Entity>(&stranger, &ObjectId::new("e404"), None)
        .await
        .unwrap_err();
    assert_eq!(hidden.to_string(), missing.to_string());

    let owner = Principal::user("u1", UserRank::User);
    let resolution = guard
        .view::<Entity>(&owner, &ObjectId::new("e2"), None)
        .await
        .unwrap();
    assert!(!resolution.document.related_digital_entity.is_stub());
}

#[tokio::test]
async fn test_annotation_shared_through_room() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let store = create_store(&config).await.unwrap();
    seed(store.as_ref()).await;

    let owner = TargetOwner::Compilation(ObjectId::new("c1"));
    let existing = Annotation::new("a1", 0, Agent::person("u1", "alice"), owner.clone());
    save(store.as_ref(), &existing, None).await.unwrap();
    let mut compilation = Compilation::new("c1", "Vessels", alice());
    compilation.annotation_list = vec![Some(Reference::stub("a1"))];
    save(store.as_ref(), &compilation, Some(1)).await.unwrap();

    let resolver = Resolver::from_config(store.clone(), &config.resolver);
    let mut list = load_list(&resolver, &owner).await.unwrap().unwrap();
    assert_eq!(list.len(), 1);

    let channel = Arc::new(TokioBroadcast::from_config(&config.broadcast));
    let mut events = channel.subscribe();
    let rooms = RoomRegistry::new(channel.clone());

    let mut user = SocketUser::new("u1", "s1");
    user.room = "c1".to_string();
    rooms.join(user, Vec::new());

    let added = Annotation::new("a2", 1, Agent::person("u1", "alice"), owner.clone());
    let delta = list.attach(added).unwrap();
    assert_eq!(rooms.publish("s1", owner.clone(), delta), 1);
    assert!(rooms.displayed("c1").contains(&ObjectId::new("a2")));

    let mut sequences = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RepositoryEvent::Annotation { sequence, room, .. } = event {
            assert_eq!(room.as_deref(), Some("c1"));
            sequences.push(sequence);
        }
    }
    assert_eq!(sequences, vec![1]);

    assert!(whitelist_changed(
        channel.as_ref(),
        true,
        Collection::Compilation,
        &ObjectId::new("c1")
    ));
    assert!(matches!(
        events.try_recv().unwrap(),
        RepositoryEvent::WhitelistChanged { .. }
    ));
}
