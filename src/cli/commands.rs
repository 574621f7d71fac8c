//! CLI command handlers.
//!
//! Each handler opens the configured store and runs one operation locally.

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Args, ValueEnum};
use repograph::{
    create_store, metadata, AccessGuard, AccessPolicy, Collection, Compilation, Composer, Config,
    DocumentStore, Entity, Institution, MetadataService, ObjectId, Person, Principal, Resolver,
    UserRank,
};

use super::output;

/// Guarded document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GuardedKind {
    Entity,
    Compilation,
}

/// Documents carrying per-owner relation maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HolderKind {
    Person,
    Institution,
}

/// Identity of the caller a view is computed for.
#[derive(Args, Debug, Clone, Default)]
pub struct CallerArgs {
    /// View as this user ID (anonymous when omitted)
    #[arg(long)]
    pub user: Option<String>,
    /// Role of the user
    #[arg(long, value_parser = parse_rank)]
    pub role: Option<UserRank>,
    /// Password supplied for a protected object
    #[arg(long)]
    pub password: Option<String>,
}

impl CallerArgs {
    pub fn principal(&self) -> Principal {
        match &self.user {
            None => Principal::Anonymous,
            Some(id) => Principal::user(id.as_str(), self.role.unwrap_or_default()),
        }
    }
}

fn parse_rank(s: &str) -> std::result::Result<UserRank, String> {
    match s.to_lowercase().as_str() {
        "user" => Ok(UserRank::User),
        "uploadrequested" | "upload-requested" => Ok(UserRank::UploadRequested),
        "uploader" => Ok(UserRank::Uploader),
        "admin" => Ok(UserRank::Admin),
        other => Err(format!("unknown role: {}", other)),
    }
}

async fn open(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    Ok(create_store(config).await?)
}

/// Run the get command.
pub async fn run_get(
    config: &Config,
    collection: String,
    id: String,
    deep: bool,
    json_output: bool,
) -> Result<()> {
    let collection: Collection = collection.parse().map_err(|e: String| anyhow!(e))?;
    let id = ObjectId::new(id);
    let store = open(config).await?;

    let Some(stored) = store.get_by_id(collection, &id).await? else {
        bail!("{} {} not found", collection, id);
    };

    let resolver = Resolver::from_config(store, &config.resolver);
    let mut options = resolver.options();
    options.deep |= deep;
    let resolution = resolver
        .with_options(options)
        .resolve_value(collection, stored.body)
        .await?;

    output::print_document(collection, &id, stored.revision, &resolution, json_output)
}

/// Run the view command.
pub async fn run_view(
    config: &Config,
    kind: GuardedKind,
    id: String,
    caller: CallerArgs,
    json_output: bool,
) -> Result<()> {
    let store = open(config).await?;
    let guard = AccessGuard::new(
        Resolver::from_config(store, &config.resolver),
        AccessPolicy::new(&config.access),
    );
    let principal = caller.principal();
    let id = ObjectId::new(id);
    let password = caller.password.as_deref();

    let (document, report) = match kind {
        GuardedKind::Entity => {
            let resolution = guard.view::<Entity>(&principal, &id, password).await?;
            (serde_json::to_value(&resolution.document)?, resolution.report)
        }
        GuardedKind::Compilation => {
            let resolution = guard.view::<Compilation>(&principal, &id, password).await?;
            (serde_json::to_value(&resolution.document)?, resolution.report)
        }
    };

    output::print_view(&principal, &document, &report, json_output)
}

/// Run the compose command.
pub async fn run_compose(
    config: &Config,
    id: String,
    caller: CallerArgs,
    json_output: bool,
) -> Result<()> {
    let store = open(config).await?;
    let composer = Composer::new(
        Resolver::from_config(store, &config.resolver),
        AccessPolicy::new(&config.access),
    );
    let principal = caller.principal();

    let view = composer
        .compose_by_id(&ObjectId::new(id), &principal, caller.password.as_deref())
        .await?
        .into_view(composer.policy(), &principal)?;

    output::print_composition(&view, json_output)
}

/// Run the unlink command.
pub async fn run_unlink(
    config: &Config,
    kind: HolderKind,
    id: String,
    owner: String,
    json_output: bool,
) -> Result<()> {
    let store = open(config).await?;
    let service = MetadataService::new(store, &config.metadata);
    let id = ObjectId::new(id);
    let owner = ObjectId::new(owner);

    let (collection, removed, orphan) = match kind {
        HolderKind::Person => {
            let unlinked = service.unlink::<Person>(&id, &owner).await?;
            (Collection::Person, unlinked.removed.is_some(), unlinked.orphan)
        }
        HolderKind::Institution => {
            let unlinked = service.unlink::<Institution>(&id, &owner).await?;
            (
                Collection::Institution,
                unlinked.removed.is_some(),
                unlinked.orphan,
            )
        }
    };

    output::print_unlink(collection, &id, &owner, removed, orphan, json_output)
}

/// Run the sweep command.
pub async fn run_sweep(config: &Config, dry_run: bool, json_output: bool) -> Result<()> {
    let store = open(config).await?;
    let report = metadata::sweep_orphans(store.as_ref(), dry_run).await?;
    output::print_sweep(&report, dry_run, json_output)
}

/// Run the prune command.
pub async fn run_prune(
    config: &Config,
    kind: GuardedKind,
    id: String,
    json_output: bool,
) -> Result<()> {
    let store = open(config).await?;
    let id = ObjectId::new(id);
    let retries = config.metadata.max_retries;

    let (collection, removed) = match kind {
        GuardedKind::Entity => (
            Collection::Entity,
            metadata::prune_entity(store.as_ref(), &id, retries).await?,
        ),
        GuardedKind::Compilation => (
            Collection::Compilation,
            metadata::prune_compilation(store.as_ref(), &id, retries).await?,
        ),
    };
    let Some(removed) = removed else {
        bail!("{} {} not found", collection, id);
    };

    output::print_prune(collection, &id, removed, json_output)
}
