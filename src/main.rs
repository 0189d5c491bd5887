//! The `factorix` CLI entry point: assembles configuration, wires up the HTTP/cache stack, loads
//! the locally installed mod set, and dispatches to one handler per subcommand.

use factorix::cache::{CacheStore, CacheStores, EvictSelector};
use factorix::config::Config;
use factorix::dependency::{parse_spec, DependencyGraph, InstallTarget, Planner, ResolvedInstall, Validator};
use factorix::error::{DependencyError, Error as FxError};
use factorix::http::portal::{Credentials, Portal, PortalResult};
use factorix::http::retry::RetryConfig;
use factorix::http::transport::TransportConfig;
use factorix::http::{CacheClient, HttpClient, RetryClient, Transport};
use factorix::log::{self, debug, info, warn};
use factorix::modsettings::PropertyTree;
use factorix::mods::{self, InstalledMod, ModList, ModVersion, Release};
use factorix::opts::{CacheCommand, Command, Opts};
use factorix::platform;
use factorix::progress::TerminalProgress;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::get();
    let config = Config::assemble(&opts)?;

    log::setup_logging(&config)?;
    config.debug_values();

    platform::ensure_exists(&config.cache_dir)?;
    platform::ensure_exists(&config.mods_dir)?;

    let cancellation = CancellationToken::new();
    let signal_cancellation = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received interrupt, cancelling in-flight requests");
            signal_cancellation.cancel();
        }
    });

    let cache_stores = CacheStores::open(&config.cache_dir, Duration::from_secs(config.api_cache_ttl))?;
    let portal = build_portal(&config, &cache_stores, cancellation)?;

    let installed = mods::scan_directory(&config.mods_dir)?;
    let mod_list_path = config.mods_dir.join("mod-list.json");
    let mut mod_list = if mod_list_path.exists() {
        ModList::from_path(&mod_list_path)?
    } else {
        ModList::new()
    };

    let graph = DependencyGraph::build(&installed, &mod_list);

    match opts.command {
        Command::List => cmd_list(&graph),
        Command::Check => cmd_check(&graph),
        Command::Show { name } => cmd_show(&installed, &portal, &name).await?,
        Command::Enable { name } => cmd_enable(&graph, &mut mod_list, &mod_list_path, &name)?,
        Command::Disable { name } => cmd_disable(&graph, &mut mod_list, &mod_list_path, &name)?,
        Command::Install { specs, recursive } => {
            cmd_install(
                &graph,
                &installed,
                &mut mod_list,
                &mod_list_path,
                &config,
                &portal,
                &cache_stores.download,
                &cache_stores.info_json,
                &specs,
                recursive,
            )
            .await?
        }
        Command::Uninstall { name, all } => cmd_uninstall(&graph, &installed, &mut mod_list, &mod_list_path, &name, all)?,
        Command::Update { names } => {
            cmd_update(
                &graph,
                &installed,
                &mut mod_list,
                &mod_list_path,
                &config,
                &portal,
                &cache_stores.download,
                &cache_stores.info_json,
                &names,
            )
            .await?
        }
        Command::Download { name, version } => {
            cmd_download(&config, &portal, &cache_stores.download, &cache_stores.info_json, &name, version).await?
        }
        Command::Sync { save_path } => cmd_sync(&mut mod_list, &mod_list_path, &save_path)?,
        Command::Cache(cache_command) => cmd_cache(&cache_stores, cache_command)?,
        Command::Publish { archive, changelog } => cmd_publish(&portal, &archive, changelog.as_deref()).await?,
        Command::Upload { name, archive, changelog } => {
            cmd_upload(&portal, &name, &archive, changelog.as_deref()).await?
        }
        Command::Edit { name } => cmd_edit(&portal, &name).await?,
    }

    Ok(())
}

/// Builds the layered HTTP client stack (`CacheClient(RetryClient(Transport))`) and wraps it in a
/// [`Portal`] client, per the architecture's control-flow diagram. `cancellation` trips when the
/// user interrupts the program, aborting any pending retry backoff sleep.
fn build_portal(config: &Config, cache_stores: &CacheStores, cancellation: CancellationToken) -> anyhow::Result<Portal> {
    let transport = Transport::new(TransportConfig {
        masked_params: vec!["token".to_string()],
        ..TransportConfig::default()
    })?;
    let retry = RetryClient::new(
        transport,
        RetryConfig {
            base_ms: config.retry_base_ms,
            cap_ms: config.retry_cap_ms,
            max_attempts: config.retry_max_attempts,
            retryable_server_errors: config.retry_server_error_statuses.clone(),
        },
        cancellation,
    );
    let cached = CacheClient::new(retry, cache_stores.api.clone());
    let client: Arc<dyn HttpClient> = Arc::new(cached);

    Ok(Portal::new(
        client,
        Credentials {
            username: config.portal_username.clone(),
            token: config.portal_token.clone(),
        },
        config.api_key.clone(),
    ))
}

fn cmd_list(graph: &DependencyGraph) {
    let mut nodes: Vec<_> = graph.nodes().collect();
    nodes.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    for node in nodes {
        let version = node.version.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let state = if node.enabled { "enabled" } else { "disabled" };
        let presence = if node.installed { "installed" } else { "missing" };
        println!("{:<30} {:<10} {:<9} {}", node.identifier, version, state, presence);
    }
}

fn cmd_check(graph: &DependencyGraph) {
    let result = Validator::validate(graph);

    for error in &result.errors {
        println!("error: {}", error);
    }
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }

    if result.is_valid() {
        println!("mod set is valid ({} warning(s))", result.warnings.len());
    } else {
        println!("mod set has {} error(s)", result.errors.len());
    }
}

async fn cmd_show(installed: &[InstalledMod], portal: &Portal, name: &str) -> anyhow::Result<()> {
    if let Some(local) = installed.iter().find(|m| m.identifier == name) {
        println!("{} {}", local.info.title, local.version);
        println!("author: {}", local.info.author);
        println!("factorio_version: {}", local.info.factorio_version);
        println!("installed at: {}", local.zip_path.display());
        return Ok(());
    }

    let remote = portal.fetch_mod(name).await?;
    println!("{} ({})", remote.title(), remote.name());
    println!("owner: {}", remote.owner());
    if let Some(summary) = remote.summary() {
        println!("summary: {}", summary);
    }
    println!("releases: {}", remote.releases().len());
    Ok(())
}

fn cmd_enable(graph: &DependencyGraph, mod_list: &mut ModList, mod_list_path: &Path, name: &str) -> anyhow::Result<()> {
    let plan = Planner::enable(graph, name)?;
    for identifier in &plan.to_enable {
        mod_list.set_enabled(identifier, true)?;
    }
    mod_list.save_to(mod_list_path)?;
    println!("enabled: {}", plan.to_enable.join(", "));
    Ok(())
}

fn cmd_disable(graph: &DependencyGraph, mod_list: &mut ModList, mod_list_path: &Path, name: &str) -> anyhow::Result<()> {
    refuse_while_running()?;

    let plan = Planner::disable(graph, name)?;
    for identifier in &plan.to_disable {
        mod_list.set_enabled(identifier, false)?;
    }
    mod_list.save_to(mod_list_path)?;
    println!("disabled: {}", plan.to_disable.join(", "));
    Ok(())
}

fn cmd_uninstall(
    graph: &DependencyGraph,
    installed: &[InstalledMod],
    mod_list: &mut ModList,
    mod_list_path: &Path,
    name: &str,
    all: bool,
) -> anyhow::Result<()> {
    refuse_while_running()?;

    let plan = Planner::uninstall(graph, name, all)?;
    for identifier in &plan.to_uninstall {
        for archive in installed.iter().filter(|m| &m.identifier == identifier) {
            std::fs::remove_file(&archive.zip_path)?;
        }
        mod_list.remove(identifier)?;
    }
    mod_list.save_to(mod_list_path)?;
    println!("uninstalled: {}", plan.to_uninstall.join(", "));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_install(
    graph: &DependencyGraph,
    installed: &[InstalledMod],
    mod_list: &mut ModList,
    mod_list_path: &Path,
    config: &Config,
    portal: &Portal,
    download_cache: &CacheStore,
    info_json_cache: &CacheStore,
    specs: &[String],
    recursive: bool,
) -> anyhow::Result<()> {
    let targets: Vec<InstallTarget> = specs.iter().map(|s| parse_spec(s)).collect();
    let plan = resolve_install_plan(graph, portal, &targets, recursive).await?;
    install_resolved(
        installed,
        mod_list,
        mod_list_path,
        config,
        portal,
        download_cache,
        info_json_cache,
        &plan.mods,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn cmd_update(
    graph: &DependencyGraph,
    installed: &[InstalledMod],
    mod_list: &mut ModList,
    mod_list_path: &Path,
    config: &Config,
    portal: &Portal,
    download_cache: &CacheStore,
    info_json_cache: &CacheStore,
    names: &[String],
) -> anyhow::Result<()> {
    let targets: Vec<&str> = if names.is_empty() {
        installed.iter().map(|m| m.identifier.as_str()).collect()
    } else {
        names.iter().map(String::as_str).collect()
    };

    let mut installed_versions = HashMap::new();
    for name in &targets {
        if let Some(version) = graph.active_version(name) {
            installed_versions.insert((*name).to_string(), version);
        }
    }

    let game_version = dominant_factorio_version(installed);
    let releases_by_name = fetch_releases(portal, &targets).await?;
    let plan = Planner::update(&installed_versions, &releases_by_name, game_version);

    if plan.mods.is_empty() {
        println!("everything is up to date");
        return Ok(());
    }

    install_resolved(
        installed,
        mod_list,
        mod_list_path,
        config,
        portal,
        download_cache,
        info_json_cache,
        &plan.mods,
    )
    .await
}

async fn cmd_download(
    config: &Config,
    portal: &Portal,
    download_cache: &CacheStore,
    info_json_cache: &CacheStore,
    name: &str,
    version: Option<String>,
) -> anyhow::Result<()> {
    let remote = portal.fetch_mod(name).await?;

    let release = match version {
        Some(version) => {
            let version: ModVersion = version.parse().map_err(|_| FxError::InvalidArgument(format!("'{}' is not a valid version", version)))?;
            factorix::dependency::select_exact(remote.releases(), version)
                .ok_or(DependencyError::ReleaseNotFound(name.to_string()))?
        }
        None => factorix::dependency::select_release(remote.releases(), None)
            .ok_or(DependencyError::ReleaseNotFound(name.to_string()))?,
    };

    let download_dir = config.cache_dir.join("downloads");
    platform::ensure_exists(&download_dir)?;

    let progress = TerminalProgress::new(format!("{} {}", name, release.version));
    let (path, bytes) = portal
        .download_release_with_progress(name, release, &download_dir, &progress, Some(download_cache))
        .await?;

    if let Err(e) = mods::extract_info_json_cached(&path, &release.download_url, name, info_json_cache) {
        warn!("failed to populate info_json cache for '{}': {}", name, e);
    }

    println!("downloaded {} {} ({} bytes) to {}", name, release.version, bytes, path.display());
    Ok(())
}

fn cmd_sync(mod_list: &mut ModList, mod_list_path: &Path, save_path: &Path) -> anyhow::Result<()> {
    let entries = extract_save_mod_list(save_path)?;

    for (name, enabled) in &entries {
        mod_list.set_enabled(name, *enabled)?;
    }
    mod_list.save_to(mod_list_path)?;

    println!("synced {} mod(s) from {}", entries.len(), save_path.display());
    Ok(())
}

fn cmd_cache(cache_stores: &CacheStores, command: CacheCommand) -> anyhow::Result<()> {
    match command {
        CacheCommand::Stat => {
            for store in [&cache_stores.download, &cache_stores.api, &cache_stores.info_json] {
                let stats = store.stats()?;
                println!(
                    "{:<10} entries={:<5} valid={:<5} expired={:<5} bytes={:<10} avg_bytes={:<8} avg_age={}s stale_locks={}",
                    store.name(),
                    stats.total_entries,
                    stats.valid_entries,
                    stats.expired_entries,
                    stats.total_bytes,
                    stats.avg_bytes(),
                    stats.avg_age().as_secs(),
                    stats.stale_locks
                );
            }
        }
        CacheCommand::Evict { selector } => {
            let selector = EvictSelector::parse(&selector)?;
            for store in [&cache_stores.download, &cache_stores.api, &cache_stores.info_json] {
                let (count, bytes) = store.evict(selector)?;
                println!("{}: evicted {} entries, {} bytes freed", store.name(), count, bytes);
            }
        }
    }
    Ok(())
}

/// Publishes a brand new mod: requests a one-time upload URL from the portal, then posts the
/// archive (and optional changelog) to it.
async fn cmd_publish(portal: &Portal, archive: &Path, changelog: Option<&str>) -> anyhow::Result<()> {
    let upload_url = portal.request_publish_url().await?;
    portal.upload_release(&upload_url, archive, changelog).await?;
    println!("published {}", archive.display());
    Ok(())
}

/// Uploads a new release of an already-published mod.
async fn cmd_upload(portal: &Portal, name: &str, archive: &Path, changelog: Option<&str>) -> anyhow::Result<()> {
    let upload_url = portal.request_upload_url(name).await?;
    portal.upload_release(&upload_url, archive, changelog).await?;
    println!("uploaded new release of '{}' from {}", name, archive.display());
    Ok(())
}

/// Requests a one-time portal URL for editing a mod's metadata or images, and prints it for the
/// user to act on: the edit payload shape (title/description/tag changes, image uploads) isn't
/// part of this program's data model, so this stops at the handshake rather than guessing a form.
async fn cmd_edit(portal: &Portal, name: &str) -> anyhow::Result<()> {
    let edit_url = portal.request_edit_url(name).await?;
    println!("edit '{}' at: {}", name, edit_url);
    Ok(())
}

/// Refuses to continue if a Factorio server process currently appears to be running, per the
/// guard on destructive commands (`disable`, `uninstall`).
fn refuse_while_running() -> anyhow::Result<()> {
    if platform::is_factorio_running()? {
        return Err(FxError::GameRunning.into());
    }
    Ok(())
}

/// Resolves an install plan, expanding the set of mods queried from the portal as recursion
/// uncovers dependencies not yet known. `Planner::install` needs release data for every mod it
/// might touch up front; since `recursive` can pull in names the caller never asked for, this
/// retries with a growing query set each time the planner reports a name it hasn't seen yet.
async fn resolve_install_plan(
    graph: &DependencyGraph,
    portal: &Portal,
    targets: &[InstallTarget],
    recursive: bool,
) -> anyhow::Result<factorix::dependency::InstallPlan> {
    let mut known: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();

    loop {
        let names: Vec<&str> = known.iter().map(String::as_str).collect();
        let releases_by_name = fetch_releases(portal, &names).await?;

        match Planner::install(graph, targets, recursive, &releases_by_name) {
            Ok(plan) => return Ok(plan),
            Err(DependencyError::NoSuchMod(missing)) if !known.iter().any(|n| n == &missing) => {
                known.push(missing);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Fetches full mod portal information for a set of names and collects each one's releases.
async fn fetch_releases(portal: &Portal, names: &[&str]) -> Result<HashMap<String, Vec<Release>>, FxError> {
    let results: Vec<PortalResult> = portal.fetch_multiple_mods(names).await?;
    Ok(results.into_iter().map(|r| (r.name().to_string(), r.releases().to_vec())).collect())
}

/// Downloads every resolved mod into the managed `mods/` directory, then enables it and saves the
/// mod list, honoring the configured parallel job count.
#[allow(clippy::too_many_arguments)]
async fn install_resolved(
    installed: &[InstalledMod],
    mod_list: &mut ModList,
    mod_list_path: &Path,
    config: &Config,
    portal: &Portal,
    download_cache: &CacheStore,
    info_json_cache: &CacheStore,
    resolved: &[ResolvedInstall],
) -> anyhow::Result<()> {
    if resolved.is_empty() {
        println!("nothing to do");
        return Ok(());
    }

    let jobs = config.resolve_jobs(resolved.len());
    debug!("installing {} mod(s) with {} parallel job(s)", resolved.len(), jobs);

    let results: Vec<anyhow::Result<(String, ModVersion, PathBuf, usize)>> = stream::iter(resolved)
        .map(|target| async move {
            for stale in installed
                .iter()
                .filter(|m| m.identifier == target.name && m.version != target.release.version)
            {
                if let Err(e) = std::fs::remove_file(&stale.zip_path) {
                    warn!("failed to remove stale archive {}: {}", stale.zip_path.display(), e);
                }
            }

            let progress = TerminalProgress::new(format!("{} {}", target.name, target.release.version));
            let (path, bytes) = portal
                .download_release_with_progress(
                    &target.name,
                    &target.release,
                    &config.mods_dir,
                    &progress,
                    Some(download_cache),
                )
                .await?;

            if let Err(e) = mods::extract_info_json_cached(&path, &target.release.download_url, &target.name, info_json_cache) {
                warn!("failed to populate info_json cache for '{}': {}", target.name, e);
            }

            Ok((target.name.clone(), target.release.version, path, bytes))
        })
        .buffer_unordered(jobs)
        .collect()
        .await;

    for result in results {
        let (name, version, path, bytes) = result?;
        info!("installed {} {} ({} bytes) at {}", name, version, bytes, path.display());
        mod_list.set_enabled(&name, true)?;
    }

    mod_list.save_to(mod_list_path)?;
    Ok(())
}

/// Returns the Factorio version `update` should match releases against: the greatest
/// `factorio_version` among the currently installed mods, or a conservative default if nothing is
/// installed yet.
fn dominant_factorio_version(installed: &[InstalledMod]) -> ModVersion {
    installed
        .iter()
        .map(|m| m.info.factorio_version)
        .max()
        .unwrap_or_else(|| "1.1.0".parse().expect("'1.1.0' is always a valid version"))
}

/// Pulls a mod list (name, enabled) out of a Factorio save archive by scanning its `.dat` entries
/// for one whose property tree carries a top-level `mods` list. Save files bundle more than mod
/// state in this format (map settings, scenario data); this only looks for the one key it needs.
fn extract_save_mod_list(save_path: &Path) -> anyhow::Result<Vec<(String, bool)>> {
    let file = std::fs::File::open(save_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.name().ends_with(".dat") {
            continue;
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        let tree = match PropertyTree::read(&bytes) {
            Ok(tree) => tree,
            Err(_) => continue,
        };

        let Some(mods) = tree.get("mods").and_then(PropertyTree::as_list) else {
            continue;
        };

        let mut result = Vec::new();
        for entry in mods {
            let name = match entry.get("name").and_then(PropertyTree::as_str) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let enabled = matches!(entry.get("enabled"), Some(PropertyTree::Bool(true)) | None);
            result.push((name, enabled));
        }

        if !result.is_empty() {
            return Ok(result);
        }
    }

    Err(FxError::FileFormat(format!("no recognizable mod list inside '{}'", save_path.display())).into())
}
