// crates/cli/src/commands.rs
//! Subcommand handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rcview_client::dashboard::{spawn_connectivity, spawn_dashboard};
use rcview_jobs::{BatchKind, PaneListing, SortMode};
use rcview_operations::{Explorer, MountRequest, RemoteConfig};
use rcview_types::{base_name, parent_dir, ListItem};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::config::{split_target, ConfigCommands, MountCommands};
use crate::progress;

/// Pane id used for one-shot commands.
const MAIN_PANE: &str = "0";
/// Pane id of the destination view of a copy or move.
const DEST_PANE: &str = "1";

pub async fn login(app: &App) -> Result<()> {
    let version = app.session.version(false).await?;
    println!("Logged in as {}", app.user_info);
    println!("Daemon {} on {}", version.label(), version.os);
    Ok(())
}

pub async fn ls(app: &App, target: &str, sort: SortMode, descending: bool) -> Result<()> {
    let (fs, path) = split_target(target);
    let listing = app.explorer(MAIN_PANE).list(&fs, &path).await?;

    let mut pane = PaneListing::new(listing.fs, listing.path, listing.items);
    pane.set_sort(sort, !descending);
    progress::print_listing(&pane);
    Ok(())
}

/// Resolve command line targets to listing entries.
async fn entries(explorer: &Explorer, targets: &[String]) -> Result<Vec<ListItem>> {
    let mut items = Vec::with_capacity(targets.len());
    for target in targets {
        let (fs, path) = split_target(target);
        if path.is_empty() {
            bail!("{target}: refusing to operate on the root of a remote");
        }
        let item = explorer
            .stat(&fs, &path)
            .await
            .with_context(|| format!("looking up {target}"))?;
        items.push(item);
    }
    Ok(items)
}

pub async fn batch(
    app: &mut App,
    kind: BatchKind,
    sources: &[String],
    destination: Option<&str>,
    show: bool,
) -> Result<()> {
    let explorer = app.explorer(MAIN_PANE);
    let items = entries(&explorer, sources).await?;
    let (dst_fs, dst_path) = destination.map(split_target).unwrap_or_default();

    let dest = if show && destination.is_some() {
        let listing = explorer.list(&dst_fs, &dst_path).await?;
        let pane = Arc::new(tokio::sync::Mutex::new(PaneListing::new(
            listing.fs,
            listing.path,
            listing.items,
        )));
        let redraw = app.watch(DEST_PANE, pane.clone());
        Some((pane, redraw))
    } else {
        None
    };

    let pb = progress::spinner(kind.verb());
    let indicator = app.take_indicator().map(|feed| progress::spawn_indicator(pb.clone(), feed));
    let notices = app.take_notices().map(|feed| progress::spawn_notices(pb.clone(), feed));

    let Some(handle) = app.engine.run_batch(kind, items, &dst_fs, &dst_path) else {
        pb.finish_and_clear();
        return Ok(());
    };

    let group = handle.parent.group().to_string();
    let mut task = handle.task;
    let outcome = tokio::select! {
        outcome = &mut task => outcome.context("batch task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            app.engine.cancel_group(&group);
            pb.set_message(format!("Cancelling {group}"));
            task.await.context("batch task panicked")?
        }
    };

    // Let the final snapshots reach the panes before tearing down the feeds.
    tokio::time::sleep(Duration::from_millis(100)).await;
    for task in [indicator, notices].into_iter().flatten() {
        task.abort();
    }
    pb.finish_and_clear();

    if let Some((pane, mut redraw)) = dest {
        while tokio::time::timeout(Duration::from_millis(500), redraw.recv())
            .await
            .is_ok_and(|r| r.is_some())
        {}
        progress::print_listing(&*pane.lock().await);
    }

    match outcome.error {
        Some(error) => bail!("{} stopped after {}/{} items: {error}", kind.verb(), outcome.completed, sources.len()),
        None => {
            println!("  \u{2713} {} {} item(s)", kind.verb(), outcome.completed);
            Ok(())
        }
    }
}

pub async fn mkdir(app: &App, target: &str) -> Result<()> {
    let (fs, path) = split_target(target);
    let name = base_name(&path);
    if name.is_empty() {
        bail!("{target}: missing directory name");
    }
    let created = app.explorer(MAIN_PANE).mkdir(&fs, parent_dir(&path), name).await?;
    println!("Created {}{}", created.fs, created.path);
    Ok(())
}

pub async fn link(app: &App, target: &str) -> Result<()> {
    let (fs, path) = split_target(target);
    let explorer = app.explorer(MAIN_PANE);
    let item = explorer.stat(&fs, &path).await?;
    let url = explorer.public_link(&fs, parent_dir(&path), &item).await?;
    println!("{url}");
    Ok(())
}

pub async fn about(app: &App, remote: &str) -> Result<()> {
    let (fs, _) = split_target(remote);
    let explorer = app.explorer(MAIN_PANE);

    let detail = explorer.fsinfo(&fs).await?;
    println!("{} ({})", detail.name, detail.description);
    println!("  hashes:   {}", detail.hashes.join(", "));
    println!("  features: {}", detail.feature_list().join(", "));

    match explorer.about(&fs).await {
        Ok(about) => println!(
            "  total {}  used {}  free {}  trashed {}",
            progress::bytes(about.total as f64),
            progress::bytes(about.used as f64),
            progress::bytes(about.free as f64),
            progress::bytes(about.trashed as f64)
        ),
        Err(e) => tracing::warn!(%fs, error = %e, "about not supported"),
    }
    Ok(())
}

pub async fn remotes(app: &App) -> Result<()> {
    for remote in app.explorer(MAIN_PANE).list_remotes().await? {
        println!("{remote}:");
    }
    Ok(())
}

pub async fn mounts(app: &App, action: MountCommands) -> Result<()> {
    let mounts = app.mounts();
    match action {
        MountCommands::List => {
            for point in mounts.list_mounts().await? {
                let since = point
                    .mounted_on
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{}  {}  {}", point.fs, point.mount_point, since);
            }
        }
        MountCommands::Add {
            fs,
            mount_point,
            mount_type,
            extra_flags,
        } => {
            let mut request = MountRequest::new(fs, mount_point);
            request.mount_type = mount_type;
            if let Some(flags) = extra_flags {
                request.mount_opt.insert("ExtraFlags".to_string(), json!(flags));
            }
            mounts.mount(&request).await?;
            println!("Mounted {} on {}", request.fs, request.mount_point);
        }
        MountCommands::Remove { mount_point } => {
            mounts.unmount(&mount_point).await?;
            println!("Unmounted {mount_point}");
        }
        MountCommands::RemoveAll => {
            mounts.unmount_all().await?;
            println!("Unmounted all mountpoints");
        }
        MountCommands::Types => {
            for kind in mounts.mount_types().await? {
                println!("{kind}");
            }
        }
    }
    Ok(())
}

pub async fn config(app: &App, action: ConfigCommands) -> Result<()> {
    let config = app.config();
    match action {
        ConfigCommands::Providers { kind: None } => {
            for provider in config.providers().await? {
                println!("{:<16} {}", provider.prefix, provider.description);
            }
        }
        ConfigCommands::Providers { kind: Some(kind) } => {
            let provider = config.provider_by_type(&kind).await?;
            println!("{} ({})", provider.description, provider.prefix);
            for option in provider.options.iter().filter(|o| !o.advanced) {
                let marker = if option.required { "*" } else { " " };
                let summary = option.help.lines().next().unwrap_or_default();
                println!("  {marker} {:<24} {summary}", option.name);
            }
        }
        ConfigCommands::Show { name } => {
            let settings = config.settings().await?;
            if let Some(name) = &name {
                if !settings.contains_key(name) {
                    bail!("{name}: no such remote");
                }
            }
            for (remote, values) in settings
                .iter()
                .filter(|(remote, _)| name.as_ref().map_or(true, |n| n == *remote))
            {
                println!("[{remote}]");
                for (key, value) in values {
                    match value.as_str() {
                        Some(text) => println!("  {key} = {text}"),
                        None => println!("  {key} = {value}"),
                    }
                }
            }
        }
        ConfigCommands::Create {
            name,
            kind,
            params,
            interactive,
        } => {
            config.provider_by_type(&kind).await.with_context(|| format!("backend type {kind}"))?;
            let mut remote = RemoteConfig::new(name, kind);
            remote.interactive = interactive;
            for (key, value) in params {
                remote.set(key, value);
            }
            config.create(&remote).await?;
            println!("Created remote {}:", remote.name);
        }
        ConfigCommands::Update { name, params } => {
            let mut remote = RemoteConfig::new(name, "");
            for (key, value) in params {
                remote.set(key, value);
            }
            config.update(&remote).await?;
            println!("Updated remote {}:", remote.name);
        }
        ConfigCommands::Delete { name } => {
            config.delete(&name).await?;
            println!("Deleted remote {name}:");
        }
    }
    Ok(())
}

pub async fn dashboard(app: &App, count: Option<usize>, interval: Duration) -> Result<()> {
    let cancel = CancellationToken::new();
    let (feeds, connectivity) = spawn_connectivity(app.session.clone(), interval, cancel.clone());
    let (mut info, dashboard) = spawn_dashboard(app.session.clone(), feeds.dashboard, cancel.clone());

    let mut shown = 0;
    loop {
        tokio::select! {
            next = info.recv() => match next {
                Some(info) => println!("{}", progress::dashboard_line(&info)),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
        shown += 1;
        if count.is_some_and(|n| shown >= n) {
            break;
        }
    }

    cancel.cancel();
    let _ = tokio::join!(connectivity, dashboard);
    Ok(())
}
