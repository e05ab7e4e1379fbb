//! CLI command implementations.

use crate::settings::{index_dir, Settings, SETTINGS_FILE};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use smeagol_core::RepositoryId;
use smeagol_git::{GitRepositories, RefWatcher};
use smeagol_index::{IndexStatusStore, SearchEngine, SledSearchEngine};
use smeagol_sync::{SyncCoordinator, SyncError, SyncOutcome, SyncReport, Trigger};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Everything a command needs: the repositories below a root and the
/// index in the data directory.
struct Workspace {
    settings: Settings,
    repositories: Arc<GitRepositories>,
    engine: Arc<SledSearchEngine>,
    status: Arc<IndexStatusStore>,
}

impl Workspace {
    fn open(data_dir: &Path, root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(format!("{} is not a directory", root.display()).into());
        }
        let settings = Settings::load(data_dir)?;
        let db = sled::open(index_dir(data_dir))?;
        debug!("opened index in {}", data_dir.display());

        Ok(Self {
            settings,
            repositories: Arc::new(GitRepositories::new(root)),
            engine: Arc::new(SledSearchEngine::open(&db)?),
            status: Arc::new(IndexStatusStore::open(&db)?),
        })
    }

    fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::new(SyncCoordinator::new(
            self.repositories.clone(),
            self.engine.clone(),
            self.status.clone(),
            self.settings.sync.clone(),
        ))
    }
}

/// Create the data directory with default settings.
pub fn init(data_dir: &Path) -> Result<()> {
    if data_dir.join(SETTINGS_FILE).exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let path = Settings::default().save(data_dir)?;

    println!("{} Initialized Smeagol in {}", "✓".green(), data_dir.display());
    println!("  Settings written to {}", path.display());
    println!("  Run {} to index your repositories", "smeagol sync <root>".cyan());

    Ok(())
}

/// Bring the index of every (or every named) repository up to date.
pub async fn sync(data_dir: &Path, root: &Path, repositories: &[String]) -> Result<()> {
    let workspace = Workspace::open(data_dir, root)?;
    let coordinator = workspace.coordinator();

    println!("{}", "Synchronizing repositories...".cyan());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Catching up in {}...", root.display()));

    let results = if repositories.is_empty() {
        coordinator.catch_up_all().await?
    } else {
        let ids = repositories.iter().map(|r| RepositoryId::new(r.as_str()));
        coordinator.catch_up(ids).await
    };

    spinner.finish_and_clear();

    let mut failed = 0;
    for (repository, result) in &results {
        if !print_result(repository, result) {
            failed += 1;
        }
    }
    println!(
        "{} Synchronized {} repositories",
        "✓".green(),
        (results.len() - failed).to_string().cyan()
    );

    if failed > 0 {
        return Err(format!("{} of {} repositories failed", failed, results.len()).into());
    }
    Ok(())
}

/// Purge and rebuild the index of one repository.
pub fn reindex(data_dir: &Path, root: &Path, repository: &str) -> Result<()> {
    let workspace = Workspace::open(data_dir, root)?;
    let repository = RepositoryId::new(repository);

    let result = workspace.coordinator().reindex(&repository);
    if !print_result(&repository, &result) {
        return Err(format!("reindex of {} failed", repository).into());
    }
    Ok(())
}

/// Show the watermark and document count of every repository.
pub fn status(data_dir: &Path, root: &Path) -> Result<()> {
    let workspace = Workspace::open(data_dir, root)?;

    let mut statuses: BTreeMap<RepositoryId, Option<_>> = workspace
        .repositories
        .discover()?
        .into_iter()
        .map(|id| (id, None))
        .collect();
    for (id, status) in workspace.status.list()? {
        statuses.insert(id, Some(status));
    }

    println!("{}", "Index Status".cyan().bold());
    println!();

    if statuses.is_empty() {
        println!("  No repositories found in {}", root.display());
        return Ok(());
    }

    for (id, status) in statuses {
        let documents = workspace.engine.documents(&id)?.len();
        match status {
            None => println!("  {} {}", id.to_string().bold(), "not indexed".dimmed()),
            Some(status) if status.is_empty() => println!(
                "  {} {} ({} documents)",
                id.to_string().bold(),
                "empty".yellow(),
                documents
            ),
            Some(status) => println!(
                "  {} {}@{} v{} ({} documents, updated {})",
                id.to_string().bold(),
                status.branch.cyan(),
                status.revision,
                status.version,
                documents.to_string().cyan(),
                status.last_update.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }

    Ok(())
}

/// Catch up, then follow ref updates until interrupted.
pub async fn watch(data_dir: &Path, root: &Path) -> Result<()> {
    let workspace = Workspace::open(data_dir, root)?;
    let coordinator = workspace.coordinator();

    for (repository, result) in coordinator.catch_up_all().await? {
        print_result(&repository, &result);
    }

    let watcher = RefWatcher::new(root)?;
    let debounce = Duration::from_millis(workspace.settings.debounce_ms);
    println!(
        "{} Watching {} for pushes (Ctrl+C to stop)",
        "✓".green(),
        root.display()
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handle = tokio::task::spawn_blocking({
        let stop = stop.clone();
        move || follow(&watcher, &coordinator, debounce, &stop)
    });

    tokio::signal::ctrl_c().await?;
    stop.store(true, Ordering::SeqCst);
    let handled = handle.await?;

    info!("stopped watching after {} syncs", handled);
    println!("{} Stopped", "✓".green());
    Ok(())
}

/// Runs triggers from the watcher until `stop` is set. Returns the number
/// of syncs run.
fn follow(
    watcher: &RefWatcher,
    coordinator: &SyncCoordinator,
    debounce: Duration,
    stop: &AtomicBool,
) -> usize {
    let mut handled = 0;
    while !stop.load(Ordering::SeqCst) {
        let Some(first) = watcher.recv_timeout(Duration::from_millis(250)) else {
            continue;
        };
        std::thread::sleep(debounce);

        for (repository, trigger) in coalesce(std::iter::once(first).chain(watcher.poll())) {
            let result = coordinator.handle(trigger, &repository);
            print_result(&repository, &result);
            handled += 1;
        }
    }
    handled
}

/// One trigger per repository; a default branch change wins over a push
/// since both run the same sync.
fn coalesce<I>(triggers: I) -> BTreeMap<RepositoryId, Trigger>
where
    I: IntoIterator<Item = (RepositoryId, Trigger)>,
{
    let mut batch = BTreeMap::new();
    for (repository, trigger) in triggers {
        let entry = batch.entry(repository).or_insert(trigger);
        if trigger == Trigger::DefaultBranchChanged {
            *entry = trigger;
        }
    }
    batch
}

/// Prints one line per sync. Returns false for failures.
fn print_result(repository: &RepositoryId, result: &std::result::Result<SyncReport, SyncError>) -> bool {
    match result {
        Ok(SyncReport {
            outcome: SyncOutcome::Aborted { reason },
            ..
        }) => {
            println!("{} {} aborted: {}", "⚠".yellow(), repository, reason);
            false
        }
        Ok(report) => {
            println!(
                "{} {} {} in {}ms",
                "✓".green(),
                repository.to_string().bold(),
                report.outcome,
                report.duration.as_millis()
            );
            true
        }
        Err(e) => {
            println!("{} {} {}", "✗".red(), repository.to_string().bold(), e);
            false
        }
    }
}
