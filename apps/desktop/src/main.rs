use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    load_settings, AdminSession, ClientEvent, HttpCategoryStore, ItemRect, KeyStep,
    ReconcileReport, SortableCategoryList, ViewMode,
};
use shared::{
    domain::{Category, CategoryKey, Icon},
    protocol::{CreateCategoryRequest, ServerEvent},
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ROW_HEIGHT: f32 = 40.0;
const GRID_COLUMNS: usize = 3;

#[derive(Parser, Debug)]
#[command(about = "Manage storefront categories and their display order")]
struct Cli {
    /// Settings file; defaults to ./storefront.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long, value_enum)]
    view: Option<View>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print categories in display order.
    List,
    /// Drag the category at `from` and drop it over slot `to`.
    Move {
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Keyboard-style reorder: lift `index` and step it up or down.
    Nudge {
        #[arg(long)]
        index: usize,
        #[arg(long, value_enum, value_delimiter = ',')]
        steps: Vec<Step>,
    },
    Add {
        #[arg(long)]
        key: String,
        #[arg(long)]
        label: String,
        #[arg(long, default_value = "grid")]
        icon: String,
        #[arg(long)]
        system: bool,
    },
    Remove {
        #[arg(long)]
        key: String,
    },
    /// Follow server pushes until interrupted.
    Watch,
    /// Rewrite stored ordinals that disagree with the display order.
    Retry,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Step {
    Up,
    Down,
}

impl From<Step> for KeyStep {
    fn from(step: Step) -> Self {
        match step {
            Step::Up => KeyStep::Up,
            Step::Down => KeyStep::Down,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum View {
    Grid,
    List,
}

impl From<View> for ViewMode {
    fn from(view: View) -> Self {
        match view {
            View::Grid => ViewMode::Grid,
            View::List => ViewMode::List,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }

    let mut session = AdminSession::start(settings.admin.clone(), settings.view_mode);
    if let Some(view) = cli.view {
        session.set_view_mode(view.into());
    }
    let username = cli.username.unwrap_or_else(|| settings.admin.username.clone());
    let password = cli.password.unwrap_or_else(|| settings.admin.password.clone());

    let store = Arc::new(HttpCategoryStore::new(&settings.server_url)?);
    let list = Arc::new(SortableCategoryList::new(store.clone(), settings.consistency));
    list.reload().await?;

    if cli.command.mutates() {
        session
            .sign_in(&username, &password)
            .context("category changes require the admin account")?;
    }

    match cli.command {
        Command::List => render(&list.current_order().await, session.view_mode()),
        Command::Move { from, to } => {
            let len = list.current_order().await.len();
            let layout = ItemRect::stacked(len, ROW_HEIGHT);
            let target = layout
                .get(to)
                .map(ItemRect::center)
                .ok_or_else(|| anyhow!("drop slot {to} is outside a list of {len} categories"))?;
            let mut events = list.subscribe_events();
            list.begin_drag(from, layout).await?;
            list.pointer_moved(target).await?;
            let report = list.release().await?;
            finish(&list, &mut events, report, session.view_mode()).await;
        }
        Command::Nudge { index, steps } => {
            let len = list.current_order().await.len();
            let mut events = list.subscribe_events();
            list.begin_drag(index, ItemRect::stacked(len, ROW_HEIGHT))
                .await?;
            for step in steps {
                list.key_step(step.into()).await?;
            }
            let report = list.release().await?;
            finish(&list, &mut events, report, session.view_mode()).await;
        }
        Command::Add {
            key,
            label,
            icon,
            system,
        } => {
            let category = store
                .create_category(&CreateCategoryRequest {
                    key: CategoryKey::new(key),
                    label,
                    icon: Icon::from_key(&icon).key().to_string(),
                    is_system: system,
                })
                .await?;
            println!(
                "added {} at position {}",
                category.label, category.sort_order
            );
        }
        Command::Remove { key } => {
            let key = CategoryKey::new(key);
            let current = list.current_order().await;
            let Some(category) = current.iter().find(|c| c.key == key) else {
                bail!("no category with key '{key}'");
            };
            if !category.is_deletable() {
                bail!("'{}' is a system category and cannot be removed", category.label);
            }
            store.delete_category(&key).await?;
            println!("removed {}", category.label);
        }
        Command::Watch => watch(&list, &store, session.view_mode()).await?,
        Command::Retry => {
            let mut events = list.subscribe_events();
            match list.retry_pending().await? {
                Some(report) => {
                    finish(&list, &mut events, Some(report), session.view_mode()).await;
                }
                None => println!("stored order already matches"),
            }
        }
    }

    session.sign_out();
    Ok(())
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(self, Command::List | Command::Watch)
    }
}

async fn finish(
    list: &SortableCategoryList,
    events: &mut broadcast::Receiver<ClientEvent>,
    report: Option<ReconcileReport>,
    view: ViewMode,
) {
    let Some(report) = report else {
        println!("dropped in place; order unchanged");
        return;
    };
    info!(batch_id = %report.batch_id, writes = report.attempted(), "reorder finished");
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Notice(notice) = event {
            if notice.is_failure() {
                eprintln!("{}", notice.message());
            } else {
                println!("{}", notice.message());
            }
        }
    }
    render(&list.current_order().await, view);
}

async fn watch(
    list: &Arc<SortableCategoryList>,
    store: &HttpCategoryStore,
    view: ViewMode,
) -> Result<()> {
    let pushes = store.subscribe_events().await?;
    let mut events = list.subscribe_events();
    let sync = list.spawn_server_sync(pushes);
    render(&list.current_order().await, view);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ClientEvent::OrderChanged(items)) => render(&items, view),
                Ok(ClientEvent::Server(ServerEvent::Error(err))) => {
                    eprintln!("server error: {}", err.message);
                }
                Ok(ClientEvent::Server(event)) => println!("server: {}", describe(&event)),
                Ok(ClientEvent::Error(message)) => eprintln!("{message}"),
                Ok(ClientEvent::Notice(notice)) => println!("{}", notice.message()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!("missed {skipped} updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    sync.abort();
    Ok(())
}

fn describe(event: &ServerEvent) -> String {
    match event {
        ServerEvent::CategoryCreated { category } => format!("created {}", category.key),
        ServerEvent::CategoryUpdated { category, .. } => {
            format!("updated {} (position {})", category.key, category.sort_order)
        }
        ServerEvent::CategoryDeleted { key } => format!("deleted {key}"),
        ServerEvent::Error(err) => err.message.clone(),
    }
}

fn render(items: &[Category], view: ViewMode) {
    match view {
        ViewMode::List => {
            for (index, category) in items.iter().enumerate() {
                println!(
                    "{index:>3}  {} {:<20} sort_order={}{}",
                    category.icon().glyph(),
                    category.label,
                    category.sort_order,
                    if category.is_system { "  (system)" } else { "" }
                );
            }
        }
        ViewMode::Grid => {
            for row in items.chunks(GRID_COLUMNS) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|category| format!("{} {:<18}", category.icon().glyph(), category.label))
                    .collect();
                println!("{}", cells.join(" | "));
            }
        }
    }
}
