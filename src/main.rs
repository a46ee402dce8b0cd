use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kobosync::countdown::format_countdown;
use kobosync::models::{NewToken, Project, SyncInterval};
use kobosync::session::CurrentUser;
use kobosync::{config, ApiClient, ProjectStore, SessionContext};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "kobosync=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut cfg = config::load()?;
    let args = cli::Cli::parse();
    if let Some(url) = args.api_url {
        cfg.api_url = config::validate_api_url(&url, "--api-url")?;
    }

    let session = SessionContext::init(&cfg.session_file)
        .with_context(|| format!("loading session from {}", cfg.session_file.display()))?;
    let api = ApiClient::new(&cfg, session.clone())?;
    let store = ProjectStore::new(api);

    let result = match args.command {
        cli::Commands::Session { command } => handle_session_command(command, &session),
        cli::Commands::Token { command } => handle_token_command(command, &store).await,
        cli::Commands::Project { command } => handle_project_command(command, &store).await,
        cli::Commands::Columns { command } => handle_column_command(command, &store).await,
        cli::Commands::AutoSync { command } => handle_auto_sync_command(command, &store).await,
        cli::Commands::Watch { uid } => watch(&store, &uid).await,
        cli::Commands::Export { uid, out } => {
            store.refresh(&uid).await?;
            let csv = store.export_csv(&uid)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Exported {} to {}", uid, path.display());
                }
                None => println!("{}", csv),
            }
            Ok(())
        }
        cli::Commands::ImageUrl {
            project_uid,
            submission_id,
            filename,
            out,
        } => match out {
            Some(path) => {
                let bytes = store
                    .api()
                    .fetch_image(&project_uid, &submission_id, &filename)
                    .await?;
                std::fs::write(&path, &bytes)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Saved {} bytes to {}", bytes.len(), path.display());
                Ok(())
            }
            None => {
                println!(
                    "{}",
                    store.api().image_url(&project_uid, &submission_id, &filename)
                );
                Ok(())
            }
        },
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:#}", e);
    }
    result
}

fn handle_session_command(
    command: cli::SessionCommands,
    session: &SessionContext,
) -> anyhow::Result<()> {
    match command {
        cli::SessionCommands::Login {
            id,
            name,
            email,
            role,
            api_key,
        } => {
            session.login(
                CurrentUser {
                    id,
                    name,
                    email,
                    role,
                },
                api_key,
            )?;
            println!("Signed in. Session stored at {}", session.path().display());
        }
        cli::SessionCommands::Show => match session.current_user() {
            Some(user) => {
                println!("User:  {} <{}>", user.name, user.email);
                println!("Role:  {}", user.role.as_deref().unwrap_or("-"));
                if let Some(at) = session.snapshot().started_at {
                    println!("Since: {}", at.to_rfc3339());
                }
            }
            None => println!("Not signed in."),
        },
        cli::SessionCommands::Logout => {
            session.clear()?;
            println!("Signed out.");
        }
    }
    Ok(())
}

async fn handle_token_command(command: cli::TokenCommands, store: &ProjectStore) -> anyhow::Result<()> {
    match command {
        cli::TokenCommands::List => {
            let tokens = store.list_tokens().await?;
            if tokens.is_empty() {
                println!("No tokens registered.");
            }
            for t in tokens {
                println!(
                    "{:<26} {:<24} {:<16} {}",
                    t.id,
                    t.display_name,
                    t.masked_preview,
                    t.created_at.map(|d| d.to_rfc3339()).unwrap_or_default()
                );
            }
        }
        cli::TokenCommands::Add {
            name,
            token,
            save_all,
        } => {
            let import = store.add_token(NewToken::new(token, name)).await?;
            println!(
                "Token {} ({}) registered: {} projects, {} submissions",
                import.token_id, import.token_preview, import.total_projects, import.total_submissions
            );
            for p in &import.projects {
                println!("  {:<24} {}", p.uid, p.name);
                if save_all {
                    store.save(&p.uid).await?;
                }
            }
            if save_all {
                println!("Saved {} projects.", import.projects.len());
            }
        }
        cli::TokenCommands::Delete { id } => {
            store.delete_token(&id).await?;
            println!("Token {} deleted.", id);
        }
    }
    Ok(())
}

async fn handle_project_command(
    command: cli::ProjectCommands,
    store: &ProjectStore,
) -> anyhow::Result<()> {
    match command {
        cli::ProjectCommands::List => {
            store.load().await?;
            for p in store.projects() {
                println!(
                    "{:<24} {:<32} {:>8} subs  {}  {}",
                    p.uid,
                    p.name,
                    p.total_submissions,
                    if p.active { "active  " } else { "inactive" },
                    p.last_sync_at
                        .map(|d| format!("synced {}", d.to_rfc3339()))
                        .unwrap_or_else(|| "never synced".into())
                );
            }
        }
        cli::ProjectCommands::Show { uid } => {
            let p = store.refresh(&uid).await?;
            print_project(&p);
        }
        cli::ProjectCommands::Save {
            uid,
            token,
            token_name,
        } => {
            store.load().await?;
            let token = token.map(|t| NewToken::new(t, token_name));
            let p = store.save_or_import(&uid, token).await?;
            println!("Project {} ({}) saved.", p.uid, p.name);
        }
        cli::ProjectCommands::Sync { uid } => {
            store.load().await?;
            let total = store.sync(&uid).await?;
            println!("Synced {}: {} submissions", uid, total);
        }
        cli::ProjectCommands::SyncAll => {
            store.load().await?;
            let mut failed = 0;
            for (uid, outcome) in store.sync_all().await {
                match outcome {
                    Ok(total) => println!("{:<24} ok      {} submissions", uid, total),
                    Err(e) => {
                        failed += 1;
                        println!("{:<24} failed  {}", uid, e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} project(s) failed to sync", failed);
            }
        }
        cli::ProjectCommands::Delete { uid } => {
            store.load().await?;
            store.delete(&uid).await?;
            println!("Project {} deleted.", uid);
        }
    }
    Ok(())
}

async fn handle_column_command(
    command: cli::ColumnCommands,
    store: &ProjectStore,
) -> anyhow::Result<()> {
    store.load().await?;
    let (uid, selected) = match command {
        cli::ColumnCommands::Toggle { uid, column } => {
            let s = store.toggle_column(&uid, &column).await?;
            (uid, s)
        }
        cli::ColumnCommands::SelectAll { uid } => {
            let s = store.select_all(&uid).await?;
            (uid, s)
        }
        cli::ColumnCommands::Clear { uid } => {
            let s = store.clear_all(&uid).await?;
            (uid, s)
        }
        cli::ColumnCommands::Set { uid, columns } => {
            let s = store.set_columns(&uid, &columns).await?;
            (uid, s)
        }
    };
    if selected.is_empty() {
        println!("{}: no columns selected (all columns are exported)", uid);
    } else {
        println!("{}: {}", uid, selected.join(", "));
    }
    Ok(())
}

async fn handle_auto_sync_command(
    command: cli::AutoSyncCommands,
    store: &ProjectStore,
) -> anyhow::Result<()> {
    store.load().await?;
    match command {
        cli::AutoSyncCommands::Set {
            uid,
            interval,
            disable,
        } => {
            let current = store.get(&uid)?.auto_sync.interval_seconds;
            let sync = store
                .configure_auto_sync(&uid, !disable, interval.unwrap_or(current))
                .await?;
            if !sync.enabled {
                println!("Auto-sync disabled for {}", uid);
                return Ok(());
            }
            let label = SyncInterval::from_secs(sync.interval_seconds)
                .map(|i| i.to_string())
                .unwrap_or_else(|_| format!("{}s", sync.interval_seconds));
            println!("Auto-sync every {} for {}", label, uid);
            if let Some(at) = sync.next_sync() {
                println!("Next sync in {}", format_countdown(at, Utc::now()));
            }
        }
        cli::AutoSyncCommands::Show { uid } => {
            let p = store.get(&uid)?;
            print_auto_sync(&p);
        }
    }
    Ok(())
}

/// Redraw the countdown once a second from the cached schedule. Only the
/// initial fetch touches the network.
async fn watch(store: &ProjectStore, uid: &str) -> anyhow::Result<()> {
    store.refresh(uid).await?;
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.countdown(uid, Utc::now())? {
                    Some(left) => eprint!("\rNext sync for {}: {:<12}", uid, left),
                    None => {
                        eprintln!("Auto-sync is disabled for {}", uid);
                        return Ok(());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                return Ok(());
            }
        }
    }
}

fn print_project(p: &Project) {
    println!("{} ({})", p.name, p.uid);
    println!("  owner:       {}", p.owner.as_deref().unwrap_or("-"));
    println!(
        "  created:     {}",
        p.created_at.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".into())
    );
    println!("  active:      {}", p.active);
    println!("  submissions: {} ({} loaded)", p.total_submissions, p.submissions.len());
    println!("  available:   {}", p.available_columns.join(", "));
    println!("  selected:    {}", p.selected_columns.join(", "));
    print_auto_sync(p);
}

fn print_auto_sync(p: &Project) {
    if p.auto_sync.enabled {
        let left = p
            .auto_sync
            .next_sync()
            .map(|at| format_countdown(at, Utc::now()))
            .unwrap_or_else(|| "unknown".into());
        println!(
            "  auto-sync:   every {}s, next in {}",
            p.auto_sync.interval_seconds, left
        );
    } else {
        println!("  auto-sync:   off");
    }
    println!(
        "  last sync:   {}",
        p.last_sync_at.map(|d| d.to_rfc3339()).unwrap_or_else(|| "never".into())
    );
}
