//! `shiprasetu` - CLI for the shared crowd-management state
//!
//! This binary lets operators and pilgrims work with the shared collections
//! from a terminal. Every invocation opens the configured database, so
//! several terminals stay in step through storage.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use shiprasetu::cli::{
    output, AlertsCommand, BookCommand, BookingCommand, Cli, Command, ConfigCommand,
    GhatsCommand, LostFoundCommand, OutputFormat, RecsCommand, RoutesCommand, WatchCommand,
};
use shiprasetu::{
    init_logging, Alert, BookingDesk, BookingRequest, CollectionKey, Config, FieldUpdate,
    LiveStatus, LostFoundBoard, NewReport, PersistentStore, Recommendation, SharedState,
    SqliteStore, StoreEntry, Synchronizer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands load (or validate) the configuration themselves
    let config_path = cli.config;
    let load = || Config::load_from(config_path.clone());

    match cli.command {
        Command::Config(config_cmd) => handle_config(config_path.clone(), config_cmd),
        Command::Reset(reset_cmd) => handle_reset(&open_store(&load()?)?, reset_cmd.yes),
        Command::Book(book_cmd) => handle_book(&BookingDesk::new(open_store(&load()?)?), book_cmd),
        Command::Booking(booking_cmd) => {
            handle_booking(&BookingDesk::new(open_store(&load()?)?), booking_cmd)
        }
        Command::LostFound(lost_found_cmd) => {
            handle_lost_found(&LostFoundBoard::new(open_store(&load()?)?), lost_found_cmd)
        }
        Command::Alerts(cmd) => handle_alerts(&open_state(&load()?)?, cmd),
        Command::Recs(cmd) => handle_recs(&open_state(&load()?)?, cmd),
        Command::Ghats(cmd) => handle_ghats(&open_state(&load()?)?, cmd),
        Command::Routes(cmd) => handle_routes(&open_state(&load()?)?, cmd),
        Command::Status(status_cmd) => {
            let config = load()?;
            let backend = open_backend(&config)?;
            let state = SharedState::new(namespaced(&config, Arc::clone(&backend)));
            handle_status(&config, &state, &backend.entries()?, status_cmd.json)
        }
        Command::Refresh => handle_refresh(&open_state(&load()?)?),
        Command::Watch(watch_cmd) => {
            let config = load()?;
            handle_watch(&config, open_state(&config)?, &watch_cmd).await
        }
    }
}

fn open_backend(config: &Config) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.database_path();
    let backend = SqliteStore::open(&path)
        .with_context(|| format!("opening database at {}", path.display()))?;
    Ok(Arc::new(backend))
}

fn namespaced(config: &Config, backend: Arc<SqliteStore>) -> PersistentStore {
    PersistentStore::new(backend, config.storage.namespace.clone())
}

fn open_store(config: &Config) -> anyhow::Result<PersistentStore> {
    Ok(namespaced(config, open_backend(config)?))
}

fn open_state(config: &Config) -> anyhow::Result<SharedState> {
    Ok(SharedState::new(open_store(config)?))
}

fn print_as<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    plain: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Plain => print!("{}", plain(value)),
    }
    Ok(())
}

fn report_missing(collection: &str, id: i64) -> anyhow::Result<()> {
    bail!("no {collection} with id {id}")
}

fn handle_alerts(state: &SharedState, cmd: AlertsCommand) -> anyhow::Result<()> {
    match cmd {
        AlertsCommand::List { format } => {
            print_as(format, &state.alerts(), |a| output::alerts(a))?;
        }
        AlertsCommand::Add { message, priority } => {
            let mut alert = Alert::new(&message, priority.into())?;
            alert.id = state.next_id(CollectionKey::Alerts);
            let id = alert.id;
            state.add_alert(alert);
            println!("Alert {id} broadcast.");
        }
        AlertsCommand::Delete { id } => {
            if !state.delete_alert(id).is_applied() {
                return report_missing("alert", id);
            }
            println!("Alert {id} deleted.");
        }
    }
    Ok(())
}

fn handle_recs(state: &SharedState, cmd: RecsCommand) -> anyhow::Result<()> {
    match cmd {
        RecsCommand::List { format } => {
            print_as(format, &state.recommendations(), |r| {
                output::recommendations(r)
            })?;
        }
        RecsCommand::Add {
            message,
            kind,
            route,
        } => {
            let mut rec = Recommendation::new(&message, kind.into(), &route)?;
            rec.id = state.next_id(CollectionKey::Recommendations);
            let id = rec.id;
            state.add_recommendation(rec);
            println!("Recommendation {id} added.");
        }
        RecsCommand::Delete { id } => {
            if !state.delete_recommendation(id).is_applied() {
                return report_missing("recommendation", id);
            }
            println!("Recommendation {id} deleted.");
        }
    }
    Ok(())
}

fn field_update(value: Option<String>, clear: bool) -> FieldUpdate<String> {
    match (value, clear) {
        (Some(value), _) => FieldUpdate::Set(value),
        (None, true) => FieldUpdate::Clear,
        (None, false) => FieldUpdate::Keep,
    }
}

fn handle_ghats(state: &SharedState, cmd: GhatsCommand) -> anyhow::Result<()> {
    match cmd {
        GhatsCommand::List { format } => {
            print_as(format, &state.ghat_statuses(), |g| output::ghats(g))?;
        }
        GhatsCommand::Set {
            id,
            level,
            remarks,
            clear_remarks,
        } => {
            let remarks = field_update(remarks, clear_remarks);
            if !state
                .update_ghat_status(id, level.into(), remarks)
                .is_applied()
            {
                return report_missing("ghat", id);
            }
            if let Some(ghat) = state.ghat_statuses().into_iter().find(|g| g.id == id) {
                println!(
                    "{} is now {} ({}/{}, {}).",
                    ghat.name,
                    ghat.status,
                    ghat.current_capacity,
                    ghat.max_capacity,
                    ghat.wait_time
                );
            }
        }
    }
    Ok(())
}

fn handle_routes(state: &SharedState, cmd: RoutesCommand) -> anyhow::Result<()> {
    match cmd {
        RoutesCommand::List { format } => {
            print_as(format, &state.route_paths(), |p| output::routes(p))?;
        }
        RoutesCommand::Set {
            id,
            level,
            notes,
            clear_notes,
            closed,
        } => {
            let notes = field_update(notes, clear_notes);
            if !state
                .update_route_path(id, level.into(), notes, !closed)
                .is_applied()
            {
                return report_missing("route", id);
            }
            println!("Route {id} updated.");
        }
        RoutesCommand::Toggle { id } => {
            let Some(path) = state.route_paths().into_iter().find(|p| p.id == id) else {
                return report_missing("route", id);
            };
            let open = !path.is_active;
            state.set_route_active(id, open);
            println!(
                "Route {id} ({} → {}) is now {}.",
                path.from,
                path.to,
                if open { "open" } else { "closed" }
            );
        }
    }
    Ok(())
}

fn handle_status(
    config: &Config,
    state: &SharedState,
    entries: &[StoreEntry],
    json: bool,
) -> anyhow::Result<()> {
    let snapshot = state.snapshot();
    let live = LiveStatus::from_ghats(&snapshot.ghat_statuses);
    let unsaved: Vec<String> = state.unsaved().iter().map(ToString::to_string).collect();
    let fingerprints: Vec<(CollectionKey, Option<String>)> = CollectionKey::ALL
        .into_iter()
        .map(|key| (key, state.store().fingerprint(key.as_str())))
        .collect();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "namespace": config.storage.namespace,
            "alerts": snapshot.alerts.len(),
            "recommendations": snapshot.recommendations.len(),
            "ghat_statuses": snapshot.ghat_statuses.len(),
            "route_paths": snapshot.route_paths.len(),
            "open_routes": snapshot.route_paths.iter().filter(|p| p.is_active).count(),
            "live": live.cards(),
            "unsaved": unsaved,
            "storage": entries,
            "fingerprints": fingerprints
                .iter()
                .map(|(key, hash)| (key.to_string(), serde_json::json!(hash)))
                .collect::<serde_json::Map<_, _>>(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("shiprasetu status");
        println!("-----------------");
        println!("Database:        {}", config.database_path().display());
        println!("Namespace:       {}", config.storage.namespace);
        println!("Alerts:          {}", snapshot.alerts.len());
        println!("Recommendations: {}", snapshot.recommendations.len());
        println!("Ghats:           {}", snapshot.ghat_statuses.len());
        println!(
            "Routes:          {} ({} open)",
            snapshot.route_paths.len(),
            snapshot.route_paths.iter().filter(|p| p.is_active).count()
        );
        if !unsaved.is_empty() {
            println!("Unsaved:         {}", unsaved.join(", "));
        }
        println!();
        print!("{}", output::live_status(&live));
        println!();
        for (key, hash) in &fingerprints {
            let short = hash.as_deref().map_or("-", |h| h.get(..12).unwrap_or(h));
            println!("{:<16} {short}", key.to_string());
        }
        println!();
        print!("{}", output::storage_entries(entries));
    }
    Ok(())
}

fn handle_refresh(state: &SharedState) -> anyhow::Result<()> {
    let changed = state.refresh_data();
    if changed.is_empty() {
        println!("Already up to date.");
    } else {
        let names: Vec<String> = changed.iter().map(ToString::to_string).collect();
        println!("Reloaded: {}", names.join(", "));
    }
    Ok(())
}

async fn handle_watch(
    config: &Config,
    state: SharedState,
    cmd: &WatchCommand,
) -> anyhow::Result<()> {
    if !config.sync.enabled {
        bail!("synchronizer is disabled in configuration ([sync] enabled = false)");
    }
    let period = match cmd.interval {
        Some(0) => bail!("--interval must be greater than 0"),
        Some(secs) => Duration::from_secs(secs),
        None => config.poll_interval(),
    };

    let (tx, mut rx) = mpsc::channel(16);
    let handle = Synchronizer::new(state, period).with_events(tx).start();
    println!(
        "Watching {} every {}s. Press Ctrl-C to stop.",
        config.database_path().display(),
        period.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                let names: Vec<String> = event.changed.iter().map(ToString::to_string).collect();
                println!("{}  changed: {}", event.at.format("%H:%M:%S"), names.join(", "));
            }
        }
    }

    let stats = handle.stats();
    handle.stop().await;
    info!(ticks = stats.ticks, changes = stats.changes, "Watch ended");
    Ok(())
}

fn handle_reset(store: &PersistentStore, yes: bool) -> anyhow::Result<()> {
    if !yes {
        println!("This will clear alerts, recommendations, ghat statuses and route paths.");
        println!("Use --yes to confirm.");
        return Ok(());
    }
    let removed = store.clear_collections()?;
    println!("Cleared {removed} collection(s). Built-in data returns on next use.");
    Ok(())
}

fn handle_book(desk: &BookingDesk, cmd: BookCommand) -> anyhow::Result<()> {
    let request = BookingRequest {
        name: cmd.name,
        age: cmd.age,
        gender: cmd.gender,
        ghat: cmd.ghat,
        date: cmd.date,
        time_slot: cmd.slot,
    };
    let booking = desk.book(&request)?;
    println!("Booking confirmed.");
    print!("{}", output::booking(&booking));

    if let Some(dir) = cmd.receipt {
        let path = dir.join(booking.receipt_file_name());
        std::fs::write(&path, booking.confirmation_text())
            .with_context(|| format!("writing receipt to {}", path.display()))?;
        println!("Receipt saved to {}", path.display());
    }
    Ok(())
}

fn handle_booking(desk: &BookingDesk, cmd: BookingCommand) -> anyhow::Result<()> {
    match cmd {
        BookingCommand::Show { format } => match desk.current() {
            Some(booking) => print_as(format, &booking, output::booking)?,
            None => println!("No booking."),
        },
        BookingCommand::Options => print!("{}", output::booking_options()),
        BookingCommand::Clear => {
            if desk.clear()? {
                println!("Booking cleared.");
            } else {
                println!("No booking.");
            }
        }
    }
    Ok(())
}

fn handle_lost_found(board: &LostFoundBoard, cmd: LostFoundCommand) -> anyhow::Result<()> {
    match cmd {
        LostFoundCommand::List {
            search,
            filter,
            format,
        } => {
            let reports = board.search(&search, filter.into());
            print_as(format, &reports, |r| output::reports(r))?;
        }
        LostFoundCommand::Report {
            kind,
            name,
            age,
            gender,
            location,
            description,
        } => {
            let report = board.submit(NewReport {
                kind: kind.into(),
                name,
                age,
                gender,
                location,
                description,
            })?;
            println!("Report {} posted.", report.id);
        }
        LostFoundCommand::Resolve { id } => {
            if !board.resolve(id)?.is_applied() {
                return report_missing("report", id);
            }
            println!("Report {id} resolved.");
        }
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!("  Namespace:      {}", config.storage.namespace);
                println!();
                println!("[Sync]");
                println!("  Enabled:        {}", config.sync.enabled);
                println!("  Poll interval:  {}s", config.sync.poll_interval_secs);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "shiprasetu_main_{tag}_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_config_validate_fails_on_bad_file() {
        let path = write_config("bad", "[sync]\npoll_interval_secs = 0\n");

        let result = handle_config(None, ConfigCommand::Validate { file: Some(path.clone()) });
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("poll_interval_secs"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_validate_uses_global_path() {
        let path = write_config("global", "[storage]\nnamespace = \"Bad Name\"\n");

        let result = handle_config(Some(path.clone()), ConfigCommand::Validate { file: None });
        assert!(result.is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_config_validate_accepts_good_file() {
        let path = write_config("good", "[sync]\npoll_interval_secs = 5\n");

        assert!(handle_config(None, ConfigCommand::Validate { file: Some(path.clone()) }).is_ok());

        let _ = std::fs::remove_file(&path);
    }
}
