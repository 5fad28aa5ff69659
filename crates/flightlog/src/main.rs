//! `flightlog` - CLI for the flight log
//!
//! This binary provides the command-line interface for logging flights,
//! inspecting statistics, sharing the log and rendering its map layers.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;

use flightlog::cli::{
    AddCommand, Cli, Command, ConfigCommand, EditCommand, OutputFormat, RenderCommand,
    TokenCommand,
};
use flightlog::map::{self, FeatureCollection, HeadlessSurface, MapSyncController, MapView};
use flightlog::storage::{load_access_token, save_access_token};
use flightlog::{
    init_logging, Config, Error, Flight, FlightDraft, FlightStats, FlightStore, GeocodeTable,
    LoadSource, Session, SqliteStore, ViewEvent,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Add(cmd) => handle_add(&open_storage(&config)?, cmd),
        Command::Edit(cmd) => handle_edit(&open_storage(&config)?, cmd),
        Command::Remove { id } => handle_remove(&open_storage(&config)?, &id),
        Command::Clear { yes } => handle_clear(&open_storage(&config)?, yes),
        Command::List(cmd) => {
            let kv = open_storage(&config)?;
            let store = FlightStore::open(&kv);
            let flights = store.sorted_by_date();
            print_flights(&flights, cmd.format)
        }
        Command::Stats(cmd) => handle_stats(&open_storage(&config)?, cmd.json),
        Command::Airports(cmd) => {
            handle_airports(cmd.query.as_deref().unwrap_or(""));
            Ok(())
        }
        Command::Share => {
            let kv = open_storage(&config)?;
            let store = FlightStore::open(&kv);
            println!("{}", flightlog::share_url(&config.share.base_url, store.flights())?);
            Ok(())
        }
        Command::Import { url } => handle_import(&open_storage(&config)?, &url),
        Command::Render(cmd) => handle_render(&config, &open_storage(&config)?, &cmd).await,
        Command::Token(cmd) => handle_token(&config, &open_storage(&config)?, cmd),
        Command::Status(cmd) => handle_status(&config, &open_storage(&config)?, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::open(config.database_path())?)
}

fn handle_add(kv: &SqliteStore, cmd: AddCommand) -> Result<()> {
    let table = GeocodeTable::builtin();
    let flight = FlightStore::open(kv).add(&FlightDraft::from(cmd), &table)?;
    println!(
        "Added {} on {} ({} mi)",
        flight.route_label(),
        flight.display_date(),
        flight.distance
    );
    println!("Id: {}", flight.id);
    Ok(())
}

fn handle_remove(kv: &SqliteStore, id: &str) -> Result<()> {
    let removed = FlightStore::open(kv).remove(id)?;
    println!("Removed {} on {}", removed.route_label(), removed.display_date());
    Ok(())
}

fn handle_clear(kv: &SqliteStore, yes: bool) -> Result<()> {
    let mut store = FlightStore::open(kv);
    if yes {
        let count = store.len();
        store.clear()?;
        println!("Deleted {count} flights.");
    } else {
        println!("This will delete all {} flights.", store.len());
        println!("Use --yes to confirm.");
    }
    Ok(())
}

fn handle_stats(kv: &SqliteStore, json: bool) -> Result<()> {
    let stats = FlightStats::compute(FlightStore::open(kv).flights());
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn handle_import(kv: &SqliteStore, url: &str) -> Result<()> {
    let session = Session::load(kv, url);
    match session.source {
        LoadSource::Shared { .. } if session.saved => {
            println!("Imported {} flights from {}.", session.store.len(), session.source);
        }
        LoadSource::Shared { .. } => {
            bail!(
                "read {} flights from {} but could not save them",
                session.store.len(),
                session.source
            );
        }
        LoadSource::Persisted => {
            bail!(
                "link carried no valid flight data; kept {} saved flights",
                session.store.len()
            );
        }
    }
    Ok(())
}

fn handle_edit(kv: &SqliteStore, cmd: EditCommand) -> Result<()> {
    let table = GeocodeTable::builtin();
    let mut store = FlightStore::open(kv);
    let id = cmd.id.clone();
    let existing = store.get(&id).ok_or_else(|| Error::flight_not_found(&id))?;
    let draft = cmd.apply_to(FlightDraft::from_flight(existing));
    let flight = store.update(&id, &draft, &table)?;
    println!(
        "Updated {} on {} ({} mi)",
        flight.route_label(),
        flight.display_date(),
        flight.distance
    );
    Ok(())
}

fn print_flights(flights: &[&Flight], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(flights)?),
        OutputFormat::Plain => {
            for f in flights {
                println!(
                    "{} {} {} | {} | {} mi | {}",
                    f.date,
                    f.route_label(),
                    f.airline,
                    f.aircraft,
                    f.distance,
                    f.id
                );
            }
        }
        OutputFormat::Table => {
            if flights.is_empty() {
                println!("No flights logged yet.");
                return Ok(());
            }
            println!(
                "{:<12} {:<11} {:<22} {:<18} {:>7}  {}",
                "DATE", "ROUTE", "AIRLINE", "AIRCRAFT", "MILES", "ID"
            );
            for f in flights {
                println!(
                    "{:<12} {:<11} {:<22} {:<18} {:>7}  {}",
                    f.display_date(),
                    f.route_label(),
                    truncate(&f.airline, 22),
                    truncate(&f.aircraft, 18),
                    f.distance,
                    f.id
                );
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn print_stats(stats: &FlightStats) {
    println!("Flight Statistics");
    println!("=================");
    println!("Flights:            {}", stats.total_flights);
    println!("Total distance:     {} mi", stats.total_distance);
    println!("Average distance:   {} mi", stats.average_distance);
    println!("Times around Earth: {:.2}", stats.times_around_earth);
    if let Some(longest) = &stats.longest {
        println!("Longest flight:     {} ({} mi)", longest.route, longest.distance);
    }
    if let Some(shortest) = &stats.shortest {
        println!("Shortest flight:    {} ({} mi)", shortest.route, shortest.distance);
    }
    println!(
        "Unique:             {} airports, {} airlines, {} aircraft",
        stats.unique_airports, stats.unique_airlines, stats.unique_aircraft
    );
    if let (Some(first), Some(last)) = (&stats.first_flight, &stats.last_flight) {
        println!(
            "Flying since:       {} (latest {})",
            flightlog::flight::display_date(first),
            flightlog::flight::display_date(last)
        );
    }

    for (title, ranked) in [
        ("Top airlines", &stats.top_airlines),
        ("Top aircraft", &stats.top_aircraft),
        ("Top routes", &stats.top_routes),
        ("Top airports", &stats.top_airports),
    ] {
        if ranked.is_empty() {
            continue;
        }
        println!();
        println!("[{title}]");
        for r in ranked {
            println!("  {:<30} {}", r.label, r.count);
        }
    }

    if !stats.flights_by_year.is_empty() {
        println!();
        println!("[Flights by year]");
        for (year, count) in &stats.flights_by_year {
            println!("  {year}  {count}");
        }
    }
}

fn handle_airports(query: &str) {
    let table = GeocodeTable::builtin();
    let matches = table.search(query);
    if matches.is_empty() {
        println!("No airports match \"{query}\".");
        return;
    }
    for a in matches {
        println!(
            "{}  {:<40} {:<20} [{:.4}, {:.4}]",
            a.code, a.name, a.city, a.coordinates.lon, a.coordinates.lat
        );
    }
}

async fn handle_render(config: &Config, kv: &SqliteStore, cmd: &RenderCommand) -> Result<()> {
    let Some(token) = config.access_token(kv)? else {
        println!("No map access token; set one with `flightlog token set <TOKEN>`.");
        return Ok(());
    };

    let (tx, rx) = map::runtime::channel();
    let surface = HeadlessSurface::new().with_ready_sender(tx.clone());
    let controller =
        MapSyncController::new(surface, config.map.container.clone(), config.surface_options(""));
    let mut view = MapView::new(controller, tx, rx);

    view.post(ViewEvent::Mount(token));
    view.post(ViewEvent::Submit(FlightStore::open(kv).snapshot()));
    match view.run_until_ready(config.ready_timeout()).await {
        Ok(()) => {}
        Err(Error::SurfaceNotReady { timeout }) => {
            println!("Map not ready after {}ms; nothing rendered.", timeout.as_millis());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    view.drain();

    let controller = view.into_controller();
    let handle = controller
        .handle()
        .context("ready map surface has no handle")?;

    fs::create_dir_all(&cmd.out).map_err(|source| Error::DirectoryCreate {
        path: cmd.out.clone(),
        source,
    })?;
    for layer in [map::ROUTES_LAYER, map::AIRPORTS_LAYER] {
        let data = controller
            .surface()
            .layer_data(handle, layer)
            .cloned()
            .map_or_else(empty_collection, Ok)?;
        let path = cmd.out.join(format!("{layer}.geojson"));
        write_json(&path, &data)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn empty_collection() -> Result<Value> {
    Ok(serde_json::to_value(FeatureCollection::<Value>::empty())?)
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn handle_token(config: &Config, kv: &SqliteStore, cmd: TokenCommand) -> Result<()> {
    match cmd {
        TokenCommand::Set { token } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            save_access_token(kv, &token)?;
            println!("Saved map access token.");
        }
        TokenCommand::Clear => {
            save_access_token(kv, "")?;
            println!("Removed saved map access token.");
        }
        TokenCommand::Show => {
            let source = token_source(config, kv)?;
            match config.access_token(kv)? {
                Some(token) => println!("{} (from {source})", mask(&token)),
                None => println!("No map access token set."),
            }
        }
    }
    Ok(())
}

fn token_source(config: &Config, kv: &SqliteStore) -> Result<&'static str> {
    let configured = config
        .map
        .access_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    Ok(if configured {
        "configuration"
    } else if load_access_token(kv)?.is_some() {
        "saved token"
    } else {
        "none"
    })
}

fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}…")
}

fn handle_status(config: &Config, kv: &SqliteStore, json: bool) -> Result<()> {
    let store = FlightStore::open(kv);
    let storage = kv.stats()?;
    let total_distance: u64 = store.flights().iter().map(|f| u64::from(f.distance)).sum();
    let token = token_source(config, kv)?;

    if json {
        let status = serde_json::json!({
            "flights": store.len(),
            "total_distance": total_distance,
            "database_path": config.database_path(),
            "database_bytes": storage.db_size_bytes,
            "stored_keys": storage.total_keys,
            "access_token": token,
            "share_base_url": config.share.base_url,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("flightlog status");
        println!("----------------");
        println!("Flights:       {}", store.len());
        println!("Distance:      {total_distance} mi");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", storage.db_size_bytes);
        println!("Stored keys:   {}", storage.total_keys);
        println!("Access token:  {token}");
        println!("Share URL:     {}", config.share.base_url);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut value = serde_json::to_value(config)?;
                if let Some(token) = value.pointer_mut("/map/access_token") {
                    if !token.is_null() {
                        *token = Value::String("<redacted>".to_string());
                    }
                }
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Map]");
                println!(
                    "  Access token:       {}",
                    if config.map.access_token.is_some() { "set" } else { "not set" }
                );
                println!("  Container:          {}", config.map.container);
                println!(
                    "  Center:             [{}, {}]",
                    config.map.center.lon, config.map.center.lat
                );
                println!("  Zoom:               {}", config.map.zoom);
                println!("  Projection:         {:?}", config.map.projection);
                println!("  Navigation control: {}", config.map.navigation_control);
                println!("  Ready timeout (ms): {}", config.map.ready_timeout_ms);
                println!();
                println!("[Share]");
                println!("  Base URL:           {}", config.share.base_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
