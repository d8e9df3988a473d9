//! `cc98f` - CLI for cc98-filter
//!
//! This binary manages the block list and runs the filter engine over saved
//! pages.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing::{debug, warn};

use cc98_filter::cli::{
    Cli, Command, ConfigCommand, EntityArgs, ExportCommand, ImportCommand, LabelCommand,
    ListCommand, ReplayCommand, ScanCommand,
};
use cc98_filter::transfer::{self, ImportPolicy};
use cc98_filter::{
    init_logging, page_channel, BlockManager, BlockStore, BlockedEntity, Broadcaster, Config,
    Document, EngineSettings, EngineStats, EntityKind, FilterEngine, MemoryStore, ScanReport,
    Selector, SqliteStore,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Scan(cmd) => handle_scan(&config, &cmd),
        Command::Replay(cmd) => handle_replay(&config, cmd).await,
        Command::Block(args) => handle_block(&config, &args),
        Command::Unblock(args) => handle_unblock(&config, &args),
        Command::Enable(args) => handle_toggle(&config, &args, true),
        Command::Disable(args) => handle_toggle(&config, &args, false),
        Command::Label(cmd) => handle_label(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Export(cmd) => handle_export(&config, cmd),
        Command::Import(cmd) => handle_import(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.database_path();
    SqliteStore::open(&path).with_context(|| format!("opening block list at {}", path.display()))
}

fn open_manager(config: &Config) -> Result<BlockManager> {
    Ok(BlockManager::open(
        Box::new(open_store(config)?),
        Broadcaster::default(),
    ))
}

fn read_page(path: &Path, url: Option<&str>) -> Result<Document> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading page {}", path.display()))?;
    Ok(match url {
        Some(url) => Document::parse_with_url(&html, url),
        None => Document::parse(&html),
    })
}

fn write_html(html: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("writing {}", path.display()))?,
        None => io::stdout().write_all(html.as_bytes())?,
    }
    Ok(())
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> Result<()> {
    let document = Rc::new(RefCell::new(read_page(&cmd.page, cmd.url.as_deref())?));
    let settings = EngineSettings::from_config(config)?;
    let engine = FilterEngine::start(settings, Box::new(open_store(config)?), Rc::clone(&document));

    write_html(&document.borrow().to_html(), cmd.output.as_deref())?;
    print_report(&engine.stats().totals, cmd.json)
}

async fn handle_replay(config: &Config, cmd: ReplayCommand) -> Result<()> {
    let document = Rc::new(RefCell::new(read_page(&cmd.page, cmd.url.as_deref())?));
    let fragments = cmd
        .fragments
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("reading fragment {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let into = Selector::parse(&cmd.into)?;
    let interval = Duration::from_millis(cmd.interval_ms);

    // The replay works on a copy of the persisted list.
    let store = MemoryStore::with_list(open_store(config)?.load()?);
    let settings = EngineSettings::from_config(config)?;
    let broadcaster = Broadcaster::default();
    let mut engine = FilterEngine::start(settings, Box::new(store), Rc::clone(&document));
    let (page, mutations) = page_channel(Rc::clone(&document));

    let feed = async move {
        for fragment in &fragments {
            let added = page.insert_html_into(&into, fragment)?;
            debug!(nodes = added.len(), "Inserted fragment");
            tokio::time::sleep(interval).await;
        }
        drop(page);
        Ok::<_, cc98_filter::Error>(fragments.len())
    };
    let (stats, fed) = tokio::join!(engine.run(mutations, broadcaster.subscribe()), feed);
    let fed = fed?;

    write_html(&document.borrow().to_html(), cmd.output.as_deref())?;
    print_stats(fed, &stats, cmd.json)
}

fn print_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(report)?);
    } else {
        eprintln!(
            "hidden {}, redacted {}, withheld {} ({} commands applied, {} skipped)",
            report.hidden,
            report.redacted,
            report.withheld,
            report.commands_applied,
            report.commands_skipped
        );
    }
    Ok(())
}

fn print_stats(fragments: usize, stats: &EngineStats, json: bool) -> Result<()> {
    if json {
        eprintln!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        eprintln!(
            "{fragments} fragments inserted, {} relevant batches, {} re-scans after the initial scan",
            stats.relevant_batches, stats.debounced_scans
        );
        print_report(&stats.totals, false)?;
    }
    Ok(())
}

fn handle_block(config: &Config, args: &EntityArgs) -> Result<()> {
    let mut manager = open_manager(config)?;
    let entity = manager.add(args.kind(), &args.id)?;
    println!("Blocked {} '{}'", args.kind(), entity.id);
    Ok(())
}

fn handle_unblock(config: &Config, args: &EntityArgs) -> Result<()> {
    let mut manager = open_manager(config)?;
    let entity = manager.remove(args.kind(), &args.id)?;
    println!("Unblocked {} '{}'", args.kind(), entity.id);
    Ok(())
}

fn handle_toggle(config: &Config, args: &EntityArgs, enabled: bool) -> Result<()> {
    let mut manager = open_manager(config)?;
    let state = if enabled { "enabled" } else { "disabled" };
    if manager.set_enabled(args.kind(), &args.id, enabled)? {
        println!("{} '{}' {state}", args.kind(), args.id.trim());
    } else {
        println!("{} '{}' was already {state}", args.kind(), args.id.trim());
    }
    Ok(())
}

fn handle_label(config: &Config, cmd: &LabelCommand) -> Result<()> {
    let mut manager = open_manager(config)?;
    manager.set_label(&cmd.user, cmd.label.as_deref())?;
    let user = manager
        .list()
        .get(EntityKind::User, cmd.user.trim())
        .and_then(BlockedEntity::label);
    match user {
        Some(label) => println!("Label for '{}' set to '{label}'", cmd.user.trim()),
        None => println!("Label for '{}' cleared", cmd.user.trim()),
    }
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> Result<()> {
    let manager = open_manager(config)?;
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(manager.list())?);
        return Ok(());
    }

    let stats = manager.stats();
    println!("Users ({} listed, {} enabled)", stats.users, stats.enabled_users);
    print_entities(&manager.list().users);
    println!();
    println!("Boards ({} listed, {} enabled)", stats.boards, stats.enabled_boards);
    print_entities(&manager.list().boards);
    Ok(())
}

fn print_entities(entities: &[BlockedEntity]) {
    for entity in entities {
        let state = if entity.enabled { "on " } else { "off" };
        let since = entity
            .first_seen_time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M");
        match entity.label() {
            Some(label) => println!("  [{state}] {:<24} since {since}  label: {label}", entity.id),
            None => println!("  [{state}] {:<24} since {since}", entity.id),
        }
    }
}

fn handle_export(config: &Config, cmd: ExportCommand) -> Result<()> {
    let manager = open_manager(config)?;
    let now = Utc::now();
    let path = cmd
        .file
        .unwrap_or_else(|| PathBuf::from(transfer::backup_file_name(now)));
    let json = transfer::export(manager.list(), now).to_json()?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported block list to {}", path.display());
    Ok(())
}

fn handle_import(config: &Config, cmd: &ImportCommand) -> Result<()> {
    let json = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("reading {}", cmd.file.display()))?;
    let policy = if cmd.replace {
        ImportPolicy::Replace
    } else {
        ImportPolicy::Merge
    };

    let mut manager = open_manager(config)?;
    let assume_yes = cmd.yes;
    let mut confirm = |question: &str| assume_yes || ask(question);
    let outcome = transfer::import(&mut manager, &json, policy, &mut confirm)?;
    println!("Import complete: {outcome}");
    Ok(())
}

fn ask(question: &str) -> bool {
    eprint!("{question} [y/N] ");
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            warn!(error = %e, "Could not read answer");
            false
        }
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Engine]");
                println!("  Debounce (ms):      {}", config.engine.debounce_ms);
                println!("  Observe root:       {}", config.engine.observe_root);
                println!("  Message pages:      {}", config.engine.message_page_prefix);
                println!("  Icon:               {}", config.engine.icon_url);
                println!(
                    "  Restore on unblock: {}",
                    config.engine.restore_on_unblock
                );
                println!();
                println!("[Markers]");
                println!("  Redacted:           {}", config.markers.redacted);
                println!("  Board blocked:      {}", config.markers.board_blocked);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("invalid configuration")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
