// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod cli;
mod command;
mod config;
mod console_format;
mod delivery;
mod dispatch;
mod layout;
mod reconcile;
mod render;
mod store;
mod typeface;
mod types;
mod ui;
mod webhook;

use cli::Commands;
use config::AppConfig;
use delivery::{ConsoleMessenger, ImageHost, ImgbbHost, LineMessenger, Messenger, Reply};
use dispatch::Dispatcher;
use log::error;
use reconcile::{Reconciler, SheetRepository, TicketRepository};
use std::fs;
use std::path::Path;
use store::{JsonFileStore, MemoryStore, StoreError, Workbook};

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    // Set console width override if specified (for testing)
    if let Some(width) = args.console_width {
        console_format::set_console_width(width);
    }

    // Resolve configuration once; everything below borrows it
    let config = match config::load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    // Credentials are checked up front so a command never half-runs
    if args.needs_delivery() {
        let check = match args.command {
            Commands::Webhook { .. } => config.require_delivery().map(|_| ()),
            _ => config.require_image_host().map(|_| ()),
        };
        if let Err(e) = check {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    }

    let result = match &args.command {
        Commands::Handle { .. } => {
            let text = args.handle_text().unwrap_or_default();
            run_handle(&config, &args, &text)
        }
        Commands::Show => run_handle(&config, &args, &config.commands.show_table),
        Commands::List => run_list(&config),
        Commands::Resequence => run_resequence(&config),
        Commands::Init => run_init(&config),
        Commands::ImportProfiles { file } => run_import_profiles(&config, file),
        Commands::Webhook { body, signature } => run_webhook(&config, body, signature),
    };

    if let Err(e) = result {
        ui::print_error(&e);
        std::process::exit(1);
    }
}

/// Open the configured workbook as a ticket repository
fn open_repository(config: &AppConfig) -> Result<SheetRepository<JsonFileStore>, StoreError> {
    let store = JsonFileStore::open(&config.store_path())?;
    Ok(SheetRepository::with_sheets(store, &config.store.ticket_sheet, &config.store.profile_sheet))
}

/// Image host for the configured key and endpoint
fn image_host(config: &AppConfig, api_key: &str) -> ImgbbHost {
    let host = ImgbbHost::new(delivery::build_agent(config.http_timeout()), api_key);
    match config.imgbb.endpoint.as_deref() {
        Some(endpoint) => host.with_endpoint(endpoint),
        None => host,
    }
}

/// Dispatch one message from the command line and print the reply
fn run_handle(config: &AppConfig, args: &cli::CliArgs, text: &str) -> Result<(), String> {
    let imgbb = match config.imgbb.api_key.as_deref() {
        Some(key) if !args.no_deliver => Some(image_host(config, key)),
        _ => None,
    };
    let host: Option<&dyn ImageHost> = imgbb.as_ref().map(|h| h as &dyn ImageHost);

    let reply = if args.dry_run {
        match dry_run_handle(config, args, host, text) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Cannot read workbook: {}", e);
                Reply::Text(dispatch::SYSTEM_ERROR_REPLY.to_string())
            }
        }
    } else {
        match open_repository(config) {
            Ok(repository) => Dispatcher::new(config, repository, host).with_output(args.output.clone()).handle(text),
            Err(e) => {
                error!("Cannot open workbook: {}", e);
                Reply::Text(dispatch::SYSTEM_ERROR_REPLY.to_string())
            }
        }
    };

    ConsoleMessenger.send(&reply).map_err(|e| e.to_string())
}

/// Handle a message against an in-memory copy of the workbook and report what would change
fn dry_run_handle(
    config: &AppConfig,
    args: &cli::CliArgs,
    host: Option<&dyn ImageHost>,
    text: &str,
) -> Result<Reply, StoreError> {
    let file = JsonFileStore::open(&config.store_path())?;
    let before = file.snapshot()?;
    let store = MemoryStore::new(before.clone());
    let repository = SheetRepository::with_sheets(store, &config.store.ticket_sheet, &config.store.profile_sheet);

    let mut dispatcher = Dispatcher::new(config, repository, host).with_output(args.output.clone());
    let reply = dispatcher.handle(text);

    let after = dispatcher.reconciler().repository().store().workbook();
    let changed = before.changed_rows(after, &config.store.ticket_sheet);
    ui::status(&format!("dry run: {} ticket rows would change, {} left untouched", changed, file.path().display()));
    Ok(reply)
}

/// Print the open worklist as a console table
fn run_list(config: &AppConfig) -> Result<(), String> {
    let repository = open_repository(config).map_err(|e| format!("{} (run `ticket-board init` first?)", e))?;
    let tickets: Vec<types::Ticket> = repository
        .list_open_tickets()
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|stored| stored.ticket)
        .collect();

    console_format::print_worklist(&tickets, None).map_err(|e| format!("Failed to print worklist: {}", e))
}

/// Renumber open tickets without touching anything else
fn run_resequence(config: &AppConfig) -> Result<(), String> {
    let repository = open_repository(config).map_err(|e| format!("{} (run `ticket-board init` first?)", e))?;
    let mut reconciler = Reconciler::new(repository);
    let renumbered = reconciler.resequence().map_err(|e| e.to_string())?;

    ui::status(&format!("renumbered {} open tickets", renumbered));
    Ok(())
}

/// Create the workbook with empty sheets
fn run_init(config: &AppConfig) -> Result<(), String> {
    let path = config.store_path();
    let existed = path.exists();
    let initial = Workbook::with_named_headers(&config.store.ticket_sheet, &config.store.profile_sheet);
    JsonFileStore::create_with(&path, &initial).map_err(|e| format!("Failed to create workbook: {}", e))?;

    if existed {
        ui::warning(&format!("workbook already exists, left unchanged: {}", path.display()));
    } else {
        ui::status(&format!("created workbook {}", path.display()));
    }
    Ok(())
}

/// Load `store,model,phone,address` lines into the profile sheet
fn run_import_profiles(config: &AppConfig, file: &Path) -> Result<(), String> {
    let text = fs::read_to_string(file).map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let profiles = types::parse_profile_lines(&text).map_err(|e| format!("{}: {}", file.display(), e))?;

    let mut repository = open_repository(config).map_err(|e| format!("{} (run `ticket-board init` first?)", e))?;
    let (added, updated) = repository.upsert_profiles(&profiles).map_err(|e| e.to_string())?;

    ui::status(&format!("imported {} profiles ({} new, {} updated)", profiles.len(), added, updated));
    Ok(())
}

/// Verify a saved webhook delivery and answer each text message on the channel
fn run_webhook(config: &AppConfig, body_path: &Path, signature: &str) -> Result<(), String> {
    let credentials = config.require_delivery()?;
    let body = fs::read(body_path).map_err(|e| format!("Failed to read {}: {}", body_path.display(), e))?;

    webhook::verify_signature(credentials.channel_secret, &body, signature).map_err(|e| e.to_string())?;
    let events = webhook::parse_text_events(&body).map_err(|e| e.to_string())?;
    if events.is_empty() {
        ui::status("webhook carried no text messages");
        return Ok(());
    }

    let agent = delivery::build_agent(config.http_timeout());
    let host = image_host(config, credentials.imgbb_api_key);

    // One repository for the whole delivery; each event sees the previous one's writes
    let mut dispatcher = match open_repository(config) {
        Ok(repository) => Some(Dispatcher::new(config, repository, Some(&host))),
        Err(e) => {
            error!("Cannot open workbook: {}", e);
            None
        }
    };

    let mut delivered = 0;
    for event in &events {
        let reply = match dispatcher.as_mut() {
            Some(d) => d.handle(&event.text),
            None => Reply::Text(dispatch::SYSTEM_ERROR_REPLY.to_string()),
        };
        let messenger = LineMessenger::new(agent.clone(), credentials.channel_access_token, &event.reply_token);
        if delivery::send_or_log(&messenger, &reply) {
            delivered += 1;
        }
    }

    ui::status(&format!("answered {} of {} messages", delivered, events.len()));
    Ok(())
}
