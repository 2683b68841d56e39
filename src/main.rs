mod accounts;
mod config;
mod contacts;
mod db;
mod inbox;
mod input;
mod models;
mod session;
mod store;
mod ui;

use accounts::AccountService;
use config::Config;
use contacts::ContactBook;
use input::LineReceiver;
use models::UserAccount;
use store::MessageStore;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            ui::error(&format!("Configuration error: {err}"));
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        tracing::warn!("Failed to create data directory: {}", e);
    }

    // Create the database connection pool (runs migrations on startup)
    let pool = match db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            ui::error(&format!("Cannot connect to server: {err}"));
            std::process::exit(1);
        }
    };

    let store = MessageStore::new(pool.clone());
    let account_service = AccountService::new(pool);

    let mut lines = input::spawn_stdin_reader();

    ui::clear_screen();
    ui::banner(None);
    let Some(user) = accounts::create_or_load(&account_service, &config.data_dir, &mut lines).await
    else {
        ui::error("Cannot proceed without a user.");
        return;
    };

    ui::clear_screen();
    ui::banner(Some(&user));

    let mut contacts = ContactBook::load(&config.data_dir);

    main_menu(
        &store,
        &account_service,
        &config,
        &user,
        &mut contacts,
        &mut lines,
    )
    .await;
}

async fn main_menu(
    store: &MessageStore,
    accounts_svc: &AccountService,
    config: &Config,
    user: &UserAccount,
    contacts: &mut ContactBook,
    lines: &mut LineReceiver,
) {
    loop {
        println!();
        ui::notice("Main menu:");
        println!("1. List contacts");
        println!("2. Add contact");
        println!("3. Inbox");
        println!("4. Open conversation");
        println!("5. Clear inbox");
        println!("6. Delete account");
        println!("7. Exit");
        ui::prompt("Select an option: ");

        let choice = tokio::select! {
            line = lines.recv() => match line {
                Some(line) => line,
                None => return,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                ui::notice("Exiting.");
                return;
            }
        };

        match choice.trim() {
            "1" => list_contacts(contacts),
            "2" => {
                let _ = add_contact(accounts_svc, contacts, lines).await;
            }
            "3" => inbox_menu(store, accounts_svc, config, user, contacts, lines).await,
            "4" => open_from_contacts(store, config, user, contacts, lines).await,
            "5" => clear_inbox(store, user, lines).await,
            "6" => {
                if delete_account(accounts_svc, config, user, lines).await {
                    return;
                }
            }
            "7" | "q" | "quit" => {
                ui::notice("Goodbye!");
                return;
            }
            _ => ui::error("Unknown option."),
        }
    }
}

fn list_contacts(contacts: &ContactBook) {
    if contacts.is_empty() {
        ui::notice("No contacts yet.");
        return;
    }
    ui::notice("--- Contacts ---");
    for (index, (user_id, name)) in contacts.iter().enumerate() {
        println!("{}. {} ({})", index + 1, name, user_id);
    }
}

/// Prompt for an 8-digit id, verify it on the server, cache the name.
/// Returns the (id, name) pair when a contact was added.
async fn add_contact(
    accounts_svc: &AccountService,
    contacts: &mut ContactBook,
    lines: &mut LineReceiver,
) -> Option<(String, String)> {
    ui::prompt("Enter the 8-digit ID of the contact: ");
    let user_id = lines.recv().await?.trim().to_string();

    if user_id.len() != 8 || !user_id.chars().all(|c| c.is_ascii_digit()) {
        ui::error("IDs are exactly 8 digits.");
        return None;
    }
    if let Some(name) = contacts.get(&user_id) {
        ui::notice(&format!("Contact already exists locally: {name}"));
        return None;
    }

    match accounts_svc.lookup_username(&user_id).await {
        Ok(Some(name)) => {
            if let Err(err) = contacts.insert(&user_id, &name) {
                tracing::warn!("could not persist contact book: {err}");
            }
            ui::success(&format!("Added contact: {name} ({user_id})"));
            Some((user_id, name))
        }
        Ok(None) => {
            ui::error("User ID not found on server.");
            None
        }
        Err(err) => {
            ui::error(&format!("Lookup failed: {err}"));
            None
        }
    }
}

async fn inbox_menu(
    store: &MessageStore,
    accounts_svc: &AccountService,
    config: &Config,
    user: &UserAccount,
    contacts: &mut ContactBook,
    lines: &mut LineReceiver,
) {
    ui::clear_screen();
    ui::banner(Some(user));
    let rows = inbox::render_inbox(store, accounts_svc, contacts, user, config.inbox_limit).await;

    ui::prompt("Select (number), [a] add contact, [q] back: ");
    let Some(command) = lines.recv().await else {
        return;
    };
    let command = command.trim().to_string();

    match command.to_ascii_lowercase().as_str() {
        "q" | "" => return,
        "a" => {
            let _ = add_contact(accounts_svc, contacts, lines).await;
            return;
        }
        _ => {}
    }

    let Ok(index) = command.parse::<usize>() else {
        return;
    };
    let Some(row) = index.checked_sub(1).and_then(|i| rows.get(i)) else {
        ui::error("Invalid selection.");
        return;
    };

    let partner_id = row.partner_id.clone();
    let partner_name = inbox::resolve_name(accounts_svc, contacts, &partner_id).await;
    if !contacts.contains(&partner_id) {
        if let Err(err) = contacts.insert(&partner_id, &partner_name) {
            tracing::warn!("could not persist contact book: {err}");
        }
    }

    session::open_session(store, config, user, &partner_id, &partner_name, lines).await;
}

async fn open_from_contacts(
    store: &MessageStore,
    config: &Config,
    user: &UserAccount,
    contacts: &ContactBook,
    lines: &mut LineReceiver,
) {
    list_contacts(contacts);
    if contacts.is_empty() {
        return;
    }

    ui::prompt("Select contact by number: ");
    let Some(selection) = lines.recv().await else {
        return;
    };
    let Some((partner_id, partner_name)) = selection
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| contacts.nth(index))
    else {
        ui::error("Invalid selection.");
        return;
    };

    let (partner_id, partner_name) = (partner_id.to_string(), partner_name.to_string());
    session::open_session(store, config, user, &partner_id, &partner_name, lines).await;
}

async fn clear_inbox(store: &MessageStore, user: &UserAccount, lines: &mut LineReceiver) {
    ui::prompt("Delete every message addressed to you? (y/n): ");
    let Some(confirm) = lines.recv().await else {
        return;
    };
    if !confirm.trim().eq_ignore_ascii_case("y") {
        return;
    }

    match store.clear_inbox(&user.user_id).await {
        Ok(removed) => ui::success(&format!("Inbox cleared on server ({removed} messages).")),
        Err(err) => ui::error(&format!("Clear inbox failed: {err}")),
    }
}

/// Returns true when the account was deleted and the program should exit.
async fn delete_account(
    accounts_svc: &AccountService,
    config: &Config,
    user: &UserAccount,
    lines: &mut LineReceiver,
) -> bool {
    ui::prompt("Delete your account and all messages? (y/n): ");
    let Some(confirm) = lines.recv().await else {
        return false;
    };
    if !confirm.trim().eq_ignore_ascii_case("y") {
        return false;
    }

    match accounts_svc.delete_account(&user.user_id).await {
        Ok(()) => {
            accounts::delete_profile(&config.data_dir);
            ui::success("Account deleted. Exiting.");
            true
        }
        Err(err) => {
            ui::error(&format!("Account deletion failed: {err}"));
            false
        }
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    // Keep the interactive transcript clean: diagnostics default to warn
    // and go to stderr unless RUST_LOG says otherwise.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "info,catapult=debug,sqlx=warn".to_string()
        } else {
            "warn,catapult=warn,sqlx=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "catapult starting up"
    );
    Ok(())
}
