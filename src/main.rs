// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile-Sync terminal client
//!
//! Signs in with a Google ID token, shows the Firestore profile and lets
//! the user edit the display name.

use anyhow::Context;
use profile_sync::{
    config::{Config, StoreBackend},
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{
        terminal_signin::{read_line, shared_input},
        GoogleIdTokenExchange, GoogleIdTokenVerifier, ProfileStore, SessionController,
        SessionOptions, TerminalGoogleSignIn,
    },
    ui::{self, Command},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is the screen.
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        project = %config.gcp_project_id,
        collection = %config.profile_collection,
        "Starting profile-sync"
    );

    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(
            FirestoreDb::new(&config.gcp_project_id)
                .await
                .context("Failed to connect to Firestore")?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory profile store; edits are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let profiles = ProfileStore::new(store, config.profile_collection.clone());

    let verifier =
        GoogleIdTokenVerifier::new(&config).context("Failed to initialize ID token verifier")?;
    let exchange = Arc::new(GoogleIdTokenExchange::new(
        verifier,
        config.session_signing_key.clone(),
    ));

    let input = shared_input(tokio::io::BufReader::new(tokio::io::stdin()));
    let provider = Arc::new(TerminalGoogleSignIn::new(
        input.clone(),
        config.session_file.clone(),
    ));

    let controller =
        SessionController::start(provider, exchange, profiles, SessionOptions::from(&config))
            .await;

    spawn_renderer(&controller);
    println!("{}", ui::HELP);

    loop {
        let Some(line) = read_line(&input).await.context("Failed to read input")? else {
            break;
        };

        let command = match ui::parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::SignIn => controller.begin_sign_in().await,
            Command::Edit => controller.begin_edit(),
            Command::Cancel => controller.cancel_edit(),
            Command::Save(name) => match ui::save_hint(&controller.state()) {
                Some(hint) => println!("{hint}"),
                None => {
                    controller.begin_edit();
                    controller.commit_edit(&name).await;
                }
            },
            Command::Refresh => controller.refresh_profile().await,
            Command::SignOut => controller.sign_out().await,
            Command::Help => println!("{}", ui::HELP),
            Command::Quit => break,
        }
    }

    tracing::info!("Exiting");
    Ok(())
}

/// Print the screen on every state change and each notification.
fn spawn_renderer(controller: &SessionController) {
    let mut states = controller.subscribe();
    println!("{}", ui::render(&states.borrow_and_update()));
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let screen = ui::render(&states.borrow_and_update());
            println!("\n{screen}");
        }
    });

    let mut notifications = controller.notifications();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => println!("{}", ui::render_notification(&notification)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped notifications");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Initialize structured JSON logging on stderr.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("profile_sync=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
