use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod services;
mod tui;

use app::{App, View};
use config::Config;
use db::StoreErrorKind;
use error::Result;
use tui::{draw, handle_key_event};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --add flag (headless save): shelfmark --add <url> [key]
    let add_url = if args.len() >= 3 && args[1] == "--add" {
        Some(args[2].clone())
    } else {
        None
    };

    // Initialize app
    let mut app = App::new(&config).await?;

    // If a URL was given, save it and exit without entering the TUI.
    if let Some(url) = add_url {
        let key = args.get(3).map(|s| s.as_str());
        match app.add_page_headless(&url, key).await {
            Ok(page_id) => {
                println!("Saved page #{page_id}: {url}");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error: {e}");
                // Scripts can tell an already bookmarked URL apart from
                // a real failure.
                let code = match db::error_kind(&e) {
                    Some(StoreErrorKind::Conflict) => 2,
                    _ => 1,
                };
                std::process::exit(code);
            }
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Poll for completed background saves
        app.poll_add_result().await?;

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(
                        key,
                        app.url_input_active,
                        app.view == View::Reading,
                        app.show_help,
                    ) {
                        let should_quit = app.handle_action(action).await?;
                        if should_quit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
