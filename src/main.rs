//! Binary entry point: parse the command line, bring up the record store,
//! then either serve the API or drive the terminal UI against it.
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use school_records::api::{self, shutdown_signal, HttpServer};
use school_records::cli::{Cli, Command, ServeArgs};
use school_records::logging::{init_file_logging, init_logging};
use school_records::{run_app, ApiClient, App, Store};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Serve(args) => serve(&cli, args),
        Command::Tui => tui(&cli),
    }
}

fn serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    init_logging(cli.log_format)?;
    let store = Store::connect(&cli.store_config()?)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let server = HttpServer::new(args.server_config(), store.clone());
    runtime.block_on(server.start(shutdown_signal()))?;

    close_store(store);
    info!("server stopped");
    Ok(())
}

/// The TUI owns the terminal, so its log goes to a file next to the database.
fn tui(cli: &Cli) -> Result<()> {
    init_file_logging(&cli.tui_log_path()?)?;
    let store = Store::connect(&cli.store_config()?)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client = ApiClient::new(api::router(store.clone()), runtime.handle().clone());

    let mut app = App::load(client);
    let result = run_app(&mut app);
    drop(app);

    close_store(store);
    result
}

fn close_store(store: Store) {
    if let Err(err) = store.close() {
        warn!(error = %format!("{err:#}"), "record store did not close cleanly");
    }
}
