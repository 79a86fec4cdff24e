use clap::Parser;
use rest_cli::cli::commands::alias::{execute_alias_command, scan_switch, scan_verbosity};
use rest_cli::cli::commands::request::execute_request_command;
use rest_cli::cli::commands::service::execute_service_command;
use rest_cli::cli::errors::print_error_with_json;
use rest_cli::cli::tracing_init::init_tracing;
use rest_cli::cli::{Cli, Commands, GlobalArgs};
use rest_cli::config::manager::ServiceManager;
use rest_cli::error::Error;
use rest_cli::invocation::HttpMethod;
use rest_cli::output::Output;
use rest_cli::store::default_db_path;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (verbosity, json_errors) = match &cli.command {
        Commands::Alias(args) => (
            cli.global.verbosity.saturating_add(scan_verbosity(args)),
            cli.global.json_errors || scan_switch(args, "--json-errors"),
        ),
        _ => (cli.global.verbosity, cli.global.json_errors),
    };
    init_tracing(verbosity);

    match run_command(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error_with_json(&e, json_errors);
            std::process::exit(1);
        }
    }
}

/// `--db` (or `REST_DB`), else `~/.rest.db`.
fn db_path(global: &GlobalArgs) -> Result<PathBuf, Error> {
    global.db.clone().map_or_else(default_db_path, Ok)
}

async fn run_command(cli: Cli) -> Result<i32, Error> {
    let Cli { global, command } = cli;
    let output = Output::new(global.quiet, global.json_errors);

    let (method, args) = match command {
        Commands::Version => {
            output.data(format!("rest {}", env!("CARGO_PKG_VERSION")));
            let path = db_path(&global)?;
            if path.exists() {
                if let Some(version) = ServiceManager::open(&path)?.store_version()? {
                    output.data(format!("database {version} ({})", path.display()));
                }
            }
            return Ok(0);
        }
        Commands::Service { command } => {
            let manager = ServiceManager::open(&db_path(&global)?)?;
            execute_service_command(&manager, &output, command)?;
            return Ok(0);
        }
        Commands::Alias(args) => return execute_alias_command(&global, args).await,
        Commands::Get(args) => (HttpMethod::Get, args),
        Commands::Post(args) => (HttpMethod::Post, args),
        Commands::Put(args) => (HttpMethod::Put, args),
        Commands::Delete(args) => (HttpMethod::Delete, args),
        Commands::Patch(args) => (HttpMethod::Patch, args),
        Commands::Head(args) => (HttpMethod::Head, args),
        Commands::Options(args) => (HttpMethod::Options, args),
    };

    let manager = ServiceManager::open(&db_path(&global)?)?;
    execute_request_command(manager.store(), &output, method, args).await
}
