mod auth;
mod cli;
mod clock;
mod db;
mod error;
mod export;
mod fmt;
mod ingest;
mod jobs;
mod ledger;
mod models;
mod server;
mod settings;
mod sheet;
mod status;
mod validator;
mod worker;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ExpenseCommands, IncomeCommands, JobsCommands, SearchCommands};
use ledger::SearchFilter;
use models::RecordKind;

/// Log to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn serve(mut settings: settings::Settings, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        settings.bind_addr = addr;
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::run(settings))
}

fn run(command: Commands) -> anyhow::Result<()> {
    let settings = settings::load_settings();
    match &command {
        Commands::Serve { .. } | Commands::Jobs { .. } => init_tracing(&settings.log_level),
        _ => init_tracing("warn"),
    }

    match command {
        Commands::Init { data_dir } => cli::init::run(data_dir)?,
        Commands::Signup {
            first_name,
            last_name,
            date_of_birth,
            username,
            email,
            password,
        } => cli::account::signup(cli::account::SignupArgs {
            first_name,
            last_name,
            date_of_birth,
            username,
            email,
            password,
        })?,
        Commands::Signin { login, password } => cli::account::signin(&login, password)?,
        Commands::Signout => cli::account::signout()?,
        Commands::Income { command } => match command {
            IncomeCommands::Add { amount, source } => cli::records::add_income(amount, &source)?,
            IncomeCommands::Update { id, amount, source } => cli::records::update_income(id, amount, &source)?,
            IncomeCommands::Delete { id } => cli::records::delete(RecordKind::Income, id)?,
            IncomeCommands::List => cli::records::list(RecordKind::Income, &SearchFilter::default())?,
        },
        Commands::Expense { command } => match command {
            ExpenseCommands::Add {
                amount,
                category,
                description,
            } => cli::records::add_expense(amount, &category, &description)?,
            ExpenseCommands::Update {
                id,
                amount,
                category,
                description,
            } => cli::records::update_expense(id, amount, &category, &description)?,
            ExpenseCommands::Delete { id } => cli::records::delete(RecordKind::Expense, id)?,
            ExpenseCommands::List => cli::records::list(RecordKind::Expense, &SearchFilter::default())?,
        },
        Commands::Search { command } => match command {
            SearchCommands::Income(args) => cli::records::list(RecordKind::Income, &args.into())?,
            SearchCommands::Expense(args) => cli::records::list(RecordKind::Expense, &args.into())?,
        },
        Commands::Summary => cli::summary::run()?,
        Commands::Upload { kind, file } => cli::jobs::upload(&kind, &file)?,
        Commands::Status { code } => cli::jobs::status(&code)?,
        Commands::Jobs { command } => match command {
            JobsCommands::Run => cli::jobs::run_pending()?,
        },
        Commands::Export { output } => cli::export::run(output)?,
        Commands::Serve { bind } => serve(settings, bind)?,
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
