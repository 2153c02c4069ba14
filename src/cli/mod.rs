pub mod account;
pub mod export;
pub mod init;
pub mod jobs;
pub mod records;
pub mod session;
pub mod summary;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fintrack", about = "Track incomes and expenses, from the shell or over HTTP.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, database and signing secret.
    Init {
        /// Path for fintrack data (default: ~/Documents/fintrack)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Register a new user.
    Signup {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Date of birth, YYYY-MM-DD
        #[arg(long)]
        date_of_birth: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and remember the session.
    Signin {
        /// Username or email
        login: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the current session.
    Signout,
    /// Manage incomes.
    Income {
        #[command(subcommand)]
        command: IncomeCommands,
    },
    /// Manage expenses.
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    /// Search incomes or expenses.
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },
    /// Show totals and balance.
    Summary,
    /// Upload a CSV or spreadsheet of incomes or expenses.
    Upload {
        /// Record kind: income or expense
        kind: String,
        /// Path to the CSV or XLSX file
        file: String,
    },
    /// Check a deferred upload by tracking code.
    Status {
        code: String,
    },
    /// Background job maintenance.
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// Export incomes and expenses to CSV.
    Export {
        /// Output directory (default: <data_dir>/exports)
        #[arg(long)]
        output: Option<String>,
    },
    /// Run the HTTP API.
    Serve {
        /// Address to bind, overriding settings
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum IncomeCommands {
    /// Record an income.
    Add {
        amount: f64,
        source: String,
    },
    /// Change an existing income.
    Update {
        id: i64,
        amount: f64,
        source: String,
    },
    /// Delete an income.
    Delete {
        id: i64,
    },
    /// List all incomes.
    List,
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense.
    Add {
        amount: f64,
        category: String,
        description: String,
    },
    /// Change an existing expense.
    Update {
        id: i64,
        amount: f64,
        category: String,
        description: String,
    },
    /// Delete an expense.
    Delete {
        id: i64,
    },
    /// List all expenses.
    List,
}

#[derive(Args, Clone, Default)]
pub struct SearchArgs {
    /// Lowest amount to include
    #[arg(long = "min")]
    pub min_amount: Option<f64>,
    /// Highest amount to include
    #[arg(long = "max")]
    pub max_amount: Option<f64>,
    /// Substring of the source (incomes) or category (expenses)
    #[arg(long)]
    pub text: Option<String>,
    /// Creation date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Subcommand)]
pub enum SearchCommands {
    /// Search incomes.
    Income(SearchArgs),
    /// Search expenses.
    Expense(SearchArgs),
}

#[derive(Subcommand)]
pub enum JobsCommands {
    /// Complete every pending tracking job now.
    Run,
}

impl From<SearchArgs> for crate::ledger::SearchFilter {
    fn from(args: SearchArgs) -> Self {
        Self {
            min_amount: args.min_amount,
            max_amount: args.max_amount,
            text: args.text,
            date: args.date,
        }
    }
}
