// Lahimena CLI - manage client requests, hotel rates and quotations stored
// in spreadsheet workbooks

mod exit_codes;
mod records;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lahimena_config::Settings;
use lahimena_store::{GroupBy, StoreError, Stores};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_NOT_FOUND, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lahimena")]
#[command(about = "Client, hotel and quotation records over xlsx workbooks")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/lahimena/settings.json)
    #[arg(long, global = true, env = "LAHIMENA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the workbooks, overrides the settings file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Client requests
    #[command(subcommand)]
    Clients(ClientCommands),

    /// Hotel rate sheet
    #[command(subcommand)]
    Hotels(HotelCommands),

    /// Hotel quotations
    #[command(subcommand)]
    Quotes(QuoteCommands),

    /// Current exchange rates, optionally converting an amount
    #[command(after_help = "\
Examples:
  lahimena rates
  lahimena rates --amount 150 --from Euro --to Ariary
  lahimena rates --offline --json")]
    Rates {
        #[arg(long, requires_all = ["from", "to"])]
        amount: Option<f64>,

        /// Ariary, Euro or "Dollar US" (codes MGA/EUR/USD accepted)
        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,

        /// Use the configured fallback rates without a network request
        #[arg(long)]
        offline: bool,

        #[arg(long)]
        json: bool,
    },

    /// List snapshots taken before updates and deletions
    Backups {
        /// Which workbook: clients (also holds quotations) or hotels
        #[arg(default_value = "clients")]
        workbook: String,
    },

    /// Show the effective settings
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// List client requests
    List {
        /// Only this client type (Individuel, Groupe)
        #[arg(long = "type")]
        type_client: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show one client by reference
    Show {
        reference: String,

        #[arg(long)]
        json: bool,
    },

    /// Append a client request
    #[command(after_help = "\
Examples:
  lahimena clients add --set ref_client=C12 --set nom=Rakoto --set type_client=Groupe
  lahimena clients add --set \"Réf. Client=C13\" --set Nom=Rabe --set nombre_adultes=2")]
    Add {
        /// Field assignment, by field name or column header
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Change fields of the client at a sheet row
    Update {
        row: usize,

        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete the client at a sheet row, with its extended info
    Delete { row: usize },
}

#[derive(Subcommand)]
enum HotelCommands {
    /// List hotels
    List {
        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Distinct cities
    Cities,

    /// Append a hotel
    Add {
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Change fields of the hotel at a sheet row
    Update {
        row: usize,

        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete the hotel at a sheet row
    Delete { row: usize },
}

#[derive(Subcommand)]
enum QuoteCommands {
    /// List quotations
    List {
        /// Only quotations for this client reference
        #[arg(long)]
        client: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Record a quotation; number and date default to now
    Add {
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete the quotation at a sheet row
    Delete { row: usize },

    /// Totals grouped by client, city or hotel
    Summary {
        #[arg(long, default_value = "client")]
        by: GroupBy,

        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_settings(config: Option<&PathBuf>, data_dir: Option<PathBuf>) -> Settings {
    let mut settings = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    settings
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_ref(), cli.data_dir);

    match cli.command {
        Commands::Config { init } => records::cmd_config(&settings, cli.config.as_deref(), init),
        Commands::Backups { workbook } => records::cmd_backups(&settings, &workbook),
        Commands::Rates { amount, from, to, offline, json } => {
            records::cmd_rates(&settings, amount, from, to, offline, json)
        }
        Commands::Clients(command) => {
            let stores = Stores::from_settings(&settings);
            match command {
                ClientCommands::List { type_client, json } => records::cmd_clients_list(&stores, type_client, json),
                ClientCommands::Show { reference, json } => records::cmd_clients_show(&stores, &reference, json),
                ClientCommands::Add { set } => records::cmd_add(&stores.clients, &set),
                ClientCommands::Update { row, set } => records::cmd_update(&stores.clients, row, &set),
                ClientCommands::Delete { row } => records::cmd_delete(&stores.clients, row),
            }
        }
        Commands::Hotels(command) => {
            let stores = Stores::from_settings(&settings);
            match command {
                HotelCommands::List { city, category, json } => {
                    records::cmd_hotels_list(&stores, city, category, json)
                }
                HotelCommands::Cities => records::cmd_hotels_cities(&stores),
                HotelCommands::Add { set } => records::cmd_add(&stores.hotels, &set),
                HotelCommands::Update { row, set } => records::cmd_update(&stores.hotels, row, &set),
                HotelCommands::Delete { row } => records::cmd_delete(&stores.hotels, row),
            }
        }
        Commands::Quotes(command) => {
            let stores = Stores::from_settings(&settings);
            match command {
                QuoteCommands::List { client, json } => records::cmd_quotes_list(&stores, client, json),
                QuoteCommands::Add { set } => records::cmd_quotes_add(&stores, &set),
                QuoteCommands::Delete { row } => records::cmd_delete(&stores.quotations, row),
                QuoteCommands::Summary { by, json } => records::cmd_quotes_summary(&stores, by, json),
            }
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { code: EXIT_NOT_FOUND, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Workbook(_) => Some("is the workbook open in another program?".to_string()),
            StoreError::Io(_) => None,
        };
        Self { code: EXIT_IO, message: err.to_string(), hint }
    }
}
