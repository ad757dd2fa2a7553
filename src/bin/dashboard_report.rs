//! Operator tool: prints a dashboard envelope or logs a deal from a JSON file.
//!
//! ```text
//! dashboard_report show <dashboard> <user-id> <role> [period]
//! dashboard_report log <dashboard> <user-id> <role> <form.json>
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use config::Config;
use dotenvy::dotenv;

use pushkind_deals::db::{ensure_schema, establish_connection_pool};
use pushkind_deals::domain::dashboard::{DashboardType, TimePeriod};
use pushkind_deals::domain::role::{AuthenticatedUser, UserRole};
use pushkind_deals::domain::types::{TypeConstraintError, UserId};
use pushkind_deals::dto::dashboard::DashboardQuery;
use pushkind_deals::forms::deal::LogDealForm;
use pushkind_deals::models::config::AppConfig;
use pushkind_deals::repository::DieselRepository;
use pushkind_deals::repository::storage::{DealStorage, StorageLimits};
use pushkind_deals::services::dashboard::get_dashboard_data;
use pushkind_deals::services::deals::log_deal;
use pushkind_deals::services::rate_limit::RateLimiter;

#[derive(Parser)]
#[command(name = "dashboard_report")]
#[command(about = "Print dealership dashboards and log deals from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Who is asking and for which dashboard.
#[derive(Args)]
struct Caller {
    /// Dashboard: sales, finance, sales-manager or general-manager
    dashboard: DashboardType,

    /// Identifier of the acting user
    #[arg(value_parser = parse_user_id)]
    user_id: UserId,

    /// Role of the acting user
    role: UserRole,
}

impl Caller {
    fn user(&self) -> AuthenticatedUser {
        AuthenticatedUser::new(self.user_id.clone(), self.role, "cli")
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the dashboard envelope as JSON
    Show {
        #[command(flatten)]
        caller: Caller,

        /// this-month, last-month, year-to-date, last-year or all-time
        #[arg(default_value = "this-month")]
        period: TimePeriod,
    },

    /// Validate a deal form from a JSON file and append it to the log
    Log {
        #[command(flatten)]
        caller: Caller,

        /// Path to the deal form
        form_path: PathBuf,
    },
}

fn parse_user_id(value: &str) -> Result<UserId, TypeConstraintError> {
    UserId::new(value)
}

fn load_config() -> Result<AppConfig, config::ConfigError> {
    // Select config profile (defaults to `local`).
    let app_env = env::var("APP_ENV").unwrap_or_else(|_| "local".into());

    Config::builder()
        .add_source(config::File::with_name("config/default"))
        .add_source(config::File::with_name(&format!("config/{app_env}")).required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize::<AppConfig>()
}

fn run(command: Command, app_config: &AppConfig) -> Result<String, String> {
    let pool = establish_connection_pool(&app_config.database)
        .map_err(|e| format!("Failed to establish database connection: {e}"))?;
    ensure_schema(&pool).map_err(|e| format!("Failed to prepare database: {e}"))?;

    let storage = DealStorage::with_limits(
        DieselRepository::new(pool),
        StorageLimits::from(&app_config.storage),
    );

    match command {
        Command::Show { caller, period } => {
            let data = get_dashboard_data(
                &storage,
                &caller.user(),
                caller.dashboard,
                &DashboardQuery::new(period),
            );
            serde_json::to_string_pretty(&data).map_err(|e| e.to_string())
        }
        Command::Log { caller, form_path } => {
            let payload = std::fs::read_to_string(&form_path)
                .map_err(|e| format!("Failed to read {}: {e}", form_path.display()))?;
            let form: LogDealForm =
                serde_json::from_str(&payload).map_err(|e| format!("Invalid deal form: {e}"))?;
            let limiter = RateLimiter::from(&app_config.rate_limit);
            let deal = log_deal(&storage, &limiter, &caller.user(), caller.dashboard, form)
                .map_err(|e| format!("Failed to log deal: {e}"))?;
            serde_json::to_string_pretty(&deal).map_err(|e| e.to_string())
        }
    }
}

fn main() -> ExitCode {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let app_config = match load_config() {
        Ok(app_config) => app_config,
        Err(err) => {
            log::error!("Error loading settings: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &app_config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}
