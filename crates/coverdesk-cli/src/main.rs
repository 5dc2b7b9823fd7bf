mod console;
mod output;

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use coverdesk_client::api::DEFAULT_API_URL;
use coverdesk_client::{ApiClient, SupabaseClient};
use coverdesk_core::auth::{ADMIN_ACCESS_DENIED, login_failure_message};
use coverdesk_core::{
    AppError, AuthBackend, ClientInfoForm, QuoteRequestForm, Session, SessionConfig, SessionGuard,
};

use crate::console::ConsoleExit;

#[derive(Parser)]
#[command(name = "coverdesk", version, about = "Insurance lead intake and admin CLI")]
struct Cli {
    /// Base URL of the Coverdesk API
    #[arg(long, global = true, env = "COVERDESK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Admin credentials. A token skips signing in.
#[derive(Args)]
struct Credentials {
    /// Admin email
    #[arg(long, env = "COVERDESK_EMAIL")]
    email: Option<String>,

    /// Admin password
    #[arg(long, env = "COVERDESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Access token printed by `coverdesk login --print-token`
    #[arg(long, env = "COVERDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum SubmissionKind {
    Quotes,
    Clients,
}

#[derive(Subcommand)]
enum Commands {
    /// Check admin credentials against the auth backend
    Login {
        #[command(flatten)]
        credentials: Credentials,

        /// Print the access token for use with COVERDESK_TOKEN
        #[arg(long, default_value_t = false)]
        print_token: bool,
    },

    /// Check that the API and its store are reachable
    Health,

    /// List submitted forms
    Submissions {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Only one collection (required for csv)
        #[arg(short, long, value_enum)]
        kind: Option<SubmissionKind>,
    },

    /// Delete a client submission
    DeleteClient {
        #[command(flatten)]
        credentials: Credentials,

        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },

    /// Delete a quote request
    DeleteQuote {
        #[command(flatten)]
        credentials: Credentials,

        id: Uuid,

        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },

    /// Show pipeline statistics
    Dashboard {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Submit the public quote request form
    SubmitQuote {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// health, auto, life, property or business
        #[arg(long)]
        insurance_type: String,
        #[arg(long)]
        coverage_amount: Option<String>,
        #[arg(long)]
        additional_info: Option<String>,
    },

    /// Submit the public client information form
    SubmitClient {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip_code: String,
    },

    /// Interactive admin session with automatic sign-out after inactivity
    Console {
        #[command(flatten)]
        credentials: Credentials,

        /// Minutes without input before signing out
        #[arg(long, env = "COVERDESK_INACTIVITY_MINUTES", default_value_t = 30)]
        inactivity_minutes: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("coverdesk=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Login {
            credentials,
            print_token,
        } => cmd_login(&credentials, print_token).await?,
        Commands::Health => cmd_health(&api).await?,
        Commands::Submissions {
            credentials,
            format,
            kind,
        } => {
            let api = authorize(api, &credentials).await?;
            cmd_submissions(&api, format, kind).await?;
        }
        Commands::DeleteClient {
            credentials,
            id,
            yes,
        } => {
            if yes || confirm(&format!("Delete client submission {id}?"))? {
                let api = authorize(api, &credentials).await?;
                api.delete_client_submission(id).await?;
                println!("Client submission {id} deleted.");
            }
        }
        Commands::DeleteQuote {
            credentials,
            id,
            yes,
        } => {
            if yes || confirm(&format!("Delete quote request {id}?"))? {
                let api = authorize(api, &credentials).await?;
                api.delete_quote_request(id).await?;
                println!("Quote request {id} deleted.");
            }
        }
        Commands::Dashboard { credentials, json } => {
            let api = authorize(api, &credentials).await?;
            let stats = api.dashboard().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", output::dashboard(&stats));
            }
        }
        Commands::SubmitQuote {
            full_name,
            email,
            phone,
            insurance_type,
            coverage_amount,
            additional_info,
        } => {
            let form = QuoteRequestForm {
                full_name,
                email,
                phone,
                insurance_type,
                coverage_amount,
                additional_info,
            };
            let stored = api.submit_quote_request(&form).await.map_err(form_error)?;
            println!("Quote request submitted: {}", stored.id);
        }
        Commands::SubmitClient {
            first_name,
            last_name,
            email,
            phone,
            date_of_birth,
            address,
            city,
            state,
            zip_code,
        } => {
            let form = ClientInfoForm {
                first_name,
                last_name,
                email,
                phone,
                date_of_birth,
                address,
                city,
                state,
                zip_code,
            };
            let stored = api.submit_client_info(&form).await.map_err(form_error)?;
            println!("Client information submitted: {}", stored.id);
        }
        Commands::Console {
            credentials,
            inactivity_minutes,
        } => cmd_console(&api, &credentials, inactivity_minutes).await?,
    }

    Ok(())
}

/// Signs in and requires the admin role. Non-admins are signed out again
/// before the error is returned.
async fn sign_in_admin<B: AuthBackend>(backend: &B, email: &str, password: &str) -> Result<Session> {
    let session = match backend.sign_in_with_password(email, password).await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!(error = %e, "Sign-in failed");
            bail!(login_failure_message(&e));
        }
    };

    if !session.user.is_admin() {
        if let Err(e) = backend.sign_out().await {
            tracing::warn!(error = %e, "Failed to sign out non-admin user");
        }
        bail!(ADMIN_ACCESS_DENIED);
    }

    Ok(session)
}

fn require_credentials(credentials: &Credentials) -> Result<(&str, &str)> {
    let email = credentials
        .email
        .as_deref()
        .context("COVERDESK_EMAIL not set. Required to sign in.")?;
    let password = credentials
        .password
        .as_deref()
        .context("COVERDESK_PASSWORD not set. Required to sign in.")?;
    Ok((email, password))
}

/// Attaches an admin access token to `api`, signing in when no token was given.
async fn authorize(api: ApiClient, credentials: &Credentials) -> Result<ApiClient> {
    if let Some(token) = &credentials.token {
        return Ok(api.with_token(token.clone()));
    }

    let (email, password) = require_credentials(credentials)?;
    let backend = SupabaseClient::from_env()?;
    let session = sign_in_admin(&backend, email, password).await?;
    Ok(api.with_token(session.access_token))
}

/// Keeps the server's per-field messages visible on the terminal.
fn form_error(error: AppError) -> anyhow::Error {
    match error {
        AppError::ValidationError { message, fields } => {
            let details: Vec<String> = fields
                .iter()
                .map(|f| format!("  {}: {}", f.field, f.message))
                .collect();
            anyhow::anyhow!("{message}\n{}", details.join("\n"))
        }
        other => other.into(),
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn cmd_login(credentials: &Credentials, print_token: bool) -> Result<()> {
    let (email, password) = require_credentials(credentials)?;
    let backend = SupabaseClient::from_env()?;
    let session = sign_in_admin(&backend, email, password).await?;

    if print_token {
        println!("{}", session.access_token);
    } else {
        println!(
            "Signed in as {} (admin)",
            session.user.email.as_deref().unwrap_or(email)
        );
    }
    Ok(())
}

async fn cmd_health(api: &ApiClient) -> Result<()> {
    let report = api.health().await?;
    println!("API: {}  store: {}", report.status, report.store);
    if !report.is_healthy() {
        bail!("API is unhealthy");
    }
    Ok(())
}

async fn cmd_submissions(
    api: &ApiClient,
    format: OutputFormat,
    kind: Option<SubmissionKind>,
) -> Result<()> {
    let submissions = api.submissions().await?;
    let now = Utc::now();

    match (format, kind) {
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&submissions)?);
        }
        (OutputFormat::Json, Some(SubmissionKind::Quotes)) => {
            println!("{}", serde_json::to_string_pretty(&submissions.quote_requests)?);
        }
        (OutputFormat::Json, Some(SubmissionKind::Clients)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&submissions.client_submissions)?
            );
        }
        (OutputFormat::Table, None) => print!("{}", output::submissions_table(&submissions, now)),
        (OutputFormat::Table, Some(SubmissionKind::Quotes)) => {
            print!("{}", output::quote_requests_table(&submissions.quote_requests, now));
        }
        (OutputFormat::Table, Some(SubmissionKind::Clients)) => {
            print!(
                "{}",
                output::client_submissions_table(&submissions.client_submissions, now)
            );
        }
        (OutputFormat::Csv, Some(SubmissionKind::Quotes)) => {
            output::write_quote_requests_csv(std::io::stdout(), &submissions.quote_requests)?;
        }
        (OutputFormat::Csv, Some(SubmissionKind::Clients)) => {
            output::write_client_submissions_csv(
                std::io::stdout(),
                &submissions.client_submissions,
            )?;
        }
        (OutputFormat::Csv, None) => bail!("--format csv needs --kind quotes or --kind clients"),
    }
    Ok(())
}

/// Longest idle period the console accepts: one week.
const MAX_INACTIVITY_MINUTES: u64 = 7 * 24 * 60;

fn inactivity_timeout(minutes: u64) -> Result<Duration> {
    if minutes == 0 || minutes > MAX_INACTIVITY_MINUTES {
        bail!(
            "Invalid COVERDESK_INACTIVITY_MINUTES '{minutes}': must be between 1 and {MAX_INACTIVITY_MINUTES}"
        );
    }
    Ok(Duration::from_secs(minutes * 60))
}

async fn cmd_console(
    api: &ApiClient,
    credentials: &Credentials,
    inactivity_minutes: u64,
) -> Result<()> {
    let timeout = inactivity_timeout(inactivity_minutes)?;
    let (email, password) = require_credentials(credentials)?;

    let backend = SupabaseClient::from_env()?;
    let config = SessionConfig::default().with_timeout(timeout);
    let guard = SessionGuard::mount(backend, config).await;

    let session = sign_in_admin(guard.backend(), email, password).await?;
    println!(
        "Signed in as {}. Idle sessions end after {inactivity_minutes} minutes.",
        session.user.email.as_deref().unwrap_or(email)
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let exit = console::run(&guard, api, stdin, &mut std::io::stdout()).await;
    guard.unmount().await;

    match exit? {
        ConsoleExit::Inactivity => bail!("Session ended due to inactivity"),
        ConsoleExit::SessionEnded => bail!("Session ended by the auth backend"),
        ConsoleExit::Quit | ConsoleExit::LoggedOut | ConsoleExit::EndOfInput => Ok(()),
    }
}
