//! Command-line front end for the clinic backend.
//!
//! Prints entities as JSON. Credentials come from the identity provider out
//! of band and are passed in with `--token` / `CLINIC_TOKEN`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use clinic_core::{
    ApiError, Appointment, AppointmentParams, ClientConfig, Doctor, DoctorParams,
    PaginationParams, Patient, PatientParams, ReqwestTransport, ResourceClient, Session, Task,
    TaskParams,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

type Client = ResourceClient<ReqwestTransport>;

#[derive(Parser)]
#[command(name = "clinic", version, about = "Browse and edit clinic records")]
struct Cli {
    /// Base URL of the clinic REST API.
    #[arg(long, env = "CLINIC_API_URL")]
    api_url: String,

    /// Bearer token issued by the identity provider.
    #[arg(long, env = "CLINIC_TOKEN", hide_env_values = true)]
    token: String,

    /// Maximum concurrent record fetches per list page.
    #[arg(
        long,
        env = "CLINIC_MAX_IN_FLIGHT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    max_in_flight: Option<u64>,

    /// Per-request timeout in seconds.
    #[arg(
        long,
        env = "CLINIC_REQUEST_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(subcommand)]
    Tasks(TaskCommand),
    #[command(subcommand)]
    Patients(PatientCommand),
    #[command(subcommand)]
    Doctors(DoctorCommand),
    #[command(subcommand)]
    Appointments(AppointmentCommand),
}

#[derive(Args)]
struct PageArgs {
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 20)]
    page_size: u64,
}

impl PageArgs {
    fn pagination(&self) -> PaginationParams {
        PaginationParams::page(self.page, self.page_size)
    }
}

#[derive(Subcommand)]
enum TaskCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        patient_id: Option<u64>,
        #[arg(long)]
        complete: Option<bool>,
    },
    Get {
        id: u64,
    },
    /// Every task of one patient, unpaged.
    ForPatient {
        patient_id: u64,
    },
    /// Mark a task as done.
    Complete {
        id: u64,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
enum PatientCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        search: Option<String>,
    },
    Get {
        id: u64,
    },
}

#[derive(Subcommand)]
enum DoctorCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        search: Option<String>,
    },
    Get {
        id: u64,
    },
}

#[derive(Subcommand)]
enum AppointmentCommand {
    List {
        #[command(flatten)]
        page: PageArgs,
        /// Only appointments on this day (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        patient_id: Option<u64>,
        #[arg(long)]
        doctor_id: Option<u64>,
    },
    Get {
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(&cli.api_url).context("invalid API URL")?;
    config.max_in_flight = cli
        .max_in_flight
        .map(usize::try_from)
        .transpose()
        .context("--max-in-flight does not fit this platform")?;
    config.request_timeout = cli.timeout_secs.map(Duration::from_secs);

    let transport = ReqwestTransport::new(config.request_timeout)?;
    let client = ResourceClient::from_config(&config, transport);
    let session = Session::new(cli.token);

    let outcome = match cli.command {
        Command::Tasks(command) => tasks(&client, &session, command).await,
        Command::Patients(command) => patients(&client, &session, command).await,
        Command::Doctors(command) => doctors(&client, &session, command).await,
        Command::Appointments(command) => appointments(&client, &session, command).await,
    };

    if let Err(err) = &outcome {
        if err.is_auth_failure() {
            tracing::error!("session rejected by the server; sign in again to obtain a fresh token");
        }
    }
    outcome?;
    Ok(())
}

fn print<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::local(format!("failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

async fn tasks(client: &Client, session: &Session, command: TaskCommand) -> Result<(), ApiError> {
    match command {
        TaskCommand::List {
            page,
            search,
            patient_id,
            complete,
        } => {
            let params = TaskParams {
                pagination: page.pagination(),
                patient_id,
                search,
                complete,
            };
            print(&Task::get(client, &params, session).await?)
        }
        TaskCommand::Get { id } => print(&Task::get_by_id(client, id, session).await?),
        TaskCommand::ForPatient { patient_id } => {
            print(&Task::get_by_patient_id(client, patient_id, session).await?)
        }
        TaskCommand::Complete { id } => {
            let mut task = Task::get_by_id(client, id, session).await?;
            task.complete = true;
            task.update(client, session).await?;
            print(&task)
        }
        TaskCommand::Delete { id } => {
            let task = Task::get_by_id(client, id, session).await?;
            task.delete(client, session).await?;
            tracing::info!(id, "task deleted");
            Ok(())
        }
    }
}

async fn patients(client: &Client, session: &Session, command: PatientCommand) -> Result<(), ApiError> {
    match command {
        PatientCommand::List { page, search } => {
            let params = PatientParams {
                pagination: page.pagination(),
                search,
            };
            print(&Patient::get(client, &params, session).await?)
        }
        PatientCommand::Get { id } => print(&Patient::get_by_id(client, id, session).await?),
    }
}

async fn doctors(client: &Client, session: &Session, command: DoctorCommand) -> Result<(), ApiError> {
    match command {
        DoctorCommand::List { page, search } => {
            let params = DoctorParams {
                pagination: page.pagination(),
                search,
            };
            print(&Doctor::get(client, &params, session).await?)
        }
        DoctorCommand::Get { id } => print(&Doctor::get_by_id(client, id, session).await?),
    }
}

async fn appointments(
    client: &Client,
    session: &Session,
    command: AppointmentCommand,
) -> Result<(), ApiError> {
    match command {
        AppointmentCommand::List {
            page,
            date,
            patient_id,
            doctor_id,
        } => {
            let params = AppointmentParams {
                pagination: page.pagination(),
                date,
                patient_id,
                doctor_id,
            };
            print(&Appointment::get(client, &params, session).await?)
        }
        AppointmentCommand::Get { id } => print(&Appointment::get_by_id(client, id, session).await?),
    }
}
