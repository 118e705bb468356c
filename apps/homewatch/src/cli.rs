use clap::{Args, Parser, Subcommand, ValueEnum};
use chrono::NaiveDate;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "homewatch", version, about = "Home climate and router traffic monitoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one poll cycle and append to the matching log.
    #[command(subcommand)]
    Poll(PollCommand),
    #[command(subcommand)]
    Token(TokenCommand),
    #[command(subcommand)]
    Dashboard(DashboardCommand),
}

#[derive(Subcommand)]
pub enum PollCommand {
    /// Thermostat home status.
    Climate,
    /// Legacy weather station.
    Station,
    /// Router WAN counters over SNMP.
    Traffic,
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Store a refresh token obtained out of band.
    Seed(SeedArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TokenTarget {
    Climate,
    Station,
}

#[derive(Args)]
pub struct SeedArgs {
    #[arg(long)]
    pub refresh_token: String,
    #[arg(long)]
    pub access_token: Option<String>,
    #[arg(long, value_enum, default_value_t = TokenTarget::Climate)]
    pub target: TokenTarget,
}

#[derive(Subcommand)]
pub enum DashboardCommand {
    /// Write the dashboard page to a directory.
    Render(RenderArgs),
    /// Serve the dashboard over HTTP.
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    #[arg(long)]
    pub hours_back: Option<u32>,
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    #[arg(long)]
    pub end_hour: Option<u32>,
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<String>,
}
