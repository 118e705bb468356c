mod cli;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use homewatch::config::Config;
use homewatch::dashboard::server::{self, WindowQuery};
use homewatch::dashboard::{render_page, DashboardData};
use homewatch::error::exit_status;
use homewatch::pollers::climate::ClimatePoller;
use homewatch::pollers::station::StationPoller;
use homewatch::pollers::traffic::TrafficPoller;
use homewatch::pollers::http_client;
use homewatch::snmp_source::SnmpRouter;
use homewatch::tokens::TokenManager;

use crate::cli::{
    Cli, Commands, DashboardCommand, PollCommand, RenderArgs, SeedArgs, TokenCommand, TokenTarget,
};

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,homewatch=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialise logging: {err:#}");
    }
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "homewatch failed");
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env()?;
    match cli.command {
        Commands::Poll(PollCommand::Climate) => {
            ClimatePoller::from_config(&config)?.run_once(Utc::now())?;
        }
        Commands::Poll(PollCommand::Station) => {
            StationPoller::from_config(&config)?.run_once()?;
        }
        Commands::Poll(PollCommand::Traffic) => {
            let router = SnmpRouter::from_config(&config.snmp)?;
            TrafficPoller::new(router, &config).run_once(Utc::now())?;
        }
        Commands::Token(TokenCommand::Seed(args)) => seed_tokens(&config, args)?,
        Commands::Dashboard(DashboardCommand::Render(args)) => render(&config, args)?,
        Commands::Dashboard(DashboardCommand::Serve(args)) => {
            let bind = args.bind.unwrap_or_else(|| config.dashboard.bind.clone());
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(Arc::new(config), &bind))?;
        }
    }
    Ok(())
}

fn seed_tokens(config: &Config, args: SeedArgs) -> Result<()> {
    let path = match args.target {
        TokenTarget::Climate => &config.paths.climate_tokens,
        TokenTarget::Station => &config.paths.station_tokens,
    };
    let (client_id, client_secret) = config.vendor.credentials()?;
    let tokens = TokenManager::new(
        path,
        http_client(config)?,
        config.vendor.token_url(),
        client_id,
        client_secret,
    );
    tokens.seed(&args.refresh_token, args.access_token.as_deref())?;
    tracing::info!(path = %path.display(), "refresh token stored");
    Ok(())
}

fn render(config: &Config, args: RenderArgs) -> Result<()> {
    let request = WindowQuery {
        hours_back: args.hours_back,
        end_date: args.end_date,
        end_hour: args.end_hour,
    }
    .into_request(config);
    let data = DashboardData::load(config);
    let page = render_page(config, &data, &request)?;

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let target = args.out.join("index.html");
    std::fs::write(&target, page)
        .with_context(|| format!("failed to write {}", target.display()))?;
    tracing::info!(path = %target.display(), "dashboard rendered");
    Ok(())
}
