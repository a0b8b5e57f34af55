use std::sync::Arc;

use chargebnb_core::{AppConfig, Coordinate, Identity};
use chargebnb_discovery::{
    DiscoveryPipeline, FixedLocation, LocationProvider, MapLibrary, NoLocation, StationsClient,
    ViewScope,
};
use chargebnb_session::{Gated, SessionHandle, LOGIN_REQUIRED_MESSAGE};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chargebnb")]
#[command(about = "ChargeBnB station discovery client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show charging stations near a position (requires a signed-in user).
    Discover {
        /// Device latitude; without `--lat`/`--lng` the device has no location capability.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Sign in as this user before opening the view.
        #[arg(long, env = "CHARGEBNB_USER")]
        user: Option<String>,
        #[arg(long, requires = "user")]
        email: Option<String>,
    },
    /// Check that the backend is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = chargebnb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "configuration loaded");

    let cli = Cli::parse();
    match cli.command {
        Commands::Discover {
            lat,
            lng,
            user,
            email,
        } => {
            let session = SessionHandle::new();
            if let Some(name) = user {
                let identity = match email {
                    Some(email) => Identity::new(name).with_email(email),
                    None => Identity::new(name),
                };
                session.login(identity);
            }

            let position = lat.zip(lng).map(|(lat, lng)| Coordinate::new(lat, lng));
            let rendered = match position {
                Some(at) => discover(&config, &session, FixedLocation(at)).await?,
                None => discover(&config, &session, NoLocation).await?,
            };
            println!("{rendered}");
        }
        Commands::Health => {
            let client = StationsClient::from_config(&config)?;
            let health = client.health().await?;
            println!("{}: {}", health.status, health.message);
        }
    }

    Ok(())
}

/// Renders the discovery page behind the login gate.
async fn discover<P: LocationProvider>(
    config: &AppConfig,
    session: &SessionHandle,
    location: P,
) -> anyhow::Result<String> {
    let stations = StationsClient::from_config(config)?;
    let maps = Arc::new(MapLibrary::from_config(config)?);
    let pipeline = DiscoveryPipeline::new(location, stations, maps, config.map_zoom);

    match session.require_identity(pipeline) {
        Gated::Allowed(mut pipeline) => {
            let scope = ViewScope::new();
            pipeline.run(&scope.token()).await;
            Ok(pipeline.view().to_string())
        }
        Gated::LoginRequired => {
            tracing::info!("discovery requested without a signed-in user");
            Ok(LOGIN_REQUIRED_MESSAGE.to_string())
        }
    }
}
