//! SkyCast command-line front end.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpassword::prompt_password;
use skycast::{render, App};
use skycast_core::{Config, Notifier, TracingNotifier};
use skycast_services::{LoginCredentials, RegisterCredentials};

/// SkyCast CLI
#[derive(Parser)]
#[command(name = "skycast")]
#[command(about = "Current weather, forecasts and favorite locations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current conditions and the forecast
    Weather {
        /// Place to search; defaults to the last search, then your position
        location: Option<String>,

        /// Use the device position instead of a place name
        #[arg(long, conflicts_with = "location")]
        here: bool,
    },
    /// Show only the forecast for a place
    Forecast {
        location: Option<String>,
    },
    /// Sign in to the SkyCast backend
    Login {
        username: String,

        /// Prompted for without echo when omitted
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,

        /// Prompted for without echo when omitted
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Forget the signed-in user
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage favorite locations
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// List recent searches
    Recent,
}

#[derive(Subcommand)]
enum SavedAction {
    /// List favorite locations
    List,
    /// Save the location of the last search
    Add,
    /// Remove a favorite by id
    Remove { id: i64 },
    /// Show weather for a favorite by id
    Show { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;
    let cli = Cli::parse();

    let (config, _validation) = Config::load_validated().context("Failed to load configuration")?;
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let app = App::new(config, notifier)?;

    run(&app, cli.command).await
}

async fn run(app: &App, command: Commands) -> Result<()> {
    let units = app.config().weather.units;

    match command {
        Commands::Weather { location, here } => {
            let mut dashboard = app.dashboard();
            if here {
                app.weather().get_user_location().await?;
            } else if let Some(location) = location {
                dashboard.search(&location).await?;
            } else {
                dashboard.start().await?;
            }

            let state = app.weather().state();
            if let Some(current) = &state.current_weather {
                println!("{}", render::current_weather(current, units));
            }
            if let Some(forecast) = &state.forecast {
                println!("\n{}", render::forecast(forecast, units));
            }
            if let Some(alert) = dashboard.thunderstorm_alert() {
                println!("\n⚠ Thunderstorm Alert: {}", alert);
            }
        }
        Commands::Forecast { location } => {
            let location = location
                .or_else(|| app.dashboard().last_location())
                .unwrap_or_else(|| app.config().weather.default_location.clone());
            let forecast = app
                .weather()
                .fetch_forecast(&skycast_weather::LocationQuery::name(location.trim()))
                .await?;
            println!("{}", render::forecast(&forecast.list, units));
        }
        Commands::Login { username, password } => {
            let password = password_or_prompt(password, "Password: ")?;
            let user = app
                .auth()
                .login(&LoginCredentials { username, password })
                .await?;
            println!("Signed in as {}", user.display_name());
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let (password, confirm_password) = match password {
                Some(password) => (password.clone(), password),
                None => (
                    password_or_prompt(None, "Password: ")?,
                    password_or_prompt(None, "Confirm password: ")?,
                ),
            };
            let user = app
                .auth()
                .register(&RegisterCredentials {
                    username,
                    email,
                    password,
                    confirm_password,
                })
                .await?;
            println!("Welcome, {}", user.display_name());
        }
        Commands::Logout => app.auth().logout(),
        Commands::Whoami => match app.auth().current_user() {
            Some(user) => println!("{} <{}>", user.display_name(), user.email),
            None => println!("Not signed in"),
        },
        Commands::Saved { action } => saved(app, action).await?,
        Commands::Recent => {
            let dashboard = app.dashboard();
            if dashboard.recent_searches().is_empty() {
                println!("No recent searches");
            }
            for query in dashboard.recent_searches() {
                println!("{}", query);
            }
        }
    }

    Ok(())
}

async fn saved(app: &App, action: SavedAction) -> Result<()> {
    let units = app.config().weather.units;

    match action {
        SavedAction::List => {
            let locations = app.weather().fetch_saved_locations().await;
            println!("{}", render::saved_locations(&locations));
        }
        SavedAction::Add => {
            let dashboard = app.dashboard();
            app.weather().fetch_saved_locations().await;
            let last = dashboard
                .last_location()
                .context("Search for a location before saving it")?;
            dashboard.load_location(&last).await?;
            let saved = dashboard.save_current_location().await?;
            println!("Saved {} (id {})", saved.name, saved.id);
        }
        SavedAction::Remove { id } => {
            app.weather().fetch_saved_locations().await;
            app.weather().remove_saved_location(id).await?;
        }
        SavedAction::Show { id } => {
            let locations = app.weather().fetch_saved_locations().await;
            let location = locations
                .iter()
                .find(|loc| loc.id == id)
                .with_context(|| format!("No saved location with id {}", id))?;

            let dashboard = app.dashboard();
            let (current, forecast) = dashboard.select_saved_location(location).await?;
            println!("{}", render::current_weather(&current, units));
            println!("\n{}", render::forecast(&forecast.list, units));
        }
    }

    Ok(())
}

fn password_or_prompt(password: Option<String>, prompt: &str) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt_password(prompt).context("Failed to read password"),
    }
}
