mod pages;
mod prompt;
mod theme;

use crate::pages::App;
use crate::theme::Theme;
use clap::{Parser, Subcommand};
use tracing::Level;
use userdir_lib::{ApiConfig, HttpClient, UserId};

#[derive(Parser)]
#[command(name = "userdir")]
#[command(about = "User and profile directory", long_about = None)]
struct Cli {
    /// API origin, overrides APP_URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Browse the directory interactively")]
    Browse,
    #[command(about = "Print the directory")]
    List,
    #[command(about = "Create a user")]
    CreateUser,
    #[command(about = "Edit a user")]
    EditUser { id: UserId },
    #[command(about = "Delete a user after confirmation")]
    DeleteUser { id: UserId },
    #[command(about = "Show a user's profile")]
    Profile { user_id: UserId },
    #[command(about = "Create a profile for a user")]
    CreateProfile { user_id: UserId },
    #[command(about = "Edit a user's profile")]
    EditProfile { user_id: UserId },
    #[command(about = "Delete a user's profile after confirmation")]
    DeleteProfile { user_id: UserId },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let collector = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(collector)?;

    let mut config = ApiConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_base_url(url)?;
    }
    let client = HttpClient::new(&config)?;
    tracing::info!(api = client.base_url(), "using directory service");

    let rt = tokio::runtime::Runtime::new()?;
    let mut app = App::new(client, Theme::default());

    rt.block_on(async move {
        match cli.command.unwrap_or(Commands::Browse) {
            Commands::Browse => app.browse().await,
            Commands::List => app.list().await,
            Commands::CreateUser => app.create_user().await,
            Commands::EditUser { id } => app.edit_user(id).await,
            Commands::DeleteUser { id } => app.delete_user(id).await,
            Commands::Profile { user_id } => app.profile(user_id).await,
            Commands::CreateProfile { user_id } => app.create_profile(user_id).await,
            Commands::EditProfile { user_id } => app.edit_profile(user_id).await,
            Commands::DeleteProfile { user_id } => app.delete_profile(user_id).await,
        }
    })
}
