use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use backoffice_api::{
    auth::{AuthConfig, AuthService, MASTER_ADMIN},
    config::{self, AppConfig},
    db::{self, DbConfig},
    openapi::ApiDoc,
    services::users::{UserInput, UserService},
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(
    name = "backoffice-cli",
    about = "Administrative commands for the back-office API",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a master admin account
    CreateAdmin(CreateAdminArgs),
    /// Check credentials and print a bearer token
    Login(LoginArgs),
    /// Print the OpenAPI document
    Openapi,
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long, env = "BACKOFFICE_ADMIN_USERNAME")]
    username: String,
    #[arg(long, env = "BACKOFFICE_ADMIN_EMAIL")]
    email: String,
    #[arg(long, env = "BACKOFFICE_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
struct LoginArgs {
    /// Username or email
    #[arg(long)]
    login: String,
    #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminCreated {
    id: String,
    username: String,
    role: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Openapi => {
            let doc = ApiDoc::openapi()
                .to_pretty_json()
                .context("failed to render OpenAPI document")?;
            println!("{doc}");
            return Ok(());
        }
        other => other,
    };

    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    let pool = connect(&cfg).await?;

    match command {
        Commands::Migrate => {
            db::run_migrations(&pool)
                .await
                .context("failed running migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateAdmin(args) => create_admin(pool, args, cli.json).await?,
        Commands::Login(args) => login(&cfg, pool, args, cli.json).await?,
        Commands::Openapi => {}
    }

    Ok(())
}

async fn connect(cfg: &AppConfig) -> Result<Arc<db::DbPool>> {
    let pool = db::establish_connection_with_config(&DbConfig::from(cfg))
        .await
        .context("failed to connect to the database")?;
    Ok(Arc::new(pool))
}

async fn create_admin(pool: Arc<db::DbPool>, args: CreateAdminArgs, json: bool) -> Result<()> {
    let users = UserService::new(pool);

    let created = users
        .create(UserInput {
            username: Some(args.username),
            email: Some(args.email),
            password: Some(args.password),
            role: Some(MASTER_ADMIN.to_string()),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow!("failed to create admin: {e}"))?;

    let summary = AdminCreated {
        id: created.id.to_string(),
        username: created.username,
        role: created.role,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Created {} '{}' (id {})", summary.role, summary.username, summary.id);
    }
    Ok(())
}

async fn login(cfg: &AppConfig, pool: Arc<db::DbPool>, args: LoginArgs, json: bool) -> Result<()> {
    let auth = AuthService::new(AuthConfig::from(cfg), pool);
    let response = auth
        .login(&args.login, &args.password)
        .await
        .map_err(|e| anyhow!("login failed: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.token.token);
    }
    Ok(())
}
