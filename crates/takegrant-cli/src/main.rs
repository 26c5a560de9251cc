// CLI for scripted use of the rights system and the confused-deputy demo

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use takegrant::{ObjectId, PrincipalId, RightKind, System, SystemConfig};

mod commands {
    pub mod admin;
    pub mod auth;
    pub mod demo;
    pub mod objects;
    pub mod output;
    pub mod rights;
}

use commands::auth::AuthArgs;

#[derive(Parser)]
#[command(name = "takegrant")]
#[command(about = "Take-Grant discretionary access control with an audit trail", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, global = true, default_value = "take_grant.db")]
    db: PathBuf,

    /// Milliseconds to wait for a locked database
    #[arg(long, global = true, default_value = "5000")]
    busy_timeout_ms: u64,

    /// Audit records shown when no limit is given
    #[arg(long, global = true, default_value = "20")]
    audit_limit: usize,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user (the first one becomes admin)
    Register {
        username: String,
        password: String,
    },

    /// Show the logged-in user
    Whoami {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Create an object owned by the logged-in user
    CreateObj {
        name: String,
        content: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// List all objects
    ListObj {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Read an object's content (requires read)
    ReadObj {
        id: ObjectId,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Replace an object's content (requires write)
    WriteObj {
        id: ObjectId,
        content: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Delete an object and its rights (requires write)
    DeleteObj {
        id: ObjectId,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Grant one of your rights on an object to another user
    Grant {
        /// Grantee user id
        to: PrincipalId,
        object: ObjectId,
        /// read, write or take
        right: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Take a right on an object from another user (requires take)
    Take {
        /// User id holding the right
        from: PrincipalId,
        object: ObjectId,
        /// read, write or take
        right: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Check whether you hold a right on an object
    Check {
        object: ObjectId,
        right: RightKind,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Show the most recent audit records
    ShowAudit {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List all users (admin only)
    ListUsers {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Delete a user and the rights it holds (admin only)
    DeleteUser {
        id: PrincipalId,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Make a user an admin (admin only)
    MakeAdmin {
        id: PrincipalId,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Run the confused-deputy walk-through on a fresh in-memory database
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SystemConfig {
        database_path: Some(cli.db.clone()),
        busy_timeout: Duration::from_millis(cli.busy_timeout_ms),
        audit_page_size: cli.audit_limit,
        ..SystemConfig::default()
    };

    if let Commands::Demo = cli.command {
        let system = System::open(SystemConfig::default())?;
        return commands::demo::run(&system).await;
    }

    let system = System::open(config)?;
    match cli.command {
        Commands::Register { username, password } => {
            commands::auth::register(&system, &username, &password).await?;
        }
        Commands::Whoami { auth } => {
            commands::auth::whoami(&system, &auth).await?;
        }
        Commands::CreateObj {
            name,
            content,
            auth,
        } => {
            commands::objects::create(&system, &auth, &name, &content).await?;
        }
        Commands::ListObj { auth } => {
            commands::objects::list(&system, &auth).await?;
        }
        Commands::ReadObj { id, auth } => {
            commands::objects::read(&system, &auth, id).await?;
        }
        Commands::WriteObj { id, content, auth } => {
            commands::objects::write(&system, &auth, id, &content).await?;
        }
        Commands::DeleteObj { id, auth } => {
            commands::objects::delete(&system, &auth, id).await?;
        }
        Commands::Grant {
            to,
            object,
            right,
            auth,
        } => {
            commands::rights::grant(&system, &auth, to, object, &right).await?;
        }
        Commands::Take {
            from,
            object,
            right,
            auth,
        } => {
            commands::rights::take(&system, &auth, from, object, &right).await?;
        }
        Commands::Check {
            object,
            right,
            auth,
        } => {
            commands::rights::check(&system, &auth, object, right).await?;
        }
        Commands::ShowAudit { limit } => {
            commands::admin::show_audit(&system, limit).await?;
        }
        Commands::ListUsers { auth } => {
            commands::admin::list_users(&system, &auth).await?;
        }
        Commands::DeleteUser { id, auth } => {
            commands::admin::delete_user(&system, &auth, id).await?;
        }
        Commands::MakeAdmin { id, auth } => {
            commands::admin::make_admin(&system, &auth, id).await?;
        }
        Commands::Demo => {}
    }

    Ok(())
}
