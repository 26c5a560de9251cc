// Identity commands and per-invocation login

use clap::Args;
use takegrant::{Session, System};
use takegrant_store::Store;

use crate::commands::output::warn_unaudited;

/// Credentials for commands that act as a principal.
///
/// Each invocation logs in afresh; without `--user` the command runs
/// anonymously.
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// Username to act as
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, requires = "user")]
    pub password: Option<String>,
}

impl AuthArgs {
    /// Log in if a user was given.
    pub async fn session<S: Store>(&self, system: &System<S>) -> anyhow::Result<Option<Session>> {
        let Some(user) = &self.user else {
            return Ok(None);
        };
        let password = self.password.as_deref().unwrap_or_default();

        let audited = system.login(user, password).await?;
        warn_unaudited(&audited);
        let session = audited.value;
        tracing::debug!(id = %session.id(), user = session.username(), "logged in");
        Ok(Some(session))
    }
}

pub async fn register<S: Store>(system: &System<S>, username: &str, password: &str) -> anyhow::Result<()> {
    let audited = system.register(username, password).await?;
    warn_unaudited(&audited);
    let user = audited.value;
    println!(
        "User '{}' registered successfully. id={} admin={}",
        user.username, user.id, user.is_admin
    );
    Ok(())
}

pub async fn whoami<S: Store>(system: &System<S>, auth: &AuthArgs) -> anyhow::Result<()> {
    let Some(session) = auth.session(system).await? else {
        println!("Not logged in.");
        return Ok(());
    };
    match system.whoami(&session).await? {
        Some(p) => println!("Logged in as: {} (id={}, admin={})", p.username, p.id, p.is_admin),
        None => println!("Principal {} no longer exists.", session.id()),
    }
    let logout = system.logout(session).await;
    warn_unaudited(&logout);
    Ok(())
}
