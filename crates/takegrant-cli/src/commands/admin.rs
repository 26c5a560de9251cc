// Administrative commands

use takegrant::{PrincipalId, System};
use takegrant_store::Store;

use crate::commands::auth::AuthArgs;
use crate::commands::output::{print_audit, print_users, warn_unaudited};

pub async fn list_users<S: Store>(system: &System<S>, auth: &AuthArgs) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.list_users(session.as_ref()).await?;
    warn_unaudited(&audited);
    print_users(&audited.value);
    Ok(())
}

pub async fn delete_user<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    id: PrincipalId,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.delete_user(session.as_ref(), id).await?;
    warn_unaudited(&audited);
    println!("User {} deleted.", id);
    Ok(())
}

pub async fn make_admin<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    id: PrincipalId,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.make_admin(session.as_ref(), id).await?;
    warn_unaudited(&audited);
    println!("User {} is now admin.", id);
    Ok(())
}

pub async fn show_audit<S: Store>(system: &System<S>, limit: Option<usize>) -> anyhow::Result<()> {
    let records = system.show_audit(limit).await?;
    print_audit(&records);
    Ok(())
}
