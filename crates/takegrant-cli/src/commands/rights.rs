// Rights commands

use takegrant::{Decision, ObjectId, PrincipalId, RightKind, System};
use takegrant_store::Store;

use crate::commands::auth::AuthArgs;
use crate::commands::output::warn_unaudited;

pub async fn grant<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    grantee: PrincipalId,
    object: ObjectId,
    right: &str,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system
        .grant_named(session.as_ref(), grantee, object, right)
        .await?;
    warn_unaudited(&audited);
    match audited.value {
        Decision::Applied => println!("Granted '{}' on object {} to user {}", right, object, grantee),
        Decision::AlreadyHeld => println!("User {} already has this right.", grantee),
        Decision::Denied(denial) => println!("Grant refused: {}", denial),
    }
    Ok(())
}

pub async fn take<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    target: PrincipalId,
    object: ObjectId,
    right: &str,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system
        .take_named(session.as_ref(), target, object, right)
        .await?;
    warn_unaudited(&audited);
    match audited.value {
        Decision::Applied => println!("Took '{}' on object {} from user {}", right, object, target),
        Decision::AlreadyHeld => println!("You already have this right."),
        Decision::Denied(denial) => println!("Take refused: {}", denial),
    }
    Ok(())
}

pub async fn check<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    object: ObjectId,
    kind: RightKind,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.check(session.as_ref(), object, kind).await?;
    warn_unaudited(&audited);
    let verdict = if audited.value { "granted" } else { "denied" };
    println!("Access {}: '{}' on object {}", verdict, kind, object);
    Ok(())
}
