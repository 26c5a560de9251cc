// Confused-deputy walk-through against a fresh in-memory database

use std::collections::BTreeMap;

use takegrant::{
    trojan_grant, Access, Audited, Decision, ObjectId, Principal, PrincipalId, RightKind, Session,
    System,
};
use takegrant_store::Store;

use crate::commands::output::{print_audit, print_objects, print_table, print_users, warn_unaudited};

const DEMO_AUDIT_LIMIT: usize = 50;

pub async fn run<S: Store>(system: &System<S>) -> anyhow::Result<()> {
    println!("=== Take-Grant confused deputy demo ===\n");

    let user1 = system.register("user1", "pass1").await?.into_inner();
    let user2 = system.register("user2", "pass2").await?.into_inner();
    let attacker = system.register("attacker", "attackerpass").await?.into_inner();
    println!(
        "Registered {} (admin), {} and {}",
        user1.username, user2.username, attacker.username
    );

    let user1_session = login(system, "user1", "pass1").await?;
    let user2_session = login(system, "user2", "pass2").await?;
    let attacker_session = login(system, "attacker", "attackerpass").await?;

    let file1 = system
        .create_object(Some(&user1_session), "file1", "Initial secret content")
        .await?
        .into_inner();
    println!("user1 created '{}' (id={})\n", file1.name, file1.id);

    snapshot(system, "Initial state").await?;

    step("user1 grants read on file1 to user2");
    report(
        system
            .grant(Some(&user1_session), user2.id, file1.id, RightKind::Read)
            .await?,
    );

    step("user2 checks and reads file1");
    let held = system
        .check(Some(&user2_session), file1.id, RightKind::Read)
        .await?
        .into_inner();
    println!("user2 holds read: {}", held);
    read(system, &user2_session, file1.id).await?;

    step("user1 grants take on file1 to user2");
    report(
        system
            .grant(Some(&user1_session), user2.id, file1.id, RightKind::Take)
            .await?,
    );

    step("user2 takes write on file1 from user1");
    report(
        system
            .take(Some(&user2_session), user1.id, file1.id, RightKind::Write)
            .await?,
    );

    step("user2 writes file1, then reads it back");
    let written = system
        .write_object(Some(&user2_session), file1.id, "Modified by user2")
        .await?;
    warn_unaudited(&written);
    println!("write {}", if written.value.is_granted() { "succeeded" } else { "denied" });
    read(system, &user2_session, file1.id).await?;

    step("attacker tries to read file1 directly");
    read(system, &attacker_session, file1.id).await?;

    step("user1 runs a trojan that grants read on file1 to attacker");
    report(trojan_grant(system, user1.id, &user1.username, attacker.id, file1.id, RightKind::Read).await?);

    step("attacker reads file1");
    read(system, &attacker_session, file1.id).await?;

    snapshot(system, "Final state").await?;

    println!("\nAudit trail (newest first):");
    print_audit(&system.show_audit(Some(DEMO_AUDIT_LIMIT)).await?);
    println!(
        "\nThe trojan's grant is attributed to user1 and looks exactly like a grant user1 made."
    );
    Ok(())
}

async fn login<S: Store>(system: &System<S>, username: &str, password: &str) -> anyhow::Result<Session> {
    let audited = system.login(username, password).await?;
    warn_unaudited(&audited);
    Ok(audited.value)
}

async fn read<S: Store>(system: &System<S>, session: &Session, object: ObjectId) -> anyhow::Result<()> {
    let audited = system.read_object(Some(session), object).await?;
    warn_unaudited(&audited);
    match audited.value {
        Access::Granted(found) => println!("{} reads '{}': {}", session.username(), found.name, found.content),
        Access::Denied => println!("{} was denied read", session.username()),
    }
    Ok(())
}

fn step(title: &str) {
    println!("\n--- {} ---", title);
}

fn report(audited: Audited<Decision>) {
    warn_unaudited(&audited);
    match audited.value {
        Decision::Applied => println!("applied"),
        Decision::AlreadyHeld => println!("already held"),
        Decision::Denied(denial) => println!("refused: {}", denial),
    }
}

/// Print users, objects and the rights graph with names resolved.
async fn snapshot<S: Store>(system: &System<S>, title: &str) -> anyhow::Result<()> {
    let store = system.store();
    let users = store.list_principals().await?;
    let objects = store.list_objects().await?;
    let rights = store.all_rights().await?;

    println!("{}:", title);
    println!("Users:");
    print_users(&users);
    println!("Objects:");
    print_objects(&objects, true);

    let names: BTreeMap<PrincipalId, &str> = users
        .iter()
        .map(|p: &Principal| (p.id, p.username.as_str()))
        .collect();
    let object_names: BTreeMap<ObjectId, &str> =
        objects.iter().map(|o| (o.id, o.name.as_str())).collect();
    let rows: Vec<Vec<String>> = rights
        .iter()
        .map(|r| {
            vec![
                names.get(&r.subject).map_or_else(|| r.subject.to_string(), |n| n.to_string()),
                object_names.get(&r.object).map_or_else(|| r.object.to_string(), |n| n.to_string()),
                r.kind.to_string(),
            ]
        })
        .collect();
    println!("Rights:");
    print_table(&["user", "object", "right"], &rows);
    Ok(())
}
