// Object commands

use takegrant::{Access, ObjectId, System};
use takegrant_store::Store;

use crate::commands::auth::AuthArgs;
use crate::commands::output::{print_objects, warn_unaudited};

pub async fn create<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    name: &str,
    content: &str,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.create_object(session.as_ref(), name, content).await?;
    warn_unaudited(&audited);
    let object = audited.value;
    println!(
        "Object '{}' (id={}) created with owner rights.",
        object.name, object.id
    );
    Ok(())
}

pub async fn list<S: Store>(system: &System<S>, auth: &AuthArgs) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.list_objects(session.as_ref()).await?;
    warn_unaudited(&audited);
    if audited.value.is_empty() {
        println!("No objects.");
    } else {
        print_objects(&audited.value, false);
    }
    Ok(())
}

pub async fn read<S: Store>(system: &System<S>, auth: &AuthArgs, id: ObjectId) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.read_object(session.as_ref(), id).await?;
    warn_unaudited(&audited);
    match audited.value {
        Access::Granted(object) => {
            println!("Object: {} (owner_id={})", object.name, object.owner);
            println!("Content: {}", object.content);
        }
        Access::Denied => println!("Read denied or you must login first."),
    }
    Ok(())
}

pub async fn write<S: Store>(
    system: &System<S>,
    auth: &AuthArgs,
    id: ObjectId,
    content: &str,
) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.write_object(session.as_ref(), id, content).await?;
    warn_unaudited(&audited);
    match audited.value {
        Access::Granted(()) => println!("Object id={} updated.", id),
        Access::Denied => println!("Write denied or you must login first."),
    }
    Ok(())
}

pub async fn delete<S: Store>(system: &System<S>, auth: &AuthArgs, id: ObjectId) -> anyhow::Result<()> {
    let session = auth.session(system).await?;
    let audited = system.delete_object(session.as_ref(), id).await?;
    warn_unaudited(&audited);
    match audited.value {
        Access::Granted(()) => println!("Object id={} and related rights deleted.", id),
        Access::Denied => println!("Delete denied or you must login first."),
    }
    Ok(())
}
