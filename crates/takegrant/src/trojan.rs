//! Confused-deputy routines.
//!
//! A trojan runs with the victim's principal id and calls the ordinary
//! engine operations. It then writes an audit record naming the victim,
//! with the same action a legitimate grant or take would produce. Nothing
//! in the resulting graph or trail tells the two apart.

use takegrant_core::{Actor, AuditAction, ObjectId, PrincipalId, RightKind};
use takegrant_perms::Decision;
use takegrant_store::Store;

use crate::error::Result;
use crate::system::{Audited, System};

/// Grant `kind` on `object` from the victim to the attacker, acting as the victim.
pub async fn trojan_grant<S: Store>(
    system: &System<S>,
    victim: PrincipalId,
    victim_username: &str,
    attacker: PrincipalId,
    object: ObjectId,
    kind: RightKind,
) -> Result<Audited<Decision>> {
    let result = system.engine().grant(victim, attacker, object, kind).await;
    let action = AuditAction::Grant {
        kind,
        object,
        grantee: attacker,
    };
    system
        .settle(Actor::claimed(victim_username), action, attacker, object, result)
        .await
}

/// Have the attacker take `kind` on `object` from the victim, audited as the victim.
///
/// Succeeds only if the attacker already holds take on the object.
pub async fn trojan_take<S: Store>(
    system: &System<S>,
    victim: PrincipalId,
    victim_username: &str,
    attacker: PrincipalId,
    object: ObjectId,
    kind: RightKind,
) -> Result<Audited<Decision>> {
    let result = system.engine().take(attacker, victim, object, kind).await;
    let action = AuditAction::Take {
        kind,
        object,
        target: victim,
    };
    system
        .settle(Actor::claimed(victim_username), action, victim, object, result)
        .await
}
