//! Proptest generators for property-based testing.
//!
//! Operations address principals by index into a fixed roster so a
//! sequence can be replayed against any store and against the pure
//! [`RightsGraph`] reference model.

use proptest::prelude::*;

use takegrant_core::{ObjectId, PrincipalId, Right, RightKind, RightsGraph};
use takegrant_perms::{Decision, Denial, Engine};
use takegrant_store::Store;

/// Generate a RightKind.
pub fn right_kind() -> impl Strategy<Value = RightKind> {
    prop_oneof![
        Just(RightKind::Read),
        Just(RightKind::Write),
        Just(RightKind::Take),
    ]
}

/// Generate a right kind name, sometimes one that does not exist.
pub fn kind_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => right_kind().prop_map(|k| k.as_str().to_string()),
        1 => "[a-z]{1,8}",
    ]
}

/// One rights mutation, with principals given as roster indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Grant {
        granter: usize,
        grantee: usize,
        kind: RightKind,
    },
    Take {
        taker: usize,
        target: usize,
        kind: RightKind,
    },
}

impl Op {
    /// Apply the rules to the reference model.
    ///
    /// Mirrors the engine: precondition edges must exist, the new edge is
    /// a copy, and an already-held edge is a successful no-op.
    pub fn apply_to_model(
        &self,
        graph: &mut RightsGraph,
        roster: &[PrincipalId],
        object: ObjectId,
    ) -> Decision {
        match *self {
            Op::Grant {
                granter,
                grantee,
                kind,
            } => {
                let source = Right::new(roster[granter], object, kind);
                if !graph.contains(&source) {
                    return Decision::Denied(Denial::Unauthorized);
                }
                inserted(graph.insert_edge(source.copied_to(roster[grantee])))
            }
            Op::Take {
                taker,
                target,
                kind,
            } => {
                if !graph.has_right(roster[taker], object, RightKind::Take) {
                    return Decision::Denied(Denial::Unauthorized);
                }
                let source = Right::new(roster[target], object, kind);
                if !graph.contains(&source) {
                    return Decision::Denied(Denial::RightNotHeld);
                }
                inserted(graph.insert_edge(source.copied_to(roster[taker])))
            }
        }
    }

    /// Apply the operation through the engine.
    pub async fn apply_to_engine<S: Store>(
        &self,
        engine: &Engine<S>,
        roster: &[PrincipalId],
        object: ObjectId,
    ) -> takegrant_perms::Result<Decision> {
        match *self {
            Op::Grant {
                granter,
                grantee,
                kind,
            } => {
                engine
                    .grant(roster[granter], roster[grantee], object, kind)
                    .await
            }
            Op::Take {
                taker,
                target,
                kind,
            } => engine.take(roster[taker], roster[target], object, kind).await,
        }
    }
}

fn inserted(new: bool) -> Decision {
    if new {
        Decision::Applied
    } else {
        Decision::AlreadyHeld
    }
}

/// Generate one operation over a roster of `principals` entries.
pub fn op(principals: usize) -> impl Strategy<Value = Op> {
    let idx = 0..principals;
    prop_oneof![
        (idx.clone(), idx.clone(), right_kind()).prop_map(|(granter, grantee, kind)| Op::Grant {
            granter,
            grantee,
            kind,
        }),
        (idx.clone(), idx, right_kind()).prop_map(|(taker, target, kind)| Op::Take {
            taker,
            target,
            kind,
        }),
    ]
}

/// Generate up to `max_len` operations over a roster of `principals` entries.
pub fn op_sequence(principals: usize, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(principals), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use takegrant_core::has_duplicate_edges;
    use takegrant_store::{Credentials, MemoryStore, NewPrincipal, SqliteStore, Store};

    use crate::fixtures::block_on;

    const ROSTER: usize = 4;

    /// Register `ROSTER` principals and one object owned by the first.
    async fn seed<S: Store>(store: S) -> (Engine<S>, Vec<PrincipalId>, ObjectId) {
        let mut roster = Vec::new();
        for i in 0..ROSTER {
            let p = store
                .insert_principal(&NewPrincipal {
                    username: format!("p{}", i),
                    credentials: Credentials {
                        hash: String::new(),
                    },
                    admin_if_first: false,
                })
                .await
                .unwrap()
                .unwrap();
            roster.push(p.id);
        }
        let engine = Engine::new(Arc::new(store));
        let object = engine
            .create_owned_object(roster[0], "obj", "")
            .await
            .unwrap()
            .unwrap();
        (engine, roster, object.id)
    }

    fn owner_model(roster: &[PrincipalId], object: ObjectId) -> RightsGraph {
        RightsGraph::from_edges(Right::owner_seed(roster[0], object))
    }

    proptest! {
        #[test]
        fn test_memory_store_matches_model(ops in op_sequence(ROSTER, 40)) {
            block_on(async {
                let (engine, roster, object) = seed(MemoryStore::new()).await;
                let mut model = owner_model(&roster, object);

                for op in &ops {
                    let expected = op.apply_to_model(&mut model, &roster, object);
                    let actual = op.apply_to_engine(&engine, &roster, object).await.unwrap();
                    prop_assert_eq!(actual, expected, "{:?}", op);
                }

                let edges = engine.store().all_rights().await.unwrap();
                prop_assert!(!has_duplicate_edges(&edges));
                prop_assert_eq!(edges, model.iter().copied().collect::<Vec<_>>());
                Ok(())
            })?;
        }

        #[test]
        fn test_sqlite_store_matches_model(ops in op_sequence(ROSTER, 25)) {
            block_on(async {
                let (engine, roster, object) = seed(SqliteStore::open_memory().unwrap()).await;
                let mut model = owner_model(&roster, object);

                for op in &ops {
                    let expected = op.apply_to_model(&mut model, &roster, object);
                    let actual = op.apply_to_engine(&engine, &roster, object).await.unwrap();
                    prop_assert_eq!(actual, expected, "{:?}", op);
                }

                let edges = engine.store().all_rights().await.unwrap();
                prop_assert!(!has_duplicate_edges(&edges));
                prop_assert_eq!(edges.len(), model.len());
                Ok(())
            })?;
        }

        #[test]
        fn test_kind_name_parses_or_rejects(name in kind_name()) {
            match name.parse::<RightKind>() {
                Ok(kind) => prop_assert_eq!(kind.as_str(), name.as_str()),
                Err(_) => prop_assert!(!["read", "write", "take"].contains(&name.as_str())),
            }
        }
    }
}
