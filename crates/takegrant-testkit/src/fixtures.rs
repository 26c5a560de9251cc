//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::future::Future;

use takegrant::{Object, Principal, Session, System, SystemConfig};
use takegrant_store::{AuditSink, MemoryStore, SqliteStore, Store};

/// Content `file1` is created with.
pub const FILE1_CONTENT: &str = "Initial secret content";

/// The lowest bcrypt cost, so fixtures register users quickly.
pub const TEST_PASSWORD_COST: u32 = 4;

/// In-memory configuration with [`TEST_PASSWORD_COST`].
pub fn test_config() -> SystemConfig {
    SystemConfig {
        password_cost: TEST_PASSWORD_COST,
        ..SystemConfig::default()
    }
}

/// Three registered principals and one object owned by the first.
///
/// `user1` registers first and is therefore the admin. All three are
/// logged in. Only `file1`'s creation is in the graph: user1 holds
/// read, write and take on it, nobody else holds anything.
pub struct Scenario<S: Store> {
    pub system: System<S>,
    pub user1: Principal,
    pub user2: Principal,
    pub attacker: Principal,
    pub user1_session: Session,
    pub user2_session: Session,
    pub attacker_session: Session,
    pub file1: Object,
}

impl Scenario<MemoryStore> {
    /// Scenario over the in-memory store.
    pub async fn memory() -> Self {
        Self::build(MemoryStore::new(), test_config()).await
    }
}

impl Scenario<SqliteStore> {
    /// Scenario over an in-memory SQLite database.
    pub async fn sqlite() -> Self {
        let store = SqliteStore::open_memory().expect("open sqlite");
        Self::build(store, test_config()).await
    }
}

impl<S: Store + AuditSink + 'static> Scenario<S> {
    /// Register the users and create `file1` on `store`.
    pub async fn build(store: S, config: SystemConfig) -> Self {
        let system = System::new(store, config);

        let user1 = register(&system, "user1", "pass1").await;
        let user2 = register(&system, "user2", "pass2").await;
        let attacker = register(&system, "attacker", "evilpass").await;

        let user1_session = login(&system, "user1", "pass1").await;
        let user2_session = login(&system, "user2", "pass2").await;
        let attacker_session = login(&system, "attacker", "evilpass").await;

        let file1 = system
            .create_object(Some(&user1_session), "file1", FILE1_CONTENT)
            .await
            .expect("create file1")
            .value;

        Self {
            system,
            user1,
            user2,
            attacker,
            user1_session,
            user2_session,
            attacker_session,
            file1,
        }
    }
}

/// Register a principal, panicking on failure.
pub async fn register<S: Store>(system: &System<S>, username: &str, password: &str) -> Principal {
    system
        .register(username, password)
        .await
        .expect("register")
        .value
}

/// Log in, panicking on failure.
pub async fn login<S: Store>(system: &System<S>, username: &str, password: &str) -> Session {
    system
        .login(username, password)
        .await
        .expect("login")
        .value
}

/// Run a future to completion on a fresh current-thread runtime.
///
/// For driving async stores from inside synchronous proptest bodies.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build runtime")
        .block_on(future)
}
