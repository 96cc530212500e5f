//! In-memory store implementation.

use super::{Connection, ConnectionFactory, ConnectionSettings, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Name of the policy a freshly created database starts with.
pub const AUTOGEN_POLICY: &str = "autogen";

/// Duration of [`AUTOGEN_POLICY`]: keep data forever.
pub const AUTOGEN_DURATION: &str = "0s";

/// An operation performed against an [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// Existence check of a database.
    ExistDb(String),
    /// Creation of a database.
    CreateDb(String),
    /// Lookup of the default policy of a database.
    DefaultRetentionPolicy(String),
    /// Creation of a retention policy.
    SetRetentionPolicy {
        /// Database the policy belongs to.
        database: String,
        /// Policy name.
        name: String,
        /// Duration literal.
        duration: String,
        /// Whether the policy became the default.
        default: bool,
    },
    /// Change of an existing retention policy.
    UpdateRetentionPolicy {
        /// Database the policy belongs to.
        database: String,
        /// Policy name.
        name: String,
        /// Duration literal.
        duration: String,
        /// Whether the policy became the default.
        default: bool,
    },
}

impl StoreCall {
    /// Returns true for calls that change the store.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateDb(_) | Self::SetRetentionPolicy { .. } | Self::UpdateRetentionPolicy { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Policy {
    duration: String,
    default: bool,
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeMap<String, BTreeMap<String, Policy>>,
    calls: Vec<StoreCall>,
}

impl State {
    fn policies(&mut self, database: &str) -> Result<&mut BTreeMap<String, Policy>, StoreError> {
        self.databases
            .get_mut(database)
            .ok_or_else(|| StoreError::Query(format!("database not found: {database}")))
    }
}

fn make_default(policies: &mut BTreeMap<String, Policy>, name: &str) {
    for (policy_name, policy) in policies.iter_mut() {
        policy.default = policy_name == name;
    }
}

/// In-memory store implementation.
///
/// Databases and their retention policies live in a map protected by a
/// `RwLock`, and every operation is recorded so callers can inspect what was
/// done. New databases start with an `autogen` default policy, like
/// `InfluxDB`.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use shared::storage::{Connection, ConnectionFactory, ConnectionSettings, InMemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let settings = ConnectionSettings {
///     host: "localhost".to_string(),
///     port: "8086".to_string(),
///     database: "nmon_reports".to_string(),
///     user: "root".to_string(),
///     password: "root".to_string(),
///     debug: false,
/// };
///
/// let connection = store.connect(&settings).unwrap();
/// connection.create_db("nmon_reports").await.unwrap();
/// assert_eq!(connection.default_retention_policy().await.unwrap(), "autogen");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds database `name` with its `autogen` policy, without recording a
    /// call.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn seed_database(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockError)?;
        state
            .databases
            .entry(name.to_string())
            .or_insert_with(autogen);
        Ok(())
    }

    /// Returns true if database `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn has_database(&self, name: &str) -> Result<bool, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockError)?;
        Ok(state.databases.contains_key(name))
    }

    /// Returns the duration of policy `policy` on `database` and whether it
    /// is the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn policy(&self, database: &str, policy: &str) -> Result<Option<(String, bool)>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockError)?;
        Ok(state
            .databases
            .get(database)
            .and_then(|policies| policies.get(policy))
            .map(|policy| (policy.duration.clone(), policy.default)))
    }

    /// Returns every call performed so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn calls(&self) -> Result<Vec<StoreCall>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockError)?;
        Ok(state.calls.clone())
    }

    /// Forgets the recorded calls, keeping the databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be acquired.
    pub fn clear_calls(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockError)?;
        state.calls.clear();
        Ok(())
    }

    fn with_state<T>(
        &self,
        call: StoreCall,
        op: impl FnOnce(&mut State) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockError)?;
        state.calls.push(call);
        op(&mut state)
    }
}

fn autogen() -> BTreeMap<String, Policy> {
    BTreeMap::from([(
        AUTOGEN_POLICY.to_string(),
        Policy {
            duration: AUTOGEN_DURATION.to_string(),
            default: true,
        },
    )])
}

impl ConnectionFactory for InMemoryStore {
    type Connection = InMemoryConnection;

    fn connect(&self, settings: &ConnectionSettings) -> Result<InMemoryConnection, StoreError> {
        Ok(InMemoryConnection {
            store: self.clone(),
            database: settings.database.clone(),
        })
    }
}

/// Handle on an [`InMemoryStore`] scoped to one database.
#[derive(Debug, Clone)]
pub struct InMemoryConnection {
    store: InMemoryStore,
    database: String,
}

#[async_trait]
impl Connection for InMemoryConnection {
    fn database(&self) -> &str {
        &self.database
    }

    async fn exist_db(&self, name: &str) -> Result<bool, StoreError> {
        self.store
            .with_state(StoreCall::ExistDb(name.to_string()), |state| {
                Ok(state.databases.contains_key(name))
            })
    }

    async fn create_db(&self, name: &str) -> Result<(), StoreError> {
        self.store
            .with_state(StoreCall::CreateDb(name.to_string()), |state| {
                state
                    .databases
                    .entry(name.to_string())
                    .or_insert_with(autogen);
                Ok(())
            })
    }

    async fn default_retention_policy(&self) -> Result<String, StoreError> {
        let database = self.database.clone();
        self.store.with_state(
            StoreCall::DefaultRetentionPolicy(database.clone()),
            |state| {
                state
                    .policies(&database)?
                    .iter()
                    .find(|(_, policy)| policy.default)
                    .map(|(name, _)| name.clone())
                    .ok_or(StoreError::NoDefaultPolicy(database.clone()))
            },
        )
    }

    async fn set_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError> {
        let call = StoreCall::SetRetentionPolicy {
            database: self.database.clone(),
            name: name.to_string(),
            duration: duration.to_string(),
            default,
        };
        self.store.with_state(call, |state| {
            let policies = state.policies(&self.database)?;
            if let Some(existing) = policies.get(name) {
                if existing.duration != duration || existing.default != default {
                    return Err(StoreError::Query("retention policy already exists".to_string()));
                }
                return Ok(());
            }
            policies.insert(
                name.to_string(),
                Policy {
                    duration: duration.to_string(),
                    default: false,
                },
            );
            if default {
                make_default(policies, name);
            }
            Ok(())
        })
    }

    async fn update_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError> {
        let call = StoreCall::UpdateRetentionPolicy {
            database: self.database.clone(),
            name: name.to_string(),
            duration: duration.to_string(),
            default,
        };
        self.store.with_state(call, |state| {
            let policies = state.policies(&self.database)?;
            let policy = policies
                .get_mut(name)
                .ok_or_else(|| StoreError::Query(format!("retention policy not found: {name}")))?;
            policy.duration = duration.to_string();
            if default {
                make_default(policies, name);
            }
            Ok(())
        })
    }
}
