//! Creating tenant databases.
//!
//! `create_tenant_database` validates the tenant type, renders the type's
//! schema template for the tenant's database, posts it to the administrative
//! endpoint, and records the outcome on the control tenant.
//!
//! Concurrent calls for the same tenant in one process share a single
//! attempt, the same way connection attempts are shared. Separate processes
//! are not coordinated, so templates must stay safe to re-apply.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tenantry_core::{
    AdminExecutor, ConnectionManager, SetupPatch, TenantError, TenantKey, TenantResult,
    TenantType,
};
use tracing::{debug, error, info, warn};

use crate::probe::DatabaseProbe;
use crate::template::TemplateStore;
use crate::tracker::SetupTracker;

type ProvisionAttempt = Shared<BoxFuture<'static, TenantResult<()>>>;

#[derive(Default)]
struct Attempts {
    entries: HashMap<String, (u64, ProvisionAttempt)>,
    next_id: u64,
}

/// Clears a tenant's entry when its attempt task ends, including by panic.
struct AttemptGuard {
    attempts: Arc<Mutex<Attempts>>,
    tenant_id: String,
    id: u64,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let mut attempts = self.attempts.lock();
        if attempts
            .entries
            .get(&self.tenant_id)
            .is_some_and(|(id, _)| *id == self.id)
        {
            attempts.entries.remove(&self.tenant_id);
        }
    }
}

struct Inner {
    manager: ConnectionManager,
    admin: Arc<dyn AdminExecutor>,
    templates: TemplateStore,
    tracker: SetupTracker,
    probe: DatabaseProbe,
    attempts: Arc<Mutex<Attempts>>,
}

/// Provisions organization databases.
#[derive(Clone)]
pub struct Provisioner {
    inner: Arc<Inner>,
}

impl Provisioner {
    /// Create a provisioner.
    ///
    /// `manager` derives database names and backs existence checks, `admin`
    /// runs the rendered scripts, and `tracker` records outcomes.
    pub fn new(
        manager: ConnectionManager,
        admin: Arc<dyn AdminExecutor>,
        templates: TemplateStore,
        tracker: SetupTracker,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                probe: DatabaseProbe::new(manager.clone()),
                manager,
                admin,
                templates,
                tracker,
                attempts: Arc::new(Mutex::new(Attempts::default())),
            }),
        }
    }

    /// The template store in use.
    pub fn templates(&self) -> &TemplateStore {
        &self.inner.templates
    }

    /// The tracker outcomes are recorded with.
    pub fn tracker(&self) -> &SetupTracker {
        &self.inner.tracker
    }

    /// Provision `tenant_id` as `tenant_type` (`"retail"` or `"restaurant"`).
    ///
    /// An unknown type fails with [`TenantError::InvalidTenantType`] before
    /// any I/O.
    pub async fn create_tenant_database(&self, tenant_id: &str, tenant_type: &str) -> TenantResult<()> {
        let tenant_type: TenantType = tenant_type.parse()?;
        self.provision(tenant_id, tenant_type).await
    }

    /// Provision `tenant_id` as `tenant_type`.
    ///
    /// Joins the attempt already running for `tenant_id`, if any. The attempt
    /// runs to completion even if every caller stops waiting.
    pub async fn provision(&self, tenant_id: &str, tenant_type: TenantType) -> TenantResult<()> {
        let key = self.inner.manager.config().organization_key(tenant_id)?;

        let attempt = {
            let mut attempts = self.inner.attempts.lock();
            match attempts.entries.get(tenant_id) {
                Some((_, attempt)) => {
                    debug!(tenant_id, "Joining in-flight provisioning attempt");
                    attempt.clone()
                }
                None => {
                    attempts.next_id += 1;
                    let id = attempts.next_id;
                    let attempt = self.spawn_attempt(tenant_id.to_string(), tenant_type, id);
                    attempts
                        .entries
                        .insert(tenant_id.to_string(), (id, attempt.clone()));
                    attempt
                }
            }
        };

        debug!(tenant = %key, "Awaiting provisioning attempt");
        attempt.await
    }

    /// Check whether `tenant_id`'s database exists. Never fails.
    pub async fn database_exists(&self, tenant_id: &str) -> bool {
        self.inner.probe.exists(tenant_id).await
    }

    /// Check whether a provisioning attempt is running for `tenant_id`.
    pub fn is_provisioning(&self, tenant_id: &str) -> bool {
        self.inner.attempts.lock().entries.contains_key(tenant_id)
    }

    fn spawn_attempt(&self, tenant_id: String, tenant_type: TenantType, id: u64) -> ProvisionAttempt {
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let _guard = AttemptGuard {
                attempts: Arc::clone(&inner.attempts),
                tenant_id: tenant_id.clone(),
                id,
            };
            run_attempt(&inner, &tenant_id, tenant_type).await
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(TenantError::ProvisioningFailed {
                    database: String::new(),
                    status: None,
                    body: None,
                    message: format!("provisioning attempt aborted: {}", e),
                }),
            }
        }
        .boxed()
        .shared()
    }
}

/// One provisioning attempt: apply the schema, then record the outcome.
async fn run_attempt(inner: &Inner, tenant_id: &str, tenant_type: TenantType) -> TenantResult<()> {
    let key = inner.manager.config().organization_key(tenant_id)?;
    let database = key.database().to_string();
    info!(tenant_id, database = %database, tenant_type = %tenant_type, "Provisioning tenant database");

    let result = apply_schema(inner, &key, tenant_type).await;

    let patch = match &result {
        Ok(()) => {
            info!(tenant_id, database = %database, "Tenant database provisioned");
            SetupPatch::completed(&database, tenant_type)
        }
        Err(e) => {
            error!(tenant_id, database = %database, error = %e, "Tenant provisioning failed");
            SetupPatch::failed(&database, tenant_type, e.to_string())
        }
    };

    if let Err(e) = inner.tracker.record_setup_outcome(tenant_id, patch).await {
        warn!(tenant_id, error = %e, "Failed to record setup outcome");
    }

    result
}

async fn apply_schema(
    inner: &Inner,
    key: &TenantKey,
    tenant_type: TenantType,
) -> TenantResult<()> {
    let template = inner.templates.load(tenant_type).await?;
    let script = template.render(key.database())?;
    debug!(
        tenant = %key,
        template = %template.origin,
        checksum = %template.checksum,
        "Rendered schema template"
    );

    inner
        .admin
        .execute(key, &script)
        .await
        .map_err(|e| TenantError::provisioning_failed(key.database(), e))
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("templates", &self.inner.templates)
            .field("in_flight", &self.inner.attempts.lock().entries.len())
            .finish()
    }
}
