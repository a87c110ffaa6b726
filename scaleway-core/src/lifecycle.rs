//! Lifecycle - Generic Create/Read/Update/Delete skeleton
//!
//! A [`ResourceDriver`] knows how to talk to the vendor API for one entity.
//! [`ManagedResource`] wraps it with scope resolution, composite IDs, wait
//! loops, not-found handling and timeouts, so every resource behaves the same.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ProviderMeta;
use crate::differ::{self, Diff};
use crate::error::{ApiError, ProviderError, ProviderResult};
use crate::id::CompositeId;
use crate::locality::{Locality, Scope};
use crate::provider::{BoxFuture, ResourceHandler};
use crate::resource::{AttributeMap, LifecycleState, ResourceData};
use crate::schema::ResourceSchema;
use crate::scope;
use crate::validation::{Diagnostics, ValidationError};
use crate::wait::{Observed, WaitOptions, guard, wait_for};

/// Per-phase limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(15 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(15 * 60),
            delete: Duration::from_secs(15 * 60),
        }
    }
}

/// Backend status of an object with asynchronous state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStatus {
    Stable,
    /// Still moving, e.g. `snapshotting`
    Transient(String),
    /// Will not recover on its own
    Failed(String),
}

/// Budget left before `deadline`
fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// `<prefix>-<8 hex chars>`
pub fn generate_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}

/// Vendor calls for one entity kind
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    /// Resource type name (e.g., "scaleway_instance_ip")
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn locality(&self) -> Locality;

    /// Attributes holding a parent's composite ID the scope may be inherited from
    fn scope_sources(&self) -> &'static [&'static str] {
        &[]
    }

    /// Prefix of generated names when `name` is left empty
    fn name_prefix(&self) -> Option<&'static str> {
        None
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// The backend answers 403 for objects that were deleted
    fn forbidden_means_gone(&self) -> bool {
        false
    }

    /// Create and Update return before the object settles
    fn has_async_state(&self) -> bool {
        false
    }

    /// Wait for a settled status before deleting
    fn wait_before_delete(&self) -> bool {
        false
    }

    /// Wait until the object disappears after deleting
    fn wait_after_delete(&self) -> bool {
        false
    }

    /// Create the object and return its bare UUID
    async fn create(&self, scope: &Scope, data: &ResourceData) -> ProviderResult<String>;

    /// Follow-up calls that need the object to exist. Runs once the new ID
    /// is recorded, so a failure here still leaves the object in state.
    async fn after_create(&self, _id: &CompositeId, _data: &ResourceData) -> ProviderResult<()> {
        Ok(())
    }

    /// Copy the live object into `data`
    async fn read(&self, id: &CompositeId, data: &mut ResourceData) -> ProviderResult<()>;

    /// Send the changed attributes of `data`
    async fn update(&self, id: &CompositeId, data: &ResourceData) -> ProviderResult<()>;

    async fn delete(&self, id: &CompositeId) -> ProviderResult<()>;

    async fn status(&self, _id: &CompositeId) -> Result<ObjectStatus, ApiError> {
        Ok(ObjectStatus::Stable)
    }
}

/// A driver wired into the shared lifecycle
pub struct ManagedResource<D> {
    driver: D,
    schema: ResourceSchema,
    meta: Arc<ProviderMeta>,
}

impl<D: ResourceDriver> ManagedResource<D> {
    pub fn new(driver: D, meta: Arc<ProviderMeta>) -> Self {
        let schema = driver.schema();
        Self {
            driver,
            schema,
            meta,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn type_name(&self) -> &'static str {
        self.driver.type_name()
    }

    fn wait_options(&self, limit: Duration) -> WaitOptions {
        WaitOptions::new(self.meta.poll_interval(), limit)
            .with_forbidden_as_absent(self.driver.forbidden_means_gone())
    }

    /// Stored IDs are read as the scope kind this resource lives in
    fn parse_id(&self, id: &str) -> ProviderResult<CompositeId> {
        CompositeId::parse_for(self.driver.locality(), id)
    }

    fn is_gone(&self, err: &ProviderError) -> bool {
        err.is_not_found() || (self.driver.forbidden_means_gone() && err.is_forbidden())
    }

    /// Fill what the user left to the provider before the create call
    fn prepare_create(&self, scope: &Scope, data: &mut ResourceData) {
        let mut attributes = data.attributes().clone();
        self.schema.apply_defaults(&mut attributes);
        for (name, value) in attributes.iter() {
            if !data.attributes().is_set(name) {
                data.set(name, value.clone());
            }
        }

        if let Some(prefix) = self.driver.name_prefix()
            && data.get_str("name").is_none()
        {
            let name = generate_name(prefix);
            debug!("{}: generated name {}", self.type_name(), name);
            data.set("name", name);
        }

        if let (Some(attribute), Some(token)) = (self.driver.locality().attribute(), scope.token()) {
            data.set(attribute, token);
        }

        let defaults = [
            ("project_id", self.meta.default_project_id()),
            ("organization_id", self.meta.default_organization_id()),
        ];
        for (attribute, default) in defaults {
            let writable = self.schema.get(attribute).is_some_and(|a| !a.is_read_only());
            if let Some(default) = default
                && writable
                && data.get_str(attribute).is_none()
            {
                data.set(attribute, default);
            }
        }
    }

    async fn wait_until_settled(
        &self,
        cancel: &CancellationToken,
        id: &CompositeId,
        deadline: Instant,
    ) -> ProviderResult<Observed<ObjectStatus>> {
        let what = format!("{} {}", self.type_name(), id);
        wait_for(
            cancel,
            &what,
            self.wait_options(remaining(deadline)),
            || self.driver.status(id),
            |observed| !matches!(observed, Observed::Present(ObjectStatus::Transient(_))),
        )
        .await
    }

    async fn wait_until_stable(
        &self,
        cancel: &CancellationToken,
        id: &CompositeId,
        deadline: Instant,
    ) -> ProviderResult<()> {
        let what = format!("{} {}", self.type_name(), id);
        match self.wait_until_settled(cancel, id, deadline).await? {
            Observed::Present(ObjectStatus::Stable) => Ok(()),
            Observed::Present(ObjectStatus::Transient(status) | ObjectStatus::Failed(status)) => {
                Err(ProviderError::FailedState { what, status })
            }
            Observed::Absent => Err(ProviderError::NotFound(what)),
        }
    }

    async fn wait_until_gone(
        &self,
        cancel: &CancellationToken,
        id: &CompositeId,
        deadline: Instant,
    ) -> ProviderResult<()> {
        let what = format!("{} {} deletion", self.type_name(), id);
        wait_for(
            cancel,
            &what,
            self.wait_options(remaining(deadline)),
            || self.driver.status(id),
            Observed::is_absent,
        )
        .await
        .map(|_| ())
    }

    async fn create_inner(
        &self,
        cancel: &CancellationToken,
        data: &mut ResourceData,
    ) -> ProviderResult<()> {
        let sources = self.driver.scope_sources();
        scope::check_scope_consistency(self.driver.locality(), data.attributes(), sources)?;
        let scope =
            scope::extract_scope(self.driver.locality(), data.attributes(), &self.meta, sources)?;
        self.prepare_create(&scope, data);

        data.set_lifecycle(LifecycleState::Creating);
        let deadline = Instant::now() + self.driver.timeouts().create;
        let what = format!("create {}", self.type_name());
        let uuid = guard(cancel, remaining(deadline), &what, self.driver.create(&scope, data)).await?;

        let id = CompositeId::new(scope, uuid);
        data.set_id(id.encode());
        info!("{}: created {}", self.type_name(), id);

        if self.driver.has_async_state() {
            self.wait_until_stable(cancel, &id, deadline).await?;
        }
        guard(cancel, remaining(deadline), &what, self.driver.after_create(&id, data)).await?;

        self.read_inner(cancel, data).await?;
        if data.id().is_empty() {
            return Err(ProviderError::NotFound(format!(
                "{} {} right after creation",
                self.type_name(),
                id
            )));
        }
        Ok(())
    }

    async fn read_inner(
        &self,
        cancel: &CancellationToken,
        data: &mut ResourceData,
    ) -> ProviderResult<()> {
        if data.id().is_empty() {
            debug!("{}: nothing to read, no ID in state", self.type_name());
            return Ok(());
        }
        let id = self.parse_id(data.id())?;
        let what = format!("read {} {}", self.type_name(), id);
        let limit = self.driver.timeouts().read;

        match guard(cancel, limit, &what, self.driver.read(&id, data)).await {
            Ok(()) => {}
            Err(err) if self.is_gone(&err) => {
                info!("{}: {} is gone, removing from state ({})", self.type_name(), id, err);
                data.clear_id();
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        if let (Some(attribute), Some(token)) = (self.driver.locality().attribute(), id.scope.token()) {
            data.set(attribute, token);
        }
        data.set_id(id.encode());
        data.set_lifecycle(LifecycleState::Stable);
        debug!("{}: read {}", self.type_name(), id);
        Ok(())
    }

    async fn update_inner(
        &self,
        cancel: &CancellationToken,
        data: &mut ResourceData,
    ) -> ProviderResult<()> {
        let id = self.parse_id(data.id())?;
        data.carry_computed(&self.schema);

        match differ::diff(&self.schema, data.prior(), data.attributes()) {
            Diff::Replace { forced_by, .. } => {
                return Err(ProviderError::Validation(
                    forced_by
                        .into_iter()
                        .map(|name| {
                            ValidationError::new(name, "changing this attribute requires a new resource")
                        })
                        .collect(),
                ));
            }
            Diff::NoChange => debug!("{}: nothing to update on {}", self.type_name(), id),
            Diff::Update { changed } => {
                debug!("{}: updating {} ({})", self.type_name(), id, changed.join(", "))
            }
            Diff::Create => {}
        }

        data.set_lifecycle(LifecycleState::Updating);
        let deadline = Instant::now() + self.driver.timeouts().update;
        let what = format!("update {} {}", self.type_name(), id);
        guard(cancel, remaining(deadline), &what, self.driver.update(&id, data)).await?;

        if self.driver.has_async_state() {
            self.wait_until_stable(cancel, &id, deadline).await?;
        }
        self.read_inner(cancel, data).await
    }

    async fn delete_inner(
        &self,
        cancel: &CancellationToken,
        data: &mut ResourceData,
    ) -> ProviderResult<()> {
        let id = self.parse_id(data.id())?;
        let deadline = Instant::now() + self.driver.timeouts().delete;
        data.set_lifecycle(LifecycleState::Deleting);

        if self.driver.wait_before_delete()
            && self.wait_until_settled(cancel, &id, deadline).await?.is_absent()
        {
            info!("{}: {} already gone", self.type_name(), id);
            data.clear_id();
            return Ok(());
        }

        let what = format!("delete {} {}", self.type_name(), id);
        match guard(cancel, remaining(deadline), &what, self.driver.delete(&id)).await {
            Ok(()) => {}
            Err(err) if self.is_gone(&err) => {
                debug!("{}: {} already gone ({})", self.type_name(), id, err);
            }
            Err(err) => return Err(err),
        }

        if self.driver.wait_after_delete() {
            self.wait_until_gone(cancel, &id, deadline).await?;
        }

        info!("{}: deleted {}", self.type_name(), id);
        data.clear_id();
        Ok(())
    }

    pub fn validate(&self, config: &AttributeMap) -> Diagnostics {
        let mut diags = self.schema.validate(config);
        if let Err(err) = scope::check_scope_consistency(
            self.driver.locality(),
            config,
            self.driver.scope_sources(),
        ) {
            diags.error(self.driver.locality().attribute().unwrap_or("id"), err.to_string());
        }
        diags
    }

    pub fn plan(&self, prior: Option<&AttributeMap>, desired: &AttributeMap) -> ProviderResult<Diff> {
        scope::check_scope_consistency(
            self.driver.locality(),
            desired,
            self.driver.scope_sources(),
        )
        .map_err(|e| e.for_resource(self.type_name()))?;
        Ok(differ::diff(&self.schema, prior, desired))
    }

    /// Absent -> creating -> stable. On success `data` holds the new composite ID.
    pub async fn create(&self, cancel: &CancellationToken, data: &mut ResourceData) -> ProviderResult<()> {
        self.create_inner(cancel, data)
            .await
            .map_err(|e| e.for_resource(self.type_name()))
    }

    /// A not-found (or forbidden, for drivers that say so) empties the ID
    /// and succeeds.
    pub async fn read(&self, cancel: &CancellationToken, data: &mut ResourceData) -> ProviderResult<()> {
        self.read_inner(cancel, data)
            .await
            .map_err(|e| e.for_resource(self.type_name()))
    }

    pub async fn update(&self, cancel: &CancellationToken, data: &mut ResourceData) -> ProviderResult<()> {
        self.update_inner(cancel, data)
            .await
            .map_err(|e| e.for_resource(self.type_name()))
    }

    /// Deleting an object that is already gone succeeds
    pub async fn delete(&self, cancel: &CancellationToken, data: &mut ResourceData) -> ProviderResult<()> {
        self.delete_inner(cancel, data)
            .await
            .map_err(|e| e.for_resource(self.type_name()))
    }
}

impl<D: ResourceDriver> ResourceHandler for ManagedResource<D> {
    fn type_name(&self) -> &str {
        self.driver.type_name()
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn locality(&self) -> Locality {
        self.driver.locality()
    }

    fn validate(&self, config: &AttributeMap) -> Diagnostics {
        ManagedResource::validate(self, config)
    }

    fn plan(&self, prior: Option<&AttributeMap>, desired: &AttributeMap) -> ProviderResult<Diff> {
        ManagedResource::plan(self, prior, desired)
    }

    fn create<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(ManagedResource::create(self, cancel, data))
    }

    fn read<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(ManagedResource::read(self, cancel, data))
    }

    fn update<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(ManagedResource::update(self, cancel, data))
    }

    fn delete<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        data: &'a mut ResourceData,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(ManagedResource::delete(self, cancel, data))
    }
}
