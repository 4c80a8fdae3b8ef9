//! Owner instances and their lifecycle
//!
//! A [`Record`] pairs an [`OwnerState`] with one backend instance per
//! declared attribute. The lifecycle methods drive the backends in a fixed
//! order:
//!
//! - save: `before_save` on every backend, persist the owner row, flush
//!   loaded associations, then notify `Save`
//! - reload: re-read the owner row, drop loaded associations, notify `Reload`
//! - destroy: delete the owner row, cascade to side tables, notify `Destroy`

use tracing::debug;

use valuta_backends::{Backend, OwnerState};
use valuta_core::{Error, Key, LifecycleEvent, Result, RowId, Value};
use valuta_storage::Row;

use crate::accessor::Accessor;
use crate::context::PriceContext;
use crate::model::Model;

/// One owner instance
pub struct Record {
    model: Model,
    owner: OwnerState,
    backends: Vec<(String, Box<dyn Backend>)>,
}

impl Record {
    /// A new, unsaved owner of `model`
    pub fn new(model: &Model) -> Result<Self> {
        let owner = OwnerState::new(model.db().clone(), model.table(), model.type_name())?;
        Ok(Self::with_owner(model, owner))
    }

    /// An owner hydrated from a stored row
    pub fn from_row(model: &Model, row: Row) -> Result<Self> {
        let owner =
            OwnerState::from_row(model.db().clone(), model.table(), model.type_name(), row)?;
        Ok(Self::with_owner(model, owner))
    }

    fn with_owner(model: &Model, owner: OwnerState) -> Self {
        let backends = model
            .attributes()
            .iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor.instantiate()))
            .collect();
        Self {
            model: model.clone(),
            owner,
            backends,
        }
    }

    // ========== Identity ==========

    /// Model this record belongs to
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Row id once saved
    pub fn id(&self) -> Option<RowId> {
        self.owner.id()
    }

    /// Whether the owner row exists in storage
    pub fn is_persisted(&self) -> bool {
        self.owner.is_persisted()
    }

    /// Owner state as backends see it
    pub fn owner(&self) -> &OwnerState {
        &self.owner
    }

    // ========== Plain columns ==========

    /// Read a plain owner column
    pub fn column(&self, name: &str) -> Result<&Value> {
        self.owner
            .read_column(name)
            .ok_or_else(|| Error::unknown_column(self.model.table(), name))
    }

    /// Write a plain owner column (persisted on save)
    pub fn set_column(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.owner.write_column(name, value.into())
    }

    // ========== Keyed attributes ==========

    /// Accessor for attribute `name`
    pub fn accessor(&mut self, name: &str) -> Result<Accessor<'_>> {
        let Self {
            model,
            owner,
            backends,
        } = self;
        let (attribute, backend) = backends
            .iter_mut()
            .find(|(attribute, _)| attribute == name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;
        Ok(Accessor::new(
            attribute.as_str(),
            backend.as_mut(),
            owner,
            model.keys(),
        ))
    }

    /// Value of `name` at `key`
    pub fn get(&mut self, name: &str, key: &Key) -> Result<Option<Value>> {
        self.accessor(name)?.get(key)
    }

    /// Store `value` as `name` at `key`
    pub fn set(&mut self, name: &str, key: &Key, value: impl Into<Value>) -> Result<Option<Value>> {
        self.accessor(name)?.set(key, value)
    }

    /// Whether `name` holds a value at `key`
    pub fn is_present(&mut self, name: &str, key: &Key) -> Result<bool> {
        self.accessor(name)?.is_present(key)
    }

    /// Keys holding a value of `name`
    pub fn keys(&mut self, name: &str) -> Result<Vec<Key>> {
        self.accessor(name)?.keys()
    }

    /// Value of `name` at the context's key
    pub fn get_in(&mut self, name: &str, ctx: &PriceContext) -> Result<Option<Value>> {
        self.accessor(name)?.get_in(ctx)
    }

    /// Store `value` as `name` at the context's key
    pub fn set_in(
        &mut self,
        name: &str,
        ctx: &PriceContext,
        value: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.accessor(name)?.set_in(ctx, value)
    }

    // ========== Lifecycle ==========

    /// Persist the owner and every loaded Price record
    pub fn save(&mut self) -> Result<()> {
        for (_, backend) in self.backends.iter_mut() {
            backend.before_save(&mut self.owner)?;
        }
        self.owner.save(self.model.associations())?;
        self.notify(LifecycleEvent::Save);
        debug!(
            target: "valuta::model",
            model = %self.model.type_name(),
            id = ?self.owner.id(),
            "Record saved"
        );
        Ok(())
    }

    /// Re-read the owner and forget unsaved keyed values
    pub fn reload(&mut self) -> Result<()> {
        self.owner.reload()?;
        self.notify(LifecycleEvent::Reload);
        Ok(())
    }

    /// Delete the owner and its Price records
    pub fn destroy(&mut self) -> Result<()> {
        self.owner.destroy(self.model.associations().values())?;
        self.notify(LifecycleEvent::Destroy);
        debug!(
            target: "valuta::model",
            model = %self.model.type_name(),
            id = ?self.owner.id(),
            "Record destroyed"
        );
        Ok(())
    }

    fn notify(&mut self, event: LifecycleEvent) {
        for (_, backend) in self.backends.iter_mut() {
            backend.notify(event);
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.type_name())
            .field("id", &self.owner.id())
            .finish()
    }
}
