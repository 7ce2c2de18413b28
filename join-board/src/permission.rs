//! Capability checks for mutating board operations.
//!
//! Capabilities are live values: callers read them at the moment of each
//! mutation instead of caching them. [`PermissionService`] holds one
//! [`tokio::sync::watch`] channel per capability, and a
//! [`PermissionHandle`] can flip them while the board is running.

use tokio::sync::watch;

/// Live capability flags consulted before every mutation.
pub trait Permissions: Send + Sync {
    /// Whether tasks may be edited or moved.
    fn can_edit(&self) -> bool;
    /// Whether tasks may be created.
    fn can_create(&self) -> bool;
    /// Whether tasks may be deleted.
    fn can_delete(&self) -> bool;
}

/// A fixed set of capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Edit and move tasks.
    pub edit: bool,
    /// Create tasks.
    pub create: bool,
    /// Delete tasks.
    pub delete: bool,
}

impl Default for Capabilities {
    /// Every signed-in user, guests included, may edit, create and delete.
    fn default() -> Self {
        Self {
            edit: true,
            create: true,
            delete: true,
        }
    }
}

impl Capabilities {
    /// Denies every mutation.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            edit: false,
            create: false,
            delete: false,
        }
    }
}

impl Permissions for Capabilities {
    fn can_edit(&self) -> bool {
        self.edit
    }

    fn can_create(&self) -> bool {
        self.create
    }

    fn can_delete(&self) -> bool {
        self.delete
    }
}

/// Permission collaborator backed by watch channels.
#[derive(Debug, Clone)]
pub struct PermissionService {
    edit: watch::Receiver<bool>,
    create: watch::Receiver<bool>,
    delete: watch::Receiver<bool>,
}

/// Writer side of a [`PermissionService`].
#[derive(Debug)]
pub struct PermissionHandle {
    edit: watch::Sender<bool>,
    create: watch::Sender<bool>,
    delete: watch::Sender<bool>,
}

impl PermissionService {
    /// Creates a service starting from `initial`, and the handle that
    /// updates it.
    #[must_use]
    pub fn new(initial: Capabilities) -> (Self, PermissionHandle) {
        let (edit_tx, edit) = watch::channel(initial.edit);
        let (create_tx, create) = watch::channel(initial.create);
        let (delete_tx, delete) = watch::channel(initial.delete);
        (
            Self {
                edit,
                create,
                delete,
            },
            PermissionHandle {
                edit: edit_tx,
                create: create_tx,
                delete: delete_tx,
            },
        )
    }

    /// Current capability flags.
    #[must_use]
    pub fn current(&self) -> Capabilities {
        Capabilities {
            edit: self.can_edit(),
            create: self.can_create(),
            delete: self.can_delete(),
        }
    }

    /// Stream of edit capability changes.
    #[must_use]
    pub fn watch_edit(&self) -> watch::Receiver<bool> {
        self.edit.clone()
    }
}

impl Permissions for PermissionService {
    fn can_edit(&self) -> bool {
        *self.edit.borrow()
    }

    fn can_create(&self) -> bool {
        *self.create.borrow()
    }

    fn can_delete(&self) -> bool {
        *self.delete.borrow()
    }
}

impl PermissionHandle {
    /// Replaces all three capabilities.
    pub fn set(&self, caps: Capabilities) {
        self.edit.send_replace(caps.edit);
        self.create.send_replace(caps.create);
        self.delete.send_replace(caps.delete);
        tracing::debug!(?caps, "capabilities changed");
    }

    /// Grants or revokes the edit capability.
    pub fn set_edit(&self, allowed: bool) {
        self.edit.send_replace(allowed);
    }

    /// Grants or revokes the create capability.
    pub fn set_create(&self, allowed: bool) {
        self.create.send_replace(allowed);
    }

    /// Grants or revokes the delete capability.
    pub fn set_delete(&self, allowed: bool) {
        self.delete.send_replace(allowed);
    }
}

impl<P: Permissions + ?Sized> Permissions for std::sync::Arc<P> {
    fn can_edit(&self) -> bool {
        (**self).can_edit()
    }

    fn can_create(&self) -> bool {
        (**self).can_create()
    }

    fn can_delete(&self) -> bool {
        (**self).can_delete()
    }
}
