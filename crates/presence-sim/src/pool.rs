//! The simulated client pool: ephemeral identities generating live traffic.
//!
//! Each identity owns one transport handle. Display names are drawn from a
//! fixed pool with a random suffix for uniqueness. An identity's name is
//! immutable while its handle is open, so renaming tears the handle down
//! and reopens it under the new name, restoring the prior connection
//! state.
//!
//! Bulk teardown never stops at a failure: an unsubscribe error is logged
//! and the remaining identities are still destroyed. Because teardown
//! races with any outstanding here-now query, callers should wait a
//! settling interval before re-bootstrapping from a snapshot.

use rand::Rng;
use tracing::{debug, info, warn};

use presence_client::{ClientError, Transport};
use presence_types::IdentityId;

use crate::error::SimError;

/// Built-in pool of display-name stems. Each generated name combines one
/// stem with a random hex suffix.
const NAME_POOL: &[&str] = &[
    "Alder", "Birch", "Cedar", "Dusk", "Ember", "Fern", "Grove", "Haze",
    "Iris", "Juniper", "Kestrel", "Lark", "Moss", "Nettle", "Oak", "Pine",
    "Quill", "Reed", "Sage", "Thorn", "Umber", "Vale", "Wren", "Yarrow",
];

/// Opens transport handles for simulated identities.
///
/// The pool is generic over this seam so that demos run on the loopback
/// broker and soak tests on a real server.
pub trait HandleFactory {
    /// The transport type this factory opens.
    type Handle: Transport;

    /// Open a handle presenting `identity` on the wire.
    fn open(
        &self,
        identity: &str,
    ) -> impl std::future::Future<Output = Result<Self::Handle, ClientError>> + Send;
}

impl HandleFactory for presence_client::LoopbackBroker {
    type Handle = presence_client::LoopbackTransport;

    async fn open(&self, identity: &str) -> Result<Self::Handle, ClientError> {
        Ok(self.handle(identity))
    }
}

/// One ephemeral identity and its transport handle.
#[derive(Debug)]
pub struct SimulatedIdentity<T> {
    /// Pool-local identifier, stable across renames.
    pub id: IdentityId,
    /// The name this identity presents on the wire.
    pub display_name: String,
    /// The open transport handle.
    pub handle: T,
    /// The channel this identity is currently subscribed to, if any.
    pub connected_channel: Option<String>,
}

/// Creates and destroys simulated identities.
pub struct SimulatedClientPool<F: HandleFactory> {
    factory: F,
    identities: Vec<SimulatedIdentity<F::Handle>>,
}

impl<F: HandleFactory> SimulatedClientPool<F> {
    /// Create an empty pool over a handle factory.
    pub const fn new(factory: F) -> Self {
        Self {
            factory,
            identities: Vec::new(),
        }
    }

    /// Allocate a new identity with a generated display name and an open
    /// handle. Starts disconnected.
    pub async fn create(&mut self) -> Result<IdentityId, SimError> {
        let display_name = self.generate_name();
        let handle = self.factory.open(&display_name).await?;
        let id = IdentityId::new();
        info!(identity = %id, name = %display_name, "created simulated identity");
        self.identities.push(SimulatedIdentity {
            id,
            display_name,
            handle,
            connected_channel: None,
        });
        Ok(id)
    }

    /// Subscribe an identity to a channel, generating join traffic.
    ///
    /// An identity connected elsewhere is disconnected first. The pool
    /// never feeds the reconciler directly; a monitor watching the
    /// channel's presence companion observes the traffic.
    pub async fn connect(&mut self, id: IdentityId, channel: &str) -> Result<(), SimError> {
        let identity = self.identity_mut(id)?;
        if let Some(current) = identity.connected_channel.take() {
            identity.handle.unsubscribe(&current).await?;
        }
        // The stream is dropped immediately; the subscription's side
        // effect (the join announcement) is all the pool needs.
        let _stream = identity.handle.subscribe(channel).await?;
        identity.connected_channel = Some(channel.to_owned());
        debug!(identity = %id, channel = channel, "simulated identity connected");
        Ok(())
    }

    /// Unsubscribe an identity from its channel, generating leave traffic.
    /// A no-op for identities that are already disconnected.
    pub async fn disconnect(&mut self, id: IdentityId) -> Result<(), SimError> {
        let identity = self.identity_mut(id)?;
        if let Some(channel) = identity.connected_channel.take() {
            identity.handle.unsubscribe(&channel).await?;
            debug!(identity = %id, channel = %channel, "simulated identity disconnected");
        }
        Ok(())
    }

    /// Rename an identity.
    ///
    /// The wire identity is immutable on an open connection, so this
    /// tears the old handle down and opens a new one under the new name,
    /// then restores the prior connection state. A name collision or a
    /// failed teardown unsubscribe leaves the identity's record
    /// unchanged; a failed resubscribe leaves it renamed but
    /// disconnected.
    pub async fn rename(&mut self, id: IdentityId, new_name: &str) -> Result<(), SimError> {
        let collision = self
            .identities
            .iter()
            .any(|i| i.id != id && i.display_name == new_name);
        if collision {
            return Err(SimError::NameCollision {
                name: new_name.to_owned(),
            });
        }

        let new_handle = self.factory.open(new_name).await?;
        let identity = self.identity_mut(id)?;
        if let Some(channel) = &identity.connected_channel {
            identity.handle.unsubscribe(channel).await?;
        }
        let previous_channel = identity.connected_channel.take();
        let old_name = std::mem::replace(&mut identity.display_name, new_name.to_owned());
        identity.handle = new_handle;
        if let Some(channel) = previous_channel {
            let _stream = identity.handle.subscribe(&channel).await?;
            identity.connected_channel = Some(channel);
        }
        info!(identity = %id, from = %old_name, to = new_name, "renamed simulated identity");
        Ok(())
    }

    /// Destroy one identity, ignoring (but logging) teardown failures.
    pub async fn remove(&mut self, id: IdentityId) -> Result<(), SimError> {
        let position = self
            .identities
            .iter()
            .position(|i| i.id == id)
            .ok_or(SimError::UnknownIdentity(id))?;
        let mut identity = self.identities.remove(position);
        if let Some(channel) = identity.connected_channel.take()
            && let Err(e) = identity.handle.unsubscribe(&channel).await
        {
            warn!(identity = %id, error = %e, "teardown unsubscribe failed");
        }
        debug!(identity = %id, "removed simulated identity");
        Ok(())
    }

    /// Destroy every identity. Teardown failures are logged and never
    /// block the removal of the remaining identities. Returns the number
    /// of identities removed.
    pub async fn remove_all(&mut self) -> usize {
        let mut removed = 0usize;
        for mut identity in self.identities.drain(..) {
            if let Some(channel) = identity.connected_channel.take()
                && let Err(e) = identity.handle.unsubscribe(&channel).await
            {
                warn!(
                    identity = %identity.id,
                    error = %e,
                    "teardown unsubscribe failed during bulk removal"
                );
            }
            removed = removed.saturating_add(1);
        }
        info!(removed, "removed all simulated identities");
        removed
    }

    /// The identities currently in the pool.
    pub fn identities(&self) -> impl Iterator<Item = &SimulatedIdentity<F::Handle>> {
        self.identities.iter()
    }

    /// Look up one identity.
    pub fn identity(&self, id: IdentityId) -> Option<&SimulatedIdentity<F::Handle>> {
        self.identities.iter().find(|i| i.id == id)
    }

    /// Number of live identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    fn identity_mut(
        &mut self,
        id: IdentityId,
    ) -> Result<&mut SimulatedIdentity<F::Handle>, SimError> {
        self.identities
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(SimError::UnknownIdentity(id))
    }

    fn generate_name(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let stem = NAME_POOL
                .get(rng.random_range(0..NAME_POOL.len()))
                .copied()
                .unwrap_or("Sim");
            let suffix: u16 = rng.random();
            let candidate = format!("sim-{stem}-{suffix:04x}");
            if !self.identities.iter().any(|i| i.display_name == candidate) {
                return candidate;
            }
        }
    }
}

impl<F: HandleFactory> std::fmt::Debug for SimulatedClientPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedClientPool")
            .field("identities", &self.identities.len())
            .finish_non_exhaustive()
    }
}
