//! Per-machine registry of shared clients.

use super::{Client, ClientId, CompletionNotifier};
use crate::config::MachineConfig;
use crate::error::MachineError;
use crate::runtime::EventSender;
use std::any::{Any, TypeId};
use std::collections::HashMap;

trait ErasedClient: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn shutdown(&mut self);
}

impl<C: Client> ErasedClient for C {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn shutdown(&mut self) {
        Client::shutdown(self)
    }
}

/// Owns at most one instance of each client type.
///
/// Instances are created on first request and live until
/// [`ClientRegistry::shutdown_all`]. A failed creation is not cached, so a
/// later request tries again.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<TypeId, Box<dyn ErasedClient>>,
    order: Vec<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance of `C`, initializing it on first use.
    pub fn get_or_create<C: Client>(
        &mut self,
        config: &MachineConfig,
        sender: &EventSender,
    ) -> Result<&mut C, MachineError> {
        let key = TypeId::of::<C>();
        if !self.clients.contains_key(&key) {
            let id = ClientId::of::<C>();
            let notifier = CompletionNotifier::new(id, sender.clone());
            let client = C::initialize(config.client_params(C::NAME), notifier).map_err(
                |source| MachineError::ClientUnavailable {
                    client: C::NAME,
                    source,
                },
            )?;
            tracing::info!(client = C::NAME, "client initialized");
            self.clients.insert(key, Box::new(client));
            self.order.push(id);
        }
        self.get_mut::<C>()
            .ok_or(MachineError::ClientNotCreated { client: C::NAME })
    }

    pub fn get<C: Client>(&self) -> Option<&C> {
        self.clients
            .get(&TypeId::of::<C>())?
            .as_any()
            .downcast_ref::<C>()
    }

    pub fn get_mut<C: Client>(&mut self) -> Option<&mut C> {
        self.clients
            .get_mut(&TypeId::of::<C>())?
            .as_any_mut()
            .downcast_mut::<C>()
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.order.contains(&client)
    }

    /// Ids of the created clients, in creation order.
    pub fn ids(&self) -> &[ClientId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Shut every client down, newest first, and empty the registry.
    pub fn shutdown_all(&mut self) {
        for id in self.order.drain(..).rev() {
            if let Some(client) = self.clients.get_mut(&id.type_id) {
                client.shutdown();
                tracing::info!(client = id.name(), "client shut down");
            }
        }
        self.clients.clear();
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientParams;
    use crate::error::ClientError;
    use crate::runtime::EventQueue;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SHUTDOWNS: AtomicUsize = AtomicUsize::new(0);

    struct Lidar {
        topic: String,
        requests: usize,
    }

    impl Client for Lidar {
        const NAME: &'static str = "lidar";
        type Goal = ();

        fn initialize(
            params: ClientParams<'_>,
            _notifier: CompletionNotifier,
        ) -> Result<Self, ClientError> {
            Ok(Self {
                topic: params.require("topic")?,
                requests: 0,
            })
        }

        fn send_request(&mut self, _goal: ()) -> Result<(), ClientError> {
            self.requests += 1;
            Ok(())
        }

        fn shutdown(&mut self) {
            SHUTDOWNS.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn creates_client_once() {
        let queue = EventQueue::new();
        let config = MachineConfig::default().with_client("lidar", json!({ "topic": "/scan" }));
        let mut registry = ClientRegistry::new();

        let first = registry
            .get_or_create::<Lidar>(&config, &queue.sender())
            .unwrap();
        first.send_request(()).unwrap();
        let first_ptr: *const Lidar = &*first;

        let second = registry
            .get_or_create::<Lidar>(&config, &queue.sender())
            .unwrap();
        let second_ptr: *const Lidar = &*second;
        assert_eq!(second_ptr, first_ptr);
        assert_eq!(second.requests, 1);
        assert_eq!(second.topic, "/scan");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn missing_prerequisite_is_unavailable_and_not_cached() {
        let queue = EventQueue::new();
        let mut registry = ClientRegistry::new();

        let result = registry.get_or_create::<Lidar>(&MachineConfig::default(), &queue.sender());
        assert!(matches!(
            result,
            Err(MachineError::ClientUnavailable { client: "lidar", .. })
        ));
        assert!(registry.is_empty());

        let config = MachineConfig::default().with_client("lidar", json!({ "topic": "/scan" }));
        assert!(registry
            .get_or_create::<Lidar>(&config, &queue.sender())
            .is_ok());
    }

    #[test]
    fn shutdown_all_empties_the_registry() {
        let queue = EventQueue::new();
        let config = MachineConfig::default().with_client("lidar", json!({ "topic": "/scan" }));
        let mut registry = ClientRegistry::new();
        registry
            .get_or_create::<Lidar>(&config, &queue.sender())
            .unwrap();

        let before = SHUTDOWNS.load(Ordering::SeqCst);
        registry.shutdown_all();

        assert_eq!(SHUTDOWNS.load(Ordering::SeqCst), before + 1);
        assert!(registry.get::<Lidar>().is_none());
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn registry_lookup_without_creation() {
        let registry = ClientRegistry::new();
        assert!(registry.get::<Lidar>().is_none());
        assert!(!registry.contains(ClientId::of::<Lidar>()));
    }
}
