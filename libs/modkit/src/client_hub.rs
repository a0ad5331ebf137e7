//! Type-keyed registry of in-process clients.
//!
//! A provider module registers its API once, keyed by the trait object
//! type (`hub.register::<dyn my::Api>(client)`), and consumers fetch it by
//! the same type. Re-registering replaces the previous client; Arcs already
//! handed out stay valid.

use parking_lot::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientHubError {
    #[error("client not found: {type_name}")]
    NotFound { type_name: &'static str },
}

type Boxed = Box<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct ClientHub {
    map: RwLock<HashMap<TypeId, Boxed>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under the interface type `T`
    /// (usually a trait object like `dyn my_module::contract::MyApi`).
    pub fn register<T>(&self, client: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map.write().insert(TypeId::of::<T>(), Box::new(client));
    }

    /// Fetch a client by interface type `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, ClientHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
            .ok_or(ClientHubError::NotFound {
                type_name: std::any::type_name::<T>(),
            })
    }

    pub fn remove<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let boxed = self.map.write().remove(&TypeId::of::<T>())?;
        boxed.downcast::<Arc<T>>().ok().map(|b| *b)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_trait::async_trait]
    trait Lamp: Send + Sync {
        async fn level(&self) -> i32;
    }

    struct FixedLamp(i32);

    #[async_trait::async_trait]
    impl Lamp for FixedLamp {
        async fn level(&self) -> i32 {
            self.0
        }
    }

    #[tokio::test]
    async fn register_and_get_dyn_trait() {
        let hub = ClientHub::new();
        let api: Arc<dyn Lamp> = Arc::new(FixedLamp(42));
        hub.register::<dyn Lamp>(api.clone());

        let got = hub.get::<dyn Lamp>().unwrap();
        assert_eq!(got.level().await, 42);
        assert!(Arc::ptr_eq(&api, &got));
    }

    #[tokio::test]
    async fn reregister_replaces_and_remove_clears() {
        let hub = ClientHub::new();
        assert!(hub.get::<dyn Lamp>().is_err());

        hub.register::<dyn Lamp>(Arc::new(FixedLamp(1)));
        hub.register::<dyn Lamp>(Arc::new(FixedLamp(2)));
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.get::<dyn Lamp>().unwrap().level().await, 2);

        assert!(hub.remove::<dyn Lamp>().is_some());
        assert!(hub.is_empty());
    }
}
