//! Shared primitives for the gyre workspace crates.
//!
//! ```rust
//! use gcommon::{EventBus, Registry};
//!
//! let mut registry = Registry::new();
//! registry.insert("alpha".to_string(), 1_u32);
//! assert_eq!(registry.get("alpha"), Some(&1));
//!
//! let bus: EventBus<u32> = EventBus::new();
//! bus.subscribe(|value| assert_eq!(*value, 7));
//! bus.emit(&7);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use gcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod registry {
    //! Generic insertion-ordered registry used by runtime registries.
    //!
    //! Iteration order over `keys`/`values` is first-registration order;
    //! re-inserting an existing key replaces its value but keeps its
    //! original position.
    //!
    //! ```rust
    //! use gcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! registry.insert("alpha".to_string(), 1_u32);
    //! registry.insert("beta".to_string(), 2_u32);
    //! registry.insert("alpha".to_string(), 3_u32);
    //!
    //! let values: Vec<u32> = registry.values().copied().collect();
    //! assert_eq!(values, vec![3, 2]);
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        order: Vec<K>,
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                order: Vec::new(),
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash + Clone,
    {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, key: K, value: V) -> Option<V> {
            let previous = self.items.insert(key.clone(), value);
            if previous.is_none() {
                self.order.push(key);
            }

            previous
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            let removed = self.items.remove(key);
            if removed.is_some() {
                self.order.retain(|existing| existing.borrow() != key);
            }

            removed
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.order.iter()
        }

        pub fn values(&self) -> impl Iterator<Item = &V> {
            self.order.iter().filter_map(|key| self.items.get(key))
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub mod events {
    //! Typed pub/sub bus with registration-order dispatch.
    //!
    //! Each component publishes a closed enum of event kinds, so listener
    //! payloads are type-checked instead of name-keyed. Listeners run in
    //! registration order; a panicking listener propagates to the emitter
    //! (the dispatcher does not absorb listener failures) but cannot poison
    //! emission for later turns because the listener list is snapshotted
    //! before invocation.
    //!
    //! ```rust
    //! use gcommon::EventBus;
    //!
    //! #[derive(Debug, PartialEq)]
    //! enum Ping { Hello }
    //!
    //! let bus = EventBus::new();
    //! bus.subscribe(|event: &Ping| assert_eq!(*event, Ping::Hello));
    //! bus.emit(&Ping::Hello);
    //! ```

    use std::sync::{Arc, Mutex, MutexGuard};

    type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

    pub struct EventBus<E> {
        listeners: Mutex<Vec<Listener<E>>>,
    }

    impl<E> Default for EventBus<E> {
        fn default() -> Self {
            Self {
                listeners: Mutex::new(Vec::new()),
            }
        }
    }

    impl<E> EventBus<E> {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn subscribe<F>(&self, listener: F)
        where
            F: Fn(&E) + Send + Sync + 'static,
        {
            self.lock().push(Arc::new(listener));
        }

        pub fn emit(&self, event: &E) {
            let snapshot = self.lock().clone();
            for listener in snapshot {
                listener(event);
            }
        }

        pub fn listener_count(&self) -> usize {
            self.lock().len()
        }

        fn lock(&self) -> MutexGuard<'_, Vec<Listener<E>>> {
            match self.listeners.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            }
        }
    }
}

pub use events::EventBus;
pub use future::BoxFuture;
pub use registry::Registry;
