//! Named codec registry.
//!
//! The `CodecService` maps codec names to factories materialized from
//! [`CodecDescriptor`]s. Codec instances are built lazily, once per
//! (name, message type), and shared afterwards.
//!
//! # Thread Safety
//!
//! The service is `Send + Sync`; registration and lookup may race freely.
//! Registration is last-write-wins per name.

#![allow(clippy::significant_drop_tightening)]

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use crate::codec::{CodecRef, Message};
use crate::config::{CodecConfig, CodecDescriptor};
use crate::error::CodecResult;
use crate::kind::CodecFactory;

/// A registered codec: its descriptor, factory and built instances.
#[derive(Debug)]
struct Registration {
    descriptor: CodecDescriptor,
    factory: CodecFactory,
    /// Holds `CodecRef<M>` values keyed by `TypeId::of::<M>()`.
    instances: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

/// Registry of named codecs.
#[derive(Debug, Default)]
pub struct CodecService {
    codecs: RwLock<HashMap<String, Arc<Registration>>>,
}

impl CodecService {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service and registers every descriptor of `config`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` on the first invalid descriptor.
    pub fn from_config(config: &CodecConfig) -> CodecResult<Self> {
        let service = Self::new();
        for descriptor in &config.codecs {
            service.register(descriptor.clone())?;
        }
        info!(codecs = config.codecs.len(), "Codec service configured");
        Ok(service)
    }

    /// Registers a codec, replacing any codec with the same name.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the descriptor cannot be materialized;
    /// the previous registration, if any, is kept.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    pub fn register(&self, descriptor: CodecDescriptor) -> CodecResult<()> {
        let factory = descriptor.factory()?;
        debug!(codec = %descriptor.name, implementation = %factory.kind(), "Registered codec");

        let registration = Registration {
            descriptor,
            factory,
            instances: Mutex::new(HashMap::new()),
        };
        let mut codecs = self.codecs.write().expect("codec registry lock poisoned");
        codecs.insert(registration.descriptor.name.clone(), Arc::new(registration));
        Ok(())
    }

    /// Returns the codec registered as `name` for messages of type `M`.
    ///
    /// Returns `None` if the name is unknown or its implementation cannot
    /// honor `M`.
    ///
    /// # Panics
    ///
    /// Panics if a registry lock is poisoned.
    #[must_use]
    pub fn get_codec<M: Message>(&self, name: &str) -> Option<CodecRef<M>> {
        let registration = {
            let codecs = self.codecs.read().expect("codec registry lock poisoned");
            Arc::clone(codecs.get(name)?)
        };

        let mut instances = registration
            .instances
            .lock()
            .expect("codec instances lock poisoned");
        if let Some(cached) = instances.get(&TypeId::of::<M>()) {
            return cached.downcast_ref::<CodecRef<M>>().cloned();
        }

        let codec = registration.factory.codec::<M>()?;
        instances.insert(TypeId::of::<M>(), Arc::new(Arc::clone(&codec)));
        Some(codec)
    }

    /// Returns the descriptor registered as `name`.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<CodecDescriptor> {
        let codecs = self.codecs.read().expect("codec registry lock poisoned");
        codecs.get(name).map(|r| r.descriptor.clone())
    }

    /// Returns the registered names, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let codecs = self.codecs.read().expect("codec registry lock poisoned");
        let mut names: Vec<String> = codecs.keys().cloned().collect();
        names.sort();
        names
    }
}
