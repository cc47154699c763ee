//! Handler Registry
//!
//! Business handlers are opaque modules. Each one gets the shared router,
//! binds whatever routes it needs and hands the router back. A module that
//! returns an error or panics is logged and skipped; its partial bindings
//! are discarded and the rest of the service still starts.

use crate::error::RegistrationError;
use crate::metrics::HANDLERS_LOADED;
use axum::Router;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type RegisterFn = Box<dyn FnOnce(Router) -> Result<Router, RegistrationError> + Send>;

/// One handler module
pub struct HandlerModule {
    category: String,
    name: String,
    register: RegisterFn,
}

impl HandlerModule {
    pub fn new<F>(category: impl Into<String>, name: impl Into<String>, register: F) -> Self
    where
        F: FnOnce(Router) -> Result<Router, RegistrationError> + Send + 'static,
    {
        Self {
            category: category.into(),
            name: name.into(),
            register: Box::new(register),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `category/name`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }
}

/// Shared view of how many modules loaded, readable after startup
#[derive(Debug, Clone, Default)]
pub struct LoadedHandlers(Arc<AtomicUsize>);

impl LoadedHandlers {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, value: usize) {
        self.0.store(value, Ordering::Relaxed);
    }
}

/// A module that did not load
#[derive(Debug, Clone)]
pub struct RegistrationFailure {
    pub module: String,
    pub error: RegistrationError,
}

/// Result of loading every module
pub struct RegistryReport {
    pub router: Router,
    pub loaded: usize,
    pub failures: Vec<RegistrationFailure>,
}

/// Explicit list of handler modules, loaded once at startup
#[derive(Default)]
pub struct HandlerRegistry {
    modules: Vec<HandlerModule>,
    loaded: LoadedHandlers,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, module: HandlerModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Handle that reports the loaded count once `load` has run
    pub fn loaded_handlers(&self) -> LoadedHandlers {
        self.loaded.clone()
    }

    /// Load modules grouped by category, then by name
    pub fn load(self, router: Router) -> RegistryReport {
        let HandlerRegistry {
            mut modules,
            loaded: loaded_handle,
        } = self;
        modules.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut router = router;
        let mut loaded = 0usize;
        let mut failures = Vec::new();

        for module in modules {
            let qualified = module.qualified_name();
            let register = module.register;
            let shared = router.clone();

            let attempt = catch_unwind(AssertUnwindSafe(move || register(shared)))
                .unwrap_or_else(|payload| Err(RegistrationError::Panicked(panic_message(payload))));

            match attempt {
                Ok(updated) => {
                    router = updated;
                    loaded += 1;
                    tracing::debug!(module = %qualified, "Handler module loaded");
                }
                Err(error) => {
                    tracing::error!(module = %qualified, error = %error, "Handler module failed to load, skipping");
                    failures.push(RegistrationFailure {
                        module: qualified,
                        error,
                    });
                }
            }
        }

        loaded_handle.set(loaded);
        HANDLERS_LOADED.set(loaded as i64);
        tracing::info!(
            loaded,
            failed = failures.len(),
            "Handler registration complete"
        );

        RegistryReport {
            router,
            loaded,
            failures,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
