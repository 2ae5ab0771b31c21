use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::library_test::error::{panic_message, DiscoveryError, RegistryError};
use crate::library_test::traits::{LibraryTest, TestDescriptor};

/// Outcome of a factory call. The error is a human-readable reason.
pub type FactoryResult = std::result::Result<Box<dyn LibraryTest>, String>;

/// Builds a fresh test instance for every run.
pub type TestFactory = Box<dyn Fn() -> FactoryResult + Send + Sync>;

/// Registry for library test factories
///
/// Factories are keyed by the test type's declared name and kept sorted, so
/// candidates always come out in ascending lexicographic order no matter in
/// which order they were registered.
#[derive(Default)]
pub struct TestRegistry {
    factories: BTreeMap<String, TestFactory>,
}

impl TestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a default-constructible test under its declared type name.
    pub fn register<T>(&mut self) -> Result<(), RegistryError>
    where
        T: LibraryTest + Default + 'static,
    {
        self.register_factory(declared_name::<T>(), || {
            Ok(Box::new(T::default()) as Box<dyn LibraryTest>)
        })
    }

    /// Register a fallible factory under an explicit key.
    pub fn register_factory<F>(&mut self, key: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> FactoryResult + Send + Sync + 'static,
    {
        if key.is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        if self.factories.contains_key(key) {
            return Err(RegistryError::Duplicate {
                key: key.to_string(),
            });
        }
        debug!("Registered library test '{}'", key);
        self.factories.insert(key.to_string(), Box::new(factory));
        Ok(())
    }

    /// Checks if a test is registered under the given key.
    pub fn is_registered(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered keys in execution order.
    pub fn keys(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Registered candidates in execution order, not yet instantiated.
    pub fn candidates(&self) -> Vec<Candidate<'_>> {
        self.factories
            .iter()
            .map(|(key, factory)| Candidate { key, factory })
            .collect()
    }

    /// Instantiate every candidate in execution order.
    ///
    /// A candidate that cannot be built is recorded in
    /// [`Discovery::errors`] and the pass moves on to the next one.
    pub fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        for candidate in self.candidates() {
            match candidate.instantiate() {
                Ok(test) => discovery.tests.push(test),
                Err(err) => discovery.errors.push(err),
            }
        }
        discovery
    }
}

impl fmt::Debug for TestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// A registered factory that has not been called yet.
pub struct Candidate<'a> {
    key: &'a str,
    factory: &'a TestFactory,
}

impl<'a> Candidate<'a> {
    pub fn key(&self) -> &'a str {
        self.key
    }

    /// Build a fresh instance. Factory errors and panics become a
    /// [`DiscoveryError`] instead of unwinding into the caller.
    pub fn instantiate(&self) -> Result<DiscoveredTest, DiscoveryError> {
        let factory = self.factory;
        match panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(test)) => Ok(DiscoveredTest {
                key: self.key.to_string(),
                test,
            }),
            Ok(Err(message)) => {
                warn!("Skipping library test '{}': {}", self.key, message);
                Err(DiscoveryError::Construction {
                    key: self.key.to_string(),
                    message,
                })
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                warn!("Skipping library test '{}': constructor panicked: {}", self.key, message);
                Err(DiscoveryError::Panicked {
                    key: self.key.to_string(),
                    message,
                })
            }
        }
    }
}

/// A freshly constructed test instance together with its registry key.
pub struct DiscoveredTest {
    pub key: String,
    pub test: Box<dyn LibraryTest>,
}

impl DiscoveredTest {
    pub fn descriptor(&self) -> TestDescriptor {
        TestDescriptor::of(self.test.as_ref())
    }
}

impl fmt::Debug for DiscoveredTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveredTest")
            .field("key", &self.key)
            .field("descriptor", &self.descriptor())
            .finish()
    }
}

/// Result of a full discovery pass.
#[derive(Debug, Default)]
pub struct Discovery {
    pub tests: Vec<DiscoveredTest>,
    pub errors: Vec<DiscoveryError>,
}

impl Discovery {
    /// Keys of the successfully instantiated tests, in execution order.
    pub fn keys(&self) -> Vec<&str> {
        self.tests.iter().map(|t| t.key.as_str()).collect()
    }
}

/// Unqualified type name, e.g. `CudnnTest` for `core_library_tests::cudnn::CudnnTest`.
pub fn declared_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Generic parameters may contain `::` themselves; only strip the path before them.
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map(|idx| idx + 2).unwrap_or(0);
    &full[start..]
}
