use std::env;
use std::ffi::{c_char, c_void, CStr};
use std::ptr::NonNull;

use cuda_env_core::library_test::version::VersionError;
use libloading::Library;
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Could not load {library} (tried {tried}): {message}")]
    NotFound {
        library: &'static str,
        tried: String,
        message: String,
    },

    #[error("Symbol '{symbol}' is missing from {library}: {source}")]
    MissingSymbol {
        library: &'static str,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("{library} is not loaded")]
    NotLoaded { library: &'static str },

    #[error("{call} failed with {status_name} ({status})")]
    Status {
        call: &'static str,
        status: i32,
        status_name: String,
    },

    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Where to look for a library: an environment override, then the usual
/// sonames for the platform.
pub struct LibrarySpec {
    pub display_name: &'static str,
    pub path_env: &'static str,
    pub candidates: &'static [&'static str],
}

impl LibrarySpec {
    /// The override alone when it is set, otherwise every candidate in order.
    pub fn search_list(&self) -> Vec<String> {
        match env::var(self.path_env) {
            Ok(path) if !path.trim().is_empty() => vec![path],
            _ => self.candidates.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A loaded shared library, kept open until dropped.
pub struct LoadedLibrary {
    name: &'static str,
    path: String,
    library: Library,
}

impl LoadedLibrary {
    pub fn open(spec: &LibrarySpec) -> Result<Self, LibraryError> {
        let search = spec.search_list();
        let mut last_error = String::from("no candidates");
        for path in &search {
            // Loading runs the library's initialisers; the CUDA libraries
            // have no initialisers with preconditions on the caller.
            match unsafe { Library::new(path) } {
                Ok(library) => {
                    info!("Loaded {} from {}", spec.display_name, path);
                    return Ok(Self {
                        name: spec.display_name,
                        path: path.clone(),
                        library,
                    });
                }
                Err(e) => {
                    debug!("Could not load {} from {}: {}", spec.display_name, path, e);
                    last_error = e.to_string();
                }
            }
        }
        Err(LibraryError::NotFound {
            library: spec.display_name,
            tried: search.join(", "),
            message: last_error,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up `symbol` and copy out the function pointer.
    ///
    /// # Safety
    /// `T` must be the exact C signature of the exported symbol, and the
    /// pointer must not be called after this library is dropped.
    pub unsafe fn function<T: Copy>(&self, symbol: &'static str) -> Result<T, LibraryError> {
        let mut name = Vec::with_capacity(symbol.len() + 1);
        name.extend_from_slice(symbol.as_bytes());
        name.push(0);
        self.library
            .get::<T>(&name)
            .map(|sym| *sym)
            .map_err(|source| LibraryError::MissingSymbol {
                library: self.name,
                symbol,
                source,
            })
    }
}

impl Drop for LoadedLibrary {
    fn drop(&mut self) {
        debug!("Unloading {} ({})", self.name, self.path);
    }
}

/// Copy a C string returned by a library into an owned `String`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
pub unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Opaque library handle such as `cudnnHandle_t`.
#[derive(Debug)]
pub struct RawHandle(NonNull<c_void>);

// A handle is moved, never shared, between a test and the blocking pool.
unsafe impl Send for RawHandle {}

impl RawHandle {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}
