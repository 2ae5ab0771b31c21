use std::ffi::{c_char, c_int, c_void};
use std::ptr;
use std::sync::Arc;

use async_trait::async_trait;
use cuda_env_core::kernel::constants::CUDNN_LIBRARY_PATH_ENV;
use cuda_env_core::library_test::{
    run_blocking, LibraryTest, LibraryVersion, PhaseResult, VersionPolicy,
};
use log::{info, warn};

use crate::dylib::{c_string, LibraryError, LibrarySpec, LoadedLibrary, RawHandle};

const LIBRARY_NAME: &str = "cuDNN";
const LIBRARY_VERSION: &str = "9.5.1";
const CUDNN_STATUS_SUCCESS: c_int = 0;

#[cfg(windows)]
const CANDIDATES: &[&str] = &["cudnn64_9.dll", "cudnn64_8.dll", "cudnn.dll"];
#[cfg(not(windows))]
const CANDIDATES: &[&str] = &["libcudnn.so.9", "libcudnn.so.8", "libcudnn.so"];

const CUDNN: LibrarySpec = LibrarySpec {
    display_name: LIBRARY_NAME,
    path_env: CUDNN_LIBRARY_PATH_ENV,
    candidates: CANDIDATES,
};

type GetVersionFn = unsafe extern "C" fn() -> usize;
type CreateFn = unsafe extern "C" fn(*mut *mut c_void) -> c_int;
type DestroyFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type GetErrorStringFn = unsafe extern "C" fn(c_int) -> *const c_char;

/// Entry points resolved from a loaded cuDNN. Every copy keeps the library
/// mapped, so work abandoned by a phase timeout never outlives it.
#[derive(Clone)]
struct CudnnApi {
    get_version: GetVersionFn,
    create: CreateFn,
    destroy: DestroyFn,
    get_error_string: GetErrorStringFn,
    library: Arc<LoadedLibrary>,
}

impl CudnnApi {
    fn bind(library: LoadedLibrary) -> Result<Self, LibraryError> {
        let library = Arc::new(library);
        let (get_version, create, destroy, get_error_string) = unsafe {
            (
                library.function::<GetVersionFn>("cudnnGetVersion")?,
                library.function::<CreateFn>("cudnnCreate")?,
                library.function::<DestroyFn>("cudnnDestroy")?,
                library.function::<GetErrorStringFn>("cudnnGetErrorString")?,
            )
        };
        Ok(Self {
            get_version,
            create,
            destroy,
            get_error_string,
            library,
        })
    }

    fn check(&self, call: &'static str, status: c_int) -> Result<(), LibraryError> {
        if status == CUDNN_STATUS_SUCCESS {
            return Ok(());
        }
        let status_name = unsafe { c_string((self.get_error_string)(status)) }
            .unwrap_or_else(|| format!("CUDNN_STATUS_{}", status));
        Err(LibraryError::Status {
            call,
            status,
            status_name,
        })
    }

    fn version(&self) -> usize {
        unsafe { (self.get_version)() }
    }

    fn create_handle(&self) -> Result<Option<RawHandle>, LibraryError> {
        let mut raw: *mut c_void = ptr::null_mut();
        let status = unsafe { (self.create)(&mut raw) };
        self.check("cudnnCreate", status)?;
        Ok(RawHandle::new(raw))
    }

    fn destroy_handle(&self, handle: RawHandle) -> Result<(), LibraryError> {
        let status = unsafe { (self.destroy)(handle.as_ptr()) };
        self.check("cudnnDestroy", status)
    }
}

/// Decode `cudnnGetVersion()`.
///
/// From 9.0 the packing is `major * 10000 + minor * 100 + patch`; earlier
/// releases used `major * 1000 + minor * 100 + patch`.
pub fn decode_cudnn_version(raw: usize) -> LibraryVersion {
    let raw = raw as u64;
    if raw >= 90_000 {
        LibraryVersion::new(raw / 10_000, (raw % 10_000) / 100, raw % 100)
    } else {
        LibraryVersion::new(raw / 1_000, (raw % 1_000) / 100, raw % 100)
    }
}

/// Checks that cuDNN loads, reports the expected major.minor and can create
/// a handle.
#[derive(Default)]
pub struct CudnnTest {
    handle: Option<RawHandle>,
    api: Option<CudnnApi>,
}

impl CudnnTest {
    fn api(&self) -> Result<CudnnApi, LibraryError> {
        self.api.clone().ok_or(LibraryError::NotLoaded {
            library: LIBRARY_NAME,
        })
    }

    async fn destroy_handle(&mut self) -> PhaseResult {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let api = self.api()?;
        run_blocking(move || api.destroy_handle(handle)).await??;
        Ok(())
    }
}

#[async_trait]
impl LibraryTest for CudnnTest {
    fn library_name(&self) -> &str {
        LIBRARY_NAME
    }

    fn library_version(&self) -> &str {
        LIBRARY_VERSION
    }

    async fn initialize(&mut self) -> PhaseResult {
        let library = run_blocking(|| LoadedLibrary::open(&CUDNN)).await??;
        self.api = Some(CudnnApi::bind(library)?);
        Ok(())
    }

    async fn verify_version(&mut self) -> PhaseResult {
        let api = self.api()?;
        let raw = run_blocking(move || api.version()).await?;
        let found = decode_cudnn_version(raw);
        let expected = LibraryVersion::parse(LIBRARY_VERSION)?;
        info!("cuDNN reports version {} (raw {})", found, raw);
        VersionPolicy::SameMinor.check(&expected, &found)?;
        Ok(())
    }

    async fn execute_tests(&mut self) -> PhaseResult {
        let api = self.api()?;
        self.handle = run_blocking(move || api.create_handle()).await??;
        if self.handle.is_none() {
            warn!("cudnnCreate succeeded but returned a null handle");
        }
        self.destroy_handle().await?;
        info!("cuDNN handle created and destroyed");
        Ok(())
    }

    async fn cleanup(&mut self) -> PhaseResult {
        let result = self.destroy_handle().await;
        if let Some(api) = self.api.take() {
            info!("Releasing {} from {}", LIBRARY_NAME, api.library.path());
        }
        result
    }
}
