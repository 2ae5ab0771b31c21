use std::ffi::{c_int, c_void};
use std::ptr;
use std::sync::Arc;

use async_trait::async_trait;
use cuda_env_core::kernel::constants::CUBLAS_LIBRARY_PATH_ENV;
use cuda_env_core::library_test::{
    run_blocking, LibraryTest, LibraryVersion, PhaseResult, VersionPolicy,
};
use log::info;

use crate::dylib::{LibraryError, LibrarySpec, LoadedLibrary, RawHandle};

const LIBRARY_NAME: &str = "cuBLAS";
const LIBRARY_VERSION: &str = "12.4.5";

#[cfg(windows)]
const CANDIDATES: &[&str] = &["cublas64_12.dll", "cublas64_11.dll", "cublas.dll"];
#[cfg(not(windows))]
const CANDIDATES: &[&str] = &["libcublas.so.12", "libcublas.so.11", "libcublas.so"];

const CUBLAS: LibrarySpec = LibrarySpec {
    display_name: LIBRARY_NAME,
    path_env: CUBLAS_LIBRARY_PATH_ENV,
    candidates: CANDIDATES,
};

type CreateFn = unsafe extern "C" fn(*mut *mut c_void) -> c_int;
type DestroyFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type GetVersionFn = unsafe extern "C" fn(*mut c_void, *mut c_int) -> c_int;

/// Entry points resolved from a loaded cuBLAS. Every copy keeps the library
/// mapped.
#[derive(Clone)]
struct CublasApi {
    create: CreateFn,
    destroy: DestroyFn,
    get_version: GetVersionFn,
    library: Arc<LoadedLibrary>,
}

impl CublasApi {
    fn bind(library: LoadedLibrary) -> Result<Self, LibraryError> {
        let library = Arc::new(library);
        let (create, destroy, get_version) = unsafe {
            (
                library.function::<CreateFn>("cublasCreate_v2")?,
                library.function::<DestroyFn>("cublasDestroy_v2")?,
                library.function::<GetVersionFn>("cublasGetVersion_v2")?,
            )
        };
        Ok(Self {
            create,
            destroy,
            get_version,
            library,
        })
    }

    fn create_handle(&self) -> Result<*mut c_void, LibraryError> {
        let mut raw: *mut c_void = ptr::null_mut();
        check("cublasCreate_v2", unsafe { (self.create)(&mut raw) })?;
        Ok(raw)
    }

    fn destroy_handle(&self, handle: RawHandle) -> Result<(), LibraryError> {
        check("cublasDestroy_v2", unsafe { (self.destroy)(handle.as_ptr()) })
    }

    /// The version query needs a handle of its own.
    fn version(&self) -> Result<c_int, LibraryError> {
        let handle = self.create_handle()?;
        let mut raw: c_int = 0;
        let status = unsafe { (self.get_version)(handle, &mut raw) };
        // The handle is released before either status is reported.
        let destroyed = match RawHandle::new(handle) {
            Some(handle) => self.destroy_handle(handle),
            None => Ok(()),
        };
        check("cublasGetVersion_v2", status)?;
        destroyed?;
        Ok(raw)
    }
}

/// Decode `cublasGetVersion_v2`: `major * 10000 + minor * 100 + patch`.
pub fn decode_cublas_version(raw: c_int) -> LibraryVersion {
    let raw = raw.max(0) as u64;
    LibraryVersion::new(raw / 10_000, (raw % 10_000) / 100, raw % 100)
}

/// Name of a `cublasStatus_t` value.
pub fn cublas_status_name(status: c_int) -> String {
    let name = match status {
        0 => "CUBLAS_STATUS_SUCCESS",
        1 => "CUBLAS_STATUS_NOT_INITIALIZED",
        3 => "CUBLAS_STATUS_ALLOC_FAILED",
        7 => "CUBLAS_STATUS_INVALID_VALUE",
        8 => "CUBLAS_STATUS_ARCH_MISMATCH",
        11 => "CUBLAS_STATUS_MAPPING_ERROR",
        13 => "CUBLAS_STATUS_EXECUTION_FAILED",
        14 => "CUBLAS_STATUS_INTERNAL_ERROR",
        15 => "CUBLAS_STATUS_NOT_SUPPORTED",
        16 => "CUBLAS_STATUS_LICENSE_ERROR",
        other => return format!("CUBLAS_STATUS_{}", other),
    };
    name.to_string()
}

fn check(call: &'static str, status: c_int) -> Result<(), LibraryError> {
    if status == 0 {
        Ok(())
    } else {
        Err(LibraryError::Status {
            call,
            status,
            status_name: cublas_status_name(status),
        })
    }
}

/// Checks that cuBLAS loads, reports the expected major.minor and can create
/// a handle.
#[derive(Default)]
pub struct CublasTest {
    handle: Option<RawHandle>,
    api: Option<CublasApi>,
}

impl CublasTest {
    fn api(&self) -> Result<CublasApi, LibraryError> {
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
impl LibraryTest for CublasTest {
    fn library_name(&self) -> &str {
        LIBRARY_NAME
    }

    fn library_version(&self) -> &str {
        LIBRARY_VERSION
    }

    async fn initialize(&mut self) -> PhaseResult {
        let library = run_blocking(|| LoadedLibrary::open(&CUBLAS)).await??;
        self.api = Some(CublasApi::bind(library)?);
        Ok(())
    }

    async fn verify_version(&mut self) -> PhaseResult {
        let api = self.api()?;
        let raw = run_blocking(move || api.version()).await??;
        let found = decode_cublas_version(raw);
        let expected = LibraryVersion::parse(LIBRARY_VERSION)?;
        info!("cuBLAS reports version {} (raw {})", found, raw);
        VersionPolicy::SameMinor.check(&expected, &found)?;
        Ok(())
    }

    async fn execute_tests(&mut self) -> PhaseResult {
        let api = self.api()?;
        let handle = run_blocking(move || api.create_handle().map(RawHandle::new)).await??;
        self.handle = handle;
        self.destroy_handle().await?;
        info!("cuBLAS handle created and destroyed");
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
