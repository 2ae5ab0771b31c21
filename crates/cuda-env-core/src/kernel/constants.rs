/// Application name
pub const APP_NAME: &str = "CUDA Environment Tester";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the library test lifecycle template
pub const TEMPLATE_VERSION: &str = "1.0.0";

/// Exit code when every step of the run succeeded
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code when enumeration, a device, discovery or a library test failed
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for configuration and command-line errors
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// Environment variable that overrides the cuDNN shared library location
pub const CUDNN_LIBRARY_PATH_ENV: &str = "CUDNN_LIBRARY_PATH";

/// Environment variable that overrides the cuBLAS shared library location
pub const CUBLAS_LIBRARY_PATH_ENV: &str = "CUBLAS_LIBRARY_PATH";
