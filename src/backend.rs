//! Backend abstraction
//!
//! NdArray (CPU) is the default inference backend; the `cuda` feature switches
//! to the Burn CUDA backend.

use burn::tensor::backend::Backend;

#[cfg(feature = "cuda")]
pub type InferenceBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

#[cfg(all(not(feature = "cuda"), not(feature = "ndarray")))]
compile_error!("At least one backend (cuda or ndarray) must be enabled!");

/// Get the default device
pub fn default_device() -> <InferenceBackend as Backend>::Device {
    <InferenceBackend as Backend>::Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "cuda")]
    {
        "CUDA (GPU)"
    }

    #[cfg(all(not(feature = "cuda"), feature = "ndarray"))]
    {
        "NdArray (CPU)"
    }
}
