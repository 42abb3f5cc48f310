// ============================================================
// Layer 2 — Backend Dispatch
// ============================================================
// `system.device` picks the Burn backend once, at the top of a
// use case; everything below is generic over B:
//
//   cpu          → Autodiff<NdArray>   (NdArrayDevice::Cpu)
//   wgpu | auto  → Autodiff<Wgpu>      (WgpuDevice::default())
//
// model.valid() gives the matching inner backend for evaluation.
//
// Reference: Burn Book §4 (Backends)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};

use crate::domain::config::ComputeTarget;

pub type CpuBackend = Autodiff<NdArray>;
pub type GpuBackend = Autodiff<Wgpu>;

/// Work that can run on any autodiff backend.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output>;
}

pub fn dispatch<T: BackendTask>(target: ComputeTarget, task: T) -> Result<T::Output> {
    match target {
        ComputeTarget::Cpu => {
            tracing::info!("Using NdArray CPU backend");
            task.run::<CpuBackend>(NdArrayDevice::Cpu)
        }
        ComputeTarget::Wgpu | ComputeTarget::Auto => {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            task.run::<GpuBackend>(device)
        }
    }
}
