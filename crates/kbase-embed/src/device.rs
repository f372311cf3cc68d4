use anyhow::{anyhow, Result};
use candle_core::Device;
use kbase_core::config::DeviceKind;

/// Resolve the configured compute device. Accelerators require the matching
/// cargo feature (`metal` / `cuda`); without it candle reports an error.
pub fn select_device(kind: DeviceKind) -> Result<Device> {
    let device = match kind {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Cuda => Device::new_cuda(0).map_err(|e| anyhow!("Failed to initialize CUDA device: {}", e))?,
        DeviceKind::Metal => Device::new_metal(0).map_err(|e| anyhow!("Failed to initialize Metal device: {}", e))?,
    };
    tracing::info!(device = ?kind, "embedding device selected");
    Ok(device)
}
