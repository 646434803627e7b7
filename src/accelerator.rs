use serde::Serialize;
use std::path::Path;
use tracing::debug;

const NVIDIA_GPUS_DIR: &str = "/proc/driver/nvidia/gpus";
const NVIDIA_DEVICE: &str = "/dev/nvidia0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcceleratorInfo {
    pub available: bool,
    pub name: Option<String>,
}

impl AcceleratorInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }
}

/// Probes the NVIDIA driver's procfs entries. Only reported on the status
/// endpoints; inference placement is up to the provider.
pub fn detect() -> AcceleratorInfo {
    detect_in(Path::new(NVIDIA_GPUS_DIR), Path::new(NVIDIA_DEVICE))
}

fn detect_in(gpus_dir: &Path, device: &Path) -> AcceleratorInfo {
    let name = std::fs::read_dir(gpus_dir)
        .ok()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| std::fs::read_to_string(entry.path().join("information")).ok())
        .find_map(|info| parse_gpu_model(&info));

    let available = name.is_some() || device.exists();
    debug!("Accelerator probe: available={}, name={:?}", available, name);
    AcceleratorInfo { available, name }
}

/// Extracts the `Model:` line of a driver information file.
pub fn parse_gpu_model(information: &str) -> Option<String> {
    information.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Model")
            .then(|| value.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}
