use anyhow::{Context, Result};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

// Takes a device name and finds that device on the default host, or falls
// back to the host's default device when no name is given.
pub fn get_or_default_input(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(name) => host
            .input_devices()?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .with_context(|| format!("input device '{name}' not found")),
        None => host
            .default_input_device()
            .context("no default audio input device"),
    }
}

pub fn get_or_default_output(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match device_name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .with_context(|| format!("output device '{name}' not found")),
        None => host
            .default_output_device()
            .context("no default audio output device"),
    }
}
