//! rusb-backed transport for the physical meter.

use std::time::Duration;

use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::modules::constants::{INTERFACE_NUMBER, USB_PID, USB_VID};
use crate::modules::error::MeterError;
use crate::modules::transport::Transport;
use crate::modules::types::DeviceInfo;

/// Open handle on the meter plus its two discovered endpoint addresses.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    out_endpoint: u8,
    in_endpoint: u8,
}

impl UsbTransport {
    /// Find the meter on the bus, open it and read its endpoint pair.
    ///
    /// The first device matching the vendor/product pair wins, in
    /// enumeration order. The endpoints are taken from
    /// configuration 0 / interface 0 / alternate setting 0:
    /// endpoint 0 is OUT, endpoint 1 is IN.
    pub fn open(context: &Context) -> Result<Self, MeterError> {
        let device = find_meter(context)?;
        let (out_endpoint, in_endpoint) = endpoint_pair(&device)?;
        log::debug!(
            "endpoints: OUT=0x{:02x}, IN=0x{:02x}",
            out_endpoint,
            in_endpoint
        );

        let handle = device.open().map_err(MeterError::OpenFailed)?;

        // The CP210x bridge usually enumerates with the kernel serial
        // driver bound; it must be detached before the claim.
        if let Ok(true) = handle.kernel_driver_active(INTERFACE_NUMBER) {
            log::debug!("detaching kernel driver from interface {INTERFACE_NUMBER}");
            if let Err(e) = handle.detach_kernel_driver(INTERFACE_NUMBER) {
                log::warn!("failed to detach kernel driver: {e}");
            }
        }

        Ok(Self {
            handle,
            out_endpoint,
            in_endpoint,
        })
    }
}

impl Transport for UsbTransport {
    fn reset(&mut self) -> Result<(), MeterError> {
        self.handle.reset().map_err(MeterError::ResetFailed)
    }

    fn set_configuration(&mut self, config: u8) -> Result<(), MeterError> {
        self.handle
            .set_active_configuration(config)
            .map_err(MeterError::ConfigFailed)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), MeterError> {
        self.handle
            .claim_interface(interface)
            .map_err(MeterError::ClaimFailed)
    }

    fn control_transfer(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        timeout: Duration,
    ) -> Result<(), MeterError> {
        self.handle
            .write_control(request_type, request, value, index, &[], timeout)
            .map(|_| ())
            .map_err(MeterError::ControlFailed)
    }

    fn bulk_write(&mut self, data: &[u8], timeout: Duration) -> Result<usize, MeterError> {
        self.handle
            .write_bulk(self.out_endpoint, data, timeout)
            .map_err(MeterError::WriteFailed)
    }

    fn bulk_read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, MeterError> {
        self.handle
            .read_bulk(self.in_endpoint, buf, timeout)
            .map_err(MeterError::ReadFailed)
    }
}

/// Scan the bus for the first device matching the meter's VID/PID.
fn find_meter(context: &Context) -> Result<Device<Context>, MeterError> {
    for device in context
        .devices()
        .map_err(MeterError::Enumeration)?
        .iter()
    {
        if let Ok(desc) = device.device_descriptor() {
            if desc.vendor_id() == USB_VID && desc.product_id() == USB_PID {
                return Ok(device);
            }
        }
    }
    Err(MeterError::DeviceNotFound {
        vid: USB_VID,
        pid: USB_PID,
    })
}

/// Bulk endpoint pair of configuration 0 / interface 0 / alt setting 0.
fn endpoint_pair(device: &Device<Context>) -> Result<(u8, u8), MeterError> {
    let config = device.config_descriptor(0).map_err(MeterError::Descriptor)?;
    let interface = config.interfaces().next().ok_or(MeterError::EndpointsMissing)?;
    let alt = interface
        .descriptors()
        .next()
        .ok_or(MeterError::EndpointsMissing)?;
    let mut endpoints = alt.endpoint_descriptors();
    let out = endpoints.next().ok_or(MeterError::EndpointsMissing)?.address();
    let input = endpoints.next().ok_or(MeterError::EndpointsMissing)?.address();
    Ok((out, input))
}

/// List every enumerated device, for the not-found diagnostic path.
pub fn scan_devices(context: &Context) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    match context.devices() {
        Ok(list) => {
            for device in list.iter() {
                if let Ok(desc) = device.device_descriptor() {
                    devices.push(DeviceInfo {
                        vid: desc.vendor_id(),
                        pid: desc.product_id(),
                        info: format!("{:04x}:{:04x}", desc.vendor_id(), desc.product_id()),
                    });
                }
            }
        }
        Err(e) => {
            log::error!("failed to list devices: {e}");
        }
    }
    devices
}
