//! Device detection and report reading

use crate::error::{Result, ShuttleError};
use hidapi::HidApi;
use tracing::{debug, info};

/// Information about a detected HID device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: String,
    pub product: String,
    pub interface_number: i32,
}

impl DeviceInfo {
    fn from_hid(device: &hidapi::DeviceInfo) -> Self {
        Self {
            path: device.path().to_string_lossy().to_string(),
            vendor_id: device.vendor_id(),
            product_id: device.product_id(),
            manufacturer: device.manufacturer_string().unwrap_or_default().to_string(),
            product: device.product_string().unwrap_or_default().to_string(),
            interface_number: device.interface_number(),
        }
    }
}

fn hid_api() -> Result<HidApi> {
    HidApi::new().map_err(|e| ShuttleError::DeviceRead(format!("failed to initialize HID API: {e}")))
}

/// List all connected HID devices from one vendor
pub fn list_devices(vendor_id: u16) -> Result<Vec<DeviceInfo>> {
    let api = hid_api()?;
    Ok(api
        .device_list()
        .filter(|d| d.vendor_id() == vendor_id)
        .map(DeviceInfo::from_hid)
        .collect())
}

/// Source of raw input reports
pub trait ReportSource {
    /// Read one report into `buf` without blocking. Returns the number of
    /// bytes read; 0 means no report was pending.
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Handle to an open jog/shuttle controller
pub struct ShuttleDevice {
    handle: hidapi::HidDevice,
    info: DeviceInfo,
}

impl ShuttleDevice {
    /// Open the first device matching vendor/product id in non-blocking mode
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self> {
        let api = hid_api()?;

        let info = api
            .device_list()
            .find(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(DeviceInfo::from_hid);
        let Some(info) = info else {
            return Err(ShuttleError::DeviceNotFound { vendor_id, product_id });
        };
        debug!("Candidate device: {:?}", info);

        let handle = api
            .open(vendor_id, product_id)
            .map_err(|source| ShuttleError::DeviceOpen {
                vendor_id,
                product_id,
                source,
            })?;
        handle
            .set_blocking_mode(false)
            .map_err(|source| ShuttleError::DeviceOpen {
                vendor_id,
                product_id,
                source,
            })?;

        info!(
            "Opened {} {} ({:04x}:{:04x})",
            info.manufacturer, info.product, vendor_id, product_id
        );
        Ok(Self { handle, info })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

impl ReportSource for ShuttleDevice {
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.handle
            .read(buf)
            .map_err(|e| ShuttleError::DeviceRead(e.to_string()))
    }
}
