//! Binding to the vendor's native HID library
//!
//! The library exports plain cdecl functions. Device paths come back as a
//! `SAFEARRAY` of `BSTR`, battery packets arrive through a callback on a
//! driver-owned thread.

use std::ffi::{c_char, c_int, c_void};
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use windows_sys::core::BSTR;
use windows_sys::Win32::Foundation::{
    FreeLibrary, SysAllocStringLen, SysFreeString, SysStringLen, HMODULE,
};
use windows_sys::Win32::System::Com::{
    CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED, SAFEARRAY,
};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows_sys::Win32::System::Ole::{
    SafeArrayDestroy, SafeArrayGetElement, SafeArrayGetLBound, SafeArrayGetUBound,
};

use crate::driver::VendorDriver;
use crate::error::TransportError;
use crate::route::{RouteSlot, ServerRoute};
use crate::types::{BatteryStatus, DriverEvent, DriverKind};

/// Battery status layout filled in by `CS_GetDeviceBatteryStatus`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct RawBatteryStatus {
    level: u8,
    is_charging: u8,
    bat_voltage: u16,
}

impl From<RawBatteryStatus> for BatteryStatus {
    fn from(raw: RawBatteryStatus) -> Self {
        Self {
            level: raw.level,
            charging: raw.is_charging != 0,
            voltage: raw.bat_voltage,
        }
    }
}

type GetDeviceBatteryStatusFn = unsafe extern "C" fn(*mut c_void, *mut RawBatteryStatus) -> bool;
type ReadBatteryLevelFn = unsafe extern "C" fn();
type ServerStartFn = unsafe extern "C" fn(*mut c_char, *mut c_char, *mut c_void);
type ServerExitFn = unsafe extern "C" fn();
type FindHidDevicesFn = unsafe extern "C" fn(*mut c_char, *mut c_char, c_int, c_int) -> *mut SAFEARRAY;
type GetDeviceOnLineFn = unsafe extern "C" fn(BSTR) -> bool;
type GetDeviceOnLineWithAddressFn = unsafe extern "C" fn(BSTR) -> *mut SAFEARRAY;

/// Resolved exports. Only enumeration is mandatory.
struct Exports {
    get_battery_status: Option<GetDeviceBatteryStatusFn>,
    read_battery_level: Option<ReadBatteryLevelFn>,
    server_start: Option<ServerStartFn>,
    server_exit: Option<ServerExitFn>,
    find_devices: FindHidDevicesFn,
    device_online: Option<GetDeviceOnLineFn>,
    device_online_with_address: Option<GetDeviceOnLineWithAddressFn>,
}

/// Route used by the C callback, which carries no user context
static CALLBACK_ROUTE: RouteSlot = RouteSlot::new();

unsafe extern "C" fn usb_data_received(
    pcmd: *mut c_void,
    cmd_len: c_int,
    pdata: *mut c_void,
    data_len: c_int,
) {
    if pcmd.is_null() || pdata.is_null() || cmd_len < 2 || data_len <= 0 {
        return;
    }
    let cmd = std::slice::from_raw_parts(pcmd as *const u8, cmd_len as usize);
    let data = std::slice::from_raw_parts(pdata as *const u8, data_len as usize);
    CALLBACK_ROUTE.dispatch(cmd, data);
}

/// Look up an export by its nul-terminated name
unsafe fn resolve<F: Copy>(module: HMODULE, name: &'static [u8]) -> Option<F> {
    debug_assert_eq!(name.last(), Some(&0));
    let proc = GetProcAddress(module, name.as_ptr())?;
    Some(std::mem::transmute_copy(&proc))
}

fn c_string(value: &str) -> Result<Vec<u8>, TransportError> {
    if value.as_bytes().contains(&0) {
        return Err(TransportError::InvalidPath(value.to_string()));
    }
    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
    Ok(buf)
}

/// BSTR allocated for a call and freed afterwards
struct OwnedBstr(BSTR);

impl OwnedBstr {
    fn new(value: &str) -> Option<Self> {
        let wide: Vec<u16> = value.encode_utf16().collect();
        let bstr = unsafe { SysAllocStringLen(wide.as_ptr(), wide.len() as u32) };
        (!bstr.is_null()).then_some(Self(bstr))
    }
}

impl Drop for OwnedBstr {
    fn drop(&mut self) {
        unsafe { SysFreeString(self.0) };
    }
}

unsafe fn array_bounds(array: *const SAFEARRAY) -> Option<(i32, i32)> {
    let mut lower = 0i32;
    let mut upper = -1i32;
    if SafeArrayGetLBound(array, 1, &mut lower) < 0 || SafeArrayGetUBound(array, 1, &mut upper) < 0
    {
        return None;
    }
    Some((lower, upper))
}

/// Copy out and destroy a `SAFEARRAY` of `BSTR`
unsafe fn take_string_array(array: *mut SAFEARRAY) -> Vec<String> {
    let mut out = Vec::new();
    if let Some((lower, upper)) = array_bounds(array) {
        for index in lower..=upper {
            let mut element: BSTR = std::ptr::null();
            let hr = SafeArrayGetElement(array, &index, &mut element as *mut BSTR as *mut c_void);
            if hr < 0 || element.is_null() {
                continue;
            }
            let len = SysStringLen(element) as usize;
            out.push(String::from_utf16_lossy(std::slice::from_raw_parts(
                element, len,
            )));
            SysFreeString(element);
        }
    }
    SafeArrayDestroy(array);
    out
}

/// Copy out and destroy a `SAFEARRAY` of bytes
unsafe fn take_byte_array(array: *mut SAFEARRAY) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some((lower, upper)) = array_bounds(array) {
        for index in lower..=upper {
            let mut byte = 0u8;
            if SafeArrayGetElement(array, &index, &mut byte as *mut u8 as *mut c_void) >= 0 {
                out.push(byte);
            }
        }
    }
    SafeArrayDestroy(array);
    out
}

/// Vendor library loaded into the process
pub struct NativeDriver {
    module: HMODULE,
    exports: Exports,
    com_initialized: bool,
}

// The module handle and export pointers are process-global and immutable
// after load; all mutable state lives behind CALLBACK_ROUTE.
unsafe impl Send for NativeDriver {}
unsafe impl Sync for NativeDriver {}

impl NativeDriver {
    /// Load the library and resolve its exports.
    ///
    /// Fails when the library cannot be loaded or lacks the enumeration
    /// export; every other export is optional.
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
        let module = unsafe { LoadLibraryW(wide.as_ptr()) };
        if module.is_null() {
            return Err(TransportError::LibraryNotFound(path.display().to_string()));
        }

        let find_devices = unsafe {
            resolve::<FindHidDevicesFn>(module, b"CS_UsbFinder_FindHidDevicesByDeviceId\0")
        };
        let Some(find_devices) = find_devices else {
            unsafe { FreeLibrary(module) };
            return Err(TransportError::EntryPointMissing(
                "CS_UsbFinder_FindHidDevicesByDeviceId",
            ));
        };

        let exports = unsafe {
            Exports {
                get_battery_status: resolve(module, b"CS_GetDeviceBatteryStatus\0"),
                read_battery_level: resolve(module, b"CS_UsbServer_ReadBatteryLevel\0"),
                server_start: resolve(module, b"CS_UsbServer_Start\0"),
                server_exit: resolve(module, b"CS_UsbServer_Exit\0"),
                find_devices,
                device_online: resolve(module, b"CS_UsbFinder_GetDeviceOnLine\0"),
                device_online_with_address: resolve(
                    module,
                    b"CS_UsbFinder_GetDeviceOnLineWithAddress\0",
                ),
            }
        };

        for (name, present) in [
            ("CS_GetDeviceBatteryStatus", exports.get_battery_status.is_some()),
            ("CS_UsbServer_ReadBatteryLevel", exports.read_battery_level.is_some()),
            ("CS_UsbServer_Start", exports.server_start.is_some()),
            ("CS_UsbFinder_GetDeviceOnLine", exports.device_online.is_some()),
        ] {
            if !present {
                warn!("Vendor library lacks {name}");
            }
        }

        // S_OK and S_FALSE both need a matching CoUninitialize
        let hr = unsafe { CoInitializeEx(std::ptr::null(), COINIT_APARTMENTTHREADED) };
        Ok(Self {
            module,
            exports,
            com_initialized: hr >= 0,
        })
    }
}

impl VendorDriver for NativeDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Native
    }

    fn find_devices(
        &self,
        vid: &str,
        pid: &str,
        interface_id: i32,
        device_id: i32,
    ) -> Result<Vec<String>, TransportError> {
        let mut vid = c_string(vid)?;
        let mut pid = c_string(pid)?;
        let array = unsafe {
            (self.exports.find_devices)(
                vid.as_mut_ptr().cast(),
                pid.as_mut_ptr().cast(),
                interface_id,
                device_id,
            )
        };
        if array.is_null() {
            return Ok(Vec::new());
        }
        Ok(unsafe { take_string_array(array) })
    }

    fn is_device_online(&self, device_path: &str) -> bool {
        let Some(online) = self.exports.device_online else {
            return false;
        };
        match OwnedBstr::new(device_path) {
            Some(path) => unsafe { online(path.0) },
            None => false,
        }
    }

    fn device_address(&self, device_path: &str) -> Option<Vec<u8>> {
        let with_address = self.exports.device_online_with_address?;
        let path = OwnedBstr::new(device_path)?;
        let array = unsafe { with_address(path.0) };
        if array.is_null() {
            return None;
        }
        let address = unsafe { take_byte_array(array) };
        (!address.is_empty()).then_some(address)
    }

    fn start_server(
        &self,
        device_path: &str,
        events: mpsc::Sender<DriverEvent>,
    ) -> Result<(), TransportError> {
        let start = self
            .exports
            .server_start
            .ok_or(TransportError::EntryPointMissing("CS_UsbServer_Start"))?;
        let mut path = c_string(device_path)?;
        let mut path2 = path.clone();

        CALLBACK_ROUTE.install(ServerRoute::new(device_path, events));
        let callback: unsafe extern "C" fn(*mut c_void, c_int, *mut c_void, c_int) =
            usb_data_received;
        unsafe {
            start(
                path.as_mut_ptr().cast(),
                path2.as_mut_ptr().cast(),
                callback as *mut c_void,
            )
        };
        debug!("Battery server started on {device_path}");
        Ok(())
    }

    fn stop_server(&self) {
        if let Some(exit) = self.exports.server_exit {
            unsafe { exit() };
        }
        CALLBACK_ROUTE.clear();
    }

    fn request_battery_level(&self) -> Result<(), TransportError> {
        if !CALLBACK_ROUTE.is_active() {
            return Err(TransportError::ServerNotRunning);
        }
        let read = self
            .exports
            .read_battery_level
            .ok_or(TransportError::EntryPointMissing("CS_UsbServer_ReadBatteryLevel"))?;
        unsafe { read() };
        Ok(())
    }

    fn decode_battery(&self, data: &[u8]) -> Option<BatteryStatus> {
        let Some(decode) = self.exports.get_battery_status else {
            return BatteryStatus::from_raw(data);
        };
        if data.is_empty() {
            return None;
        }
        let mut buf = data.to_vec();
        let mut raw = RawBatteryStatus::default();
        let ok = unsafe { decode(buf.as_mut_ptr().cast(), &mut raw) };
        ok.then(|| raw.into())
    }
}

impl Drop for NativeDriver {
    fn drop(&mut self) {
        self.stop_server();
        unsafe {
            FreeLibrary(self.module);
            if self.com_initialized {
                CoUninitialize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library() {
        let result = NativeDriver::load(Path::new("definitely-not-here-hidusb.dll"));
        assert!(matches!(result, Err(TransportError::LibraryNotFound(_))));
    }

    #[test]
    fn test_c_string_rejects_interior_nul() {
        assert!(c_string("a\0b").is_err());
        assert_eq!(c_string("3554").unwrap(), b"3554\0");
    }

    #[test]
    fn test_raw_status_conversion() {
        let raw = RawBatteryStatus {
            level: 85,
            is_charging: 1,
            bat_voltage: 4000,
        };
        let status: BatteryStatus = raw.into();
        assert_eq!(status.level, 85);
        assert!(status.charging);
        assert_eq!(status.voltage, 4000);
    }
}
