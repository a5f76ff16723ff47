//! Small host helpers shared by the VTuner crates.
//!
//! - [`guess_local_ip`] : the address used for outgoing traffic, used when the
//!   configuration does not pin a base URL
//! - [`advertise_host`] : the host clients should be given for a listen address
//! - [`get_os_string`] : `OS/version`, used in the SSDP `SERVER` header

mod ip_utils;

pub use ip_utils::{advertise_host, guess_local_ip};

/// Returns a string describing the operating system and its version.
///
/// # Format
/// - macOS: "Macos/15.1"
/// - Linux: "Ubuntu/22.04" or "Linux/6.5.0"
/// - Windows: "Windows/10.0.19045"
/// - Other: "{OS}/Unknown"
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}

/// Value of the `SERVER` header sent with SSDP messages.
///
/// UPnP requires `<OS>/<version> UPnP/<version> <product>/<version>`.
pub fn upnp_server_string(product: &str, version: &str) -> String {
    format!("{} UPnP/1.0 {}/{}", get_os_string(), product, version)
}
