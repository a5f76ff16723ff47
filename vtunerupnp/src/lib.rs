//! # vtunerupnp - Présence UPnP du tuner
//!
//! - [`ssdp`] : annonces SSDP (`NOTIFY ssdp:alive` périodiques, réponses aux
//!   `M-SEARCH`, `ssdp:byebye` à l'arrêt)
//! - [`description`] : document de description du root device
//!   (`/device.xml`)

pub mod description;
pub mod ssdp;

pub use description::{DeviceDescription, render_description};
pub use ssdp::{AnnouncerHandle, SsdpAnnouncer, SsdpDevice};
