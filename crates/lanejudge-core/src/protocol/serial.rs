//! Serial port handling
//!
//! Lane timers talk 7N2 at low baud rates, usually through a USB-to-serial
//! adapter. This module opens the port with those settings and helps the
//! operator find which device node the timer landed on.

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Driver-level read timeout. Line reads retry past it, so it only bounds
/// how long a single `read` call sits in the kernel.
const PORT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A device node the timer might be attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path, e.g. "/dev/ttyUSB0"
    pub name: String,

    /// USB `vendor:product` id in hex, e.g. "0403:6001"
    pub usb_id: Option<String>,

    /// Product string reported by a USB adapter
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                usb_id: Some(format!("{:04x}:{:04x}", usb.vid, usb.pid)),
                product: usb.product,
            },
            _ => Self::node(info.port_name),
        }
    }
}

impl PortInfo {
    fn node(name: String) -> Self {
        Self {
            name,
            usb_id: None,
            product: None,
        }
    }
}

/// How likely a device node is to be the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PortKind {
    /// USB-to-serial adapter (FTDI, PL2303, CH340...)
    Adapter,
    /// USB CDC-ACM device
    Modem,
    /// On-board UART or anything else
    Other,
}

/// Classify a device node by its basename, with the node number if any
fn classify(name: &str) -> (PortKind, Option<usize>) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let numbered = |rest: &str| rest.parse::<usize>().ok();

    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        (PortKind::Adapter, numbered(rest))
    } else if let Some(rest) = basename.strip_prefix("ttyACM") {
        (PortKind::Modem, numbered(rest))
    } else {
        (PortKind::Other, None)
    }
}

/// Likely timer ports first; ttyUSB10 after ttyUSB2. Duplicates keep the
/// entry that came first, which is the richer enumerated one.
fn order_ports(mut ports: Vec<PortInfo>) -> Vec<PortInfo> {
    ports.sort_by(|a, b| {
        let (a_kind, a_num) = classify(&a.name);
        let (b_kind, b_num) = classify(&b.name);
        a_kind
            .cmp(&b_kind)
            .then(a_num.unwrap_or(usize::MAX).cmp(&b_num.unwrap_or(usize::MAX)))
            .then_with(|| a.name.cmp(&b.name))
    });
    ports.dedup_by(|later, earlier| later.name == earlier.name);
    ports
}

/// Adapter and modem nodes present in /dev, for systems where enumeration
/// comes up empty (no libudev)
#[cfg(target_os = "linux")]
fn scan_dev() -> Vec<PortInfo> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| classify(name).0 != PortKind::Other)
        .map(|name| PortInfo::node(format!("/dev/{}", name)))
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn scan_dev() -> Vec<PortInfo> {
    Vec::new()
}

/// Serial ports that could host a timer, most likely first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.extend(scan_dev());
    order_ports(ports)
}

/// Open a serial port with the timer's line settings (7 data bits, 2 stop bits, no parity)
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    serialport::new(name, baud)
        .data_bits(DataBits::Seven)
        .stop_bits(StopBits::Two)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .timeout(PORT_READ_TIMEOUT)
        .open()
        .map_err(|e| ProtocolError::OpenFailed {
            port: name.to_string(),
            reason: e.to_string(),
        })
}
