//! Hardware-dependent tests that require a real ShuttlePRO
//!
//! These tests are ignored by default and can be run with:
//! `cargo test -- --ignored`
//!
//! They require:
//! - A connected Contour ShuttlePRO v2
//! - Read access to its /dev/hidraw node
//! - uinput module loaded (for the virtual keyboard test)

use shuttlelinux::device::{self, ReportSource, ShuttleDevice};
use shuttlelinux::inject::UinputKeyboard;
use shuttlelinux::protocol::{CONTOUR_VENDOR_ID, READ_BUFFER_SIZE, SHUTTLEPRO_V2_PID};
use std::time::{Duration, Instant};

/// Test device detection with real hardware
#[test]
#[ignore]
fn test_real_device_detection() {
    let devices = device::list_devices(CONTOUR_VENDOR_ID).expect("HID API available");
    println!("Found {} Contour device(s)", devices.len());
    for d in &devices {
        println!("  {:04x}:{:04x} {} ({})", d.vendor_id, d.product_id, d.product, d.path);
    }
    assert!(
        devices.iter().any(|d| d.product_id == SHUTTLEPRO_V2_PID),
        "No ShuttlePRO v2 found. Connect one to run this test."
    );
}

/// Non-blocking reads return promptly even when the controller is idle
#[test]
#[ignore]
fn test_real_nonblocking_read() {
    let mut dev = ShuttleDevice::open(CONTOUR_VENDOR_ID, SHUTTLEPRO_V2_PID).expect("open device");
    let mut buf = [0u8; READ_BUFFER_SIZE];

    let start = Instant::now();
    for _ in 0..10 {
        let len = dev.read_report(&mut buf).expect("read");
        assert!(len == 0 || len >= 5, "unexpected report length {len}");
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}

/// Creating the virtual keyboard needs write access to /dev/uinput
#[test]
#[ignore]
fn test_real_virtual_keyboard() {
    UinputKeyboard::new().expect("uinput keyboard");
}
