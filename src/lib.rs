//! ShuttleLinux - jog/shuttle controller to keyboard bridge
//!
//! Turns the HID reports of a Contour ShuttlePRO style controller (shuttle
//! ring, jog wheel, 15 buttons) into synthetic key presses on a uinput
//! virtual keyboard, following a user-editable mapping file.

pub mod buttons;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod inject;
pub mod jog;
pub mod keys;
pub mod mapping;
pub mod poller;
pub mod protocol;
pub mod settings;
pub mod shuttle;

pub use error::{Result, ShuttleError};
pub use event::{Direction, LogicalEvent};
