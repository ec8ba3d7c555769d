//! Button press-edge detection for the 15 ShuttlePRO buttons

use crate::event::LogicalEvent;
use crate::protocol::BUTTONS_HIGH_MASK;

/// Number of addressable buttons
pub const BUTTON_COUNT: u8 = 15;

#[derive(Debug, Default)]
pub struct ButtonEdgeDetector {
    low_prev: u8,
    high_prev: u8,
}

impl ButtonEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare both masks against the previous report and return one
    /// `ButtonPressed` per 0→1 transition, in ascending button order.
    pub fn update(&mut self, low: u8, high: u8) -> Vec<LogicalEvent> {
        let high = high & BUTTONS_HIGH_MASK;
        let mut events = Vec::new();

        if low != self.low_prev {
            push_edges(&mut events, self.low_prev, low, 1);
            self.low_prev = low;
        }
        if high != self.high_prev {
            push_edges(&mut events, self.high_prev, high, 9);
            self.high_prev = high;
        }

        events
    }

    /// Buttons currently held (bit 0 = button 1)
    pub fn held(&self) -> u16 {
        ((self.high_prev as u16) << 8) | self.low_prev as u16
    }
}

fn push_edges(events: &mut Vec<LogicalEvent>, previous: u8, current: u8, first_button: u8) {
    let pressed = current & !previous;
    for bit in 0..8u8 {
        if pressed & (1 << bit) != 0 {
            events.push(LogicalEvent::ButtonPressed(first_button + bit));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(events: &[LogicalEvent]) -> Vec<u8> {
        events
            .iter()
            .map(|e| match e {
                LogicalEvent::ButtonPressed(n) => *n,
                other => panic!("unexpected event {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_press_hold_release_sequence() {
        let mut buttons = ButtonEdgeDetector::new();
        assert!(buttons.update(0b0000_0000, 0).is_empty());
        assert_eq!(pressed(&buttons.update(0b0000_0101, 0)), vec![1, 3]);
        assert!(buttons.update(0b0000_0101, 0).is_empty());
        assert!(buttons.update(0b0000_0100, 0).is_empty());
        // button 1 pressed again after release
        assert_eq!(pressed(&buttons.update(0b0000_0101, 0)), vec![1]);
    }

    #[test]
    fn test_high_byte_buttons() {
        let mut buttons = ButtonEdgeDetector::new();
        assert_eq!(pressed(&buttons.update(0, 0b0100_0001)), vec![9, 15]);
        assert_eq!(buttons.held(), 0b0100_0001_0000_0000);
    }

    #[test]
    fn test_ascending_order_across_bytes() {
        let mut buttons = ButtonEdgeDetector::new();
        assert_eq!(
            pressed(&buttons.update(0b1000_0010, 0b0000_0100)),
            vec![2, 8, 11]
        );
    }

    #[test]
    fn test_unused_high_bit_ignored() {
        let mut buttons = ButtonEdgeDetector::new();
        assert!(buttons.update(0, 0b1000_0000).is_empty());
    }

    #[test]
    fn test_all_buttons() {
        let mut buttons = ButtonEdgeDetector::new();
        let events = pressed(&buttons.update(0xFF, 0x7F));
        assert_eq!(events, (1..=BUTTON_COUNT).collect::<Vec<_>>());
    }
}
