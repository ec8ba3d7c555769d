//! Logical events produced by the trackers

use std::fmt;

/// Rotation direction shared by the jog wheel and the shuttle ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Name used for the built-in action and for mapping override keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalEvent {
    /// Press edge of button 1..=15
    ButtonPressed(u8),
    JogStep(Direction),
    /// One repeat of a deflected shuttle ring; displacement is 1..=7
    ShuttleTick(Direction, u8),
}

impl fmt::Display for LogicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalEvent::ButtonPressed(n) => write!(f, "button {n}"),
            LogicalEvent::JogStep(dir) => write!(f, "jog {dir}"),
            LogicalEvent::ShuttleTick(dir, disp) => write!(f, "shuttle {dir} x{disp}"),
        }
    }
}
