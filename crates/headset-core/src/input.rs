//! Logical button events.

/// Physical buttons on the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Answer / hang up.
    Answer,
    /// Reject an incoming call.
    Reject,
    VolumeUp,
    VolumeDown,
}

impl Button {
    /// All buttons, in polling order.
    pub const ALL: [Button; 4] = [
        Button::Answer,
        Button::Reject,
        Button::VolumeUp,
        Button::VolumeDown,
    ];

    /// Logical pin name used in configuration.
    pub fn pin_name(self) -> &'static str {
        match self {
            Button::Answer => "button_answer",
            Button::Reject => "button_reject",
            Button::VolumeUp => "button_vol_up",
            Button::VolumeDown => "button_vol_down",
        }
    }
}

/// How long the button was held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PressKind {
    Press,
    LongPress,
}

/// A debounced button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonEvent {
    pub button: Button,
    pub kind: PressKind,
}

impl ButtonEvent {
    pub fn press(button: Button) -> Self {
        Self {
            button,
            kind: PressKind::Press,
        }
    }

    pub fn long_press(button: Button) -> Self {
        Self {
            button,
            kind: PressKind::LongPress,
        }
    }
}
