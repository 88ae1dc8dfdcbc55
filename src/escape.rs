//! Classification of raw terminal input chunks.
//!
//! The terminal widget hands over one chunk per keystroke (or per pointer
//! report). A chunk is matched as a whole against the sequences the editor
//! understands; anything else is literal text, so no input is ever dropped.

pub const ESC: &str = "\u{1b}";

const END_OF_TRANSMISSION: &str = "\u{4}";
const INTERRUPT: &str = "\u{3}";
const BACKSPACE: &str = "\u{8}";
const DELETE: &str = "\u{7f}";
const TAB: &str = "\t";
const CARRIAGE_RETURN: &str = "\r";
const CONTROL_X: &str = "\u{18}";
const CONTROL_Z: &str = "\u{1a}";
const POINTER_REPORT: &str = "\u{1b}[M";

/// X10 mouse reports bias column and row by this amount.
const POINTER_BIAS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    Up,
    Down,
    Right,
    Left,
}

impl Arrow {
    fn from_final_byte(c: char) -> Option<Self> {
        match c {
            'A' => Some(Arrow::Up),
            'B' => Some(Arrow::Down),
            'C' => Some(Arrow::Right),
            'D' => Some(Arrow::Left),
            _ => None,
        }
    }

    /// The escape a terminal sends for Alt + this arrow.
    pub fn alt_sequence(self) -> &'static str {
        match self {
            Arrow::Up => "\u{1b}[1;3A",
            Arrow::Down => "\u{1b}[1;3B",
            Arrow::Right => "\u{1b}[1;3C",
            Arrow::Left => "\u{1b}[1;3D",
        }
    }
}

/// One decoded input chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    EndOfTransmission,
    Interrupt,
    Backspace,
    Tab,
    Arrow(Arrow),
    /// Zero-based pointer position.
    Pointer { button: u8, column: u16, row: u16 },
    Escape,
    CarriageReturn,
    /// Control-X or Control-Z: both only stop autocomplete.
    Cancel,
    Text(String),
}

/// Classify a chunk. Priority follows the order of the match arms.
pub fn decode(text: &str) -> InputEvent {
    match text {
        END_OF_TRANSMISSION => return InputEvent::EndOfTransmission,
        INTERRUPT => return InputEvent::Interrupt,
        BACKSPACE | DELETE => return InputEvent::Backspace,
        TAB => return InputEvent::Tab,
        _ => {}
    }
    if let Some(arrow) = decode_arrow(text) {
        return InputEvent::Arrow(arrow);
    }
    if let Some(pointer) = decode_pointer(text) {
        return pointer;
    }
    match text {
        ESC => InputEvent::Escape,
        CARRIAGE_RETURN => InputEvent::CarriageReturn,
        CONTROL_X | CONTROL_Z => InputEvent::Cancel,
        _ => InputEvent::Text(text.to_string()),
    }
}

/// `ESC [ X` (normal cursor keys) or `ESC O X` (application cursor keys).
fn decode_arrow(text: &str) -> Option<Arrow> {
    let rest = text.strip_prefix(ESC)?;
    let mut chars = rest.chars();
    let introducer = chars.next()?;
    let final_byte = chars.next()?;
    if chars.next().is_some() || !matches!(introducer, '[' | 'O') {
        return None;
    }
    Arrow::from_final_byte(final_byte)
}

fn decode_pointer(text: &str) -> Option<InputEvent> {
    let payload = text.strip_prefix(POINTER_REPORT)?;
    let bytes: Vec<char> = payload.chars().collect();
    let [button, column, row] = bytes.as_slice() else {
        return None;
    };
    Some(InputEvent::Pointer {
        button: u8::try_from(u32::from(*button).saturating_sub(POINTER_BIAS)).unwrap_or(u8::MAX),
        column: unbias(*column),
        row: unbias(*row),
    })
}

/// Remove the +32 bias (clamped at 0) and convert the 1-based coordinate to 0-based.
fn unbias(c: char) -> u16 {
    let one_based = u32::from(c).saturating_sub(POINTER_BIAS);
    u16::try_from(one_based.saturating_sub(1)).unwrap_or(u16::MAX)
}

/// Transform a chunk typed while the toolbar "control" key is armed.
///
/// Arrows become Alt-arrows; otherwise a leading ASCII letter (code above 64)
/// becomes the matching control character.
pub fn apply_control_modifier(text: &str) -> String {
    let folded = text.to_uppercase();
    if let Some(arrow) = decode_arrow(&folded) {
        return arrow.alt_sequence().to_string();
    }
    match folded.chars().next() {
        Some(c) if c.is_ascii() && u32::from(c) > 64 => {
            char::from_u32(u32::from(c) - 64).map_or(folded, String::from)
        }
        _ => folded,
    }
}
