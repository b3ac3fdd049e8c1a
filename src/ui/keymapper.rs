//! Key mapping for terminal input
//!
//! Keyboard input goes through two steps: [`KeyMapper::classify`] turns a
//! crossterm event into a [`KeyEvent`], and [`KeyMapper::translate`] turns a
//! `KeyEvent` into the bytes written to the PTY.

use std::io;
use std::time::Duration;

use bitflags::bitflags;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Named keys
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialKey {
    Backspace,
    CtrlC,
    CtrlD,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    /// The display changed size; carries no bytes
    Resize,
    Unknown,
}

/// A keyboard event as the session sees it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    Printable(char),
    Control(u8),
    Special(SpecialKey),
}

/// Key mapper for converting key events to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Bytes to send to the child for `event`. Never fails; keys with no
    /// byte form yield an empty vector.
    pub fn translate(event: &KeyEvent) -> Vec<u8> {
        match *event {
            KeyEvent::Printable(ch) => {
                let mut buf = [0u8; 4];
                ch.encode_utf8(&mut buf).as_bytes().to_vec()
            }
            KeyEvent::Control(byte) => vec![byte],
            KeyEvent::Special(key) => Self::special_bytes(key).to_vec(),
        }
    }

    fn special_bytes(key: SpecialKey) -> &'static [u8] {
        match key {
            SpecialKey::Backspace => b"\x7f",
            SpecialKey::CtrlC => b"\x03",
            SpecialKey::CtrlD => b"\x04",
            SpecialKey::ArrowUp => b"\x1b[A",
            SpecialKey::ArrowDown => b"\x1b[B",
            SpecialKey::ArrowRight => b"\x1b[C",
            SpecialKey::ArrowLeft => b"\x1b[D",
            SpecialKey::Home => b"\x1b[H",
            SpecialKey::End => b"\x1b[F",
            SpecialKey::PageUp => b"\x1b[5~",
            SpecialKey::PageDown => b"\x1b[6~",
            SpecialKey::Delete => b"\x1b[3~",
            SpecialKey::Resize | SpecialKey::Unknown => b"",
        }
    }

    /// Classify a crossterm event
    pub fn classify(event: &Event) -> KeyEvent {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::classify_key(key),
            Event::Resize(_, _) => KeyEvent::Special(SpecialKey::Resize),
            _ => KeyEvent::Special(SpecialKey::Unknown),
        }
    }

    fn classify_key(event: &event::KeyEvent) -> KeyEvent {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, mods),
            KeyCode::Enter => KeyEvent::Control(0x0D),
            KeyCode::Tab => KeyEvent::Control(0x09),
            KeyCode::Esc => KeyEvent::Control(0x1B),
            KeyCode::Backspace => KeyEvent::Special(SpecialKey::Backspace),
            KeyCode::Up => KeyEvent::Special(SpecialKey::ArrowUp),
            KeyCode::Down => KeyEvent::Special(SpecialKey::ArrowDown),
            KeyCode::Left => KeyEvent::Special(SpecialKey::ArrowLeft),
            KeyCode::Right => KeyEvent::Special(SpecialKey::ArrowRight),
            KeyCode::Home => KeyEvent::Special(SpecialKey::Home),
            KeyCode::End => KeyEvent::Special(SpecialKey::End),
            KeyCode::PageUp => KeyEvent::Special(SpecialKey::PageUp),
            KeyCode::PageDown => KeyEvent::Special(SpecialKey::PageDown),
            KeyCode::Delete => KeyEvent::Special(SpecialKey::Delete),
            _ => KeyEvent::Special(SpecialKey::Unknown),
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> KeyEvent {
        if mods.contains(Modifiers::CTRL) {
            return match ch.to_ascii_lowercase() {
                'c' => KeyEvent::Special(SpecialKey::CtrlC),
                'd' => KeyEvent::Special(SpecialKey::CtrlD),
                c @ 'a'..='z' => KeyEvent::Control(c as u8 - b'a' + 1),
                '@' | ' ' => KeyEvent::Control(0x00),
                '[' => KeyEvent::Control(0x1B),
                '\\' => KeyEvent::Control(0x1C),
                ']' => KeyEvent::Control(0x1D),
                '^' => KeyEvent::Control(0x1E),
                '_' => KeyEvent::Control(0x1F),
                _ => KeyEvent::Special(SpecialKey::Unknown),
            };
        }

        if ch.is_ascii_control() {
            if ch == '\x7f' {
                return KeyEvent::Special(SpecialKey::Backspace);
            }
            return KeyEvent::Control(ch as u8);
        }

        // Alt is not forwarded; the bare character is
        KeyEvent::Printable(ch)
    }
}

/// Non-blocking supplier of keyboard events
pub trait KeySource {
    /// Next pending event, or None when nothing is waiting
    fn next_event(&mut self) -> io::Result<Option<KeyEvent>>;
}

/// Keyboard events from the controlling terminal
#[derive(Default)]
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn next_event(&mut self) -> io::Result<Option<KeyEvent>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        let event = event::read()?;
        Ok(Some(KeyMapper::classify(&event)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent as CtKeyEvent;

    fn key(code: KeyCode, mods: KeyModifiers) -> Event {
        Event::Key(CtKeyEvent::new(code, mods))
    }

    #[test]
    fn test_translate_table() {
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::Backspace)), vec![0x7F]);
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::CtrlC)), vec![0x03]);
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::CtrlD)), vec![0x04]);
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::ArrowUp)), b"\x1b[A".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::ArrowDown)), b"\x1b[B".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::ArrowLeft)), b"\x1b[D".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::ArrowRight)), b"\x1b[C".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Printable('a')), b"a".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Control(0x1B)), vec![0x1B]);
        assert!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::Resize)).is_empty());
        assert!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::Unknown)).is_empty());
    }

    #[test]
    fn test_translate_navigation_keys() {
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::Home)), b"\x1b[H".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::End)), b"\x1b[F".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::PageUp)), b"\x1b[5~".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::PageDown)), b"\x1b[6~".to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Special(SpecialKey::Delete)), b"\x1b[3~".to_vec());
    }

    #[test]
    fn test_translate_utf8() {
        assert_eq!(KeyMapper::translate(&KeyEvent::Printable('é')), "é".as_bytes().to_vec());
        assert_eq!(KeyMapper::translate(&KeyEvent::Printable('日')), "日".as_bytes().to_vec());
    }

    #[test]
    fn test_classify_char_keys() {
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('a'), KeyModifiers::NONE)),
            KeyEvent::Printable('a')
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            KeyEvent::Printable('A')
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('x'), KeyModifiers::ALT)),
            KeyEvent::Printable('x')
        );
    }

    #[test]
    fn test_classify_ctrl_keys() {
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyEvent::Special(SpecialKey::CtrlC)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            KeyEvent::Special(SpecialKey::CtrlD)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('l'), KeyModifiers::CONTROL)),
            KeyEvent::Control(0x0C)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Char('['), KeyModifiers::CONTROL)),
            KeyEvent::Control(0x1B)
        );
    }

    #[test]
    fn test_classify_named_keys() {
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Enter, KeyModifiers::NONE)),
            KeyEvent::Control(0x0D)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Tab, KeyModifiers::NONE)),
            KeyEvent::Control(0x09)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Backspace, KeyModifiers::NONE)),
            KeyEvent::Special(SpecialKey::Backspace)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::Up, KeyModifiers::NONE)),
            KeyEvent::Special(SpecialKey::ArrowUp)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::PageDown, KeyModifiers::NONE)),
            KeyEvent::Special(SpecialKey::PageDown)
        );
        assert_eq!(
            KeyMapper::classify(&key(KeyCode::F(5), KeyModifiers::NONE)),
            KeyEvent::Special(SpecialKey::Unknown)
        );
    }

    #[test]
    fn test_classify_resize_and_other_events() {
        assert_eq!(
            KeyMapper::classify(&Event::Resize(100, 40)),
            KeyEvent::Special(SpecialKey::Resize)
        );
        assert_eq!(
            KeyMapper::classify(&Event::FocusGained),
            KeyEvent::Special(SpecialKey::Unknown)
        );

        let release = Event::Key(CtKeyEvent::new_with_kind(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert_eq!(KeyMapper::classify(&release), KeyEvent::Special(SpecialKey::Unknown));
    }

    #[test]
    fn test_modifiers_from_crossterm() {
        let mods = Modifiers::from(KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert!(mods.contains(Modifiers::CTRL));
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::ALT));
    }
}
