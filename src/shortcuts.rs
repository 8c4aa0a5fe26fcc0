//! Keyboard shortcut registry.
//!
//! Combos such as `"mod+shift+z"` are parsed once into a [`KeyCombo`]. The
//! virtual `mod` modifier resolves to Command on Apple platforms and Control
//! elsewhere. An event matches a combo only when its modifier set is exactly
//! the combo's; holding an extra modifier prevents the match.
//!
//! # Example
//!
//! ```ignore
//! let mut shortcuts = ShortcutRegistry::new(Platform::detect());
//! let id = shortcuts.add("mod+s", |_| save())?;
//!
//! window.on_key_pressed(move |text, ctrl, meta, shift, alt| {
//!     shortcuts.dispatch(&KeyEvent::new(text, Modifiers { ctrl, meta, shift, alt }))
//! });
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use slint::platform::Key;
use slint::SharedString;

use crate::error::{EditorError, EditorResult};

/// Platform family, deciding what `mod` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// macOS and iOS: `mod` is Command (meta).
    Apple,
    /// Everything else: `mod` is Control.
    Other,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn detect() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::Apple
        } else {
            Platform::Other
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::detect()
    }
}

/// Held modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    /// Only the platform's primary modifier.
    pub fn primary(platform: Platform) -> Self {
        match platform {
            Platform::Apple => Modifiers { meta: true, ..Self::NONE },
            Platform::Other => Modifiers { ctrl: true, ..Self::NONE },
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// Key names accepted in combos for keys that do not print a character.
const NAMED_KEYS: &[(&str, Key)] = &[
    ("backspace", Key::Backspace),
    ("tab", Key::Tab),
    ("enter", Key::Return),
    ("return", Key::Return),
    ("escape", Key::Escape),
    ("esc", Key::Escape),
    ("delete", Key::Delete),
    ("del", Key::Delete),
    ("up", Key::UpArrow),
    ("arrowup", Key::UpArrow),
    ("down", Key::DownArrow),
    ("arrowdown", Key::DownArrow),
    ("left", Key::LeftArrow),
    ("arrowleft", Key::LeftArrow),
    ("right", Key::RightArrow),
    ("arrowright", Key::RightArrow),
    ("home", Key::Home),
    ("end", Key::End),
    ("pageup", Key::PageUp),
    ("pagedown", Key::PageDown),
];

/// Names for printable keys that cannot appear literally in a combo.
const NAMED_CHARS: &[(&str, &str)] = &[("space", " "), ("plus", "+")];

/// Lower-cased key text, as compared against parsed combos.
fn normalize_key(text: &str) -> String {
    text.to_lowercase()
}

/// A parsed key combination with `mod` already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    /// Parse `"mod+shift+z"`-style combos. Parts are case-insensitive and
    /// `+`-separated; exactly one part must be a key. Use `plus` for the
    /// `+` key itself.
    pub fn parse(combo: &str, platform: Platform) -> EditorResult<Self> {
        let invalid = |reason: &str| EditorError::InvalidCombo {
            combo: combo.to_string(),
            reason: reason.to_string(),
        };

        let mut modifiers = Modifiers::NONE;
        let mut key: Option<String> = None;

        for part in combo.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "cmd" | "meta" | "command" => modifiers.meta = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                "mod" => match platform {
                    Platform::Apple => modifiers.meta = true,
                    Platform::Other => modifiers.ctrl = true,
                },
                name => {
                    if key.is_some() {
                        return Err(invalid("more than one key"));
                    }
                    let named_char = NAMED_CHARS.iter().find(|(n, _)| *n == name).map(|(_, c)| c.to_string());
                    let named_key = || {
                        NAMED_KEYS
                            .iter()
                            .find(|(n, _)| *n == name)
                            .map(|(_, k)| normalize_key(&SharedString::from(*k)))
                    };
                    key = Some(named_char.or_else(named_key).unwrap_or_else(|| name.to_string()));
                }
            }
        }

        let key = key.ok_or_else(|| invalid("missing key"))?;
        Ok(Self { key, modifiers })
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.modifiers == event.modifiers && self.key == normalize_key(&event.key)
    }
}

/// A key press as delivered by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// Key text, e.g. `"z"` or the text of a [`Key`].
    pub key: SharedString,
    pub modifiers: Modifiers,
    /// The event targets a text input or other editable element.
    pub target_editable: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<SharedString>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            target_editable: false,
        }
    }

    pub fn in_editable(mut self) -> Self {
        self.target_editable = true;
        self
    }
}

/// Handle returned by [`ShortcutRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortcutId(u64);

type ShortcutHandler = Rc<dyn Fn(&KeyEvent) -> anyhow::Result<()>>;

struct Shortcut {
    id: ShortcutId,
    combo: KeyCombo,
    handler: ShortcutHandler,
}

/// Registered shortcuts in registration order.
pub struct ShortcutRegistry {
    platform: Platform,
    shortcuts: Vec<Shortcut>,
    next_id: u64,
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        Self::new(Platform::detect())
    }
}

impl ShortcutRegistry {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            shortcuts: Vec::new(),
            next_id: 0,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Register `handler` for `combo`.
    pub fn add<F>(&mut self, combo: &str, handler: F) -> EditorResult<ShortcutId>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + 'static,
    {
        let combo = KeyCombo::parse(combo, self.platform)?;
        let id = ShortcutId(self.next_id);
        self.next_id += 1;

        tracing::debug!(key = %combo.key, modifiers = ?combo.modifiers, "shortcut registered");
        self.shortcuts.push(Shortcut {
            id,
            combo,
            handler: Rc::new(handler),
        });
        Ok(id)
    }

    /// Unregister a shortcut. Removing an id twice is an error.
    pub fn remove(&mut self, id: ShortcutId) -> EditorResult<()> {
        let index = self
            .shortcuts
            .iter()
            .position(|s| s.id == id)
            .ok_or(EditorError::UnknownShortcut(id.0))?;
        self.shortcuts.remove(index);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.shortcuts.clear();
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }

    /// Run the first shortcut matching `event`.
    ///
    /// Returns `true` when a shortcut matched, in which case the caller
    /// should consume the event. Events aimed at editable elements are
    /// ignored. A failing handler is logged and still counts as handled.
    pub fn dispatch(&self, event: &KeyEvent) -> bool {
        match self.handler_for(event) {
            Some(handler) => {
                handler.run(event);
                true
            }
            None => false,
        }
    }

    /// The handler [`dispatch`](Self::dispatch) would run for `event`.
    ///
    /// Callers sharing the registry behind a `RefCell` release their borrow
    /// before running it, so the handler may add or remove shortcuts.
    pub fn handler_for(&self, event: &KeyEvent) -> Option<MatchedShortcut> {
        if event.target_editable {
            return None;
        }
        self.shortcuts
            .iter()
            .find(|s| s.combo.matches(event))
            .map(|s| MatchedShortcut {
                id: s.id,
                key: s.combo.key.clone(),
                handler: s.handler.clone(),
            })
    }
}

/// A shortcut selected for an event, detached from its registry.
#[derive(Clone)]
pub struct MatchedShortcut {
    id: ShortcutId,
    key: String,
    handler: ShortcutHandler,
}

impl MatchedShortcut {
    pub fn id(&self) -> ShortcutId {
        self.id
    }

    /// Call the handler. Failures are logged, never propagated.
    pub fn run(&self, event: &KeyEvent) {
        tracing::trace!(key = %self.key, "shortcut fired");
        if let Err(err) = (self.handler)(event) {
            tracing::error!(key = %self.key, error = %err, "shortcut handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&KeyEvent) -> anyhow::Result<()>) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move |_: &KeyEvent| {
            c.set(c.get() + 1);
            Ok(())
        })
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_resolves_mod_per_platform() {
        let apple = KeyCombo::parse("mod+z", Platform::Apple).unwrap();
        assert_eq!(apple.modifiers, Modifiers::primary(Platform::Apple));
        let other = KeyCombo::parse("Mod+Z", Platform::Other).unwrap();
        assert_eq!(other.modifiers, Modifiers::primary(Platform::Other));
        assert_eq!(other.key, "z");
    }

    #[test]
    fn test_parse_aliases() {
        let combo = KeyCombo::parse("control+option+command+shift+r", Platform::Other).unwrap();
        assert_eq!(
            combo.modifiers,
            Modifiers {
                ctrl: true,
                meta: true,
                shift: true,
                alt: true
            }
        );
    }

    #[test]
    fn test_parse_named_keys() {
        let combo = KeyCombo::parse("delete", Platform::Other).unwrap();
        assert_eq!(combo.key, normalize_key(&SharedString::from(Key::Delete)));
        assert_eq!(KeyCombo::parse("space", Platform::Other).unwrap().key, " ");
    }

    #[test]
    fn test_parse_plus_key() {
        let combo = KeyCombo::parse("mod+plus", Platform::Other).unwrap();
        assert_eq!(combo.key, "+");
        assert_eq!(combo.modifiers, Modifiers::primary(Platform::Other));
        assert!(combo.matches(&KeyEvent::new("+", Modifiers::primary(Platform::Other))));

        // A literal `+` is a separator
        assert!(KeyCombo::parse("mod++", Platform::Other).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            KeyCombo::parse("mod+shift", Platform::Other),
            Err(EditorError::InvalidCombo { .. })
        ));
        assert!(matches!(
            KeyCombo::parse("a+b", Platform::Other),
            Err(EditorError::InvalidCombo { .. })
        ));
        assert!(KeyCombo::parse("", Platform::Other).is_err());
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    #[test]
    fn test_exact_modifier_match() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        let (count, handler) = counter();
        registry.add("mod+z", handler).unwrap();

        let primary = Modifiers::primary(Platform::Other);
        assert!(registry.dispatch(&KeyEvent::new("z", primary)));
        assert_eq!(count.get(), 1);

        assert!(!registry.dispatch(&KeyEvent::new("Z", primary.with_shift())));
        assert!(!registry.dispatch(&KeyEvent::new("z", Modifiers::NONE)));
        assert!(!registry.dispatch(&KeyEvent::new("z", Modifiers::primary(Platform::Apple))));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_editable_targets_ignored() {
        let mut registry = ShortcutRegistry::new(Platform::Apple);
        let (count, handler) = counter();
        registry.add("mod+z", handler).unwrap();

        let event = KeyEvent::new("z", Modifiers::primary(Platform::Apple)).in_editable();
        assert!(!registry.dispatch(&event));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_first_match_only() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        let (first, h1) = counter();
        let (second, h2) = counter();
        registry.add("ctrl+r", h1).unwrap();
        registry.add("ctrl+r", h2).unwrap();

        registry.dispatch(&KeyEvent::new("r", Modifiers::primary(Platform::Other)));
        assert_eq!((first.get(), second.get()), (1, 0));
    }

    #[test]
    fn test_failing_handler_is_contained() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        registry.add("ctrl+e", |_| anyhow::bail!("broken")).unwrap();
        let (count, handler) = counter();
        registry.add("ctrl+f", handler).unwrap();

        let ctrl = Modifiers::primary(Platform::Other);
        assert!(registry.dispatch(&KeyEvent::new("e", ctrl)));
        assert!(registry.dispatch(&KeyEvent::new("f", ctrl)));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        let (count, handler) = counter();
        let id = registry.add("ctrl+k", handler).unwrap();

        registry.remove(id).unwrap();
        assert!(matches!(registry.remove(id), Err(EditorError::UnknownShortcut(_))));
        assert!(!registry.dispatch(&KeyEvent::new("k", Modifiers::primary(Platform::Other))));
        assert_eq!(count.get(), 0);

        registry.add("ctrl+k", |_| Ok(())).unwrap();
        registry.add("ctrl+j", |_| Ok(())).unwrap();
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handler_for_detaches_from_registry() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        let (count, handler) = counter();
        let id = registry.add("ctrl+k", handler).unwrap();
        let event = KeyEvent::new("k", Modifiers::primary(Platform::Other));

        let matched = registry.handler_for(&event).unwrap();
        assert_eq!(matched.id(), id);
        registry.clear();
        matched.run(&event);
        assert_eq!(count.get(), 1);

        assert!(registry.handler_for(&event).is_none());
        assert!(registry.handler_for(&event.in_editable()).is_none());
    }

    #[test]
    fn test_named_key_event() {
        let mut registry = ShortcutRegistry::new(Platform::Other);
        let (count, handler) = counter();
        registry.add("backspace", handler).unwrap();
        assert!(registry.dispatch(&KeyEvent::new(Key::Backspace, Modifiers::NONE)));
        assert_eq!(count.get(), 1);
    }
}
