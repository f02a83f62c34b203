//! Keyboard bindings for the editing actions.
//!
//! Only actions served by the history, the clipboard and the selection are
//! bound here. Tool and viewport keys belong to the host.

/// Editing actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Copy,
    Cut,
    Paste,
    /// Delete every node as one undoable step.
    ClearAll,
    Deselect,
}

/// Modifier state a binding needs. `primary` is ⌘ on macOS, Ctrl elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chord {
    primary: bool,
    shift: bool,
}

const PLAIN: Chord = Chord { primary: false, shift: false };
const PRIMARY: Chord = Chord { primary: true, shift: false };
const PRIMARY_SHIFT: Chord = Chord { primary: true, shift: true };

/// Letter keys match either case, so Caps Lock does not matter.
const BINDINGS: &[(Chord, &str, ShortcutAction)] = &[
    (PRIMARY, "z", ShortcutAction::Undo),
    (PRIMARY_SHIFT, "z", ShortcutAction::Redo),
    (PRIMARY, "y", ShortcutAction::Redo),
    (PRIMARY, "a", ShortcutAction::SelectAll),
    (PRIMARY, "d", ShortcutAction::Duplicate),
    (PRIMARY, "c", ShortcutAction::Copy),
    (PRIMARY, "x", ShortcutAction::Cut),
    (PRIMARY, "v", ShortcutAction::Paste),
    (PRIMARY, "Delete", ShortcutAction::ClearAll),
    (PRIMARY, "Backspace", ShortcutAction::ClearAll),
    (PLAIN, "Delete", ShortcutAction::Delete),
    (PLAIN, "Backspace", ShortcutAction::Delete),
    (PLAIN, "Escape", ShortcutAction::Deselect),
];

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a `KeyboardEvent.key` value plus modifier state. Alt takes no
    /// part in any binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let chord = Chord {
            primary: ctrl || meta,
            shift,
        };
        BINDINGS
            .iter()
            .find(|(c, k, _)| *c == chord && k.eq_ignore_ascii_case(key))
            .map(|(_, _, action)| *action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ShortcutAction::*;

    fn primary(key: &str) -> Option<ShortcutAction> {
        ShortcutMap::resolve(key, true, false, false, false)
    }

    fn plain(key: &str) -> Option<ShortcutAction> {
        ShortcutMap::resolve(key, false, false, false, false)
    }

    #[test]
    fn ctrl_and_cmd_are_interchangeable() {
        for (key, action) in [("z", Undo), ("y", Redo), ("c", Copy), ("v", Paste)] {
            assert_eq!(ShortcutMap::resolve(key, true, false, false, false), Some(action));
            assert_eq!(ShortcutMap::resolve(key, false, false, false, true), Some(action));
        }
    }

    #[test]
    fn shift_turns_undo_into_redo() {
        assert_eq!(ShortcutMap::resolve("Z", false, true, false, true), Some(Redo));
        assert_eq!(ShortcutMap::resolve("c", true, true, false, false), None);
    }

    #[test]
    fn delete_keys_depend_on_primary_modifier() {
        assert_eq!(plain("Backspace"), Some(Delete));
        assert_eq!(primary("Backspace"), Some(ClearAll));
        assert_eq!(ShortcutMap::resolve("Delete", false, true, false, false), None);
    }

    #[test]
    fn escape_deselects_only_without_modifiers() {
        assert_eq!(plain("Escape"), Some(Deselect));
        assert_eq!(primary("Escape"), None);
    }

    #[test]
    fn letters_ignore_case() {
        assert_eq!(primary("D"), Some(Duplicate));
        assert_eq!(primary("X"), Some(Cut));
        assert_eq!(primary("A"), Some(SelectAll));
    }

    #[test]
    fn letters_need_a_modifier() {
        assert_eq!(plain("v"), None);
        assert_eq!(plain("q"), None);
        assert_eq!(ShortcutMap::resolve("z", false, false, true, false), None);
    }

    #[test]
    fn no_binding_is_shadowed() {
        for (chord, key, action) in BINDINGS {
            let resolved = ShortcutMap::resolve(key, chord.primary, chord.shift, false, false);
            assert_eq!(resolved, Some(*action), "{key} with {chord:?}");
        }
    }
}
