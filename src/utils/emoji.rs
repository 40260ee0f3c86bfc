use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::define_emoji;

define_emoji!(
    Yes => "✅",
    No => "🚫",
    Info => "ℹ️",
    Warn => "⚠️",
    InboxTray => ":inbox_tray:",
    OutboxTray => ":outbox_tray:"
);

pub static EMOJI_OVERRIDES: OnceCell<HashMap<String, String>> = OnceCell::new();

/// Installs the emoji overrides from the config. Only the first call has any effect.
pub fn set_overrides(overrides: HashMap<String, String>) -> bool {
    EMOJI_OVERRIDES.set(overrides).is_ok()
}

#[macro_use]
mod macros {
    #[macro_export]
    macro_rules! define_emoji {
        ($($name: ident => $fallback: literal), *) => {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum Emoji {
                $( $name ,)*
            }

            impl std::fmt::Display for Emoji {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{:?}", self)
                }
            }

            impl Emoji {
                pub fn get_fallback(&self) -> &'static str {
                    match self {
                        $(Emoji::$name => $fallback ,)*
                    }
                }

                pub fn for_chat(&self) -> &str {
                    match EMOJI_OVERRIDES.get() {
                        Some(overrides) => match overrides.get(&self.to_string()) {
                            Some(thing) => thing,
                            None => self.get_fallback(),
                        },
                        None => self.get_fallback(),
                    }
                }
            }
        };
    }
}
