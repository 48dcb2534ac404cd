//! Shared UI icons.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Session indicators
pub static MEMORY: Emoji<'_, '_> = Emoji("🧠 ", "[MEM]");
pub static SCROLL: Emoji<'_, '_> = Emoji("📜 ", "[LOG]");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "[SAVE]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
