pub mod display;
pub mod icons;
pub mod picker;

pub use display::ChatUI;
pub use picker::{SelectPicker, read_command};
