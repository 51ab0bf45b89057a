mod help_overlay;
mod list_selector;
mod source_picker;
mod status_bar;

pub use help_overlay::HelpOverlay;
pub use list_selector::{ListSelector, ListSelectorExt};
pub use source_picker::{SourcePicker, source_summary};
pub use status_bar::{StatusBar, list_nav_hints};
