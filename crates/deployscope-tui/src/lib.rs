//! TUI components for deployscope
//!
//! This crate provides the terminal user interface for deployscope,
//! including state management, keybindings, event handling, and UI components.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, Screen, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{
    HelpOverlay, ListSelector, ListSelectorExt, SourcePicker, StatusBar, list_nav_hints,
    source_summary,
};
pub use ui::screens::{DeploymentSelectScreen, LogViewerScreen};
pub use ui::{Layout, Theme};
