use crate::app::Screen;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug)]
pub enum Action {
    // Navigation
    Navigate(Screen),
    GoBack,
    Quit,

    // Selection
    SelectDeployment(String),
    RefreshDeployments,

    // UI toggles
    ToggleHelp,

    // List navigation
    ListUp,
    ListDown,
    ListSelect,

    // Source picker
    ToggleSourcePicker,
    SourceUp,
    SourceDown,
    SourceSelect,

    // Search/Filter in log viewer
    OpenSearch,
    CloseSearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ApplyFilter,
    ClearFilter,
    ToggleCaseSensitive,

    // Log viewer actions
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    ToggleTimestamps,
    ToggleLocalTime,
    ToggleSourceTags,
    ClearLogs,
    RefreshLogs,
    ExportLogs,

    // Status line
    ShowStatus(String),
    DismissStatus,

    // Tick (for periodic updates)
    Tick,

    // Render request
    Render,
}
