use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use deployscope_stream::CompiledFilter;
use deployscope_types::{DeploymentSummary, LogLine, LogSource, SourceSelection};

use super::Action;

/// Cache for filtered log results to avoid re-filtering on every render
#[derive(Default)]
pub struct FilterCache {
    /// Cached filter pattern (None = no text filter)
    cached_filter_pattern: Option<String>,
    /// Cached case sensitivity setting
    cached_case_insensitive: bool,
    /// Buffer line count when cache was built
    cached_line_count: usize,
    /// The cached filtered lines
    pub cached_lines: Vec<LogLine>,
    /// Whether cache is valid
    pub is_valid: bool,
}

impl FilterCache {
    /// Check if cache needs to be invalidated based on current state
    pub fn needs_refresh(
        &self,
        filter: Option<&CompiledFilter>,
        case_insensitive: bool,
        current_line_count: usize,
    ) -> bool {
        if !self.is_valid {
            return true;
        }
        if self.cached_line_count != current_line_count {
            return true;
        }
        let current_pattern = filter.map(|f| f.pattern().to_string());
        if self.cached_filter_pattern != current_pattern {
            return true;
        }
        self.cached_case_insensitive != case_insensitive
    }

    /// Update the cache with new filtered results
    pub fn update(
        &mut self,
        filter: Option<&CompiledFilter>,
        case_insensitive: bool,
        line_count: usize,
        lines: Vec<LogLine>,
    ) {
        self.cached_filter_pattern = filter.map(|f| f.pattern().to_string());
        self.cached_case_insensitive = case_insensitive;
        self.cached_line_count = line_count;
        self.cached_lines = lines;
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

/// Screen enumeration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    DeploymentSelect,
    LogViewer,
}

/// UI-specific transient state
pub struct UiState {
    /// Is search/filter bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Is help overlay visible?
    pub help_visible: bool,

    /// List state for the deployment selection screen
    pub list_state: ListState,

    /// Is the source picker open?
    pub source_picker_open: bool,

    /// List state for the source picker
    pub source_state: ListState,

    /// Status line message (progress, errors, export feedback)
    pub status_message: Option<String>,

    // Log viewer specific state
    /// Scroll position in log viewer
    pub log_scroll: usize,

    /// Auto-scroll enabled (follow mode)?
    pub auto_scroll: bool,

    /// Show timestamps in log viewer?
    pub show_timestamps: bool,

    /// Show timestamps in local time (vs UTC)
    pub use_local_time: bool,

    /// Show source tags next to each line?
    pub show_source_tags: bool,

    /// Currently active filter (None = show all)
    pub active_filter: Option<CompiledFilter>,

    /// Case insensitive search?
    pub filter_case_insensitive: bool,

    /// Cache for filtered log results
    pub filter_cache: FilterCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_active: false,
            search_input: String::new(),
            help_visible: false,
            list_state: ListState::default(),
            source_picker_open: false,
            source_state: ListState::default(),
            status_message: None,
            log_scroll: 0,
            auto_scroll: true,
            show_timestamps: true,
            use_local_time: true,
            show_source_tags: true,
            active_filter: None,
            filter_case_insensitive: true,
            filter_cache: FilterCache::default(),
        }
    }
}

/// Global application state
pub struct AppState {
    /// Current screen being displayed
    pub current_screen: Screen,

    /// Navigation stack for back navigation
    pub screen_stack: Vec<Screen>,

    /// Available deployments
    pub deployments: Vec<DeploymentSummary>,

    /// Selected deployment (id and display name)
    pub selected_deployment: Option<(String, String)>,

    /// Log sources for the selected deployment
    pub sources: Vec<LogSource>,

    /// Active source selection
    pub selected_source: SourceSelection,

    /// UI state
    pub ui_state: UiState,

    /// Whether app should quit
    pub should_quit: bool,

    /// Channel sender for async actions
    pub action_tx: mpsc::UnboundedSender<Action>,
}

impl AppState {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>) -> Self {
        let mut ui_state = UiState::default();
        ui_state.list_state.select(Some(0));

        Self {
            current_screen: Screen::DeploymentSelect,
            screen_stack: Vec::new(),
            deployments: Vec::new(),
            selected_deployment: None,
            sources: Vec::new(),
            selected_source: SourceSelection::Merged,
            ui_state,
            should_quit: false,
            action_tx,
        }
    }

    /// Navigate to a new screen, pushing current to stack
    pub fn navigate_to(&mut self, screen: Screen) {
        self.screen_stack.push(self.current_screen.clone());
        self.current_screen = screen;
        self.ui_state.list_state.select(Some(0));
    }

    /// Go back to previous screen
    pub fn go_back(&mut self) -> bool {
        if let Some(prev_screen) = self.screen_stack.pop() {
            self.current_screen = prev_screen;
            self.ui_state.list_state.select(Some(0));
            true
        } else {
            false
        }
    }

    /// Move deployment list selection up
    pub fn list_up(&mut self) {
        let len = self.deployments.len();
        if len == 0 {
            return;
        }
        let i = match self.ui_state.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Move deployment list selection down
    pub fn list_down(&mut self) {
        let len = self.deployments.len();
        if len == 0 {
            return;
        }
        let i = match self.ui_state.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Number of entries in the source picker ("all" plus each pod)
    pub fn source_picker_len(&self) -> usize {
        self.sources.len() + 1
    }

    pub fn source_up(&mut self) {
        let len = self.source_picker_len();
        let i = match self.ui_state.source_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.ui_state.source_state.select(Some(i));
    }

    pub fn source_down(&mut self) {
        let len = self.source_picker_len();
        let i = match self.ui_state.source_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.ui_state.source_state.select(Some(i));
    }

    /// Open the picker with the active source highlighted
    pub fn open_source_picker(&mut self) {
        let current = match &self.selected_source {
            SourceSelection::Merged => 0,
            SourceSelection::Pod(name) => self
                .sources
                .iter()
                .position(|s| &s.name == name)
                .map(|i| i + 1)
                .unwrap_or(0),
        };
        self.ui_state.source_state.select(Some(current));
        self.ui_state.source_picker_open = true;
    }

    /// Selection the picker currently points at
    pub fn picked_source(&self) -> SourceSelection {
        match self.ui_state.source_state.selected() {
            Some(0) | None => SourceSelection::Merged,
            Some(i) => self
                .sources
                .get(i - 1)
                .map(|s| SourceSelection::Pod(s.name.clone()))
                .unwrap_or(SourceSelection::Merged),
        }
    }

    pub fn show_status(&mut self, msg: impl Into<String>) {
        self.ui_state.status_message = Some(msg.into());
    }

    pub fn dismiss_status(&mut self) {
        self.ui_state.status_message = None;
    }

    // Search/filter handling

    pub fn start_search(&mut self) {
        self.ui_state.search_active = true;
        self.ui_state.search_input = self
            .ui_state
            .active_filter
            .as_ref()
            .map(|f| f.pattern().to_string())
            .unwrap_or_default();
    }

    pub fn cancel_search(&mut self) {
        self.ui_state.search_active = false;
        self.ui_state.search_input.clear();
    }

    pub fn search_input_char(&mut self, c: char) {
        self.ui_state.search_input.push(c);
    }

    pub fn search_input_backspace(&mut self) {
        self.ui_state.search_input.pop();
    }

    pub fn apply_filter(&mut self) {
        if self.ui_state.search_input.is_empty() {
            self.ui_state.active_filter = None;
        } else {
            let filter = if self.ui_state.filter_case_insensitive {
                CompiledFilter::new_case_insensitive(&self.ui_state.search_input)
            } else {
                CompiledFilter::new(&self.ui_state.search_input)
            };
            self.ui_state.active_filter = Some(filter);
        }
        self.ui_state.search_active = false;
        self.ui_state.filter_cache.invalidate();
    }

    pub fn clear_filter(&mut self) {
        self.ui_state.active_filter = None;
        self.ui_state.search_input.clear();
        self.ui_state.filter_cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> AppState {
        let (tx, _rx) = mpsc::unbounded_channel();
        AppState::new(tx)
    }

    fn source(name: &str) -> LogSource {
        LogSource {
            name: name.to_string(),
            ready: true,
        }
    }

    #[test]
    fn test_navigation_stack() {
        let mut state = new_state();
        assert_eq!(state.current_screen, Screen::DeploymentSelect);

        state.navigate_to(Screen::LogViewer);
        assert_eq!(state.current_screen, Screen::LogViewer);

        assert!(state.go_back());
        assert_eq!(state.current_screen, Screen::DeploymentSelect);
        assert!(!state.go_back());
    }

    #[test]
    fn test_source_picker_always_offers_merged_view() {
        let mut state = new_state();
        assert_eq!(state.source_picker_len(), 1);
        assert_eq!(state.picked_source(), SourceSelection::Merged);

        state.sources = vec![source("web-0"), source("web-1")];
        assert_eq!(state.source_picker_len(), 3);

        state.ui_state.source_state.select(Some(2));
        assert_eq!(
            state.picked_source(),
            SourceSelection::Pod("web-1".to_string())
        );
    }

    #[test]
    fn test_open_picker_highlights_active_source() {
        let mut state = new_state();
        state.sources = vec![source("web-0"), source("web-1")];
        state.selected_source = SourceSelection::Pod("web-1".to_string());

        state.open_source_picker();

        assert!(state.ui_state.source_picker_open);
        assert_eq!(state.ui_state.source_state.selected(), Some(2));
    }

    #[test]
    fn test_apply_and_clear_filter() {
        let mut state = new_state();
        state.ui_state.search_active = true;
        state.ui_state.search_input = "error".to_string();

        state.apply_filter();
        assert!(state.ui_state.active_filter.is_some());
        assert!(!state.ui_state.search_active);

        state.clear_filter();
        assert!(state.ui_state.active_filter.is_none());
    }

    #[test]
    fn test_filter_cache_invalidation() {
        let mut cache = FilterCache::default();
        assert!(cache.needs_refresh(None, true, 0));

        cache.update(None, true, 5, Vec::new());
        assert!(!cache.needs_refresh(None, true, 5));
        // New lines arrived
        assert!(cache.needs_refresh(None, true, 6));
        // Filter changed
        let filter = CompiledFilter::new("x");
        assert!(cache.needs_refresh(Some(&filter), true, 5));
    }
}
