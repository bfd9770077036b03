//! Type-to-filter single-selection widget.
//!
//! The widget never commits a value that has no backing option: free text
//! typed into it only narrows the candidate list, and losing focus without a
//! selection restores the last good one. The query is always the text shown
//! in the input, so reopening filters by what the user sees.

use crate::api::ModelInfo;
use crate::error::BattleError;

/// Shown by renderers in place of an empty candidate list.
pub const NO_RESULTS_PLACEHOLDER: &str = "No models found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub text: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

impl From<ModelInfo> for SelectOption {
    fn from(model: ModelInfo) -> Self {
        Self {
            text: model.name,
            value: model.id,
        }
    }
}

/// Highlight movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Keys the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
    Escape,
}

/// Emitted whenever a selection is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
    pub value: String,
    pub text: String,
}

/// One rendered candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectRow<'a> {
    pub option: &'a SelectOption,
    pub selected: bool,
    pub highlighted: bool,
}

type Listener = Box<dyn FnMut(&SelectionChanged)>;

#[derive(Default)]
pub struct SearchableSelect {
    options: Vec<SelectOption>,
    query: String,
    filtered: Vec<SelectOption>,
    highlighted: Option<usize>,
    selected_value: String,
    display_text: String,
    is_open: bool,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for SearchableSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchableSelect")
            .field("options", &self.options.len())
            .field("query", &self.query)
            .field("filtered", &self.filtered.len())
            .field("highlighted", &self.highlighted)
            .field("selected_value", &self.selected_value)
            .field("is_open", &self.is_open)
            .finish()
    }
}

impl SearchableSelect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Vec<SelectOption>) -> Self {
        let mut select = Self::new();
        select.set_options(options);
        select
    }

    /// Register a selection-changed listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&SelectionChanged) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // -- state accessors ----------------------------------------------------

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn filtered(&self) -> &[SelectOption] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Highlighted index into [`filtered`](Self::filtered). Always `None`
    /// while closed.
    pub fn highlighted(&self) -> Option<usize> {
        if self.is_open {
            self.highlighted
        } else {
            None
        }
    }

    pub fn value(&self) -> &str {
        &self.selected_value
    }

    // -- operations ---------------------------------------------------------

    /// Replace the candidates. A selection that no longer matches any option
    /// is kept; clearing it is the caller's business.
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        self.filtered = options.clone();
        self.options = options;
        self.highlighted = None;
    }

    pub fn open(&mut self) {
        self.is_open = true;
        self.highlighted = None;
        self.refilter();
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.highlighted = None;
    }

    /// Pointer click on the input.
    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    pub fn type_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.display_text = query.to_string();
        self.refilter();
        self.highlighted = None;
        if !self.is_open {
            self.open();
        }
    }

    /// Move the highlight one step, wrapping at both ends.
    pub fn navigate(&mut self, direction: Direction) {
        if !self.is_open || self.filtered.is_empty() {
            return;
        }
        let len = self.filtered.len();
        self.highlighted = Some(match (self.highlighted, direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => len - 1,
            (Some(i), Direction::Next) => (i + 1) % len,
            (Some(i), Direction::Previous) => (i + len - 1) % len,
        });
    }

    /// Commit the highlighted option, if any.
    pub fn confirm_selection(&mut self) -> Option<SelectionChanged> {
        if !self.is_open {
            return None;
        }
        let index = self.highlighted?;
        let option = self.filtered.get(index)?.clone();
        Some(self.select_option(&option))
    }

    pub fn select_option(&mut self, option: &SelectOption) -> SelectionChanged {
        self.selected_value = option.value.clone();
        self.display_text = option.text.clone();
        self.query = option.text.clone();
        self.close();

        let change = SelectionChanged {
            value: option.value.clone(),
            text: option.text.clone(),
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
        change
    }

    /// Focus left the widget without a committed selection.
    pub fn blur_without_selection(&mut self) {
        self.close();
        self.display_text = if self.selected_value.is_empty() {
            String::new()
        } else {
            self.options
                .iter()
                .find(|o| o.value == self.selected_value)
                .map(|o| o.text.clone())
                .unwrap_or_default()
        };
        self.query = self.display_text.clone();
    }

    /// Select the option carrying `value`. Returns false (and changes
    /// nothing) when there is none.
    pub fn set_value(&mut self, value: &str) -> bool {
        match self.options.iter().find(|o| o.value == value).cloned() {
            Some(option) => {
                self.select_option(&option);
                true
            }
            None => false,
        }
    }

    /// Keyboard handling. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.is_open {
            if matches!(key, Key::Up | Key::Down) {
                self.open();
                return true;
            }
            return false;
        }
        match key {
            Key::Down => self.navigate(Direction::Next),
            Key::Up => self.navigate(Direction::Previous),
            Key::Enter => {
                self.confirm_selection();
            }
            Key::Escape => self.close(),
        }
        true
    }

    /// Render snapshot of the filtered candidates.
    pub fn rows(&self) -> Vec<SelectRow<'_>> {
        let highlighted = self.highlighted();
        self.filtered
            .iter()
            .enumerate()
            .map(|(i, option)| SelectRow {
                option,
                selected: self.is_selected(option),
                highlighted: highlighted == Some(i),
            })
            .collect()
    }

    /// Non-interactive selection: an exact value wins, otherwise the first
    /// option whose text contains `query`.
    pub fn resolve(&mut self, query: &str) -> Result<String, BattleError> {
        if self.set_value(query) {
            return Ok(self.selected_value.clone());
        }
        self.type_query(query);
        self.navigate(Direction::Next);
        match self.confirm_selection() {
            Some(change) => Ok(change.value),
            None => {
                self.blur_without_selection();
                Err(BattleError::Validation(format!("no model matches '{}'", query)))
            }
        }
    }

    fn is_selected(&self, option: &SelectOption) -> bool {
        !self.selected_value.is_empty() && option.value == self.selected_value
    }

    fn refilter(&mut self) {
        self.filtered = filter_options(&self.options, &self.query);
    }
}

/// Options whose text contains `query`, ignoring case, in their original order.
pub fn filter_options(options: &[SelectOption], query: &str) -> Vec<SelectOption> {
    let needle = query.to_lowercase();
    options
        .iter()
        .filter(|o| o.text.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
