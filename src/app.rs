use crate::input::Action;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Query,
}

/// Work the event loop performs against the engine after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh,
    Delete { start: usize, end: Option<usize> },
    Inspect { index: usize },
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    command: AppCommand,
}

#[derive(Debug, Clone)]
struct InspectOverlay {
    title: String,
    text: String,
    scroll: u16,
}

pub struct App {
    running: bool,
    mode: InputMode,
    query: String,
    input: String,
    status: String,
    show_help: bool,
    pending_g: bool,
    pending_confirmation: Option<PendingConfirmation>,
    rows: Vec<String>,
    selected: usize,
    mark: Option<usize>,
    failing_backends: Vec<String>,
    overlay: Option<InspectOverlay>,
    list_width: u16,
    list_height: u16,
    overlay_height: u16,
}

impl App {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            running: true,
            mode: InputMode::Normal,
            query: query.into(),
            input: String::new(),
            status: "Ready".to_string(),
            show_help: false,
            pending_g: false,
            pending_confirmation: None,
            rows: Vec::new(),
            selected: 0,
            mark: None,
            failing_backends: Vec::new(),
            overlay: None,
            list_width: 80,
            list_height: 20,
            overlay_height: 20,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.rows.is_empty()).then_some(self.selected)
    }

    /// Inclusive bounds of the marked range, cursor included.
    pub fn marked_range(&self) -> Option<(usize, usize)> {
        let mark = self.mark?;
        Some((mark.min(self.selected), mark.max(self.selected)))
    }

    pub fn failing_backends(&self) -> &[String] {
        &self.failing_backends
    }

    pub fn overlay_active(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn overlay_title(&self) -> Option<&str> {
        self.overlay.as_ref().map(|overlay| overlay.title.as_str())
    }

    pub fn overlay_text(&self) -> Option<&str> {
        self.overlay.as_ref().map(|overlay| overlay.text.as_str())
    }

    pub fn overlay_scroll(&self) -> u16 {
        self.overlay.as_ref().map_or(0, |overlay| overlay.scroll)
    }

    /// Character width available to one rendered row.
    pub fn list_width(&self) -> usize {
        self.list_width as usize
    }

    pub fn set_list_viewport(&mut self, width: u16, height: u16) {
        self.list_width = width.max(1);
        self.list_height = height.max(1);
    }

    pub fn set_overlay_viewport(&mut self, height: u16) {
        self.overlay_height = height.max(1);
        let max_scroll = self.overlay_max_scroll();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.scroll = overlay.scroll.min(max_scroll);
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Replaces the listing after a populate.
    pub fn set_listing(&mut self, rows: Vec<String>, failing_backends: Vec<String>) {
        self.failing_backends = failing_backends;
        self.set_rows(rows);
        self.status = self.summary();
    }

    /// Replaces rows without touching the failure summary, as after a resize.
    pub fn set_rows(&mut self, rows: Vec<String>) {
        self.rows = rows;
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
        if self.mark.is_some_and(|mark| mark >= self.rows.len()) {
            self.mark = None;
        }
    }

    pub fn summary(&self) -> String {
        let items = match self.rows.len() {
            1 => "1 item".to_string(),
            count => format!("{count} items"),
        };
        if self.failing_backends.is_empty() {
            items
        } else {
            format!(
                "{items}, failing: {} (details in log)",
                self.failing_backends.join(", ")
            )
        }
    }

    pub fn open_overlay(&mut self, title: impl Into<String>, text: String) {
        self.overlay = Some(InspectOverlay {
            title: title.into(),
            text,
            scroll: 0,
        });
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if let Some(pending) = self.pending_confirmation.take() {
            match action {
                Action::ConfirmYes => {
                    self.status = format!("Confirmed: {}", pending.prompt);
                    self.mark = None;
                    return pending.command;
                }
                Action::ConfirmNo | Action::CancelInput | Action::CloseOverlay => {
                    self.status = "Action cancelled".to_string();
                    return AppCommand::None;
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.status =
                        "Pending confirmation: press y to confirm or n to cancel".to_string();
                    return AppCommand::None;
                }
            }
        }

        if !matches!(action, Action::GPrefix) {
            self.pending_g = false;
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::Down => {
                self.move_by(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_by(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_by(self.page_step());
                AppCommand::None
            }
            Action::PageUp => {
                self.move_by(-self.page_step());
                AppCommand::None
            }
            Action::Top => {
                self.jump_top();
                AppCommand::None
            }
            Action::Bottom => {
                self.jump_bottom();
                AppCommand::None
            }
            Action::GPrefix => {
                if self.pending_g {
                    self.pending_g = false;
                    self.jump_top();
                } else {
                    self.pending_g = true;
                }
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::Refresh => {
                self.status = format!("Refreshing '{}'", self.query);
                AppCommand::Refresh
            }
            Action::StartQuery => {
                self.overlay = None;
                self.mode = InputMode::Query;
                self.input = self.query.clone();
                self.status = "Query mode (backend=... resource=...)".to_string();
                AppCommand::None
            }
            Action::ToggleMark => {
                if self.overlay.is_some() || self.rows.is_empty() {
                    return AppCommand::None;
                }
                self.mark = match self.mark {
                    Some(_) => {
                        self.status = "Range mark cleared".to_string();
                        None
                    }
                    None => {
                        self.status = format!("Range mark at row {}", self.selected + 1);
                        Some(self.selected)
                    }
                };
                AppCommand::None
            }
            Action::DeleteSelection => self.prepare_delete_confirmation(),
            Action::Inspect => {
                if self.overlay.is_some() {
                    return AppCommand::None;
                }
                match self.selected_index() {
                    Some(index) => AppCommand::Inspect { index },
                    None => {
                        self.status = "Nothing to inspect".to_string();
                        AppCommand::None
                    }
                }
            }
            Action::CloseOverlay => {
                if self.overlay.take().is_some() {
                    self.status = "Closed inspect view".to_string();
                } else if self.mark.take().is_some() {
                    self.status = "Range mark cleared".to_string();
                }
                AppCommand::None
            }
            Action::SubmitInput => {
                self.mode = InputMode::Normal;
                self.query = self.input.trim().to_string();
                self.input.clear();
                self.mark = None;
                self.status = format!("Refreshing '{}'", self.query);
                AppCommand::Refresh
            }
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                self.status = "Input cancelled".to_string();
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                AppCommand::None
            }
            Action::DeleteWord => {
                while self.input.ends_with(' ') {
                    self.input.pop();
                }
                while !self.input.ends_with(' ') && !self.input.is_empty() {
                    self.input.pop();
                }
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.input.push(c);
                AppCommand::None
            }
            Action::ConfirmYes | Action::ConfirmNo => {
                self.status = "No pending confirmation".to_string();
                AppCommand::None
            }
        }
    }

    fn prepare_delete_confirmation(&mut self) -> AppCommand {
        if self.overlay.is_some() {
            return AppCommand::None;
        }
        let Some(selected) = self.selected_index() else {
            self.status = "Nothing to delete".to_string();
            return AppCommand::None;
        };

        let (first, last) = self.marked_range().unwrap_or((selected, selected));
        let (prompt, command) = if first == last {
            (
                format!("Delete row {}", first + 1),
                AppCommand::Delete {
                    start: first,
                    end: None,
                },
            )
        } else {
            (
                format!("Delete rows {}-{}", first + 1, last + 1),
                AppCommand::Delete {
                    start: first,
                    end: Some(last + 1),
                },
            )
        };

        self.pending_confirmation = Some(PendingConfirmation {
            prompt: prompt.clone(),
            command,
        });
        self.status = format!("{prompt}? [y/n]");
        AppCommand::None
    }

    fn page_step(&self) -> isize {
        (self.list_height as isize - 1).max(1)
    }

    fn overlay_max_scroll(&self) -> u16 {
        let lines = self
            .overlay
            .as_ref()
            .map_or(0, |overlay| overlay.text.lines().count());
        let max = lines.saturating_sub(self.overlay_height as usize);
        u16::try_from(max).unwrap_or(u16::MAX)
    }

    fn move_by(&mut self, delta: isize) {
        if self.overlay.is_some() {
            let max_scroll = self.overlay_max_scroll() as isize;
            if let Some(overlay) = self.overlay.as_mut() {
                let next = (overlay.scroll as isize + delta).clamp(0, max_scroll);
                overlay.scroll = next as u16;
            }
            return;
        }
        if self.rows.is_empty() {
            return;
        }
        let last = self.rows.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    fn jump_top(&mut self) {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.scroll = 0,
            None => self.selected = 0,
        }
    }

    fn jump_bottom(&mut self) {
        let max_scroll = self.overlay_max_scroll();
        match self.overlay.as_mut() {
            Some(overlay) => overlay.scroll = max_scroll,
            None => self.selected = self.rows.len().saturating_sub(1),
        }
    }
}
