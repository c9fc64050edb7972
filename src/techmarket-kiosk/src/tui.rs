//! Interactive kiosk: login gate, inventory manager and customer showcase.

use crate::controller::{AdminController, Mutation, Notice, NoticeKind, ProductList, RefreshTicket};
use crate::form::FormField;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::collections::VecDeque;
use std::time::Duration;
use techmarket_catalog::{Backend, Catalog, Product, ProductId};

// ============================================================================
// Public entry point
// ============================================================================

/// Run the kiosk until the user quits from the login screen.
pub fn run<B: Backend>(catalog: Catalog<B>, passcode: String) -> Result<()> {
    let app = App::new(catalog, passcode);
    app.run()
}

// ============================================================================
// App state
// ============================================================================

struct App<B> {
    catalog: Catalog<B>,
    passcode: String,
    screen: Screen,
    should_quit: bool,
    /// Shown one at a time, oldest first. Any key dismisses the front one.
    notices: VecDeque<Notice>,
    /// Work scheduled by key handlers, run by the loop after the next draw.
    pending: VecDeque<PendingWork>,
}

enum PendingWork {
    Refresh(RefreshTicket),
    Mutation(Mutation),
}

enum Screen {
    Login(LoginScreen),
    Admin(AdminScreen),
    Showcase(ShowcaseScreen),
}

#[derive(Default)]
struct LoginScreen {
    focus: LoginFocus,
    input: String,
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
enum LoginFocus {
    #[default]
    Customer,
    Passcode,
}

struct AdminScreen {
    controller: AdminController,
    focus: AdminFocus,
    list_state: ListState,
    /// Cursor inside the focused field, in characters.
    cursor: usize,
    /// Product awaiting delete confirmation.
    confirm: Option<ProductId>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum AdminFocus {
    Field(FormField),
    List,
}

struct ShowcaseScreen {
    list: ProductList,
    list_state: ListState,
}

#[derive(Clone, Copy)]
enum Destination {
    Login,
    Admin,
    Showcase,
}

/// What a key press asks the app to do once the screen borrow is released.
enum Outcome {
    Nothing,
    Schedule(PendingWork),
    Notify(Notice),
    Enter(Destination),
    Quit,
}

impl From<Result<Mutation, Notice>> for Outcome {
    fn from(result: Result<Mutation, Notice>) -> Self {
        match result {
            Ok(mutation) => Outcome::Schedule(PendingWork::Mutation(mutation)),
            Err(notice) => Outcome::Notify(notice),
        }
    }
}

/// Clamped (non-wrapping) movement on a `ListState` within `0..count`.
fn list_nav(state: &mut ListState, count: usize, forward: bool) {
    if let Some(selected) = state.selected() {
        if forward {
            if selected < count.saturating_sub(1) {
                state.select(Some(selected + 1));
            }
        } else if selected > 0 {
            state.select(Some(selected - 1));
        }
    }
}

/// Keep the list cursor on a valid row after the rows changed.
fn sync_list_state(state: &mut ListState, count: usize) {
    match (state.selected(), count) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), n) if i >= n => state.select(Some(n - 1)),
        _ => {}
    }
}

/// Byte offset of the `index`-th character, or the end of `text`.
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices().nth(index).map_or(text.len(), |(b, _)| b)
}

impl AdminScreen {
    fn new() -> Self {
        Self {
            controller: AdminController::new(),
            focus: AdminFocus::List,
            list_state: ListState::default(),
            cursor: 0,
            confirm: None,
        }
    }

    fn set_focus(&mut self, focus: AdminFocus) {
        self.focus = focus;
        if let AdminFocus::Field(field) = focus {
            self.cursor = self.controller.form().field(field).chars().count();
        }
    }

    fn handle_field_key(&mut self, field: FormField, key: KeyCode) {
        let len = self.controller.form().field(field).chars().count();
        match key {
            KeyCode::Char(c) => {
                let value = self.controller.form_mut().field_mut(field);
                value.insert(byte_offset(value, self.cursor), c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let value = self.controller.form_mut().field_mut(field);
                    value.remove(byte_offset(value, self.cursor));
                }
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let value = self.controller.form_mut().field_mut(field);
                    value.remove(byte_offset(value, self.cursor));
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Tab | KeyCode::Down | KeyCode::Enter => match field.next() {
                Some(next) => self.set_focus(AdminFocus::Field(next)),
                None => self.set_focus(AdminFocus::List),
            },
            KeyCode::BackTab | KeyCode::Up => {
                if let Some(prev) = field.prev() {
                    self.set_focus(AdminFocus::Field(prev));
                }
            }
            KeyCode::Esc => self.set_focus(AdminFocus::List),
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyCode) -> Outcome {
        let count = self.controller.list().len();
        match key {
            KeyCode::Up | KeyCode::Char('k') => list_nav(&mut self.list_state, count, false),
            KeyCode::Down | KeyCode::Char('j') => list_nav(&mut self.list_state, count, true),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(index) = self.list_state.selected() {
                    self.controller.select_row(index);
                }
            }
            KeyCode::Tab | KeyCode::Char('e') => {
                self.set_focus(AdminFocus::Field(FormField::Title));
            }
            KeyCode::BackTab => self.set_focus(AdminFocus::Field(FormField::Image)),
            KeyCode::Char('a') => return self.controller.submit_insert().into(),
            KeyCode::Char('u') => return self.controller.submit_update().into(),
            KeyCode::Char('d') => match self.controller.request_delete() {
                Ok(id) => self.confirm = Some(id),
                Err(notice) => return Outcome::Notify(notice),
            },
            KeyCode::Char('c') => self.controller.clear(),
            KeyCode::Char('r') => {
                let ticket = self.controller.list_mut().begin_refresh();
                return Outcome::Schedule(PendingWork::Refresh(ticket));
            }
            KeyCode::Char('q') | KeyCode::Esc => return Outcome::Enter(Destination::Login),
            _ => {}
        }
        Outcome::Nothing
    }

    fn handle_confirm_key(&mut self, id: ProductId, key: KeyCode) -> Outcome {
        match key {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.confirm = None;
                self.controller.confirm_delete(id).into()
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                tracing::debug!(id, "delete declined");
                self.confirm = None;
                Outcome::Nothing
            }
            _ => Outcome::Nothing,
        }
    }
}

impl<B: Backend> App<B> {
    fn new(catalog: Catalog<B>, passcode: String) -> Self {
        Self {
            catalog,
            passcode,
            screen: Screen::Login(LoginScreen::default()),
            should_quit: false,
            notices: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }

    fn run(mut self) -> Result<()> {
        // Restore the terminal before printing a panic message.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = ratatui::try_restore();
            let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_inner();

        ratatui::restore();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::cursor::Show);
        let _ = std::panic::take_hook();

        result
    }

    fn run_inner(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();

        loop {
            terminal.draw(|frame| self.render(frame))?;

            // Scheduled work runs after a frame showing "Saving..." or
            // "Loading..." has been drawn, then the result is drawn.
            if !self.pending.is_empty() {
                self.process_pending();
                continue;
            }

            if event::poll(Duration::from_millis(100))?
                && let Event::Key(key) = event::read()?
            {
                // Windows compatibility: only handle Press events
                if key.kind == KeyEventKind::Press {
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }
                    self.handle_key(key.code);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn process_pending(&mut self) {
        while let Some(work) = self.pending.pop_front() {
            match (work, &mut self.screen) {
                (PendingWork::Refresh(ticket), Screen::Admin(state)) => {
                    let list = state.controller.list_mut();
                    let result = self.catalog.list(list.order());
                    self.notices.extend(list.finish_refresh(ticket, result));
                    sync_list_state(&mut state.list_state, state.controller.list().len());
                }
                (PendingWork::Refresh(ticket), Screen::Showcase(state)) => {
                    let result = self.catalog.list(state.list.order());
                    self.notices.extend(state.list.finish_refresh(ticket, result));
                    sync_list_state(&mut state.list_state, state.list.len());
                }
                (PendingWork::Mutation(mutation), Screen::Admin(state)) => {
                    let notices = state.controller.execute(&self.catalog, mutation);
                    self.notices.extend(notices);
                    sync_list_state(&mut state.list_state, state.controller.list().len());
                }
                (PendingWork::Mutation(mutation), _) => {
                    tracing::warn!(?mutation, "dropping change scheduled outside the inventory screen");
                }
                (PendingWork::Refresh(_), Screen::Login(_)) => {}
            }
        }
    }

    fn enter(&mut self, destination: Destination) {
        match destination {
            Destination::Login => {
                tracing::info!("returned to login");
                self.screen = Screen::Login(LoginScreen::default());
            }
            Destination::Admin => {
                let mut state = AdminScreen::new();
                let ticket = state.controller.list_mut().begin_refresh();
                self.pending.push_back(PendingWork::Refresh(ticket));
                self.screen = Screen::Admin(state);
            }
            Destination::Showcase => {
                let mut list = ProductList::showcase();
                let ticket = list.begin_refresh();
                self.pending.push_back(PendingWork::Refresh(ticket));
                self.screen = Screen::Showcase(ShowcaseScreen {
                    list,
                    list_state: ListState::default(),
                });
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Nothing => {}
            Outcome::Schedule(work) => self.pending.push_back(work),
            Outcome::Notify(notice) => self.notices.push_back(notice),
            Outcome::Enter(destination) => self.enter(destination),
            Outcome::Quit => self.should_quit = true,
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        if self.notices.pop_front().is_some() {
            return;
        }

        let outcome = match &mut self.screen {
            Screen::Login(state) => Self::handle_login_key(state, &self.passcode, key),
            Screen::Admin(state) => match (state.confirm, state.focus) {
                (Some(id), _) => state.handle_confirm_key(id, key),
                (None, AdminFocus::Field(field)) => {
                    state.handle_field_key(field, key);
                    Outcome::Nothing
                }
                (None, AdminFocus::List) => state.handle_list_key(key),
            },
            Screen::Showcase(state) => match key {
                KeyCode::Up | KeyCode::Char('k') => {
                    list_nav(&mut state.list_state, state.list.len(), false);
                    Outcome::Nothing
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    list_nav(&mut state.list_state, state.list.len(), true);
                    Outcome::Nothing
                }
                KeyCode::Char('r') => {
                    Outcome::Schedule(PendingWork::Refresh(state.list.begin_refresh()))
                }
                KeyCode::Char('q') | KeyCode::Esc => Outcome::Enter(Destination::Login),
                _ => Outcome::Nothing,
            },
        };
        self.apply(outcome);
    }

    fn handle_login_key(state: &mut LoginScreen, passcode: &str, key: KeyCode) -> Outcome {
        match (state.focus, key) {
            (_, KeyCode::Esc) => Outcome::Quit,
            (_, KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down) => {
                state.focus = match state.focus {
                    LoginFocus::Customer => LoginFocus::Passcode,
                    LoginFocus::Passcode => LoginFocus::Customer,
                };
                Outcome::Nothing
            }
            (LoginFocus::Customer, KeyCode::Enter) => Outcome::Enter(Destination::Showcase),
            (LoginFocus::Customer, KeyCode::Char('q')) => Outcome::Quit,
            (LoginFocus::Passcode, KeyCode::Char(c)) => {
                state.input.push(c);
                Outcome::Nothing
            }
            (LoginFocus::Passcode, KeyCode::Backspace) => {
                state.input.pop();
                Outcome::Nothing
            }
            (LoginFocus::Passcode, KeyCode::Enter) => {
                let accepted = state.input == passcode;
                state.input.clear();
                if accepted {
                    tracing::info!("admin session started");
                    Outcome::Enter(Destination::Admin)
                } else {
                    tracing::warn!("admin passcode rejected");
                    Outcome::Notify(Notice::error("Access denied", "Incorrect passcode."))
                }
            }
            _ => Outcome::Nothing,
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn render(&mut self, frame: &mut Frame) {
        match &mut self.screen {
            Screen::Login(state) => render_login(frame, state),
            Screen::Admin(state) => render_admin(frame, state),
            Screen::Showcase(state) => render_showcase(frame, state),
        }
        if let Some(notice) = self.notices.front() {
            render_notice(frame, notice);
        }
    }
}

// ============================================================================
// Screen renderers
// ============================================================================

fn render_login(frame: &mut Frame, state: &LoginScreen) {
    let popup = centered_rect(60, 60, frame.area());
    let block = Block::default()
        .title(" TechMarket ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [_, welcome, _, customer, _, label, input, _, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("Welcome to TechMarket!").centered(),
        welcome,
    );

    let customer_style = if state.focus == LoginFocus::Customer {
        Style::default().fg(Color::Black).bg(Color::Green).bold()
    } else {
        Style::default().fg(Color::Green)
    };
    frame.render_widget(
        Paragraph::new("[ I'm a customer: browse the catalog ]")
            .style(customer_style)
            .centered(),
        customer,
    );

    let masked = "*".repeat(state.input.chars().count());
    render_form_field(
        frame,
        "Admin passcode:",
        &masked,
        "",
        state.focus == LoginFocus::Passcode,
        label,
        input,
    );

    frame.render_widget(
        Paragraph::new("Tab Switch | Enter Confirm | Esc Quit")
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        hint,
    );

    if state.focus == LoginFocus::Passcode {
        frame.set_cursor_position(Position::new(
            input.x + 1 + masked.chars().count() as u16,
            input.y + 1,
        ));
    }
}

fn render_admin(frame: &mut Frame, state: &mut AdminScreen) {
    let area = frame.area();
    let [header, id_line, form_area, list_area, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(16),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let status = if state.controller.is_busy() {
        Span::styled("  Saving...", Style::default().fg(Color::Yellow))
    } else if state.controller.list().is_loading() {
        Span::styled("  Loading...", Style::default().fg(Color::Cyan))
    } else {
        Span::raw("")
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                "TechMarket Inventory",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            status,
        ])),
        header,
    );

    let form = state.controller.form();
    let id_text = match form.selected() {
        Some(id) => format!("ID: {id} (editing)"),
        None => "ID: new product".to_string(),
    };
    frame.render_widget(
        Paragraph::new(id_text).style(Style::default().fg(Color::DarkGray)),
        id_line,
    );

    let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(3)].repeat(4))
        .split(form_area);
    for (i, field) in FormField::ALL.into_iter().enumerate() {
        let focused = state.focus == AdminFocus::Field(field);
        render_form_field(
            frame,
            field.label(),
            form.field(field),
            field.placeholder(),
            focused,
            rows[i * 2],
            rows[i * 2 + 1],
        );
        if focused {
            let cursor = state.cursor.min(form.field(field).chars().count());
            let input = rows[i * 2 + 1];
            // +1 for border
            frame.set_cursor_position(Position::new(input.x + 1 + cursor as u16, input.y + 1));
        }
    }

    let selected = form.selected();
    let items: Vec<ListItem> = state
        .controller
        .list()
        .products()
        .iter()
        .map(|p| inventory_list_item(p, selected == Some(p.id)))
        .collect();
    let list_border = if state.focus == AdminFocus::List {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let title = format!(" Products ({}) ", state.controller.list().len());
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(list_border)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut state.list_state);

    let mut hints = String::from("a Add");
    if selected.is_some() {
        hints.push_str(" | u Update | d Delete");
    }
    hints.push_str(" | c Clear | r Refresh | Tab Edit | q Logout");
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        hint,
    );

    if let Some(id) = state.confirm {
        render_confirm(frame, id);
    }
}

/// One inventory row. The product loaded into the form is ticked.
fn inventory_list_item(product: &Product, selected: bool) -> ListItem<'_> {
    let (mark, style) = if selected {
        ("✓ ", Style::default().fg(Color::Green).bold())
    } else {
        ("  ", Style::default())
    };
    ListItem::new(Line::from(vec![
        Span::styled(mark, style),
        Span::styled(
            format!("#{:<5}", product.id),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(product.title.as_str(), style),
        Span::raw("  "),
        Span::styled(product.display_price(), Style::default().fg(Color::Green)),
    ]))
}

fn render_showcase(frame: &mut Frame, state: &mut ShowcaseScreen) {
    let area = frame.area();
    let [header, body, hint] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new("TechMarket Showcase")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .centered(),
        header,
    );
    frame.render_widget(
        Paragraph::new("j/k Scroll | r Refresh | q Back")
            .style(Style::default().fg(Color::DarkGray))
            .centered(),
        hint,
    );

    if state.list.is_empty() {
        let message = if state.list.is_loading() {
            "Loading catalog..."
        } else {
            "Our inventory is being updated."
        };
        let vertical = Layout::vertical([Constraint::Length(1)]).flex(Flex::Center);
        let [center] = vertical.areas(body);
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .centered(),
            center,
        );
        return;
    }

    let items: Vec<ListItem> = state.list.products().iter().map(showcase_card).collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::Yellow));
    frame.render_stateful_widget(list, body, &mut state.list_state);
}

fn showcase_card(product: &Product) -> ListItem<'_> {
    let description = product
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("Ask a salesperson for more details.");
    ListItem::new(Text::from(vec![
        Line::from(Span::styled(
            product.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(description, Style::default().fg(Color::Gray))),
        Line::from(vec![
            Span::styled("Technology", Style::default().fg(Color::Magenta)),
            Span::raw("  "),
            Span::styled(
                product.display_price(),
                Style::default().fg(Color::Green).bold(),
            ),
        ]),
        Line::from(""),
    ]))
}

fn render_confirm(frame: &mut Frame, id: ProductId) {
    let popup = centered_rect(50, 25, frame.area());
    frame.render_widget(Clear, popup);
    let text = Text::from(vec![
        Line::from(""),
        Line::from(format!("Delete product ID: {id}?")),
        Line::from(""),
        Line::from(Span::styled(
            "y Delete | n Cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(
        Paragraph::new(text).centered().block(
            Block::default()
                .title(" Confirm ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .style(Style::default().bg(Color::Black)),
        ),
        popup,
    );
}

fn render_notice(frame: &mut Frame, notice: &Notice) {
    let color = match notice.kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::Warning => Color::Yellow,
        NoticeKind::Error => Color::Red,
    };
    let popup = centered_rect(50, 30, frame.area());
    frame.render_widget(Clear, popup);
    let text = Text::from(vec![
        Line::from(""),
        Line::from(notice.message.as_str()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(
        Paragraph::new(text)
            .centered()
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(format!(" {} ", notice.title))
                    .title_style(Style::default().fg(color).bold())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(Color::Black)),
            ),
        popup,
    );
}

fn render_form_field(
    frame: &mut Frame,
    label: &str,
    value: &str,
    placeholder: &str,
    focused: bool,
    label_area: Rect,
    input_area: Rect,
) {
    frame.render_widget(
        Paragraph::new(label).style(Style::default().bold()),
        label_area,
    );
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let content = if value.is_empty() && !focused {
        Span::styled(placeholder, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(value)
    };
    frame.render_widget(
        Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        ),
        input_area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [v_area] = vertical.areas(area);
    let [h_area] = horizontal.areas(v_area);
    h_area
}
