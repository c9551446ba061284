use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use entity_compare::{Bucket, ComparisonRun, Stats};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Common,
    OnlyA,
    OnlyB,
    Divergent,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Common => Page::OnlyA,
            Page::OnlyA => Page::OnlyB,
            Page::OnlyB => Page::Divergent,
            Page::Divergent => Page::Common,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Common => Page::Divergent,
            Page::OnlyA => Page::Common,
            Page::OnlyB => Page::OnlyA,
            Page::Divergent => Page::OnlyB,
        }
    }

    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            Page::Common => Some(Bucket::Common),
            Page::OnlyA => Some(Bucket::OnlyA),
            Page::OnlyB => Some(Bucket::OnlyB),
            Page::Divergent => None,
        }
    }

    pub fn title(&self, run: &ComparisonRun) -> String {
        match self.bucket() {
            Some(bucket) => bucket.title(&run.result.entity_a, &run.result.entity_b),
            None => "Divergent".to_string(),
        }
    }
}

/// One table line, shared by bucket pages and the divergent page
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub property: String,
    pub property_id: String,
    pub value: String,
    pub value_id: String,
    pub side: String,
}

pub struct App {
    pub run: ComparisonRun,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    rows: Vec<ViewRow>,
}

impl App {
    pub fn new(run: ComparisonRun) -> Self {
        let mut app = Self {
            run,
            state: TableState::default(),
            current_page: Page::Common,
            show_detail: false,
            rows: Vec::new(),
        };
        app.load_page();
        app
    }

    fn load_page(&mut self) {
        let result = &self.run.result;

        self.rows = match self.current_page.bucket() {
            Some(bucket) => {
                let side = match bucket {
                    Bucket::Common => "A & B",
                    Bucket::OnlyA => result.entity_a.label.as_str(),
                    Bucket::OnlyB => result.entity_b.label.as_str(),
                };
                result
                    .bucket(bucket)
                    .iter()
                    .map(|row| ViewRow {
                        property: row.property_label.clone(),
                        property_id: row.property_id.clone(),
                        value: row.value_label.clone(),
                        value_id: row.value_id.clone(),
                        side: side.to_string(),
                    })
                    .collect()
            }
            None => result
                .divergent_properties()
                .into_iter()
                .flat_map(|property| {
                    let a_rows = property.values_a.into_iter().map(|v| (&result.entity_a.label, v));
                    let b_rows = property.values_b.into_iter().map(|v| (&result.entity_b.label, v));
                    let label = property.property_label;
                    let id = property.property_id;
                    a_rows
                        .chain(b_rows)
                        .map(move |(side, value)| ViewRow {
                            property: label.clone(),
                            property_id: id.clone(),
                            value: value.value_label,
                            value_id: value.value_id,
                            side: side.clone(),
                        })
                        .collect::<Vec<_>>()
                })
                .collect(),
        };

        // Reset selection to first item
        if self.rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn stats(&self) -> &Stats {
        &self.run.stats
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_row(&self) -> Option<&ViewRow> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.load_page();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.load_page();
    }

    pub fn next(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn last(&mut self) {
        if !self.rows.is_empty() {
            self.state.select(Some(self.rows.len() - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if !app.rows().is_empty() {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Header: tabs + stats
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let stats = app.stats();
    let pages = [Page::Common, Page::OnlyA, Page::OnlyB, Page::Divergent];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(&app.run), style));
    }

    let stat_spans = vec![
        Span::styled(
            format!("{} vs {}", app.run.result.entity_a.display_name(), app.run.result.entity_b.display_name()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(format!("= {}", stats.common_count), Style::default().fg(Color::Green)),
        Span::raw("  "),
        Span::styled(format!("A {}", stats.only_a_count), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(format!("B {}", stats.only_b_count), Style::default().fg(Color::Magenta)),
        Span::raw("  |  "),
        Span::styled(
            format!("Similarity {:.1}%", stats.similarity_ratio * 100.0),
            Style::default().fg(Color::Yellow),
        ),
    ];

    let header = Paragraph::new(vec![Line::from(tab_spans), Line::from(stat_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Property", "Property ID", "Value", "Value ID", "Side"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let color = page_color(app.current_page);
    let rows = app.rows().iter().map(|row| {
        let cells = vec![
            Cell::from(truncate(&row.property, 30)),
            Cell::from(row.property_id.clone()),
            Cell::from(truncate(&row.value, 36)).style(Style::default().fg(color)),
            Cell::from(row.value_id.clone()),
            Cell::from(truncate(&row.side, 20)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(12),
            Constraint::Length(38),
            Constraint::Length(14),
            Constraint::Length(22),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", app.current_page.title(&app.run))),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn page_color(page: Page) -> Color {
    match page {
        Page::Common => Color::Green,
        Page::OnlyA => Color::Cyan,
        Page::OnlyB => Color::Magenta,
        Page::Divergent => Color::Red,
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.rows().len();

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let row = match app.selected_row() {
        Some(r) => r,
        None => {
            let no_selection = Paragraph::new("No statement selected").block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Statement "),
            );
            f.render_widget(no_selection, area);
            return;
        }
    };

    let field = |name: &'static str, value: &str| {
        Line::from(vec![
            Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(value.to_string()),
        ])
    };

    let content = vec![
        Line::from(""),
        field("  Property: ", &row.property),
        field("  Property ID: ", &row.property_id),
        Line::from(""),
        field("  Value: ", &row.value),
        field("  Value ID: ", &row.value_id),
        Line::from(""),
        field("  Seen on: ", &row.side),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Statement "),
    );

    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
