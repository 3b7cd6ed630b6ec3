use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::{timeago, App, View};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.view {
        View::Feed => render_feed(frame, app, chunks[1]),
        View::Reading => render_reading(frame, app, chunks[1]),
    }

    render_status(frame, app, chunks[2]);

    // Render URL input popup if active
    if app.url_input_active {
        render_url_input(frame, app);
    }

    // Render help popup if active
    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let info = match app.view {
        View::Feed => format!(" {} pages", app.pages.len()),
        View::Reading => app
            .current
            .as_ref()
            .map(|s| format!(" {}", s.current.url))
            .unwrap_or_default(),
    };

    let block = Block::default()
        .title(" Shelfmark ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(info).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_feed(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .pages
        .iter()
        .map(|page| {
            let line = Line::from(vec![
                Span::styled(page.title.as_str(), Style::default().fg(Color::White)),
                Span::styled(
                    format!("  {}", timeago(page.created_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_reading(frame: &mut Frame, app: &App, area: Rect) {
    let Some(current) = &app.current else {
        return;
    };
    let page = &current.current;

    let block = Block::default()
        .title(format!(" {} ({}) ", page.title, timeago(page.created_at)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Wrap to the actual pane width each frame so resizes come for free.
    let width = inner.width.max(20) as usize;
    let text = app.reading_text.as_deref().unwrap_or_default();
    let lines: Vec<Line> = text
        .lines()
        .flat_map(|raw| {
            if raw.trim().is_empty() {
                vec![Line::from("")]
            } else {
                textwrap::wrap(raw, width)
                    .into_iter()
                    .map(|cow| Line::from(cow.into_owned()))
                    .collect()
            }
        })
        .collect();

    let paragraph = Paragraph::new(lines).scroll((app.scroll, 0));
    frame.render_widget(paragraph, inner);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = match &app.status {
        Some(status) => status.clone(),
        None => match app.view {
            View::Feed => {
                "j/k:nav  Enter:read  a:add  d:delete  r:refresh  ?:help  q:quit".to_string()
            }
            View::Reading => "j/k:scroll  n:newer  p:older  o:browser  b:back  q:quit".to_string(),
        },
    };

    let paragraph = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_url_input(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(" Save a page - enter URL ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    // Clear the area first
    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {}_", app.url_input);
    let paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = vec![
        "",
        " Feed:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   < / >    Jump to top / bottom",
        "   Enter    Read the selected page",
        "   a        Save a new page",
        "   d        Delete the selected page",
        "   r        Refresh the feed",
        "",
        " Reading:",
        "   j / k    Scroll",
        "   n / p    Newer / older page",
        "   b / Esc  Back to the feed",
        "",
        " General:",
        "   o        Open in browser",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
