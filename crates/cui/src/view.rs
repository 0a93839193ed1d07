use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Style, Stylize};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(12),
            Constraint::Length(8),
        ])
        .split(frame.area());

    draw_header(frame, root[0], app);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(root[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.reel_rows().len() as u16 + 2),
            Constraint::Length(3),
            Constraint::Min(4),
        ])
        .split(middle[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(middle[1]);

    draw_reel(frame, left[0], app);
    draw_progress(frame, left[1], app);
    draw_selection(frame, left[2], app);
    draw_history(frame, right[0], app);
    draw_roster(frame, right[1], app);
    draw_events(frame, root[2], app);

    if app.show_help {
        draw_help_popup(frame);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!("Roster Spin | Hint: {}", app.next_hint());
    let summary = format!(
        "Phase: {} | Available: {} | Drawn: {}",
        app.phase_label(),
        app.available_summary(),
        app.session.history().len()
    );
    let lines = vec![
        Line::from(title.bold()),
        Line::from(summary),
        Line::from(format!("Data: {}", app.data_dir.display())),
        Line::from(format!("Status: {}", app.status_line)),
    ];
    let block = Block::default().borders(Borders::ALL).title("Overview");
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(paragraph, area);
}

fn draw_reel(frame: &mut Frame, area: Rect, app: &App) {
    let spinning = app.session.state().is_spinning;
    let lines: Vec<Line<'_>> = app
        .reel_rows()
        .into_iter()
        .map(|row| {
            if row.centered {
                let style = if spinning {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                };
                Line::styled(format!(">> {} <<", row.label), style)
            } else {
                Line::styled(row.label, Style::default().fg(Color::DarkGray))
            }
        })
        .collect();
    let block = pane_block("Reel", spinning);
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn draw_progress(frame: &mut Frame, area: Rect, app: &App) {
    let progress = app.session.animator().progress().clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Spin"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(progress)
        .label(format!("{:.0}%", progress * 100.0));
    frame.render_widget(gauge, area);
}

fn draw_selection(frame: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line<'_>> = app
        .selection_lines()
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 {
                Line::from(line.bold())
            } else {
                Line::from(line)
            }
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Selection");
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

fn draw_history(frame: &mut Frame, area: Rect, app: &App) {
    let rows = app.history_rows();
    let items: Vec<ListItem<'_>> = if rows.is_empty() {
        vec![ListItem::new("empty")]
    } else {
        rows.into_iter().map(ListItem::new).collect()
    };
    let block = Block::default().borders(Borders::ALL).title("History");
    frame.render_widget(List::new(items).block(block), area);
}

fn draw_roster(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem<'_>> = app
        .roster_rows()
        .into_iter()
        .map(|row| {
            if row.drawn {
                ListItem::new(row.label).style(
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ListItem::new(row.label)
            }
        })
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Roster");
    frame.render_widget(List::new(items).block(block), area);
}

fn draw_events(frame: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line<'_>> = app
        .event_log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|line| Line::from(line.as_str()))
        .collect();
    let block = Block::default().borders(Borders::ALL).title("Events");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_help_popup(frame: &mut Frame) {
    let area = centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from("space / enter / d  draw"),
        Line::from("s  skip (clear the current pick, keep history)"),
        Line::from("P  purge history (press twice)"),
        Line::from("esc  close help / cancel purge"),
        Line::from("? help | q quit"),
    ];
    let block = Block::default().borders(Borders::ALL).title("Help");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let mut block = Block::default().title(title).borders(Borders::ALL);
    if focused {
        block = block.border_style(Style::default().fg(Color::Yellow));
    }
    block
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
