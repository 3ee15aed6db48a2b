use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use doodle_common::config::{ROUND_DURATION_SECS, ROUND_END_GRACE};
use doodle_common::scoring::MIN_AWARD;

pub fn draw_help_popup(frame: &mut Frame) {
    let area = frame.area();

    // Center popup
    let popup_area = centered_rect(70, 80, area);

    // Clear background
    frame.render_widget(Clear, popup_area);

    let timing = format!(
        "{}s to draw; the answer shows for {}s",
        ROUND_DURATION_SECS,
        ROUND_END_GRACE.as_secs()
    );
    let award = format!("Seconds left on the clock (at least {})", MIN_AWARD);

    let sections: Vec<(&str, Color, Vec<(&str, &str)>)> = vec![
        (
            "HOW TO PLAY",
            Color::Rgb(255, 220, 50),
            vec![],
        ),
        (
            "Rounds",
            Color::Rgb(100, 200, 255),
            vec![
                ("Turns", "Everyone draws once per round, in join order"),
                ("Clock", timing.as_str()),
                ("Early end", "The round ends once everyone has guessed"),
            ],
        ),
        (
            "Guessing",
            Color::Rgb(200, 150, 255),
            vec![
                ("Match", "Exact word, any case, spaces around ignored"),
                ("Points", award.as_str()),
                ("Once", "One correct guess per player per turn"),
            ],
        ),
        (
            "CONTROLS",
            Color::Rgb(100, 255, 150),
            vec![
                ("[Ctrl+N]", "Create a room (dashboard)"),
                ("[Enter]", "Join room / send guess"),
                ("[R]", "Toggle ready (lobby)"),
                ("[S]", "Start game (lobby, creator only)"),
                ("[Arrows]", "Move brush (drawer)"),
                ("[Space]", "Lift / lower pen (drawer)"),
                ("[C]", "Clear canvas (drawer)"),
                ("[?]", "Toggle this help screen"),
                ("[Esc]", "Leave room"),
            ],
        ),
    ];

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(""));

    for (title, color, items) in &sections {
        lines.push(Line::from(Span::styled(
            format!("  {}", title),
            Style::default()
                .fg(*color)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        for (key, desc) in items {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("    {:<16}", key),
                    Style::default().fg(Color::Rgb(200, 200, 220)),
                ),
                Span::styled(
                    desc.to_string(),
                    Style::default().fg(Color::Rgb(150, 150, 170)),
                ),
            ]));
        }
        if !items.is_empty() {
            lines.push(Line::from(""));
        }
    }

    lines.push(Line::from(Span::styled(
        "  Press any key to close",
        Style::default().fg(Color::Rgb(100, 100, 120)),
    )));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(100, 200, 255)))
                .title(" Help - Rules & Controls ")
                .title_style(
                    Style::default()
                        .fg(Color::Rgb(255, 220, 50))
                        .add_modifier(Modifier::BOLD),
                ),
        );

    frame.render_widget(paragraph, popup_area);
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
