use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use doodle_common::profile::UserProfile;
use doodle_common::room::{RoomCode, RoomCodeError, ROOM_CODE_LEN};

#[derive(Debug, Clone)]
pub struct DashboardScreen {
    pub player_name: String,
    pub code_input: String,
    pub profile: Option<UserProfile>,
    pub status_message: Option<String>,
    pub offline: bool,
}

impl DashboardScreen {
    pub fn new(player_name: String, profile: Option<UserProfile>) -> Self {
        Self {
            player_name,
            code_input: String::new(),
            profile,
            status_message: None,
            offline: false,
        }
    }

    pub fn with_status(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Codes are alphanumeric, so anything else is dropped at the keyboard.
    pub fn type_char(&mut self, c: char) {
        if c.is_ascii_alphanumeric() && self.code_input.len() < ROOM_CODE_LEN {
            self.code_input.push(c.to_ascii_uppercase());
        }
    }

    pub fn backspace(&mut self) {
        self.code_input.pop();
    }

    pub fn parse_code(&self) -> Result<RoomCode, RoomCodeError> {
        RoomCode::parse(&self.code_input)
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title bar
                Constraint::Min(10),   // Body
                Constraint::Length(3), // Help bar
            ])
            .split(area);

        // Title
        let mut title_spans = vec![
            Span::styled(
                "  DOODLE ",
                Style::default()
                    .fg(Color::Rgb(255, 220, 50))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("Dashboard - Welcome, ", Style::default().fg(Color::Rgb(180, 180, 200))),
            Span::styled(
                self.player_name.as_str(),
                Style::default()
                    .fg(Color::Rgb(100, 200, 255))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("!", Style::default().fg(Color::Rgb(180, 180, 200))),
        ];
        if self.offline {
            title_spans.push(Span::styled(
                "  (offline)",
                Style::default().fg(Color::Rgb(255, 150, 100)),
            ));
        }
        let title = Paragraph::new(Line::from(title_spans)).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::Rgb(60, 60, 80))),
        );
        frame.render_widget(title, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        self.draw_join_panel(frame, body[0]);
        self.draw_profile_panel(frame, body[1]);

        // Help bar
        let help = Paragraph::new(Line::from(vec![
            Span::raw("  "),
            Span::styled("[Ctrl+N]", Style::default().fg(Color::Rgb(100, 200, 255))),
            Span::styled(" Create room  ", Style::default().fg(Color::Rgb(120, 120, 140))),
            Span::styled("[Enter]", Style::default().fg(Color::Rgb(100, 255, 150))),
            Span::styled(" Join  ", Style::default().fg(Color::Rgb(120, 120, 140))),
            Span::styled("[?]", Style::default().fg(Color::Rgb(200, 150, 255))),
            Span::styled(" Help  ", Style::default().fg(Color::Rgb(120, 120, 140))),
            Span::styled("[Esc]", Style::default().fg(Color::Rgb(255, 150, 100))),
            Span::styled(" Quit", Style::default().fg(Color::Rgb(120, 120, 140))),
        ]))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::Rgb(60, 60, 80))),
        );
        frame.render_widget(help, chunks[2]);
    }

    fn draw_join_panel(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Prompt
                Constraint::Length(3), // Code field
                Constraint::Length(2), // Status/Error
                Constraint::Min(0),
            ])
            .margin(1)
            .split(area);

        let prompt = Paragraph::new("  Enter a room code to join, or create a new room.")
            .style(Style::default().fg(Color::Rgb(150, 150, 170)));
        frame.render_widget(prompt, chunks[0]);

        let padded = format!("{:_<width$}", self.code_input, width = ROOM_CODE_LEN);
        let code_input = Paragraph::new(Span::styled(
            padded,
            Style::default()
                .fg(Color::Rgb(255, 220, 50))
                .add_modifier(Modifier::BOLD),
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Room Code "),
        );
        frame.render_widget(code_input, chunks[1]);

        if let Some(ref msg) = self.status_message {
            let status = Paragraph::new(format!("  {}", msg))
                .style(Style::default().fg(Color::Rgb(255, 150, 100)));
            frame.render_widget(status, chunks[2]);
        }

        frame.set_cursor_position((
            chunks[1].x + self.code_input.len() as u16 + 1,
            chunks[1].y + 1,
        ));
    }

    fn draw_profile_panel(&self, frame: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Rgb(150, 150, 170));
        let value = Style::default()
            .fg(Color::Rgb(100, 200, 255))
            .add_modifier(Modifier::BOLD);

        let mut lines: Vec<Line> = Vec::new();
        match &self.profile {
            Some(p) => {
                lines.push(Line::from(""));
                for (name, stat) in [
                    ("Games played", p.games_played.to_string()),
                    ("Games won", p.games_won.to_string()),
                    ("Win rate", format!("{}%", p.win_rate())),
                    ("Total score", p.total_score.to_string()),
                    ("Average score", p.average_score().to_string()),
                ] {
                    lines.push(Line::from(vec![
                        Span::styled(format!("  {:<16}", name), label),
                        Span::styled(stat, value),
                    ]));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "  Achievements",
                    Style::default()
                        .fg(Color::Rgb(255, 220, 50))
                        .add_modifier(Modifier::BOLD),
                )));
                for a in p.achievements() {
                    let (mark, style) = if a.unlocked {
                        ("★", Style::default().fg(Color::Rgb(100, 255, 150)))
                    } else {
                        ("·", Style::default().fg(Color::Rgb(80, 80, 100)))
                    };
                    lines.push(Line::from(vec![
                        Span::styled(format!("  {} {:<14}", mark, a.name), style),
                        Span::styled(a.description, Style::default().fg(Color::Rgb(120, 120, 140))),
                    ]));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "  Profile unavailable",
                Style::default().fg(Color::Rgb(100, 100, 120)),
            ))),
        }

        let panel = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
                .title(" Profile ")
                .title_style(Style::default().fg(Color::Rgb(180, 180, 200))),
        );
        frame.render_widget(panel, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_input_normalized() {
        let mut screen = DashboardScreen::new("Ada".into(), None);
        for c in "ab-1 2c9z".chars() {
            screen.type_char(c);
        }
        assert_eq!(screen.code_input, "AB12C9");
        assert_eq!(screen.parse_code().unwrap().as_str(), "AB12C9");
    }

    #[test]
    fn test_short_code_rejected_before_lookup() {
        let mut screen = DashboardScreen::new("Ada".into(), None);
        screen.type_char('a');
        screen.type_char('b');
        assert_eq!(screen.parse_code(), Err(RoomCodeError::Length(2)));
        screen.backspace();
        assert_eq!(screen.code_input, "A");
    }
}
