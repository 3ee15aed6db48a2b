use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use doodle_common::lobby::LobbyView;
use doodle_common::room::MAX_PLAYERS;

use super::standings_widget::player_color;

#[derive(Debug, Clone)]
pub struct LobbyScreen {
    pub view: LobbyView,
    pub status_message: Option<String>,
}

impl LobbyScreen {
    pub fn new(view: LobbyView) -> Self {
        Self {
            view,
            status_message: None,
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let room = &self.view;

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(15),
                Constraint::Length(18),
                Constraint::Percentage(15),
            ])
            .split(area);

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(20),
                Constraint::Percentage(60),
                Constraint::Percentage(20),
            ])
            .split(vertical[1]);

        let form_area = horizontal[1];

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),  // Title
                Constraint::Length(2),  // Room code
                Constraint::Min(4),     // Player list
                Constraint::Length(2),  // Status
                Constraint::Length(2),  // Help
            ])
            .split(form_area);

        // Title
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                "  DOODLE ",
                Style::default()
                    .fg(Color::Rgb(255, 220, 50))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "- Lobby",
                Style::default().fg(Color::Rgb(180, 180, 200)),
            ),
        ]));
        frame.render_widget(title, chunks[0]);

        // Room code + counts
        let room_info = Paragraph::new(Line::from(vec![
            Span::styled("  Room ", Style::default().fg(Color::Rgb(150, 150, 170))),
            Span::styled(
                room.code.to_string(),
                Style::default()
                    .fg(Color::Rgb(100, 200, 255))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(
                    "  ({}/{} players, {} ready, {} rounds)",
                    room.entries.len(),
                    MAX_PLAYERS,
                    room.ready_count(),
                    room.max_rounds
                ),
                Style::default().fg(Color::Rgb(120, 120, 140)),
            ),
        ]));
        frame.render_widget(room_info, chunks[1]);

        // Player list
        let player_lines: Vec<Line> = room
            .entries
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let (ready_mark, ready_style) = if p.is_ready {
                    (" ✓ ", Style::default().fg(Color::Rgb(100, 255, 150)))
                } else {
                    (" · ", Style::default().fg(Color::Rgb(120, 120, 140)))
                };
                let mut name_style = Style::default().fg(player_color(idx));
                if p.is_local {
                    name_style = name_style.add_modifier(Modifier::UNDERLINED);
                }
                let mut spans = vec![
                    Span::styled(ready_mark, ready_style),
                    Span::styled(p.display_name.clone(), name_style),
                ];
                if p.is_creator {
                    spans.push(Span::styled(
                        " (creator)",
                        Style::default()
                            .fg(Color::Rgb(255, 220, 50))
                            .add_modifier(Modifier::BOLD),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        let players_widget = Paragraph::new(player_lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
                .title(" Players ")
                .title_style(Style::default().fg(Color::Rgb(180, 180, 200))),
        );
        frame.render_widget(players_widget, chunks[2]);

        // Status
        if let Some(ref msg) = self.status_message {
            let status = Paragraph::new(format!("  {}", msg))
                .style(Style::default().fg(Color::Rgb(255, 150, 100)));
            frame.render_widget(status, chunks[3]);
        }

        // Help
        let ready_label = if room.local_ready { " Not ready  " } else { " Ready  " };
        let mut help_spans = vec![
            Span::raw("  "),
            Span::styled("[R]", Style::default().fg(Color::Rgb(100, 200, 255))),
            Span::styled(ready_label, Style::default().fg(Color::Rgb(120, 120, 140))),
        ];
        if room.local_is_creator {
            let start_style = if room.can_start {
                Style::default()
                    .fg(Color::Rgb(100, 255, 150))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Rgb(80, 80, 100))
            };
            help_spans.push(Span::styled("[S]", start_style));
            help_spans.push(Span::styled(
                " Start Game  ",
                Style::default().fg(Color::Rgb(120, 120, 140)),
            ));
        } else {
            help_spans.push(Span::styled(
                "Waiting for the creator to start...  ",
                Style::default().fg(Color::Rgb(150, 150, 170)),
            ));
        }
        help_spans.push(Span::styled("[Esc]", Style::default().fg(Color::Rgb(255, 150, 100))));
        help_spans.push(Span::styled(" Leave", Style::default().fg(Color::Rgb(120, 120, 140))));
        frame.render_widget(Paragraph::new(Line::from(help_spans)), chunks[4]);
    }
}
