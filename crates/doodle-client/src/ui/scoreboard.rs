use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use doodle_common::profile::UserProfile;
use doodle_common::room::{Player, RoomCode};
use doodle_common::scoring::{self, Standing};

#[derive(Debug, Clone)]
pub struct ScoreboardScreen {
    pub code: RoomCode,
    pub standings: Vec<Standing>,
    pub winners: Vec<String>,
    winner_ids: Vec<String>,
    pub local_id: String,
    /// The local player's profile after this game was recorded.
    pub profile: Option<UserProfile>,
}

impl ScoreboardScreen {
    pub fn new(code: RoomCode, players: &[Player], local_id: String) -> Self {
        let top = scoring::winners(players);
        Self {
            code,
            standings: scoring::standings(players),
            winners: top.iter().map(|p| p.display_name.clone()).collect(),
            winner_ids: top.iter().map(|p| p.id.clone()).collect(),
            local_id,
            profile: None,
        }
    }

    pub fn local_won(&self) -> bool {
        self.winner_ids.iter().any(|id| *id == self.local_id)
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(15),
                Constraint::Length(3),  // Title
                Constraint::Length(3),  // Winner
                Constraint::Min(5),     // Score table
                Constraint::Length(2),  // Profile line
                Constraint::Length(2),  // Help
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
            .split(vertical[3]);

        // Title
        let title = Paragraph::new(Line::from(vec![Span::styled(
            format!("  GAME OVER - {}", self.code),
            Style::default()
                .fg(Color::Rgb(255, 220, 50))
                .add_modifier(Modifier::BOLD),
        )]))
        .alignment(Alignment::Center);
        frame.render_widget(title, vertical[1]);

        // Winner announcement
        let winner_line = if self.winners.is_empty() {
            Line::from(Span::styled(
                "  Nobody scored this time",
                Style::default().fg(Color::Rgb(180, 180, 200)),
            ))
        } else if self.local_won() && self.winners.len() == 1 {
            Line::from(Span::styled(
                "  You won!",
                Style::default()
                    .fg(Color::Rgb(100, 255, 150))
                    .add_modifier(Modifier::BOLD),
            ))
        } else {
            let label = if self.winners.len() > 1 { "  Winners: " } else { "  Winner: " };
            Line::from(vec![
                Span::styled(label, Style::default().fg(Color::Rgb(180, 180, 200))),
                Span::styled(
                    self.winners.join(", "),
                    Style::default()
                        .fg(Color::Rgb(100, 255, 150))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" !", Style::default().fg(Color::Rgb(255, 220, 50))),
            ])
        };
        frame.render_widget(Paragraph::new(winner_line).alignment(Alignment::Center), vertical[2]);

        // Score table
        let header = Row::new(vec![
            Cell::from("Rank").style(Style::default().fg(Color::Rgb(180, 180, 200))),
            Cell::from("Player").style(Style::default().fg(Color::Rgb(180, 180, 200))),
            Cell::from("Score").style(Style::default().fg(Color::Rgb(180, 180, 200))),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

        let podium_colors = [
            Color::Rgb(255, 220, 50),  // Gold
            Color::Rgb(180, 200, 220), // Silver
            Color::Rgb(210, 150, 100), // Bronze
        ];

        let rows: Vec<Row> = self
            .standings
            .iter()
            .map(|s| {
                let color = podium_colors
                    .get(s.rank - 1)
                    .copied()
                    .unwrap_or(Color::Rgb(120, 120, 140));
                let mut style = Style::default().fg(color);
                if s.rank == 1 {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if s.player_id == self.local_id {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                Row::new(vec![
                    Cell::from(format!("  #{}", s.rank)).style(style),
                    Cell::from(s.display_name.clone()).style(style),
                    Cell::from(s.score.to_string()).style(style),
                ])
            })
            .collect();

        let widths = [
            Constraint::Length(8),
            Constraint::Percentage(50),
            Constraint::Length(10),
        ];

        let table = Table::new(rows, widths).header(header).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
                .title(" Final Scores ")
                .title_style(
                    Style::default()
                        .fg(Color::Rgb(255, 220, 50))
                        .add_modifier(Modifier::BOLD),
                ),
        );
        frame.render_widget(table, horizontal[1]);

        // Profile
        if let Some(ref p) = self.profile {
            let summary = Paragraph::new(Span::styled(
                format!(
                    "  {} games played, {} won ({}%), {} total points",
                    p.games_played,
                    p.games_won,
                    p.win_rate(),
                    p.total_score
                ),
                Style::default().fg(Color::Rgb(150, 150, 170)),
            ))
            .alignment(Alignment::Center);
            frame.render_widget(summary, vertical[4]);
        }

        // Help
        let help = Paragraph::new(Line::from(vec![
            Span::raw("  "),
            Span::styled("[Enter]", Style::default().fg(Color::Rgb(100, 255, 150))),
            Span::styled(" Back to dashboard  ", Style::default().fg(Color::Rgb(120, 120, 140))),
            Span::styled("[Q]", Style::default().fg(Color::Rgb(255, 150, 100))),
            Span::styled(" Quit", Style::default().fg(Color::Rgb(120, 120, 140))),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(help, vertical[5]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score: u32) -> Player {
        let mut p = Player::new(id, id.to_uppercase());
        p.score = score;
        p
    }

    #[test]
    fn test_tied_winners() {
        let code = RoomCode::parse("END001").unwrap();
        let screen = ScoreboardScreen::new(
            code,
            &[player("a", 40), player("b", 70), player("c", 70)],
            "c".into(),
        );
        assert_eq!(screen.winners, vec!["B", "C"]);
        assert!(screen.local_won());
        assert_eq!(screen.standings[2].rank, 3);
    }

    #[test]
    fn test_nobody_wins_scoreless_game() {
        let code = RoomCode::parse("END002").unwrap();
        let screen = ScoreboardScreen::new(code, &[player("a", 0), player("b", 0)], "a".into());
        assert!(screen.winners.is_empty());
        assert!(!screen.local_won());
    }

    #[test]
    fn test_local_won_agrees_with_recorded_win() {
        use doodle_common::profile::{Identity, UserProfile};

        let rosters = [
            vec![player("a", 40), player("b", 70), player("c", 70)],
            vec![player("a", 70), player("b", 70)],
            vec![player("a", 90), player("b", 10)],
            vec![player("a", 0), player("b", 0)],
        ];
        for players in rosters {
            let code = RoomCode::parse("END003").unwrap();
            let screen = ScoreboardScreen::new(code, &players, "a".into());
            let mut profile = UserProfile::for_identity(&Identity::new("a", "A"));
            assert!(profile.record_final_roster(&players));
            assert_eq!(screen.local_won(), profile.games_won == 1, "{:?}", players);
        }
    }
}
