use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use doodle_common::game::{GamePhase, MessageKind};
use doodle_common::session::{Session, SessionView};

use super::canvas::Canvas;
use super::standings_widget;

/// Below this many seconds the clock turns red.
const CLOCK_WARNING_SECS: u32 = 10;

/// Longest guess the input box accepts.
pub const MAX_GUESS_LEN: usize = 40;

#[derive(Debug, Clone)]
pub struct GameScreen {
    pub session: Session,
    pub canvas: Canvas,
    pub guess_input: String,
    pub status_message: Option<String>,
}

impl GameScreen {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            canvas: Canvas::default(),
            guess_input: String::new(),
            status_message: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_local_drawing()
    }

    /// Guess box accepts input only while the local player may still guess.
    pub fn can_guess(&self) -> bool {
        let view_phase = self.session.phase();
        *view_phase == GamePhase::RoundActive
            && !self.is_drawing()
            && !self.session.game().has_guessed(&self.session.local().uid)
    }

    pub fn type_char(&mut self, c: char) {
        if self.guess_input.chars().count() < MAX_GUESS_LEN {
            self.guess_input.push(c);
        }
    }

    pub fn take_guess(&mut self) -> Option<String> {
        let text: String = self.guess_input.drain(..).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let view = self.session.view();
        let area = frame.area();

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        let left_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),  // Title
                Constraint::Length(2),  // Word / hint
                Constraint::Min(8),     // Canvas
                Constraint::Length(2),  // Status
            ])
            .split(main_chunks[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(12), Constraint::Min(6)])
            .split(main_chunks[1]);

        self.draw_title_bar(frame, left_chunks[0], &view);
        self.draw_word_line(frame, left_chunks[1], &view);
        self.draw_canvas(frame, left_chunks[2], &view);
        self.draw_status(frame, left_chunks[3], &view);
        self.draw_standings(frame, right_chunks[0], &view);
        self.draw_chat_panel(frame, right_chunks[1], &view);
    }

    fn draw_title_bar(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let drawer_color = if view.is_local_drawing {
            Color::Rgb(100, 255, 150)
        } else {
            Color::Rgb(180, 180, 200)
        };
        let clock_color = if view.time_left <= CLOCK_WARNING_SECS {
            Color::Rgb(255, 100, 100)
        } else {
            Color::Rgb(100, 200, 255)
        };
        let drawer = if view.is_local_drawing {
            "You".to_string()
        } else {
            view.current_drawer.clone().unwrap_or_else(|| "?".into())
        };

        let title = Line::from(vec![
            Span::styled(
                " DOODLE ",
                Style::default()
                    .fg(Color::Rgb(255, 220, 50))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}  Round {}/{}", view.code, view.round, view.max_rounds),
                Style::default().fg(Color::Rgb(150, 150, 170)),
            ),
            Span::styled("  |  ", Style::default().fg(Color::Rgb(80, 80, 100))),
            Span::styled("Drawing: ", Style::default().fg(Color::Rgb(150, 150, 170))),
            Span::styled(
                drawer,
                Style::default()
                    .fg(drawer_color)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("  |  ", Style::default().fg(Color::Rgb(80, 80, 100))),
            Span::styled(
                format!("{:>2}s", view.time_left),
                Style::default()
                    .fg(clock_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn draw_word_line(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let line = match (&view.word, &view.hint) {
            (Some(word), _) if view.is_local_drawing && view.phase == GamePhase::RoundActive => {
                Line::from(vec![
                    Span::styled("  Draw: ", Style::default().fg(Color::Rgb(150, 150, 170))),
                    Span::styled(
                        word.to_uppercase(),
                        Style::default()
                            .fg(Color::Rgb(255, 220, 50))
                            .add_modifier(Modifier::BOLD),
                    ),
                ])
            }
            (Some(word), _) => Line::from(vec![
                Span::styled("  The word was ", Style::default().fg(Color::Rgb(150, 150, 170))),
                Span::styled(
                    word.to_uppercase(),
                    Style::default()
                        .fg(Color::Rgb(100, 255, 150))
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            (None, Some(hint)) => Line::from(vec![
                Span::styled("  Guess: ", Style::default().fg(Color::Rgb(150, 150, 170))),
                Span::styled(
                    hint.clone(),
                    Style::default()
                        .fg(Color::Rgb(200, 200, 220))
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            (None, None) => Line::from(""),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_canvas(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let (border, title) = if view.is_local_drawing {
            let pen = if self.canvas.pen_down { "pen down" } else { "pen up" };
            (
                Style::default().fg(Color::Rgb(100, 200, 255)),
                format!(" Canvas - {} ", pen),
            )
        } else {
            (
                Style::default().fg(Color::Rgb(80, 80, 100)),
                " Canvas ".to_string(),
            )
        };
        let lines = if view.is_local_drawing {
            self.canvas.render_lines(view.phase == GamePhase::RoundActive)
        } else {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    format!(
                        "  {} is drawing...",
                        view.current_drawer.as_deref().unwrap_or("Someone")
                    ),
                    Style::default().fg(Color::Rgb(120, 120, 140)),
                )),
            ]
        };
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title)
                .title_style(Style::default().fg(Color::Rgb(180, 180, 200))),
        );
        frame.render_widget(paragraph, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let text = if let Some(ref msg) = self.status_message {
            Span::styled(format!("  {}", msg), Style::default().fg(Color::Rgb(255, 150, 100)))
        } else {
            let hint = match view.phase {
                GamePhase::RoundEnding => "  Next turn starting...",
                GamePhase::GameComplete => "  Game over! Tallying scores...",
                _ if view.is_local_drawing => "  [Arrows] Move  [Space] Pen  [C] Clear  [Esc] Leave",
                _ if view.has_local_guessed => "  You got it! Waiting for the others...",
                _ => "  Type a guess and press [Enter]  [Esc] Leave",
            };
            Span::styled(hint, Style::default().fg(Color::Rgb(120, 120, 140)))
        };
        frame.render_widget(Paragraph::new(Line::from(text)), area);
    }

    fn draw_standings(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let game = self.session.game();
        let guessed = |id: &str| game.has_guessed(id);
        let table = standings_widget::build_standings_table(
            &view.standings,
            &self.session.local().uid,
            game.current_drawer_id(),
            &guessed,
        );
        frame.render_widget(table, area);
    }

    fn draw_chat_panel(&self, frame: &mut Frame, area: Rect, view: &SessionView) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let visible = inner_height.saturating_sub(1);
        let skip = view.messages.len().saturating_sub(visible);

        let mut lines: Vec<Line> = view.messages[skip..]
            .iter()
            .map(|msg| match msg.kind {
                MessageKind::System => Line::from(Span::styled(
                    format!("  {}", msg.text),
                    Style::default().fg(Color::Rgb(100, 100, 120)),
                )),
                MessageKind::CorrectGuess { points } => Line::from(Span::styled(
                    format!("  {} guessed the word! +{}", msg.sender_name, points),
                    Style::default()
                        .fg(Color::Rgb(100, 255, 150))
                        .add_modifier(Modifier::BOLD),
                )),
                MessageKind::Chat => Line::from(vec![
                    Span::styled(
                        format!("  {}", msg.sender_name),
                        Style::default()
                            .fg(Color::Rgb(100, 200, 255))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(": {}", msg.text),
                        Style::default().fg(Color::Rgb(200, 200, 220)),
                    ),
                ]),
            })
            .collect();

        let focused = self.can_guess();
        let style = if focused {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::Rgb(80, 80, 100))
        };
        lines.push(Line::from(Span::styled(
            format!("  > {}", self.guess_input),
            style,
        )));

        let (border_style, title_style) = if focused {
            (
                Style::default().fg(Color::Rgb(100, 180, 255)),
                Style::default()
                    .fg(Color::Rgb(100, 180, 255))
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            (
                Style::default().fg(Color::Rgb(60, 60, 80)),
                Style::default().fg(Color::Rgb(120, 120, 140)),
            )
        };

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(" Guesses ")
                .title_style(title_style),
        );
        frame.render_widget(paragraph, area);

        if focused {
            let typed = self.guess_input.chars().count() as u16;
            let cursor_x = area
                .x
                .saturating_add(5)
                .saturating_add(typed)
                .min(area.right().saturating_sub(2));
            let cursor_y = area.y + area.height.saturating_sub(2);
            frame.set_cursor_position((cursor_x, cursor_y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodle_common::config::Timing;
    use doodle_common::profile::Identity;
    use doodle_common::room::{Player, Room, RoomCode, RoomPatch};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn guesser_screen() -> GameScreen {
        let code = RoomCode::parse("GUESS1").unwrap();
        let mut room = Room::new(code.clone(), "a", 1);
        room.join(Player::new("a", "Alice")).unwrap();
        room.join(Player::new("b", "Bob")).unwrap();
        room.apply_patch(RoomPatch::start());
        let mut rng = StdRng::seed_from_u64(3);
        let (session, _) = Session::load(
            &code,
            Some(room),
            Identity::new("b", "Bob"),
            Timing::default(),
            &mut rng,
        )
        .unwrap();
        GameScreen::new(session)
    }

    #[test]
    fn test_guess_input_is_capped() {
        let mut screen = guesser_screen();
        assert!(screen.can_guess());
        for _ in 0..MAX_GUESS_LEN + 25 {
            screen.type_char('x');
        }
        assert_eq!(screen.guess_input.chars().count(), MAX_GUESS_LEN);
    }

    #[test]
    fn test_blank_guess_not_taken() {
        let mut screen = guesser_screen();
        screen.type_char(' ');
        assert_eq!(screen.take_guess(), None);
        assert!(screen.guess_input.is_empty());
    }
}
