use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use doodle_common::scoring::Standing;

/// Player colors - each player gets a distinct color
const PLAYER_COLORS: [Color; 8] = [
    Color::Rgb(100, 200, 255), // Sky blue
    Color::Rgb(255, 150, 100), // Coral
    Color::Rgb(150, 255, 150), // Lime
    Color::Rgb(255, 200, 100), // Gold
    Color::Rgb(200, 150, 255), // Lavender
    Color::Rgb(255, 150, 200), // Pink
    Color::Rgb(120, 230, 220), // Teal
    Color::Rgb(230, 230, 140), // Sand
];

pub fn player_color(idx: usize) -> Color {
    PLAYER_COLORS[idx % PLAYER_COLORS.len()]
}

pub fn truncate_name(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(max.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// Live standings for the game view. The local player is underlined and the
/// drawer is marked with a pencil.
pub fn build_standings_table<'a>(
    standings: &[Standing],
    local_id: &str,
    drawer_id: Option<&str>,
    guessed: &dyn Fn(&str) -> bool,
) -> Table<'a> {
    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(Color::Rgb(180, 180, 200))),
        Cell::from("Player").style(Style::default().fg(Color::Rgb(180, 180, 200))),
        Cell::from("Score").style(Style::default().fg(Color::Rgb(180, 180, 200))),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD))
    .bottom_margin(1);

    let rows: Vec<Row> = standings
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            let mut style = Style::default().fg(player_color(idx));
            if s.player_id == local_id {
                style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
            }
            let marker = if drawer_id == Some(s.player_id.as_str()) {
                " ✎"
            } else if guessed(&s.player_id) {
                " ✓"
            } else {
                ""
            };
            Row::new(vec![
                Cell::from(s.rank.to_string())
                    .style(Style::default().fg(Color::Rgb(150, 150, 170))),
                Cell::from(format!("{}{}", truncate_name(&s.display_name, 14), marker))
                    .style(style),
                Cell::from(s.score.to_string()).style(style),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(6),
    ];

    Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
            .title(" Players ")
            .title_style(Style::default().fg(Color::Rgb(180, 180, 200))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Ada", 8), "Ada");
        assert_eq!(truncate_name("Bartholomew", 8), "Barthol…");
    }
}
