use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

pub const CANVAS_WIDTH: u16 = 48;
pub const CANVAS_HEIGHT: u16 = 14;

const INK: &str = "█";
const PAPER: &str = " ";

/// Character-cell sketch pad for the drawer. Stroke data stays local.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub width: u16,
    pub height: u16,
    cells: Vec<bool>,
    pub cursor: (u16, u16),
    /// When set, every brush move also paints.
    pub pen_down: bool,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
            cursor: (width / 2, height / 2),
            pen_down: false,
        }
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn is_inked(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| !c)
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = false);
    }

    pub fn paint(&mut self) {
        let (x, y) = self.cursor;
        let idx = self.index(x, y);
        self.cells[idx] = true;
    }

    pub fn toggle_pen(&mut self) {
        self.pen_down = !self.pen_down;
        if self.pen_down {
            self.paint();
        }
    }

    /// Move the brush, clamped to the edges.
    pub fn move_cursor(&mut self, dx: i16, dy: i16) {
        let (x, y) = self.cursor;
        let nx = (x as i32 + dx as i32).clamp(0, self.width as i32 - 1) as u16;
        let ny = (y as i32 + dy as i32).clamp(0, self.height as i32 - 1) as u16;
        self.cursor = (nx, ny);
        if self.pen_down {
            self.paint();
        }
    }

    pub fn render_lines(&self, show_cursor: bool) -> Vec<Line<'static>> {
        let ink = Style::default().fg(Color::Rgb(230, 230, 240));
        let brush = Style::default()
            .fg(Color::Rgb(255, 220, 50))
            .bg(Color::Rgb(60, 60, 80));

        (0..self.height)
            .map(|y| {
                let spans: Vec<Span> = (0..self.width)
                    .map(|x| {
                        let glyph = if self.is_inked(x, y) { INK } else { PAPER };
                        if show_cursor && self.cursor == (x, y) {
                            let mark = if self.is_inked(x, y) { INK } else { "+" };
                            Span::styled(mark, brush)
                        } else {
                            Span::styled(glyph, ink)
                        }
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_clamped_to_edges() {
        let mut canvas = Canvas::new(4, 3);
        canvas.move_cursor(-10, -10);
        assert_eq!(canvas.cursor, (0, 0));
        canvas.move_cursor(10, 10);
        assert_eq!(canvas.cursor, (3, 2));
    }

    #[test]
    fn test_pen_paints_while_moving() {
        let mut canvas = Canvas::new(5, 1);
        canvas.cursor = (0, 0);
        canvas.toggle_pen();
        canvas.move_cursor(1, 0);
        canvas.move_cursor(1, 0);
        canvas.toggle_pen();
        canvas.move_cursor(1, 0);

        assert!(canvas.is_inked(0, 0));
        assert!(canvas.is_inked(2, 0));
        assert!(!canvas.is_inked(3, 0));
    }

    #[test]
    fn test_clear() {
        let mut canvas = Canvas::default();
        canvas.paint();
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_render_dimensions() {
        let canvas = Canvas::new(6, 2);
        let lines = canvas.render_lines(true);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 6);
    }
}
