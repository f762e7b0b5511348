use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::scale::{GRID_CELLS, GRID_SIDE};
use crate::shared::LedState;

const KEY_LABELS: [&str; GRID_CELLS] = [
    "1", "2", "3", "4", "5",
    "Q", "W", "E", "R", "T",
    "A", "S", "D", "F", "G",
    "Z", "X", "C", "V", "B",
    "6", "7", "8", "9", "0",
];

fn led_style(led: LedState, blink_on: bool) -> Style {
    match led {
        LedState::Off => Style::default().fg(Color::DarkGray),
        LedState::OnMedium => Style::default().fg(Color::Cyan),
        LedState::OnHigh => Style::default()
            .fg(Color::Black)
            .bg(Color::LightMagenta)
            .add_modifier(Modifier::BOLD),
        LedState::Blink if blink_on => Style::default().fg(Color::Red),
        LedState::Blink => Style::default().fg(Color::DarkGray),
    }
}

pub fn draw_pad_grid(
    frame: &mut Frame,
    area: Rect,
    leds: &[LedState; GRID_CELLS],
    labels: &[String],
    blink_on: bool,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, GRID_SIDE as u32); GRID_SIDE])
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, GRID_SIDE as u32); GRID_SIDE])
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let pad = row_idx * GRID_SIDE + col_idx;
            let style = led_style(leds[pad], blink_on);
            let note = labels.get(pad).map_or("", String::as_str);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(KEY_LABELS[pad]);
            let label = Paragraph::new(note)
                .alignment(Alignment::Center)
                .style(style)
                .block(block);
            frame.render_widget(label, *cell_area);
        }
    }
}
