use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use super::grid::draw_pad_grid;
use crate::pitch::NoteReading;
use crate::shared::DisplayState;

const NEEDLE_WIDTH: usize = 21; // odd so there is a centre mark

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport
            Constraint::Length(3), // sample + tuner
            Constraint::Min(15),   // pads + piano roll
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_transport(frame, sections[0], state);
    draw_sample_row(frame, sections[1], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(20)])
        .split(sections[2]);
    draw_pad_grid(frame, body[0], &state.leds, &state.pad_labels, blink_on);
    draw_roll(frame, body[1], state);

    let help = "Space play  R arm  A-D loop  </> slot  -/= bpm  {/} base  S scale  P tuner  Q/U quant  M/O/V  X clear  N new song  Esc quit";
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), sections[3]);
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let status = match (state.playing, state.armed) {
        (true, true) => Span::styled(" REC ", Style::default().fg(Color::White).bg(Color::Red)),
        (true, false) => Span::styled(" PLAY ", Style::default().fg(Color::Black).bg(Color::Green)),
        (false, true) => Span::styled(" ARMED ", Style::default().fg(Color::Red)),
        (false, false) => Span::styled(" STOP ", Style::default().fg(Color::Gray)),
    };
    let label = format!("loop {}  {:.0} bpm", state.loop_id.label(), state.bpm);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(Line::from(vec![status, Span::raw(" "), Span::raw(label)])))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(state.progress.clamp(0.0, 1.0));
    frame.render_widget(gauge, area);
}

fn draw_sample_row(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let quant = match state.quantize {
        Some(n) => format!("1/{n}"),
        None => "off".to_string(),
    };
    let avail = if state.slot_available { "" } else { "  (unavailable)" };
    let sample = Line::from(vec![
        Span::styled(
            format!("[{}] {}", state.slot_index + 1, state.slot_name),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(avail, Style::default().fg(Color::Red)),
        Span::raw(format!(
            "  {}  {} {}  q:{quant}",
            state.flags,
            state.base_note,
            state.scale.name()
        )),
    ]);
    frame.render_widget(
        Paragraph::new(sample).block(Block::default().borders(Borders::ALL).title("sample")),
        cols[0],
    );

    let tuner = if !state.tuner_enabled {
        Line::from(Span::styled("off (P)", Style::default().fg(Color::DarkGray)))
    } else {
        match &state.reading {
            Some(reading) => tuner_line(reading),
            None => Line::from("listening…"),
        }
    };
    frame.render_widget(
        Paragraph::new(tuner).block(Block::default().borders(Borders::ALL).title("tuner")),
        cols[1],
    );
}

// "A4  +12  ----------|--*-------"
fn tuner_line(reading: &NoteReading) -> Line<'static> {
    let half = NEEDLE_WIDTH / 2;
    let pos = (half as i32 + reading.cents * half as i32 / 50).clamp(0, NEEDLE_WIDTH as i32 - 1) as usize;
    let needle: String = (0..NEEDLE_WIDTH)
        .map(|i| match i {
            _ if i == pos => '*',
            _ if i == half => '|',
            _ => '-',
        })
        .collect();
    let color = if reading.cents.abs() <= 5 { Color::Green } else { Color::Yellow };
    Line::from(vec![
        Span::styled(format!("{:<4}", reading.note), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{:+3}  ", reading.cents)),
        Span::styled(needle, Style::default().fg(color)),
    ])
}

fn draw_roll(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines: Vec<Line> = state
        .roll
        .iter()
        .map(|lane| {
            let cells: String = lane
                .cells
                .iter()
                .enumerate()
                .map(|(col, &on)| match (on, state.playhead_column == Some(col)) {
                    (true, _) => '■',
                    (false, true) => '│',
                    (false, false) => '·',
                })
                .collect();
            Line::from(vec![
                Span::styled(format!("{:>4} ", lane.note), Style::default().fg(Color::Cyan)),
                Span::raw(cells),
            ])
        })
        .collect();
    let title = format!("loop {}", state.loop_id.label());
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
