//! # Session Plot
//!
//! Renders the four telemetry series of a session (velocity, position,
//! torque, current against time) as a 2x2 grid of line charts in the
//! terminal, and blocks until the operator presses a key.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType};
use ratatui::{Frame, Terminal};
use std::io;
use thiserror::Error;

// Internal
use super::SessionData;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One chart panel of the 2x2 grid.
struct Panel {
    title: &'static str,
    y_label: &'static str,
    color: Color,
    points: Vec<(f64, f64)>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Terminal error while plotting: {0}")]
    Io(#[from] io::Error),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Display the session's telemetry, blocking until a key is pressed.
pub fn show(data: &SessionData) -> Result<(), PlotError> {
    let panels = build_panels(data);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_display(&mut terminal, &panels);

    // Restore the terminal even if drawing failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn run_display(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    panels: &[Panel],
) -> Result<(), PlotError> {
    loop {
        terminal.draw(|f| draw_grid(f, panels))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(()),
            _ => (),
        }
    }
}

fn draw_grid(f: &mut Frame, panels: &[Panel]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(f.area());

    let mut cells: Vec<Rect> = Vec::with_capacity(4);
    for row in rows.iter() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row);
        cells.extend(cols.iter().copied());
    }

    for (panel, cell) in panels.iter().zip(cells) {
        draw_panel(f, panel, cell);
    }
}

fn draw_panel(f: &mut Frame, panel: &Panel, area: Rect) {
    let (x_min, x_max) = time_bounds(&panel.points);
    let (y_min, y_max) = series_bounds(&panel.points);

    let datasets = vec![Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(panel.color))
        .data(&panel.points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(panel.title)
                .borders(Borders::ALL),
        )
        .x_axis(
            Axis::default()
                .title("Time (s)")
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::raw(format_label(x_min)),
                    Span::raw(format_label(x_max)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(panel.y_label)
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format_label(y_min)),
                    Span::raw(format_label(y_max)),
                ]),
        );

    f.render_widget(chart, area);
}

fn build_panels(data: &SessionData) -> Vec<Panel> {
    let series = |select: fn(&super::TelemetryRecord) -> f64| -> Vec<(f64, f64)> {
        data.records
            .iter()
            .map(|r| (r.time_s, select(r)))
            .collect()
    };

    vec![
        Panel {
            title: "Motor Velocity Over Time",
            y_label: "Velocity (counts/s)",
            color: Color::Cyan,
            points: series(|r| r.velocity),
        },
        Panel {
            title: "Motor Position Over Time",
            y_label: "Position (counts)",
            color: Color::Red,
            points: series(|r| r.position),
        },
        Panel {
            title: "Motor Torque Over Time",
            y_label: "Torque (Nm)",
            color: Color::Green,
            points: series(|r| r.torque_nm),
        },
        Panel {
            title: "Motor Current Over Time",
            y_label: "Current (A)",
            color: Color::Blue,
            points: series(|r| r.current_a),
        },
    ]
}

/// X bounds of a panel: zero to the last timestamp, at least one second
/// wide so a short or empty session still gets a sensible axis.
fn time_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let last = points.last().map(|p| p.0).unwrap_or(0.0);
    (0.0, if last < 1.0 { 1.0 } else { last })
}

/// Y bounds of a panel, padded by 5% of the value range. A constant or
/// empty series gets a unit band around its value.
fn series_bounds(points: &[(f64, f64)]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &(_, y) in points {
        if y < min {
            min = y;
        }
        if y > max {
            max = y;
        }
    }

    if points.is_empty() {
        return (0.0, 1.0);
    }

    if max - min < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }

    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Format a simple numeric axis label
fn format_label(value: f64) -> String {
    if (value - value.round()).abs() < f64::EPSILON {
        format!("{}", value.round())
    } else {
        format!("{:.2}", value)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::experiment::TelemetryRecord;

    #[test]
    fn test_time_bounds() {
        assert_eq!(time_bounds(&[]), (0.0, 1.0));
        assert_eq!(time_bounds(&[(0.2, 1.0)]), (0.0, 1.0));
        assert_eq!(time_bounds(&[(0.0, 1.0), (4.5, 2.0)]), (0.0, 4.5));
    }

    #[test]
    fn test_series_bounds_padded() {
        let (min, max) = series_bounds(&[(0.0, 0.0), (1.0, 10.0)]);
        assert_eq!(min, -0.5);
        assert_eq!(max, 10.5);
    }

    #[test]
    fn test_series_bounds_constant_series() {
        let (min, max) = series_bounds(&[(0.0, 3.0), (1.0, 3.0)]);
        assert_eq!(min, 2.0);
        assert_eq!(max, 4.0);
    }

    #[test]
    fn test_series_bounds_empty() {
        assert_eq!(series_bounds(&[]), (0.0, 1.0));
    }

    #[test]
    fn test_build_panels_order() {
        let data = SessionData {
            records: vec![TelemetryRecord {
                time_s: 0.0,
                velocity: 1.0,
                position: 2.0,
                torque_nm: 3.0,
                current_a: 4.0,
            }],
        };

        let panels = build_panels(&data);

        assert_eq!(panels.len(), 4);
        assert_eq!(panels[0].points[0].1, 1.0);
        assert_eq!(panels[1].points[0].1, 2.0);
        assert_eq!(panels[2].points[0].1, 3.0);
        assert_eq!(panels[3].points[0].1, 4.0);
    }
}
