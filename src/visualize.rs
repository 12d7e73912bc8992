use std::fmt::Write;

use crate::game::{FLOOR, FRUIT, HUMAN, ROBOT, WALL};
use crate::grid::Grid;
use crate::state::StepOutcome;

/// Customize grid rendering for CLI visualization.
#[derive(Clone, Copy, Debug, Default)]
pub struct VisualOptions {
    pub show_coordinates: bool,
}

pub fn render_grid(grid: &Grid) -> String {
    render_grid_with_options(grid, VisualOptions::default())
}

pub fn render_grid_with_options(grid: &Grid, options: VisualOptions) -> String {
    let mut out = String::new();
    if options.show_coordinates {
        let _ = write!(out, "   ");
        for col in 0..grid.width() {
            let _ = write!(out, "{}", col % 10);
        }
        let _ = writeln!(out);
    }
    for (index, row) in grid.rows().enumerate() {
        if options.show_coordinates {
            let _ = write!(out, "{index:>2} ");
        }
        for &cell in row {
            out.push(cell_symbol(cell));
        }
        let _ = writeln!(out);
    }
    out
}

pub fn describe_outcome(outcome: &StepOutcome) -> String {
    format!(
        "step {:>4}  reward {:+.1}  partner {:+.1}{}",
        outcome.info.steps,
        outcome.reward,
        outcome.info.partner_reward,
        if outcome.done { "  (done)" } else { "" }
    )
}

fn cell_symbol(cell: u8) -> char {
    match cell {
        FLOOR => '.',
        WALL => '#',
        FRUIT => 'F',
        ROBOT => 'R',
        HUMAN => 'H',
        _ => '?',
    }
}
