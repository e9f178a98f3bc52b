//! Left-to-right output arrangement.
//!
//! The [`Arrangement`] takes a snapshot of the active outputs from a
//! [`Compositor`], sorts them by x and makes sure they form a single
//! horizontal row:
//!
//! * **Contiguous** — every output starts where the previous one ends,
//!   give or take one pixel (fractional scaling can leave a sub-pixel gap).
//! * **Aligned** — when [`strict_y`](ArrangementOptions::strict_y) is set,
//!   every output shares the same y coordinate.
//!
//! When a check fails and [`allow_reorg`](ArrangementOptions::allow_reorg)
//! is set, the outputs are repaired in place (and the compositor told
//! about it); otherwise construction fails with a [`LayoutError`].
//!
//! Once sorted, outputs are addressed by their *display number*: the
//! leftmost output is number 1.  Moving and placing outputs is built on a
//! single primitive, [`Arrangement::swap`].

use crate::command::{Direction, OutputInfo, Position};
use crate::config::ArrangementOptions;
use crate::traits::Compositor;
use log::{debug, info};

/// Largest gap or overlap (in pixels) still considered contiguous.
const GAP_TOLERANCE: i32 = 1;

/// The outputs violate a layout invariant and repairing them is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("outputs are not contiguous from left to right and reorganization of outputs is disabled")]
    NotContiguous,
    #[error("outputs are not aligned on the y axis and reorganization of outputs is disabled")]
    NotAligned,
}

/// Possible errors from the arrangement.
#[derive(Debug, thiserror::Error)]
pub enum ArrangementError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// No active output reports focus.
    #[error("no focused output found")]
    NoFocus,
    /// The compositor returned an error.
    #[error("compositor error: {0}")]
    Compositor(String),
}

fn compositor_error(e: impl std::error::Error) -> ArrangementError {
    ArrangementError::Compositor(e.to_string())
}

/// Whether sorted `outputs` form a gapless row.
fn is_contiguous(outputs: &[OutputInfo]) -> bool {
    outputs
        .windows(2)
        .all(|pair| (pair[1].x - pair[0].right()).abs() <= GAP_TOLERANCE)
}

/// Whether all `outputs` share one y coordinate.
fn is_aligned(outputs: &[OutputInfo]) -> bool {
    outputs.windows(2).all(|pair| pair[0].y == pair[1].y)
}

/// The active outputs of a compositor, sorted left to right.
///
/// The arrangement is a snapshot: it is rebuilt from scratch by
/// [`calculate_outputs`](Self::calculate_outputs) and never tracks changes
/// made by other tools in between.
///
/// # Typical usage
///
/// ```ignore
/// let mut arrangement = Arrangement::new(SwayIpc::from_env()?, options)?;
/// if arrangement.move_focused(Direction::Left)? {
///     client::send(&socket, DaemonCommand::Notify)?;
/// }
/// ```
pub struct Arrangement<C: Compositor> {
    compositor: C,
    options: ArrangementOptions,
    outputs: Vec<OutputInfo>,
}

impl<C: Compositor> Arrangement<C> {
    /// Snapshot the compositor's outputs and validate (or repair) them.
    pub fn new(compositor: C, options: ArrangementOptions) -> Result<Self, ArrangementError> {
        let mut arrangement = Self {
            compositor,
            options,
            outputs: Vec::new(),
        };
        arrangement.calculate_outputs()?;
        Ok(arrangement)
    }

    /// Re-fetch the active outputs and rebuild the sorted arrangement.
    ///
    /// On error the previous arrangement is kept.  Position commands
    /// already sent while repairing are not rolled back.
    pub fn calculate_outputs(&mut self) -> Result<(), ArrangementError> {
        let mut outputs = self
            .compositor
            .active_outputs()
            .map_err(compositor_error)?;
        debug!("{} active output(s)", outputs.len());

        if outputs.is_empty() {
            info!("no active outputs");
            self.outputs = outputs;
            return Ok(());
        }

        outputs.sort_by_key(|o| o.x);

        if !is_contiguous(&outputs) {
            if !self.options.allow_reorg {
                return Err(LayoutError::NotContiguous.into());
            }
            info!("outputs are not contiguous, reorganizing");
            self.reorganize(&mut outputs, true)?;
        } else if self.options.strict_y && !is_aligned(&outputs) {
            if !self.options.allow_reorg {
                return Err(LayoutError::NotAligned.into());
            }
            info!("outputs are not aligned on y, reorganizing");
            self.reorganize(&mut outputs, false)?;
        }

        self.outputs = outputs;
        Ok(())
    }

    /// Reposition sorted `outputs`.
    ///
    /// With `pack_x` each output is placed right after its left neighbour,
    /// starting from the leftmost x; otherwise x is left alone.  With
    /// `strict_y` every output moves to the smallest y.
    fn reorganize(&self, outputs: &mut [OutputInfo], pack_x: bool) -> Result<(), ArrangementError> {
        let Some(first) = outputs.first() else {
            return Ok(());
        };
        let mut x = first.x;
        let min_y = outputs.iter().map(|o| o.y).min().unwrap_or(first.y);

        for output in outputs.iter_mut() {
            if pack_x {
                output.x = x;
            }
            if self.options.strict_y {
                output.y = min_y;
            }
            self.apply_position(output)?;
            x = output.right();
        }
        Ok(())
    }

    fn apply_position(&self, output: &OutputInfo) -> Result<(), ArrangementError> {
        debug!("output {} pos {} {}", output.name, output.x, output.y);
        self.compositor
            .set_output_position(&output.name, output.x, output.y)
            .map_err(compositor_error)
    }

    /// The sorted outputs.
    pub fn outputs(&self) -> &[OutputInfo] {
        &self.outputs
    }

    /// Number of active outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether there are no active outputs.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// The options this arrangement was built with.
    pub fn options(&self) -> ArrangementOptions {
        self.options
    }

    /// Index of the focused output.
    pub fn focused_index(&self) -> Result<usize, ArrangementError> {
        self.outputs
            .iter()
            .position(|o| o.focused)
            .ok_or(ArrangementError::NoFocus)
    }

    /// Top-left corners of the outputs in display-number order.
    ///
    /// The iterator can be cloned to walk the positions again.
    pub fn sorted_positions(&self) -> impl Iterator<Item = Position> + Clone + '_ {
        self.outputs.iter().map(OutputInfo::position)
    }

    /// Index of output `number` (1-based), if there is one.
    fn index_of_number(&self, number: i64) -> Option<usize> {
        usize::try_from(number)
            .ok()
            .filter(|n| (1..=self.outputs.len()).contains(n))
            .map(|n| n - 1)
    }

    /// Swap the outputs at indices `i1` and `i2`.
    ///
    /// Only the two endpoints trade places; outputs in between keep their
    /// order.  Every output in the range is re-packed from the x of the
    /// range's original leftmost output, so the swapped outputs take each
    /// other's slot even when widths differ.
    ///
    /// The position of **every** output is then sent to the compositor, not
    /// just the ones in the range: sway may shuffle outputs whose position
    /// was never configured explicitly.
    ///
    /// Returns whether anything moved.
    pub fn swap(&mut self, i1: usize, i2: usize) -> Result<bool, ArrangementError> {
        let (lo, hi) = (i1.min(i2), i1.max(i2));
        if lo == hi || hi >= self.outputs.len() {
            return Ok(false);
        }

        let mut x = self.outputs[lo].x;
        self.outputs.swap(lo, hi);
        for output in &mut self.outputs[lo..=hi] {
            output.x = x;
            x = output.right();
        }
        info!(
            "swapped {} and {}",
            self.outputs[hi].name, self.outputs[lo].name
        );

        for output in &self.outputs {
            self.apply_position(output)?;
        }
        Ok(true)
    }

    /// Swap the focused output with its neighbour in `direction`.
    ///
    /// Does nothing at either end of the row; there is no wraparound.
    /// Returns whether anything moved.
    pub fn move_focused(&mut self, direction: Direction) -> Result<bool, ArrangementError> {
        if self.outputs.is_empty() {
            return Ok(false);
        }
        let focused = self.focused_index()?;
        let other = match direction {
            Direction::Left => focused.checked_sub(1),
            Direction::Right => Some(focused + 1).filter(|&i| i < self.outputs.len()),
        };
        match other {
            Some(other) => self.swap(focused, other),
            None => Ok(false),
        }
    }

    /// Put the focused output where output `number` (1-based) is.
    ///
    /// Out-of-range numbers are ignored.  Returns whether anything moved.
    pub fn place(&mut self, number: i64) -> Result<bool, ArrangementError> {
        let Some(target) = self.index_of_number(number) else {
            return Ok(false);
        };
        let focused = self.focused_index()?;
        self.swap(focused, target)
    }

    /// Focus output `number` (1-based).
    ///
    /// Out-of-range numbers are silently ignored.  Focusing never changes
    /// the layout, so there is nothing to report back.
    pub fn focus(&self, number: i64) -> Result<(), ArrangementError> {
        let Some(index) = self.index_of_number(number) else {
            debug!("no output number {}, not focusing", number);
            return Ok(());
        };
        let name = &self.outputs[index].name;
        debug!("focus output {}", name);
        self.compositor.focus_output(name).map_err(compositor_error)
    }
}

//  Tests
