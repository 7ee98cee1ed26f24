use core::fmt;

use thiserror::Error;
use tracing::{Level, debug, instrument, trace, warn};

use crate::{Config, GeometrySource, Rect};

/// A geometry reading, kept for diagnostics when stabilization fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Geometry {
    /// A read of the virtual screen rect.
    VirtualScreen(Rect),

    /// A read of the display rects.
    Displays(Vec<Rect>),
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualScreen(rect) => write!(f, "virtual screen {rect}"),
            Self::Displays(rects) => {
                write!(f, "displays [")?;
                for (index, rect) in rects.iter().enumerate() {
                    if index != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{rect}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// No two consecutive geometry reads agreed within the attempt budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct GeometryUnavailable {
    /// The number of reads made.
    pub attempts: u32,

    /// The last geometry observed, `None` if every read failed.
    pub last_candidate: Option<Geometry>,
}

impl fmt::Display for GeometryUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Geometry did not stabilize after {} reads", self.attempts)?;

        match &self.last_candidate {
            Some(candidate) => write!(f, ", last read: {candidate}"),
            None => write!(f, ", every read failed"),
        }
    }
}

/// Polls a [`GeometrySource`] until two consecutive valid reads agree.
///
/// The OS offers no way to wait for a display reconfiguration to settle, so stability is
/// approximated by busy polling. Reads are not spaced out and the loop is bounded by
/// [`Config::stabilize_attempts`].
pub struct GeometryStabilizer<'a, S: ?Sized> {
    source: &'a S,
    attempts: u32,
}

impl<'a, S: GeometrySource + ?Sized> GeometryStabilizer<'a, S> {
    /// Creates a stabilizer reading from `source`.
    pub fn new(source: &'a S, config: &Config) -> Self {
        Self {
            source,
            attempts: config.stabilize_attempts,
        }
    }

    /// Returns the virtual screen rect once two consecutive reads agree.
    #[instrument("GeometryStabilizer::stable_virtual_screen_rect", level = Level::DEBUG, skip_all, err)]
    pub fn stable_virtual_screen_rect(&self) -> Result<Rect, GeometryUnavailable> {
        self.stabilize(
            || self.source.virtual_screen_rect(),
            Rect::is_valid,
            Geometry::VirtualScreen,
        )
    }

    /// Returns the display rects once two consecutive reads agree.
    ///
    /// Reads with no displays, or with any degenerate display, are not valid.
    #[instrument("GeometryStabilizer::stable_display_rects", level = Level::DEBUG, skip_all, err)]
    pub fn stable_display_rects(&self) -> Result<Vec<Rect>, GeometryUnavailable> {
        self.stabilize(
            || self.source.display_rects(),
            |rects: &Vec<Rect>| !rects.is_empty() && rects.iter().all(Rect::is_valid),
            Geometry::Displays,
        )
    }

    fn stabilize<T, E>(
        &self,
        mut read: impl FnMut() -> Result<T, E>,
        is_valid: impl Fn(&T) -> bool,
        into_geometry: impl FnOnce(T) -> Geometry,
    ) -> Result<T, GeometryUnavailable>
    where
        T: Clone + PartialEq + fmt::Debug,
        E: fmt::Display,
    {
        let mut last_valid: Option<T> = None;
        let mut last_candidate: Option<T> = None;

        for attempt in 1..=self.attempts {
            let candidate = match read() {
                Ok(candidate) => candidate,
                Err(error) => {
                    debug!("Geometry read {attempt} failed:\n{error}");
                    continue;
                }
            };

            if !is_valid(&candidate) {
                debug!("Geometry read {attempt} is invalid: {candidate:?}");
                last_candidate = Some(candidate);
                continue;
            }

            if last_valid.as_ref() == Some(&candidate) {
                if attempt > 2 {
                    debug!("Geometry stabilized after {attempt} reads");
                } else {
                    trace!("Geometry stabilized after {attempt} reads");
                }
                return Ok(candidate);
            }

            if last_valid.is_some() {
                debug!("Geometry changed on read {attempt}: {candidate:?}");
            }

            last_candidate = Some(candidate.clone());
            last_valid = Some(candidate);
        }

        let error = GeometryUnavailable {
            attempts: self.attempts,
            last_candidate: last_candidate.map(into_geometry),
        };
        warn!("{error}");

        Err(error)
    }
}
