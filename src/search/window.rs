/// Transit window on the phase circle $[0, 1)$
///
/// The window is the half-open interval $[c - h, c + h)$ taken modulo unity, where $c$ is the
/// epoch phase and $h$ is the half-width. Phase wraps at zero, so the window falls into exactly
/// one of three cases:
/// - it lies inside $[0, 1)$;
/// - it wraps below zero, $c - h < 0$, and is the union of $[0, c + h)$ and $[1 + c - h, 1)$;
/// - it wraps above unity, $c + h \geq 1$, and is the union of $[c - h, 1)$ and $[0, c + h - 1)$.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularWindow {
    center: f64,
    half_width: f64,
}

/// One or two half-open phase intervals covered by a [CircularWindow]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhaseIntervals {
    Inner(f64, f64),
    /// Wrapped window: an interval starting at zero and an interval ending at unity
    Wrapped { head_end: f64, tail_start: f64 },
}

impl CircularWindow {
    /// `center` must be in $[0, 1)$ and `half_width` in $(0, 1/2)$
    #[inline]
    pub fn new(center: f64, half_width: f64) -> Self {
        debug_assert!((0.0..1.0).contains(&center), "center must be in [0, 1)");
        debug_assert!(
            half_width > 0.0 && half_width < 0.5,
            "half-width must be in (0, 1/2)"
        );
        Self { center, half_width }
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    #[inline]
    pub fn intervals(&self) -> PhaseIntervals {
        let start = self.center - self.half_width;
        let end = self.center + self.half_width;
        if start < 0.0 {
            PhaseIntervals::Wrapped {
                head_end: end,
                tail_start: 1.0 + start,
            }
        } else if end >= 1.0 {
            PhaseIntervals::Wrapped {
                head_end: end - 1.0,
                tail_start: start,
            }
        } else {
            PhaseIntervals::Inner(start, end)
        }
    }

    /// Check if a phase from $[0, 1)$ is inside the window
    #[inline]
    pub fn contains(&self, phase: f64) -> bool {
        let offset = self.center;
        let half_width = self.half_width;
        if offset < half_width {
            // wraps below zero
            phase < offset + half_width || phase >= 1.0 - (half_width - offset)
        } else if offset + half_width >= 1.0 {
            // wraps above unity
            phase >= offset - half_width || phase < offset + half_width - 1.0
        } else {
            offset - half_width <= phase && phase < offset + half_width
        }
    }
}

/// Phase of time `t` for a given period, $(t \bmod P) / P \in [0, 1)$
#[inline]
pub fn phase(t: f64, period: f64) -> f64 {
    let phase = t.rem_euclid(period) / period;
    // rem_euclid may round up to the period itself
    if phase >= 1.0 { 0.0 } else { phase }
}
