//! Linear data-to-screen scales. The simulation works in resolution-independent
//! coordinates; only these mappings change on resize, which is why a resize
//! never resubmits a layout job.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f32, f32),
    range: (f32, f32),
}

impl Default for LinearScale {
    fn default() -> Self {
        Self {
            domain: (0.0, 1.0),
            range: (0.0, 1.0),
        }
    }
}

impl LinearScale {
    pub fn set_domain(&mut self, min: f32, max: f32) {
        self.domain = (min, max);
    }

    pub fn set_range(&mut self, min: f32, max: f32) {
        self.range = (min, max);
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn apply(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        if span.abs() <= f32::EPSILON {
            return (r0 + r1) * 0.5;
        }
        r0 + ((value - d0) / span) * (r1 - r0)
    }

    pub fn invert(&self, value: f32) -> f32 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        if span.abs() <= f32::EPSILON {
            return (d0 + d1) * 0.5;
        }
        d0 + ((value - r0) / span) * (d1 - d0)
    }
}

pub fn extent<I: IntoIterator<Item = f32>>(values: I) -> Option<(f32, f32)> {
    let mut bounds = None;
    for value in values {
        if !value.is_finite() {
            continue;
        }
        bounds = match bounds {
            None => Some((value, value)),
            Some((min, max)) => Some((value.min(min), value.max(max))),
        };
    }
    bounds
}
