/// Map `value` from `[domain_min, domain_max]` onto `[range_min, range_max]`.
///
/// Inverted ranges (`range_min > range_max`) are fine and are how the y axis
/// is flipped. A degenerate domain maps everything to the middle of the range.
pub fn map_linear(
    value: f64,
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
) -> f64 {
    let span = domain_max - domain_min;
    if span == 0.0 {
        return (range_min + range_max) / 2.0;
    }
    range_min + (value - domain_min) / span * (range_max - range_min)
}

/// A fixed domain/range pair, for mapping many values the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f64 {
        map_linear(value, self.domain.0, self.domain.1, self.range.0, self.range.1)
    }
}
