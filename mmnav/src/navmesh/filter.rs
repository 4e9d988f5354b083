//! Polygon filter and traversal cost.

use super::MAX_AREAS;

/// Decides which polygons a query may use and what crossing them costs.
///
/// A polygon passes when `flags & include != 0 && flags & exclude == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    include_flags: u16,
    exclude_flags: u16,
    area_cost: [f32; MAX_AREAS],
}

impl QueryFilter {
    /// Create a filter with the given masks and unit cost for every area.
    pub fn new(include_flags: u16, exclude_flags: u16) -> Self {
        Self {
            include_flags,
            exclude_flags,
            area_cost: [1.0; MAX_AREAS],
        }
    }

    pub fn include_flags(&self) -> u16 {
        self.include_flags
    }

    pub fn exclude_flags(&self) -> u16 {
        self.exclude_flags
    }

    pub fn set_include_flags(&mut self, flags: u16) {
        self.include_flags = flags;
    }

    pub fn set_exclude_flags(&mut self, flags: u16) {
        self.exclude_flags = flags;
    }

    /// Traversal cost multiplier of `area`. Out-of-range areas cost 1.0.
    pub fn area_cost(&self, area: u8) -> f32 {
        self.area_cost.get(area as usize).copied().unwrap_or(1.0)
    }

    /// Set the traversal cost multiplier of `area`; out-of-range areas are ignored.
    pub fn set_area_cost(&mut self, area: u8, cost: f32) {
        if let Some(c) = self.area_cost.get_mut(area as usize) {
            *c = cost;
        }
    }

    /// Whether a polygon with `flags` may be used.
    #[inline]
    pub fn pass_filter(&self, flags: u16) -> bool {
        (flags & self.include_flags) != 0 && (flags & self.exclude_flags) == 0
    }

    /// Cost of moving from `pa` to `pb` across a polygon of `area`.
    #[inline]
    pub fn cost(&self, pa: [f32; 3], pb: [f32; 3], area: u8) -> f32 {
        super::math::vdist(pa, pb) * self.area_cost(area)
    }
}

impl Default for QueryFilter {
    /// Accepts every polygon with at least one flag set.
    fn default() -> Self {
        Self::new(0xffff, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_filter() {
        let filter = QueryFilter::new(0x05, 0x0A);
        assert!(filter.pass_filter(0x01));
        assert!(filter.pass_filter(0x04));
        assert!(filter.pass_filter(0x05));
        // excluded bit wins over included bit
        assert!(!filter.pass_filter(0x03));
        assert!(!filter.pass_filter(0x08));
        // no included bit
        assert!(!filter.pass_filter(0x10));
        assert!(!filter.pass_filter(0));
    }

    #[test]
    fn test_default_accepts_any_flag() {
        let filter = QueryFilter::default();
        assert!(filter.pass_filter(0x8000));
        assert!(!filter.pass_filter(0));
    }

    #[test]
    fn test_area_cost() {
        let mut filter = QueryFilter::default();
        assert_eq!(filter.cost([0.0; 3], [3.0, 0.0, 4.0], 0), 5.0);

        filter.set_area_cost(2, 10.0);
        assert_eq!(filter.cost([0.0; 3], [3.0, 0.0, 4.0], 2), 50.0);

        filter.set_area_cost(200, 10.0);
        assert_eq!(filter.area_cost(200), 1.0);
    }
}
