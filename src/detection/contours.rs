use crate::models::Region;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

/// Bounding boxes of the outermost contours in a binary image.
///
/// Only outer borders without a parent are kept, so holes and anything nested
/// inside another shape are ignored. Non-zero pixels are foreground.
pub fn external_regions(binary: &GrayImage) -> Vec<Region> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| region_of(&c))
        .collect()
}

fn region_of(contour: &Contour<i32>) -> Option<Region> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Region {
        min_x: min_x.max(0) as u32,
        min_y: min_y.max(0) as u32,
        max_x: max_x.max(0) as u32,
        max_y: max_y.max(0) as u32,
        area: polygon_area(&contour.points),
    })
}

/// Shoelace area of a closed polygon
pub fn polygon_area(points: &[Point<i32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut twice_area: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    (twice_area.abs() as f32) / 2.0
}

/// The `n` regions with the largest contour area, biggest first
pub fn largest(mut regions: Vec<Region>, n: usize) -> Vec<Region> {
    regions.sort_by(|a, b| b.area.total_cmp(&a.area));
    regions.truncate(n);
    regions
}

/// Minimum geometry a region needs before it is worth sending to OCR.
/// All bounds are strict.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionFilter {
    pub min_width: u32,
    pub min_height: u32,
    pub min_aspect: Option<f32>,
    pub min_area: Option<f32>,
}

impl RegionFilter {
    pub fn accepts(&self, region: &Region) -> bool {
        region.width() > self.min_width
            && region.height() > self.min_height
            && self.min_aspect.is_none_or(|a| region.aspect_ratio() > a)
            && self.min_area.is_none_or(|a| region.area > a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn rect_image(w: u32, h: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let inside = rects
                .iter()
                .any(|&(x0, y0, x1, y1)| x >= x0 && x <= x1 && y >= y0 && y <= y1);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_external_regions_ignore_holes() {
        // A frame with a hole, plus a separate solid block
        let mut img = rect_image(100, 60, &[(5, 5, 45, 45), (60, 10, 90, 20)]);
        for y in 15..35 {
            for x in 15..35 {
                img.put_pixel(x, y, Luma([0]));
            }
        }

        let mut regions = external_regions(&img);
        regions.sort_by_key(|r| r.min_x);

        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].min_x, regions[0].min_y, regions[0].max_x, regions[0].max_y), (5, 5, 45, 45));
        assert_eq!((regions[1].width(), regions[1].height()), (31, 11));
    }

    #[test]
    fn test_polygon_area_of_square() {
        let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_largest_keeps_biggest_first() {
        let region = |area: f32| Region { min_x: 0, min_y: 0, max_x: 1, max_y: 1, area };
        let picked = largest(vec![region(5.0), region(50.0), region(20.0)], 2);
        assert_eq!(picked.iter().map(|r| r.area).collect::<Vec<_>>(), vec![50.0, 20.0]);
    }

    #[test]
    fn test_region_filter_bounds_are_strict() {
        let filter = RegionFilter {
            min_width: 80,
            min_height: 20,
            min_aspect: Some(1.5),
            min_area: Some(1000.0),
        };
        // 81x21 box, area well above the minimum
        let ok = Region { min_x: 0, min_y: 0, max_x: 80, max_y: 20, area: 1500.0 };
        assert!(filter.accepts(&ok));

        let too_narrow = Region { max_x: 79, ..ok.clone() };
        assert!(!filter.accepts(&too_narrow));

        let too_small = Region { area: 1000.0, ..ok.clone() };
        assert!(!filter.accepts(&too_small));

        let square = Region { max_x: 99, max_y: 99, ..ok };
        assert!(!filter.accepts(&square));
    }
}
