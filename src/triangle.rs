use crate::math::{Color, Point};

/// An output triangle: three input points in counter-clockwise order, plus a
/// color blended from the corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    vertices: [Point; 3],
    color: Color,
}

impl Triangle {
    pub fn new(vertices: [Point; 3]) -> Self {
        let color = std::array::from_fn(|channel| {
            let sum: u16 = vertices.iter().map(|v| u16::from(v.color()[channel])).sum();
            (sum / 3) as u8
        });
        Triangle { vertices, color }
    }

    pub const fn vertices(&self) -> [Point; 3] {
        self.vertices
    }

    pub const fn color(&self) -> Color {
        self.color
    }

    pub fn color_hex(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Positive for counter-clockwise vertex order.
    pub fn signed_area(&self) -> f64 {
        let [a, b, c] = self.vertices;
        ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point::{Point, PointId};

    fn colored(id: u32, x: f64, y: f64, color: Color) -> Point {
        Point::new(PointId(id), x, y, color)
    }

    #[test]
    fn color_is_the_channelwise_mean() {
        let t = Triangle::new([
            colored(0, 0.0, 0.0, [100, 200, 250]),
            colored(1, 1.0, 0.0, [100, 200, 250]),
            colored(2, 0.0, 1.0, [250, 110, 100]),
        ]);

        assert_eq!(t.color(), [150, 170, 200]);
        assert_eq!(t.color_hex(), "#96aac8");
    }

    #[test]
    fn signed_area_tracks_winding() {
        let a = colored(0, 0.0, 0.0, [120, 120, 120]);
        let b = colored(1, 4.0, 0.0, [120, 120, 120]);
        let c = colored(2, 0.0, 3.0, [120, 120, 120]);

        assert_eq!(Triangle::new([a, b, c]).signed_area(), 6.0);
        assert_eq!(Triangle::new([a, c, b]).signed_area(), -6.0);
    }
}
