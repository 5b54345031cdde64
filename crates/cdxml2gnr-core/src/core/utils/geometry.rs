use nalgebra::{Matrix3, Point3, Rotation3, SymmetricEigen, Unit, Vector2, Vector3};

pub fn rotation_about_z(angle_radians: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(Vector3::z()), angle_radians)
}

/// Signed angle (radians, counter-clockwise positive) that rotates `from` onto `to`.
pub fn signed_angle_2d(from: &Vector2<f64>, to: &Vector2<f64>) -> f64 {
    let cross = from.x * to.y - from.y * to.x;
    cross.atan2(from.dot(to))
}

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

/// Principal axes of a point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalAxes {
    pub mean: Point3<f64>,
    /// Unit axes as matrix rows, ordered by decreasing variance.
    pub axes: Matrix3<f64>,
    /// Variance along each axis, in the same order.
    pub variances: Vector3<f64>,
}

impl PrincipalAxes {
    /// Coordinates of `point` in the principal frame (projection onto each axis).
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.axes * (point - self.mean))
    }
}

/// Computes the three principal axes of `points`.
///
/// The axes come from the eigendecomposition of the covariance matrix, sorted by
/// decreasing eigenvalue. Each axis is oriented so that its component of largest
/// magnitude is positive, which makes the frame deterministic for a given input.
pub fn principal_axes(points: &[Point3<f64>]) -> Option<PrincipalAxes> {
    let mean = centroid(points)?;
    let covariance = points
        .iter()
        .map(|p| p - mean)
        .fold(Matrix3::zeros(), |acc, d| acc + d * d.transpose())
        / points.len() as f64;

    let eigen = SymmetricEigen::new(covariance);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| {
        eigen.eigenvalues[j]
            .partial_cmp(&eigen.eigenvalues[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut axes = Matrix3::zeros();
    let mut variances = Vector3::zeros();
    for (row, &k) in order.iter().enumerate() {
        let mut axis: Vector3<f64> = eigen.eigenvectors.column(k).into_owned();
        let dominant = axis.iamax();
        if axis[dominant] < 0.0 {
            axis = -axis;
        }
        axes.set_row(row, &axis.transpose());
        variances[row] = eigen.eigenvalues[k].max(0.0);
    }

    Some(PrincipalAxes {
        mean,
        axes,
        variances,
    })
}
