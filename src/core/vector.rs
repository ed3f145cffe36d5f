//! Small fixed-size vector helpers over `[f64; DIM]`.

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Position, velocity or force triple.
pub type Vec3 = [f64; DIM];

pub const ZERO: Vec3 = [0.0; DIM];

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn add_scaled(acc: &mut Vec3, v: &Vec3, s: f64) {
    for (a, &b) in acc.iter_mut().zip(v.iter()) {
        *a += b * s;
    }
}

#[inline]
pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub fn distance(a: &Vec3, b: &Vec3) -> f64 {
    norm(&sub(a, b))
}

#[inline]
pub fn is_finite(a: &Vec3) -> bool {
    a.iter().all(|x| x.is_finite())
}

/// Unit vector along `a`, or `None` when `a` is (nearly) zero or not finite.
#[inline]
pub fn normalized(a: &Vec3) -> Option<Vec3> {
    let n = norm(a);
    if n.is_finite() && n > 1e-12 {
        Some(scale(a, 1.0 / n))
    } else {
        None
    }
}

/// Rescale `a` so its magnitude does not exceed `max`.
#[inline]
pub fn clamp_magnitude(a: &Vec3, max: f64) -> Vec3 {
    let n = norm(a);
    if n > max && n > 0.0 {
        scale(a, max / n)
    } else {
        *a
    }
}

#[inline]
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Any unit vector perpendicular to `n` (which must be a unit vector).
pub fn perpendicular(n: &Vec3) -> Vec3 {
    let helper = if n[2].abs() < 0.9 {
        [0.0, 0.0, 1.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    normalized(&cross(n, &helper)).unwrap_or([1.0, 0.0, 0.0])
}

/// Mass-weighted mean of `(mass, vector)` samples; plain mean if the total mass is zero.
pub fn weighted_mean<I>(samples: I) -> Vec3
where
    I: IntoIterator<Item = (f64, Vec3)>,
{
    let mut acc = ZERO;
    let mut plain = ZERO;
    let mut total = 0.0;
    let mut count = 0usize;
    for (m, v) in samples {
        add_scaled(&mut acc, &v, m);
        add_scaled(&mut plain, &v, 1.0);
        total += m;
        count += 1;
    }
    if total > 1e-12 {
        scale(&acc, 1.0 / total)
    } else if count > 0 {
        scale(&plain, 1.0 / count as f64)
    } else {
        ZERO
    }
}
