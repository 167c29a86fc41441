// Shared helpers for the integration tests: 16-byte-aligned buffers the generated
// code can movaps against, and a plain scalar reference implementation of the 4x4
// operations to compare results with. Matrices are column-major [f32; 16], element
// (row, col) at index col * 4 + row, matching the generated programs.

#![allow(dead_code)]

/// 16-float buffer aligned for movaps traffic.
#[repr(align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat(pub [f32; 16]);

/// 4-float buffer aligned for movaps traffic.
#[repr(align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec4(pub [f32; 4]);

impl Mat {
    pub fn zero() -> Self {
        Mat([0.0; 16])
    }

    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Mat(m)
    }

    /// A well-conditioned, non-symmetric test matrix.
    pub fn sample() -> Self {
        Mat([
            2.0, 0.5, -1.0, 0.0, //
            1.0, 3.0, 0.5, 0.0, //
            0.0, -0.5, 2.5, 0.0, //
            4.0, -2.0, 1.0, 1.0,
        ])
    }

    pub fn sample2() -> Self {
        Mat([
            1.0, -1.0, 0.5, 0.0, //
            0.0, 2.0, 1.0, 0.0, //
            -0.5, 0.0, 3.0, 0.0, //
            -1.0, 5.0, 2.0, 1.0,
        ])
    }
}

/// Deterministic xorshift stream for randomized numeric coverage. Seeded, so
/// failures reproduce exactly.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish float in [-2, 2].
    pub fn next_f32(&mut self) -> f32 {
        (self.next() >> 40) as f32 / (1u64 << 24) as f32 * 4.0 - 2.0
    }

    pub fn mat(&mut self) -> Mat {
        let mut m = [0.0; 16];
        for v in &mut m {
            *v = self.next_f32();
        }
        Mat(m)
    }
}

pub fn mul(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            let mut acc = 0.0;
            for k in 0..4 {
                acc += a[k * 4 + row] * b[col * 4 + k];
            }
            out[col * 4 + row] = acc;
        }
    }
    out
}

pub fn transform(m: &[f32; 16], v: &[f32; 4]) -> [f32; 4] {
    let mut out = [0.0; 4];
    for row in 0..4 {
        for k in 0..4 {
            out[row] += m[k * 4 + row] * v[k];
        }
    }
    out
}

pub fn transpose(m: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = m[row * 4 + col];
        }
    }
    out
}

/// General inverse by cofactor expansion.
pub fn invert(m: &[f32; 16]) -> [f32; 16] {
    let at = |r: usize, c: usize| m[c * 4 + r];
    let mut cof = [0.0f32; 16];
    for r in 0..4 {
        for c in 0..4 {
            let mut sub = [0.0f32; 9];
            let mut i = 0;
            for sr in 0..4 {
                if sr == r {
                    continue;
                }
                for sc in 0..4 {
                    if sc == c {
                        continue;
                    }
                    sub[i] = at(sr, sc);
                    i += 1;
                }
            }
            let det3 = sub[0] * (sub[4] * sub[8] - sub[5] * sub[7])
                - sub[1] * (sub[3] * sub[8] - sub[5] * sub[6])
                + sub[2] * (sub[3] * sub[7] - sub[4] * sub[6]);
            let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
            cof[c * 4 + r] = sign * det3;
        }
    }
    let det = (0..4).map(|c| at(0, c) * cof[c * 4]).sum::<f32>();
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            // adjugate = transpose of the cofactor matrix
            out[col * 4 + row] = cof[row * 4 + col] / det;
        }
    }
    out
}

pub fn rotation_x(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = Mat::identity().0;
    m[5] = c;
    m[6] = s;
    m[9] = -s;
    m[10] = c;
    m
}

pub fn rotation_y(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = Mat::identity().0;
    m[0] = c;
    m[2] = -s;
    m[8] = s;
    m[10] = c;
    m
}

pub fn rotation_z(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    let mut m = Mat::identity().0;
    m[0] = c;
    m[1] = s;
    m[4] = -s;
    m[5] = c;
    m
}

pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = Mat::identity().0;
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

pub fn scaling(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = Mat::identity().0;
    m[0] = x;
    m[5] = y;
    m[10] = z;
    m
}

/// Column-major rotation matrix of a unit quaternion (x, y, z, w).
pub fn rotation_quat(q: [f32; 4]) -> [f32; 16] {
    let [x, y, z, w] = q;
    let mut m = Mat::identity().0;
    m[0] = 1.0 - 2.0 * (y * y + z * z);
    m[1] = 2.0 * (x * y + z * w);
    m[2] = 2.0 * (x * z - y * w);
    m[4] = 2.0 * (x * y - z * w);
    m[5] = 1.0 - 2.0 * (x * x + z * z);
    m[6] = 2.0 * (y * z + x * w);
    m[8] = 2.0 * (x * z + y * w);
    m[9] = 2.0 * (y * z - x * w);
    m[10] = 1.0 - 2.0 * (x * x + y * y);
    m
}

pub fn trs(t: [f32; 3], q: [f32; 4], s: [f32; 3]) -> [f32; 16] {
    let tm = translation(t[0], t[1], t[2]);
    let rm = rotation_quat(q);
    let sm = scaling(s[0], s[1], s[2]);
    mul(&mul(&tm, &rm), &sm)
}

#[track_caller]
pub fn assert_close(actual: &[f32], expected: &[f32], eps: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= eps,
            "lane {i}: got {a}, expected {e} (eps {eps})\nactual:   {actual:?}\nexpected: {expected:?}"
        );
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
