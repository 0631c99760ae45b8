//! 4x4 column-major matrices, the layout OpenGL-style renderers expect.

/// Column-major 4x4 matrix: element `(row, col)` lives at `col * 4 + row`.
pub type Matrix = [f64; 16];

pub fn identity() -> Matrix {
    let mut m = [0.0; 16];
    for i in 0..4 {
        m[i * 5] = 1.0;
    }
    m
}

/// `a * b`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// `m * v` for a homogeneous column vector.
pub fn vector_multiply(m: &Matrix, v: [f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (row, o) in out.iter_mut().enumerate() {
        *o = (0..4).map(|k| m[k * 4 + row] * v[k]).sum();
    }
    out
}

/// Orthographic projection of the box `[left, right] x [bottom, top] x [near, far]`.
pub fn ortho(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Matrix {
    let mut m = [0.0; 16];
    m[0] = 2.0 / (right - left);
    m[5] = 2.0 / (top - bottom);
    m[10] = -2.0 / (far - near);
    m[12] = -(right + left) / (right - left);
    m[13] = -(top + bottom) / (top - bottom);
    m[14] = -(far + near) / (far - near);
    m[15] = 1.0;
    m
}

#[cfg(test)]
#[path = "../../tests/unit/frame/matrix.rs"]
mod tests;
