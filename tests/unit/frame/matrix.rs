use super::*;

fn translate(x: f64, y: f64, z: f64) -> Matrix {
    let mut m = identity();
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

#[test]
fn identity_is_neutral() {
    let t = translate(1.0, 2.0, 3.0);
    assert_eq!(multiply(&identity(), &t), t);
    assert_eq!(multiply(&t, &identity()), t);
}

#[test]
fn multiply_applies_right_operand_first() {
    let mut scale = identity();
    scale[0] = 2.0;
    let m = multiply(&scale, &translate(1.0, 0.0, 0.0));
    assert_eq!(vector_multiply(&m, [1.0, 0.0, 0.0, 1.0]), [4.0, 0.0, 0.0, 1.0]);
    let m = multiply(&translate(1.0, 0.0, 0.0), &scale);
    assert_eq!(vector_multiply(&m, [1.0, 0.0, 0.0, 1.0]), [3.0, 0.0, 0.0, 1.0]);
}

#[test]
fn ortho_maps_box_corners_to_clip_cube() {
    let m = ortho(0.0, 4.0, 0.0, 2.0, 1.0, -1.0);
    assert_eq!(vector_multiply(&m, [0.0, 0.0, 1.0, 1.0]), [-1.0, -1.0, 1.0, 1.0]);
    assert_eq!(vector_multiply(&m, [4.0, 2.0, -1.0, 1.0]), [1.0, 1.0, -1.0, 1.0]);
}
