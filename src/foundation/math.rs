/// Reverse the low bits of `x`, using as many bits as needed to count up to `max`.
///
/// `max` is usually a power of two; when it is not, the result can land at or
/// beyond `max` and callers fall back to the unreversed index.
pub(crate) fn bit_reverse(mut x: usize, max: usize) -> usize {
    let mut result = 0;
    let mut placeholder = 1;
    while placeholder < max {
        result = (result << 1) | (x & 1);
        x >>= 1;
        placeholder <<= 1;
    }
    result
}

/// Exponent of the largest power of two that is `<= n` (0 for `n <= 1`).
pub(crate) fn floor_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - 1 - n.leading_zeros()) as usize
    }
}

/// Largest power of two that is `<= n` (1 for `n <= 1`).
pub(crate) fn floor_pow2(n: usize) -> usize {
    1 << floor_log2(n)
}

/// Integer square root, rounded down.
pub(crate) fn isqrt(n: usize) -> usize {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as usize;
    while x * x > n {
        x -= 1;
    }
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x
}
