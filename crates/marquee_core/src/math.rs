/// Clamped scalar lerp: `t` outside `[0, 1]` is clamped, so accumulator-style
/// callers (logo fade) can never overshoot the target.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}
