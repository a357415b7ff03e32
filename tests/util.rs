/// Check that two floats agree to within a small absolute or relative
/// tolerance, whichever is looser at their magnitude.
#[macro_export]
macro_rules! assert_close {
    ($left:expr, $right:expr, $msg:expr) => {{
        // open a new scope to avoid shadowing variables at the call site
        let left: f64 = $left;
        let right: f64 = $right;
        let scale = if left.abs() > right.abs() {
            left.abs()
        } else {
            right.abs()
        };
        let tolerance = f64::max(1e-9, scale * 1e-6);
        assert!(
            (left - right).abs() <= tolerance,
            "{}: {} vs {}",
            $msg,
            left,
            right
        );
    }};
}
