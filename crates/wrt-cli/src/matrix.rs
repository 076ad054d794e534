//! Nested-array matrix literals: `[[r00, r01, r02, x], ..., [0, 0, 0, 1]]`.

use wrt_graph::Pose;
use wrt_types::WrtError;

/// Parse an `As` payload into a validated [`Pose`].
pub fn parse_pose(literal: &str, tolerance: f64) -> Result<Pose, WrtError> {
    let rows: Vec<Vec<f64>> = serde_json::from_str(literal.trim())
        .map_err(|e| WrtError::InvalidTransform(format!("cannot read matrix literal: {e}")))?;
    if rows.len() != 4 || rows.iter().any(|row| row.len() != 4) {
        return Err(WrtError::InvalidTransform(format!(
            "expected 4 rows of 4 numbers, got {} row(s)",
            rows.len()
        )));
    }
    let mut m = [[0.0; 4]; 4];
    for (dst, src) in m.iter_mut().zip(&rows) {
        dst.copy_from_slice(src);
    }
    Pose::from_matrix_with_tolerance(m, tolerance)
}

/// Print `pose` in the literal form [`parse_pose`] reads back.
pub fn format_pose(pose: &Pose, precision: usize) -> String {
    let rows: Vec<String> = pose
        .to_matrix()
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|v| format_number(*v, precision)).collect();
            format!("[{}]", cells.join(", "))
        })
        .collect();
    format!("[{}]", rows.join(", "))
}

/// Fixed precision with trailing zeros dropped; `-0` prints as `0`.
pub fn format_number(value: f64, precision: usize) -> String {
    let mut s = format!("{value:.precision$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" { "0".to_string() } else { s }
}
