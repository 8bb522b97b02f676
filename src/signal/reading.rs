//! Vertical rate readings and their text form
//!
//! Each input line carries either a ready-made vertical rate or the raw
//! vectors it is derived from:
//!
//! ```text
//! 7.5                      climbing at 7.5 m/s
//! -                        no signal (also `none`, `unavailable`)
//! wx wy wz px py pz bx by bz
//!                          wind, vessel position, body center
//! ```

use glam::Vec3;

/// Errors parsing a signal line
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ReadingError {
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("expected 1 or 9 values, got {0}")]
    WrongArity(usize),
}

/// Component of `wind` along the local up direction
///
/// Up points from the body center to the vessel. Returns `None` when the
/// two coincide and there is no up direction.
pub fn vertical_component(wind: Vec3, position: Vec3, body_center: Vec3) -> Option<f32> {
    let up = (position - body_center).try_normalize()?;
    let rate = wind.dot(up);
    rate.is_finite().then_some(rate)
}

/// Parse one input line
///
/// `Ok(None)` for a blank line, `Ok(Some(None))` for an explicit
/// unavailable marker or a degenerate vector set, `Ok(Some(Some(rate)))`
/// for a reading.
pub fn parse_line(line: &str) -> Result<Option<Option<f32>>, ReadingError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if matches!(
        line.to_ascii_lowercase().as_str(),
        "-" | "none" | "unavailable"
    ) {
        return Ok(Some(None));
    }

    let values = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ReadingError::InvalidNumber(field.to_string()))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    match values.as_slice() {
        [rate] => Ok(Some(Some(*rate))),
        [wx, wy, wz, px, py, pz, bx, by, bz] => Ok(Some(vertical_component(
            Vec3::new(*wx, *wy, *wz),
            Vec3::new(*px, *py, *pz),
            Vec3::new(*bx, *by, *bz),
        ))),
        other => Err(ReadingError::WrongArity(other.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_reading() {
        assert_eq!(parse_line("  7.5 "), Ok(Some(Some(7.5))));
        assert_eq!(parse_line("-12"), Ok(Some(Some(-12.0))));
    }

    #[test]
    fn test_unavailable_markers() {
        assert_eq!(parse_line("-"), Ok(Some(None)));
        assert_eq!(parse_line("None"), Ok(Some(None)));
        assert_eq!(parse_line("unavailable"), Ok(Some(None)));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("# thermal at 3km"), Ok(None));
    }

    #[test]
    fn test_vector_reading() {
        // Vessel straight "above" the body center on +Y, wind rising at 4 m/s
        let reading = parse_line("1 4 0, 0 1024 0, 0 0 0").unwrap();
        assert_eq!(reading, Some(Some(4.0)));
    }

    #[test]
    fn test_vector_reading_off_axis() {
        let rate = vertical_component(
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 2.0),
        );
        assert_eq!(rate, Some(-3.0));
    }

    #[test]
    fn test_degenerate_up_is_unavailable() {
        let reading = parse_line("1 2 3 5 5 5 5 5 5").unwrap();
        assert_eq!(reading, Some(None));
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(
            parse_line("fast"),
            Err(ReadingError::InvalidNumber("fast".to_string()))
        );
        assert_eq!(parse_line("1 2"), Err(ReadingError::WrongArity(2)));
        assert!(parse_line("inf").is_err());
    }
}
