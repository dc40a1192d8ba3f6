//! Background corner-offset sidecar configs.
//!
//! A background image `town.bg.dds` may ship a `town.bg.json` next to it that
//! pre-skews the quad's four corners (used to bake a perspective slant into
//! specific art). All offsets default to zero; a parse failure leaves the
//! background with zero offsets rather than failing the batch.

use crate::jsonc::strip_comment_lines;
use glam::Vec2;
use serde::Deserialize;

/// Four independently offsettable quad corners, in pre-scale pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerOffsets {
    pub top_left: Vec2,
    pub bottom_left: Vec2,
    pub top_right: Vec2,
    pub bottom_right: Vec2,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CornerOffsetsJson {
    top_left: OffsetJson,
    bottom_left: OffsetJson,
    top_right: OffsetJson,
    bottom_right: OffsetJson,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OffsetJson {
    x: f32,
    y: f32,
}

/// Parse a sidecar config body (comment lines allowed).
pub fn parse_corner_offsets(raw: &str) -> Result<CornerOffsets, String> {
    let json: CornerOffsetsJson = serde_json::from_str(&strip_comment_lines(raw))
        .map_err(|e| format!("Failed to parse corner-offset config: {e}"))?;
    Ok(CornerOffsets {
        top_left: Vec2::new(json.top_left.x, json.top_left.y),
        bottom_left: Vec2::new(json.bottom_left.x, json.bottom_left.y),
        top_right: Vec2::new(json.top_right.x, json.top_right.y),
        bottom_right: Vec2::new(json.bottom_right.x, json.bottom_right.y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"
        {
          "top_left": { "x": 1.0, "y": 2.0 },
          "bottom_left": { "x": -3.0, "y": 0.5 },
          "top_right": { "x": 0.0, "y": -1.0 },
          "bottom_right": { "x": 4.0, "y": 4.0 }
        }
        "#;
        let offsets = parse_corner_offsets(raw).expect("should parse");
        assert_eq!(offsets.top_left, Vec2::new(1.0, 2.0));
        assert_eq!(offsets.bottom_left, Vec2::new(-3.0, 0.5));
        assert_eq!(offsets.top_right, Vec2::new(0.0, -1.0));
        assert_eq!(offsets.bottom_right, Vec2::new(4.0, 4.0));
    }

    #[test]
    fn absent_corners_default_to_zero() {
        let raw = r#"{ "top_right": { "x": 5.0, "y": 0.0 } }"#;
        let offsets = parse_corner_offsets(raw).expect("should parse");
        assert_eq!(offsets.top_left, Vec2::ZERO);
        assert_eq!(offsets.top_right, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn comment_lines_are_stripped() {
        let raw = "// art slants left\n{ \"top_left\": { \"x\": 2.0, \"y\": 0.0 } }";
        let offsets = parse_corner_offsets(raw).expect("should parse");
        assert_eq!(offsets.top_left, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_corner_offsets("not json").is_err());
    }
}
