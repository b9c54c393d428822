//! QR code images for waste ids.

use crate::environment::{CodeImageEncoder, CodeImageOptions, EncodeError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::{Color, QrCode};
use std::fmt::Write as _;

/// Prefix of the data URLs produced by [`QrCodeEncoder`]
pub const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

/// Renders QR codes as SVG data URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeEncoder;

impl QrCodeEncoder {
    /// Render `text` as an SVG document
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InvalidInput` for text that does not fit in a QR
    /// code or colours that are not `#RRGGBB`.
    pub fn render_svg(text: &str, options: &CodeImageOptions) -> Result<String, EncodeError> {
        check_colour(&options.dark)?;
        check_colour(&options.light)?;

        let code = QrCode::new(text.as_bytes()).map_err(|e| EncodeError::InvalidInput(e.to_string()))?;
        let modules = code.width();
        let margin = usize::try_from(options.margin).map_err(|e| EncodeError::Render(e.to_string()))?;
        let extent = modules + 2 * margin;

        let mut path = String::new();
        for (index, colour) in code.to_colors().into_iter().enumerate() {
            if colour == Color::Dark {
                let (x, y) = (index % modules + margin, index / modules + margin);
                write!(path, "M{x} {y}h1v1h-1z").map_err(|e| EncodeError::Render(e.to_string()))?;
            }
        }

        Ok(format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" "#,
                r#"viewBox="0 0 {extent} {extent}" shape-rendering="crispEdges">"#,
                r#"<rect width="{extent}" height="{extent}" fill="{light}"/>"#,
                r#"<path fill="{dark}" d="{path}"/></svg>"#
            ),
            size = options.width,
            extent = extent,
            light = options.light,
            dark = options.dark,
            path = path,
        ))
    }
}

fn check_colour(colour: &str) -> Result<(), EncodeError> {
    let valid = colour
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        Ok(())
    } else {
        Err(EncodeError::InvalidInput(format!("colour {colour:?} is not #RRGGBB")))
    }
}

#[async_trait]
impl CodeImageEncoder for QrCodeEncoder {
    async fn encode(&self, text: &str, options: &CodeImageOptions) -> Result<String, EncodeError> {
        let svg = Self::render_svg(text, options)?;
        Ok(format!("{SVG_DATA_URL_PREFIX}{}", STANDARD.encode(svg)))
    }
}
