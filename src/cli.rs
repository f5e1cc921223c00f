//! Command line: `model-snap <model> <WIDTHxHEIGHT> <output.png>`.

use std::{fmt, path::PathBuf, str::FromStr};

use crate::error::{RenderError, Result};

pub const USAGE: &str = "usage: model-snap <model.stl|model.gltf|model.glb> <WIDTHxHEIGHT> <output.png>";

/// Output size in pixels, both sides at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions(format!("{}x{}", width, height)));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = RenderError;

    /// Accepts exactly `<digits>x<digits>`; no signs, spaces or other separators.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RenderError::InvalidDimensions(s.to_string());
        let (w, h) = s.split_once('x').ok_or_else(invalid)?;
        let parse = |part: &str| -> Result<u32> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        Dimensions::new(parse(w)?, parse(h)?).map_err(|_| invalid())
    }
}

/// Parsed positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct CliArgs {
    pub model: PathBuf,
    pub dimensions: Dimensions,
    pub output: PathBuf,
}

impl CliArgs {
    /// Parses the arguments following the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let [model, dimensions, output] = args.as_slice() else {
            return Err(RenderError::InvalidArguments(format!(
                "expected 3 arguments, got {}\n{}",
                args.len(),
                USAGE
            )));
        };
        Ok(Self {
            model: PathBuf::from(model),
            dimensions: dimensions.parse()?,
            output: PathBuf::from(output),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_width_by_height() {
        let d: Dimensions = "800x600".parse().unwrap();
        assert_eq!(d, Dimensions { width: 800, height: 600 });
        assert_eq!(d.to_string(), "800x600");
    }

    #[test]
    fn rejects_malformed_dimensions() {
        for bad in ["800", "800x", "x600", "abcxdef", "0x600", "800x0", "-800x600", "800 x600", "800X600", "99999999999x1"] {
            let err = bad.parse::<Dimensions>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDimensions, "{}", bad);
        }
    }

    #[test]
    fn parses_three_positionals() {
        let args = CliArgs::parse(["cube.stl", "400x300", "out.png"]).unwrap();
        assert_eq!(args.model, PathBuf::from("cube.stl"));
        assert_eq!(args.dimensions, Dimensions { width: 400, height: 300 });
        assert_eq!(args.output, PathBuf::from("out.png"));
    }

    #[test]
    fn wrong_argument_count_is_reported() {
        let err = CliArgs::parse(["cube.stl", "400x300"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert!(err.to_string().contains("usage"));
    }
}
