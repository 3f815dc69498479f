use std::{fmt, io, num::{ParseFloatError, ParseIntError, TryFromIntError}, str::Utf8Error};
use font_kit::error::{FontLoadingError, GlyphLoadingError, SelectionError};
use quick_xml::events::attributes::AttrError;

#[derive(Debug)]
pub struct Error {
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(value: TryFromIntError) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<SelectionError> for Error {
    fn from(value: SelectionError) -> Self {
        Error {
            message: format!("Could not select font: {}", value)
        }
    }
}

impl From<FontLoadingError> for Error {
    fn from(value: FontLoadingError) -> Self {
        Error {
            message: format!("Could not load font: {}", value)
        }
    }
}

impl From<GlyphLoadingError> for Error {
    fn from(value: GlyphLoadingError) -> Self {
        Error {
            message: format!("Could not load glyph: {}", value)
        }
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error {
            message: value.to_string()
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error {
            message: value
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
