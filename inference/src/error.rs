use std::{error::Error, fmt, io};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use machine_learning::MlErr;
use serde_json::json;

/// The inference service's result type.
pub type Result<T> = std::result::Result<T, ServiceErr>;

/// Failures of the inference service, each one maps to an HTTP status.
#[derive(Debug)]
pub enum ServiceErr {
    /// The request carried no image.
    EmptyPayload,
    /// The payload is not valid base64 or not a supported image.
    InvalidImage(String),
    UnknownClass {
        index: usize,
        names: usize,
    },
    UnsupportedDepth {
        depth: usize,
    },
    Model(MlErr),
    Image(image::ImageError),
    Io(io::Error),
    Task(String),
}

impl ServiceErr {
    /// The status code this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceErr::EmptyPayload => custom_status(452),
            ServiceErr::InvalidImage(_) => custom_status(453),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client.
    fn public_message(&self) -> String {
        match self {
            ServiceErr::EmptyPayload => {
                "Not an image file format! Please use .jpg, .jpeg or .png only.".to_string()
            }
            ServiceErr::InvalidImage(_) => {
                "Invalid image, please try using another image.".to_string()
            }
            _ => "Internal server error".to_string(),
        }
    }
}

fn custom_status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

impl fmt::Display for ServiceErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceErr::EmptyPayload => write!(f, "the request has no image"),
            ServiceErr::InvalidImage(e) => write!(f, "invalid image: {e}"),
            ServiceErr::UnknownClass { index, names } => write!(
                f,
                "the model predicted class {index} but there are only {names} names"
            ),
            ServiceErr::UnsupportedDepth { depth } => {
                write!(f, "models with {depth} input channels are not supported")
            }
            ServiceErr::Model(e) => write!(f, "model error: {e}"),
            ServiceErr::Image(e) => write!(f, "image error: {e}"),
            ServiceErr::Io(e) => write!(f, "io error: {e}"),
            ServiceErr::Task(e) => write!(f, "prediction task failed: {e}"),
        }
    }
}

impl Error for ServiceErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServiceErr::Model(e) => Some(e),
            ServiceErr::Image(e) => Some(e),
            ServiceErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for ServiceErr {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}

impl From<image::ImageError> for ServiceErr {
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

impl From<io::Error> for ServiceErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl IntoResponse for ServiceErr {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{self}");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
