use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use tracing::warn;

use pickframe_core::{HEADER_IMAGE_DATE, HEADER_IMAGE_NAME, ResponseHeaders, ServedImage};

use crate::{AppResult, AppState};

/// `GET /random`: one image nobody has been served from the current pool.
pub async fn random_image(State(state): State<AppState>) -> AppResult<Response> {
    let ServedImage { bytes, headers, .. } = state.draw.serve_random().await?;
    Ok(image_response(bytes, &headers))
}

fn image_response(bytes: Vec<u8>, headers: &ResponseHeaders) -> Response {
    let mut response = Body::from(bytes).into_response();
    let map = response.headers_mut();

    let content_type = HeaderValue::from_str(&headers.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    map.insert(header::CONTENT_TYPE, content_type);
    map.insert(
        HeaderName::from_static("x-image-date"),
        header_value(HEADER_IMAGE_DATE, &headers.image_date),
    );
    map.insert(
        HeaderName::from_static("x-image-name"),
        header_value(HEADER_IMAGE_NAME, &headers.image_name),
    );
    response
}

/// Unsendable values degrade to an empty header instead of dropping it.
fn header_value(name: &str, value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|err| {
        warn!(header = name, value, error = %err, "header value not sendable");
        HeaderValue::from_static("")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn empty_metadata_still_sets_both_headers() {
        let headers = ResponseHeaders {
            content_type: "image/png".into(),
            image_date: String::new(),
            image_name: String::new(),
        };

        let response = image_response(vec![1, 2, 3], &headers);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()["x-image-date"], "");
        assert_eq!(response.headers()["x-image-name"], "");
    }

    #[test]
    fn control_characters_become_empty_header() {
        let headers = ResponseHeaders {
            content_type: "image/jpeg".into(),
            image_date: "2019.05.01\n12:00".into(),
            image_name: "Album".into(),
        };

        let response = image_response(Vec::new(), &headers);

        assert_eq!(response.headers()["x-image-date"], "");
        assert_eq!(response.headers()["x-image-name"], "Album");
    }
}
