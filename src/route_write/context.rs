use uuid::Uuid;

use super::method::WriteMethod;

/// Per-request values every stage of the write pipeline needs
///
/// Built once by the handler from the URL and passed by reference, so no
/// stage looks anything up on its own.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: WriteMethod,
    /// App name taken from the URL
    pub app_name: String,
    /// Raw route path from the URL, absent for POST
    pub url_path: Option<String>,
    pub span: tracing::Span,
}

impl RequestContext {
    pub fn new(method: WriteMethod, app_name: impl Into<String>, url_path: Option<String>) -> Self {
        let request_id = Uuid::new_v4();
        let app_name = app_name.into();
        let span = tracing::info_span!(
            "route_write",
            %request_id,
            app = %app_name,
            %method,
        );
        Self {
            request_id,
            method,
            app_name,
            url_path,
            span,
        }
    }
}

/// Lexically canonicalise a slash-separated path
///
/// Repeated separators and `.` segments are dropped and `..` removes the
/// preceding segment. A rooted path never climbs above `/`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
