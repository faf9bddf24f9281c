//! Dev-only remote API (rouille HTTP server).
//!
//! Lets a remote browser session drive file access while the annotation
//! state lives here: scan a directory for videos, read/write annotation
//! files, and stream video bytes with HTTP Range support.
//!
//! Architecture mirrors the command-channel pattern: HTTP handlers run on
//! a background thread; anything that must touch application state is sent
//! over an mpsc channel and applied in the UI loop. Plain file I/O is
//! served directly from the handler thread.
//!
//! | Method | Path                    | Description                      |
//! |--------|-------------------------|----------------------------------|
//! | POST   | `/api/scan-path`        | `{dirPath}` → queue a library scan |
//! | POST   | `/api/read-file`        | `{filePath}` → file content      |
//! | POST   | `/api/write-file`       | `{filePath, content}`            |
//! | GET    | `/api/serve-video?path=`| Range-request video streaming    |
//! | GET    | `/api/health`           | Health check                     |

use log::{info, warn};
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

/// Commands crossing from HTTP handlers to the UI thread.
#[derive(Debug, Clone)]
pub enum ApiCommand {
    /// Rescan this directory into the video library.
    ScanPath(String),
}

#[derive(Debug, Deserialize)]
struct ScanRequest {
    #[serde(rename = "dirPath")]
    dir_path: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileRequest {
    #[serde(rename = "filePath")]
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileRequest {
    #[serde(rename = "filePath")]
    file_path: String,
    content: String,
}

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn ok() -> Self {
        Self { success: true, content: None, error: None }
    }

    fn with_content(content: String) -> Self {
        Self { success: true, content: Some(content), error: None }
    }

    fn err(msg: &str) -> Self {
        Self { success: false, content: None, error: Some(msg.to_string()) }
    }
}

/// Dev API server; spawns a background thread on `start`.
pub struct ApiServer;

impl ApiServer {
    /// Returns the command receiver the UI loop polls each frame.
    pub fn start(port: u16) -> mpsc::Receiver<ApiCommand> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let addr = format!("127.0.0.1:{port}");
            info!("dev API server on http://{addr}");
            rouille::start_server(addr, move |request| Self::handle(request, &tx));
        });
        rx
    }

    fn handle(request: &Request, tx: &mpsc::Sender<ApiCommand>) -> Response {
        let response = rouille::router!(request,
            (POST) ["/api/scan-path"] => {
                match rouille::input::json_input::<ScanRequest>(request) {
                    Ok(req) => match tx.send(ApiCommand::ScanPath(req.dir_path)) {
                        Ok(_) => Response::json(&ApiResponse::ok()),
                        Err(e) => Response::json(&ApiResponse::err(&e.to_string()))
                            .with_status_code(500),
                    },
                    Err(e) => Response::json(&ApiResponse::err(&format!("invalid JSON: {e}")))
                        .with_status_code(400),
                }
            },
            (POST) ["/api/read-file"] => {
                match rouille::input::json_input::<ReadFileRequest>(request) {
                    Ok(req) => match std::fs::read_to_string(&req.file_path) {
                        Ok(content) => Response::json(&ApiResponse::with_content(content)),
                        Err(e) => Response::json(&ApiResponse::err(&e.to_string()))
                            .with_status_code(404),
                    },
                    Err(e) => Response::json(&ApiResponse::err(&format!("invalid JSON: {e}")))
                        .with_status_code(400),
                }
            },
            (POST) ["/api/write-file"] => {
                match rouille::input::json_input::<WriteFileRequest>(request) {
                    Ok(req) => match std::fs::write(&req.file_path, req.content) {
                        Ok(_) => Response::json(&ApiResponse::ok()),
                        Err(e) => Response::json(&ApiResponse::err(&e.to_string()))
                            .with_status_code(500),
                    },
                    Err(e) => Response::json(&ApiResponse::err(&format!("invalid JSON: {e}")))
                        .with_status_code(400),
                }
            },
            (GET) ["/api/serve-video"] => {
                match request.get_param("path") {
                    Some(path) => Self::serve_video(request, Path::new(&path)),
                    None => Response::json(&ApiResponse::err("missing ?path="))
                        .with_status_code(400),
                }
            },
            (GET) ["/api/health"] => {
                Response::json(&ApiResponse::ok())
            },
            _ => {
                Response::json(&ApiResponse::err("not found")).with_status_code(404)
            }
        );
        response.with_additional_header("Access-Control-Allow-Origin", "*")
    }

    /// Stream a video file, honoring a single `bytes=start-end` range.
    /// Containers are served as stored - no remuxing.
    fn serve_video(request: &Request, path: &Path) -> Response {
        let Ok(mut file) = std::fs::File::open(path) else {
            return Response::json(&ApiResponse::err("file not found")).with_status_code(404);
        };
        let Ok(meta) = file.metadata() else {
            return Response::json(&ApiResponse::err("unreadable file")).with_status_code(500);
        };
        let len = meta.len();
        let mime = mime_for(path);

        let range = request
            .header("Range")
            .and_then(|h| parse_byte_range(h, len));
        match range {
            Some((start, end)) => {
                if file.seek(SeekFrom::Start(start)).is_err() {
                    return Response::json(&ApiResponse::err("seek failed")).with_status_code(500);
                }
                let chunk_len = end - start + 1;
                let mut buf = vec![0u8; chunk_len as usize];
                if file.read_exact(&mut buf).is_err() {
                    warn!("short read serving {}", path.display());
                    return Response::json(&ApiResponse::err("read failed")).with_status_code(500);
                }
                Response::from_data(mime, buf)
                    .with_status_code(206)
                    .with_additional_header(
                        "Content-Range",
                        format!("bytes {start}-{end}/{len}"),
                    )
                    .with_additional_header("Accept-Ranges", "bytes")
            }
            None => {
                let mut buf = Vec::with_capacity(len as usize);
                if file.read_to_end(&mut buf).is_err() {
                    return Response::json(&ApiResponse::err("read failed")).with_status_code(500);
                }
                Response::from_data(mime, buf).with_additional_header("Accept-Ranges", "bytes")
            }
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Parse a `bytes=start-end` header into an inclusive, clamped range.
fn parse_byte_range(header: &str, len: u64) -> Option<(u64, u64)> {
    if len == 0 {
        return None;
    }
    let spec = header.strip_prefix("bytes=")?;
    // Only the first range of a multi-range request is honored.
    let spec = spec.split(',').next()?.trim();
    let (start_s, end_s) = spec.split_once('-')?;
    if start_s.is_empty() {
        // Suffix range: last N bytes.
        let n: u64 = end_s.parse().ok()?;
        if n == 0 {
            return None;
        }
        let start = len.saturating_sub(n);
        return Some((start, len - 1));
    }
    let start: u64 = start_s.parse().ok()?;
    if start >= len {
        return None;
    }
    let end = if end_s.is_empty() {
        len - 1
    } else {
        end_s.parse::<u64>().ok()?.min(len - 1)
    };
    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_parsing() {
        assert_eq!(parse_byte_range("bytes=0-499", 1000), Some((0, 499)));
        assert_eq!(parse_byte_range("bytes=500-", 1000), Some((500, 999)));
        assert_eq!(parse_byte_range("bytes=-200", 1000), Some((800, 999)));
        // Clamped to the file length.
        assert_eq!(parse_byte_range("bytes=900-2000", 1000), Some((900, 999)));
        // Degenerate requests are rejected.
        assert_eq!(parse_byte_range("bytes=1000-1200", 1000), None);
        assert_eq!(parse_byte_range("bytes=5-2", 1000), None);
        assert_eq!(parse_byte_range("nonsense", 1000), None);
        assert_eq!(parse_byte_range("bytes=0-10", 0), None);
    }

    #[test]
    fn mime_lookup() {
        assert_eq!(mime_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(mime_for(Path::new("a.webm")), "video/webm");
        assert_eq!(mime_for(Path::new("a.bin")), "application/octet-stream");
    }
}
