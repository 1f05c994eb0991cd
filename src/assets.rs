use base64::Engine;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Resolves the intrinsic pixel size of `<img src>` values.
///
/// `data:` URIs are decoded in memory; anything else is treated as a path,
/// relative to `base_dir` when one is set. Remote URLs are never fetched.
#[derive(Debug, Default)]
pub struct ImageSizer {
    base_dir: Option<PathBuf>,
    cache: HashMap<String, Option<(u32, u32)>>,
}

impl ImageSizer {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            cache: HashMap::new(),
        }
    }

    pub fn intrinsic_size(&mut self, src: &str) -> Option<(u32, u32)> {
        let src = src.trim();
        if src.is_empty() {
            return None;
        }
        if let Some(hit) = self.cache.get(src) {
            return *hit;
        }
        let size = self.load_bytes(src).and_then(|bytes| decode_dimensions(&bytes));
        self.cache.insert(src.to_string(), size);
        size
    }

    fn load_bytes(&self, src: &str) -> Option<Vec<u8>> {
        if src.starts_with("data:") {
            return parse_data_uri_bytes(src).map(|(_, data)| data);
        }
        if src.contains("://") {
            return None;
        }
        let path = Path::new(src);
        let resolved = match (&self.base_dir, path.is_absolute()) {
            (Some(base), false) => base.join(path),
            _ => path.to_path_buf(),
        };
        std::fs::read(resolved).ok()
    }
}

fn decode_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let (w, h) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

pub(crate) fn parse_data_uri_bytes(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_ascii_lowercase();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim().as_bytes())
            .ok()?
    } else {
        decode_percent_encoded_bytes(payload)?
    };
    Some((mime, data))
}

fn decode_percent_encoded_bytes(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = input.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    Some(out)
}
