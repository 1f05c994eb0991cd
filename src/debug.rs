use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// A scalar value in a JSONL log record.
#[derive(Debug, Clone)]
pub(crate) enum Field<'a> {
    Str(&'a str),
    Int(i64),
    Px(crate::types::Px),
    Bool(bool),
}

impl Field<'_> {
    fn write_json(&self, out: &mut String) {
        match self {
            Field::Str(value) => {
                out.push('"');
                out.push_str(&json_escape(value));
                out.push('"');
            }
            Field::Int(value) => out.push_str(&value.to_string()),
            Field::Px(value) => out.push_str(&format!("{:.3}", value.to_f32())),
            Field::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        }
    }
}

/// Render `{"type":kind, ...fields}` as one JSON line.
pub(crate) fn json_record(kind: &str, fields: &[(&str, Field<'_>)]) -> String {
    let mut out = format!("{{\"type\":\"{}\"", json_escape(kind));
    for (key, value) in fields {
        out.push_str(&format!(",\"{}\":", json_escape(key)));
        value.write_json(&mut out);
    }
    out.push('}');
    out
}

/// JSONL sink for placement decisions plus named counters.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn event(&self, kind: &str, fields: &[(&str, Field<'_>)]) {
        let line = json_record(kind, fields);
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Write and reset the accumulated counters.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let counts = counters
                .iter()
                .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{{{}}}}}",
                json_escape(context),
                counts
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

/// Stderr tracing toggled by `AUTOPLACE_DEBUG=1`.
pub(crate) fn trace_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("AUTOPLACE_DEBUG")
            .ok()
            .map(|v| {
                let v = v.trim();
                v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
            })
            .unwrap_or(false)
    })
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Px;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn temp_log_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "autoplace_{tag}_{}_{nanos}.log",
            std::process::id()
        ))
    }

    #[test]
    fn records_are_single_line_json() {
        let line = json_record(
            "place.image",
            &[
                ("selector", Field::Str("img\n\"x\"")),
                ("index", Field::Int(2)),
                ("height", Field::Px(Px::from_f32(12.5))),
                ("floated", Field::Bool(true)),
            ],
        );
        assert_eq!(
            line,
            r#"{"type":"place.image","selector":"img\n\"x\"","index":2,"height":12.500,"floated":true}"#
        );
    }

    #[test]
    fn summary_lists_sorted_counters_and_resets() {
        let path = temp_log_path("debug_summary");
        let logger = DebugLogger::new(&path).expect("create log");
        logger.increment("placed", 2);
        logger.increment("chunks", 5);
        logger.emit_summary("pass");
        logger.emit_summary("pass");
        logger.flush();
        let text = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"type":"debug.summary","context":"pass","counts":{"chunks":5,"placed":2}}"#,
                r#"{"type":"debug.summary","context":"pass","counts":{}}"#,
            ]
        );
    }
}
