use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::debug::json_escape;

/// Timing and counter log for placement passes.
///
/// Every span and count is written as it happens; when the last handle is
/// dropped a `<stem>_hot.log` ranking the most expensive spans is written next
/// to the main log.
#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    path: PathBuf,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                path,
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, container: usize, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"container\":{},\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            container,
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_counts(&self, name: &str, container: usize, counts: &[(&str, u64)]) {
        let body = counts
            .iter()
            .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
            .collect::<Vec<_>>()
            .join(",");
        let json = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"container\":{},\"counts\":{{{}}}}}",
            json_escape(name),
            container,
            body
        );
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let _ = self.writer.flush();
        let Ok(file) = File::create(hot_path_for(&self.path)) else {
            return;
        };
        let mut writer = BufWriter::new(file);
        let mut spans: Vec<(&String, &f64)> = self.span_totals.iter().collect();
        spans.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (rank, (name, ms)) in spans.into_iter().enumerate() {
            let count = *self.span_counts.get(name).unwrap_or(&1);
            let avg = if count == 0 { 0.0 } else { ms / count as f64 };
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                ms,
                count,
                avg
            );
        }
    }
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("autoplace_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    path.with_file_name(format!("{stem}_hot.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::tests::temp_log_path;

    #[test]
    fn hot_path_keeps_directory_and_stem() {
        assert_eq!(
            hot_path_for(Path::new("/tmp/run.perf.log")),
            PathBuf::from("/tmp/run.perf_hot.log")
        );
        assert_eq!(
            hot_path_for(Path::new("/tmp/perf")),
            PathBuf::from("/tmp/perf_hot.log")
        );
    }

    #[test]
    fn drop_writes_hot_ranking() {
        let path = temp_log_path("perf");
        {
            let logger = PerfLogger::new(&path).expect("create perf log");
            logger.log_span_ms("place.pass", 0, 2.0);
            logger.log_span_ms("place.pass", 1, 4.0);
            logger.log_span_ms("place.parse", 0, 1.0);
            logger.log_counts("place.counts", 0, &[("chunks", 3)]);
        }
        let main = std::fs::read_to_string(&path).expect("main log");
        let hot_path = hot_path_for(&path);
        let hot = std::fs::read_to_string(&hot_path).expect("hot log");
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(&hot_path);

        assert_eq!(main.lines().count(), 4);
        assert!(main.contains(r#""counts":{"chunks":3}"#), "{main}");
        let first = hot.lines().next().expect("hot line");
        assert!(
            first.contains(r#""name":"place.pass""#) && first.contains(r#""avg_ms":3.000"#),
            "unexpected hot ranking: {first}"
        );
    }
}
