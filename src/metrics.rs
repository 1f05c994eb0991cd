/// Counters gathered during one placement pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementMetrics {
    pub chunk_count: usize,
    pub image_count: usize,
    pub placed: usize,
    pub trailing: usize,
    pub dropped: usize,
    pub height_queries: usize,
    pub pass_ms: f64,
}

/// Totals over every container touched by one HTML call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub containers: Vec<PlacementMetrics>,
    pub total_ms: f64,
}

impl DocumentMetrics {
    pub fn push(&mut self, metrics: PlacementMetrics) {
        self.total_ms += metrics.pass_ms;
        self.containers.push(metrics);
    }

    pub fn placed(&self) -> usize {
        self.containers.iter().map(|m| m.placed).sum()
    }
}
