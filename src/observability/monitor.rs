use super::MetricsCollector;

pub struct SessionMonitor {
    collector: MetricsCollector,
}

impl SessionMonitor {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }

    pub fn generate_report(&self) -> String {
        let snapshot = self.collector.snapshot();

        if snapshot.is_empty() {
            return "No connections registered".to_string();
        }

        let mut names: Vec<&String> = snapshot.keys().collect();
        names.sort();

        let mut report = String::from("=== Session Metrics ===\n");

        for name in names {
            let m = &snapshot[name];
            report.push_str(&format!(
                "\n[{}]\n  In: {} frames in {} units ({} bytes)\n  Out: {} frames ({} bytes)\n  Samples: {}\n  Echoes: {}\n  Problems: {}, {}\n",
                name,
                m.frames_received,
                m.units_received,
                m.bytes_received,
                m.frames_sent,
                m.bytes_sent,
                m.samples_ingested,
                m.echoes,
                plural(m.payload_errors, "payload error"),
                plural(m.unhandled_keys, "unhandled key"),
            ));
        }

        report
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }
}

fn plural(count: u64, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}
