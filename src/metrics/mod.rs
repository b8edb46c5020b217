/*!
 * Prometheus metrics exposition.
 *
 * Commands register their own counters in the default registry via
 * `lazy_static`; this module renders everything registered there in
 * Prometheus text format for the `/metrics` endpoint.
 */

use prometheus::{Encoder, TextEncoder};

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_produces_text_exposition() {
        let body = gather_metrics().unwrap();
        // Nothing may be registered yet in a bare unit test run, but the
        // encoder must still produce valid (possibly empty) output.
        assert!(body.is_empty() || body.contains("# "));
    }
}
