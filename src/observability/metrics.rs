use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub form_submissions_total: IntCounterVec,
    pub delivery_transitions_total: IntCounterVec,
    pub deliveries_completed_total: IntCounter,
    pub active_deliveries: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let form_submissions_total = IntCounterVec::new(
            Opts::new("form_submissions_total", "Form submissions by form and outcome"),
            &["form", "outcome"],
        )
        .expect("valid form_submissions_total metric");

        let delivery_transitions_total = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Delivery lifecycle transitions by stage entered",
            ),
            &["stage"],
        )
        .expect("valid delivery_transitions_total metric");

        let deliveries_completed_total = IntCounter::new(
            "deliveries_completed_total",
            "Deliveries whose drop-off was confirmed",
        )
        .expect("valid deliveries_completed_total metric");

        let active_deliveries =
            IntGauge::new("active_deliveries", "Deliveries currently between offer and completion")
                .expect("valid active_deliveries metric");

        registry
            .register(Box::new(form_submissions_total.clone()))
            .expect("register form_submissions_total");
        registry
            .register(Box::new(delivery_transitions_total.clone()))
            .expect("register delivery_transitions_total");
        registry
            .register(Box::new(deliveries_completed_total.clone()))
            .expect("register deliveries_completed_total");
        registry
            .register(Box::new(active_deliveries.clone()))
            .expect("register active_deliveries");

        Self {
            registry,
            form_submissions_total,
            delivery_transitions_total,
            deliveries_completed_total,
            active_deliveries,
        }
    }

    pub fn record_submission<T, E>(&self, form: &str, result: &Result<T, E>) {
        let outcome = if result.is_ok() { "success" } else { "error" };
        self.form_submissions_total
            .with_label_values(&[form, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
