//! Marking policy: which events arm the detail lane for persistence.
//!
//! Compiled to a flat `Vec<CompiledRule>` rather than `dyn Trait` callbacks,
//! so evaluating a record is a single non-virtual pass — there is no
//! dynamic dispatch on the hot path.

use tracecore_ring::{EventKind, IndexRecord};

/// One configured trigger, as it appears in `TraceConfig::trigger_kinds`.
#[derive(Debug, Clone)]
pub enum TriggerSpec {
    /// Fires when `function_id` matches exactly.
    Symbol { function_id: u64 },
    /// Fires on any `Exception` event.
    Exception,
    /// Fires when the caller-supplied call duration meets or exceeds this
    /// threshold (evaluated only on `Return` events that carry a duration).
    LatencyThreshold { min_duration_ns: u64 },
    /// Fires while the event timestamp falls in `[start_ns, end_ns]`.
    TimeWindow { start_ns: u64, end_ns: u64 },
}

#[derive(Debug, Clone, Copy)]
enum CompiledRule {
    Symbol(u64),
    Exception,
    LatencyThreshold(u64),
    TimeWindow(u64, u64),
}

impl CompiledRule {
    fn matches(self, record: &IndexRecord, duration_ns: Option<u64>) -> bool {
        match self {
            CompiledRule::Symbol(id) => record.function_id == id,
            CompiledRule::Exception => {
                EventKind::from_u32(record.event_kind) == Some(EventKind::Exception)
            }
            CompiledRule::LatencyThreshold(min) => duration_ns.is_some_and(|d| d >= min),
            CompiledRule::TimeWindow(start, end) => {
                record.timestamp_ns >= start && record.timestamp_ns <= end
            }
        }
    }
}

/// Compiled rule table; `evaluate` is called once per captured index event.
pub struct MarkingPolicy {
    rules: Vec<CompiledRule>,
}

impl MarkingPolicy {
    pub fn compile(specs: &[TriggerSpec]) -> Self {
        let rules = specs
            .iter()
            .map(|spec| match spec {
                TriggerSpec::Symbol { function_id } => CompiledRule::Symbol(*function_id),
                TriggerSpec::Exception => CompiledRule::Exception,
                TriggerSpec::LatencyThreshold { min_duration_ns } => {
                    CompiledRule::LatencyThreshold(*min_duration_ns)
                }
                TriggerSpec::TimeWindow { start_ns, end_ns } => {
                    CompiledRule::TimeWindow(*start_ns, *end_ns)
                }
            })
            .collect();
        Self { rules }
    }

    /// `true` if any rule matches this record; the caller is responsible for
    /// arming the detail lane (`lane.mark()`) when it does.
    pub fn evaluate(&self, record: &IndexRecord, duration_ns: Option<u64>) -> bool {
        self.rules.iter().any(|rule| rule.matches(record, duration_ns))
    }
}
