//! 运行指标
//!
//! 通过 `metrics` facade 记录；未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录一行输入的处理结果
///
/// `outcome` 取值见 `ingestion::LineOutcome::as_str`。
pub fn record_line_outcome(outcome: &'static str) {
    counter!("rtl2chords_lines_total", "outcome" => outcome).increment(1);
}

/// 记录一条提交到投递队列的记录
pub fn record_record_submitted(sensor: &str) {
    counter!(
        "rtl2chords_records_submitted_total",
        "sensor" => sensor.to_string()
    )
    .increment(1);
}

/// 记录因队列已满而丢弃的记录
pub fn record_record_dropped(sink_name: &str) {
    counter!(
        "rtl2chords_records_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录解码器重启
pub fn record_upstream_restart() {
    counter!("rtl2chords_upstream_restarts_total").increment(1);
}

/// 记录投递队列深度
pub fn record_queue_pending(pending: usize) {
    gauge!("rtl2chords_queue_pending").set(pending as f64);
}

/// 记录一次 HTTP 投递尝试
pub fn record_delivery(success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!("rtl2chords_deliveries_total", "status" => status).increment(1);
    histogram!("rtl2chords_delivery_latency_ms").record(latency_ms);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
///
/// 用于投递延迟等无需保留样本的统计。
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
