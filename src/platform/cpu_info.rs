//! CPU information discovered once at startup.

use std::fs;

use serde::Serialize;

/// Hardware features worth reporting on the diagnostic pages.
const REPORTED_FLAGS: &[&str] = &["ssse3", "sse4_1", "sse4_2", "popcnt", "avx", "avx2"];

/// Snapshot of the host CPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuInfo {
    pub num_cores: usize,
    pub model_name: String,
    pub hardware_flags: Vec<String>,
}

impl CpuInfo {
    /// Probe the current host.
    ///
    /// The core count comes from the scheduler's view; model and flags come
    /// from `/proc/cpuinfo` where available and are left empty elsewhere.
    pub fn init() -> Self {
        let mut info = match fs::read_to_string("/proc/cpuinfo") {
            Ok(text) => Self::parse(&text),
            Err(_) => Self {
                num_cores: 0,
                model_name: String::new(),
                hardware_flags: Vec::new(),
            },
        };
        info.num_cores = num_cpus::get();

        tracing::info!(
            num_cores = info.num_cores,
            model = %info.model_name,
            flags = ?info.hardware_flags,
            "CPU info initialized"
        );
        info
    }

    /// Parse the text format of `/proc/cpuinfo`.
    pub fn parse(text: &str) -> Self {
        let mut num_cores = 0;
        let mut model_name = String::new();
        let mut hardware_flags = Vec::new();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "processor" => num_cores += 1,
                "model name" if model_name.is_empty() => model_name = value.to_string(),
                "flags" if hardware_flags.is_empty() => {
                    let present: Vec<&str> = value.split_whitespace().collect();
                    hardware_flags = REPORTED_FLAGS
                        .iter()
                        .filter(|flag| present.contains(*flag))
                        .map(|flag| flag.to_string())
                        .collect();
                }
                _ => {}
            }
        }

        Self {
            num_cores,
            model_name,
            hardware_flags,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.hardware_flags.iter().any(|f| f == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
flags\t\t: fpu vme sse2 ssse3 sse4_1 sse4_2 popcnt avx
processor\t: 1
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
flags\t\t: fpu vme sse2 ssse3 sse4_1 sse4_2 popcnt avx
";

    #[test]
    fn parses_proc_cpuinfo() {
        let info = CpuInfo::parse(SAMPLE);
        assert_eq!(info.num_cores, 2);
        assert_eq!(info.model_name, "Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz");
        assert_eq!(info.hardware_flags, vec!["ssse3", "sse4_1", "sse4_2", "popcnt", "avx"]);
        assert!(info.has_flag("sse4_2"));
        assert!(!info.has_flag("avx2"));
    }

    #[test]
    fn empty_input_yields_empty_info() {
        let info = CpuInfo::parse("");
        assert_eq!(info.num_cores, 0);
        assert!(info.model_name.is_empty());
        assert!(info.hardware_flags.is_empty());
    }

    #[test]
    fn init_reports_at_least_one_core() {
        assert!(CpuInfo::init().num_cores >= 1);
    }
}
