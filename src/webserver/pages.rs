//! Default diagnostic pages: `/` (status), `/varz` (configuration), `/logs`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::config::ProcessConfig;
use crate::observability::{version_string, LogBuffer};
use crate::platform::CpuInfo;
use crate::webserver::handler::{Page, PageArgs, PathHandlerRegistry};

pub const STATUS_PATH: &str = "/";
pub const VARZ_PATH: &str = "/varz";
pub const LOGS_PATH: &str = "/logs";

/// Everything the default pages render from.
#[derive(Debug, Clone)]
pub struct DefaultPages {
    pub config: Arc<ProcessConfig>,
    pub cpu_info: CpuInfo,
    /// Absent when logging was not routed through the in-memory buffer.
    pub log_buffer: Option<LogBuffer>,
    pub started_at: Instant,
}

pub(crate) fn register(registry: &dyn PathHandlerRegistry, pages: DefaultPages) {
    let DefaultPages {
        config,
        cpu_info,
        log_buffer,
        started_at,
    } = pages;

    let hostname = config.hostname.clone();
    registry.register_path_handler(
        STATUS_PATH,
        Arc::new(move |_: &PageArgs| {
            Page::Json(json!({
                "version": version_string(),
                "hostname": hostname,
                "uptime_secs": started_at.elapsed().as_secs(),
                "cpu": cpu_info,
            }))
        }),
    );

    registry.register_path_handler(
        VARZ_PATH,
        Arc::new(move |_: &PageArgs| match serde_json::to_value(config.as_ref()) {
            Ok(value) => Page::Json(value),
            Err(e) => Page::Text(format!("cannot serialize configuration: {}", e)),
        }),
    );

    registry.register_path_handler(
        LOGS_PATH,
        Arc::new(move |args: &PageArgs| {
            let Some(buffer) = &log_buffer else {
                return Page::Text("Log buffering is disabled".to_string());
            };
            let lines = buffer.lines();
            // `?lines=N` limits output to the last N lines.
            let skip = args
                .get("lines")
                .and_then(|n| n.parse::<usize>().ok())
                .map(|n| lines.len().saturating_sub(n))
                .unwrap_or(0);
            Page::Text(lines[skip..].join("\n"))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::PathHandler;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Default)]
    struct Pages(Mutex<HashMap<String, PathHandler>>);

    impl PathHandlerRegistry for Pages {
        fn register_path_handler(&self, path: &str, handler: PathHandler) {
            self.0.lock().unwrap().insert(path.to_string(), handler);
        }
    }

    impl Pages {
        fn render(&self, path: &str, args: &[(&str, &str)]) -> Page {
            let args: PageArgs = args
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let handler = self.0.lock().unwrap()[path].clone();
            handler(&args)
        }
    }

    fn default_pages(log_buffer: Option<LogBuffer>) -> DefaultPages {
        DefaultPages {
            config: Arc::new(ProcessConfig {
                hostname: "node-1".into(),
                ..Default::default()
            }),
            cpu_info: CpuInfo::parse("processor : 0\nmodel name : Test CPU\n"),
            log_buffer,
            started_at: Instant::now(),
        }
    }

    #[test]
    fn registers_status_varz_and_logs() {
        let pages = Pages::default();
        register(&pages, default_pages(None));

        let mut paths: Vec<String> = pages.0.lock().unwrap().keys().cloned().collect();
        paths.sort();
        assert_eq!(paths, vec!["/", "/logs", "/varz"]);
    }

    #[test]
    fn status_reports_version_and_hostname() {
        let pages = Pages::default();
        register(&pages, default_pages(None));

        match pages.render(STATUS_PATH, &[]) {
            Page::Json(value) => {
                assert_eq!(value["hostname"], "node-1");
                assert_eq!(value["version"], version_string());
                assert_eq!(value["cpu"]["model_name"], "Test CPU");
            }
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn varz_dumps_configuration() {
        let pages = Pages::default();
        register(&pages, default_pages(None));

        match pages.render(VARZ_PATH, &[]) {
            Page::Json(value) => {
                assert_eq!(value["webserver_port"], 25010);
                assert_eq!(value["hostname"], "node-1");
            }
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn logs_page_honours_line_limit() {
        let buffer = LogBuffer::new(16);
        buffer.make_writer().write_all(b"one\ntwo\nthree\n").unwrap();

        let pages = Pages::default();
        register(&pages, default_pages(Some(buffer)));

        assert_eq!(pages.render(LOGS_PATH, &[]), Page::Text("one\ntwo\nthree".into()));
        assert_eq!(
            pages.render(LOGS_PATH, &[("lines", "2")]),
            Page::Text("two\nthree".into())
        );
    }
}
