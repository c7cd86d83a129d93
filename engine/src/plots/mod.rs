//! Plot Harvesting
//!
//! Finds the files a piece of R code writes with `png()`, `pdf()` or
//! `ggsave()` and pulls each one back from the sandbox as base64.

use crate::sandbox::{script, SandboxManager};
use regex::Regex;
use sdk::{ExecutionResult, Plot};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

const ENCODE_TIMEOUT: Duration = Duration::from_secs(30);

/// Filename patterns and the MIME type of files they produce
const PLOT_PATTERNS: &[(&str, &str)] = &[
    (r#"png\(\s*["']([^"']+\.png)["']"#, "image/png"),
    (r#"ggsave\(\s*["']([^"']+\.png)["']"#, "image/png"),
    (r#"pdf\(\s*["']([^"']+\.pdf)["']"#, "application/pdf"),
];

static COMPILED_PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

fn compiled_patterns() -> &'static [(Regex, &'static str)] {
    COMPILED_PATTERNS.get_or_init(|| {
        PLOT_PATTERNS
            .iter()
            .map(|(pattern, mime)| (Regex::new(pattern).expect("Invalid plot pattern"), *mime))
            .collect()
    })
}

/// A file the code is expected to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotReference {
    pub filename: String,
    pub mime_type: &'static str,
}

/// Every plot file referenced in `code`, pattern by pattern.
///
/// A file named by more than one pattern appears once per match.
pub fn referenced_files(code: &str) -> Vec<PlotReference> {
    compiled_patterns()
        .iter()
        .flat_map(|(regex, mime)| {
            regex.captures_iter(code).filter_map(move |caps| {
                Some(PlotReference {
                    filename: caps.get(1)?.as_str().to_string(),
                    mime_type: *mime,
                })
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct PlotHarvester {
    manager: Arc<SandboxManager>,
}

impl PlotHarvester {
    pub fn new(manager: Arc<SandboxManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SandboxManager> {
        &self.manager
    }

    /// Retrieve the plots `code` wrote. Files that are missing or fail to
    /// encode are left out.
    pub async fn harvest(&self, code: &str) -> Vec<Plot> {
        let mut plots = Vec::new();

        for reference in referenced_files(code) {
            let command = script::encode_file_command(&reference.filename);
            let exec = match self.manager.run_command(&command, ENCODE_TIMEOUT).await {
                Ok(exec) => exec,
                Err(e) => {
                    warn!(filename = %reference.filename, error = %e, "Error encoding plot");
                    continue;
                }
            };

            match script::parse_encoded_output(&exec.stdout_text(), &reference.filename) {
                Some(content) => {
                    info!(filename = %reference.filename, "Encoded plot");
                    plots.push(Plot {
                        filename: reference.filename,
                        content,
                        mime_type: reference.mime_type.to_string(),
                    });
                }
                None => {
                    warn!(filename = %reference.filename, error = ?exec.error, "Plot file not found or encoding failed")
                }
            }
        }

        plots
    }

    /// Run `code` and attach the plots it produced.
    ///
    /// Plots are collected even when the run reports an error, since files
    /// written before the failure are still there.
    pub async fn run_and_harvest(&self, code: &str, timeout_ms: Option<u64>) -> ExecutionResult {
        let mut result = self.manager.run(code, timeout_ms).await;
        result.plots = self.harvest(code).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(code: &str) -> Vec<String> {
        referenced_files(code)
            .into_iter()
            .map(|r| r.filename)
            .collect()
    }

    #[test]
    fn test_finds_each_plot_call() {
        let code = r#"
png("plot1.png", width = 800)
hist(x)
dev.off()
ggsave('plot2.png', p)
pdf("report.pdf")
"#;
        let refs = referenced_files(code);
        assert_eq!(
            refs,
            vec![
                PlotReference {
                    filename: "plot1.png".to_string(),
                    mime_type: "image/png"
                },
                PlotReference {
                    filename: "plot2.png".to_string(),
                    mime_type: "image/png"
                },
                PlotReference {
                    filename: "report.pdf".to_string(),
                    mime_type: "application/pdf"
                },
            ]
        );
    }

    #[test]
    fn test_ggsave_not_counted_as_png_call() {
        assert_eq!(names(r#"ggsave("only.png")"#), vec!["only.png"]);
    }

    #[test]
    fn test_unsupported_extensions_ignored() {
        assert!(names(r#"png("plot.jpg"); ggsave("plot.svg"); pdf(file = "x.pdf")"#).is_empty());
    }

    #[test]
    fn test_duplicates_kept() {
        assert_eq!(
            names(r#"png("a.png"); png("a.png")"#),
            vec!["a.png", "a.png"]
        );
    }

    #[test]
    fn test_no_plots() {
        assert!(names("summary(mtcars)").is_empty());
    }
}
