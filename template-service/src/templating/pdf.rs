use crate::templating::error::TemplateError;
use crate::templating::preview::html_escape;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Print stylesheet applied to every PDF: A4 pages, header rows repeated on
/// each page, table rows kept whole and short paragraph fragments avoided.
pub const PRINT_STYLESHEET: &str = r#"
@page { size: A4; margin: 20mm 15mm; }
body { font-family: "Times New Roman", serif; font-size: 12pt; line-height: 1.4; color: #000; }
h1, h2, h3, h4, h5, h6 { page-break-after: avoid; }
p { margin: 0 0 6pt 0; orphans: 3; widows: 3; }
table { width: 100%; border-collapse: collapse; margin: 6pt 0; }
thead { display: table-header-group; }
tfoot { display: table-footer-group; }
tr { page-break-inside: avoid; }
th, td { border: 1px solid #000; padding: 4pt 6pt; vertical-align: top; }
th { font-weight: bold; background: #f0f0f0; }
"#;

/// Wraps a preview fragment into a standalone, printable HTML document.
pub fn wrap_for_print(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape(title),
        PRINT_STYLESHEET,
        body
    )
}

/// Converts a complete HTML document into PDF bytes.
#[async_trait]
pub trait HtmlToPdfRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, TemplateError>;
}

/// Runs a headless browser (or any compatible converter) as a short-lived
/// process per request. Each call gets its own scratch directory, so no
/// browser state is shared between renders.
///
/// `args` may contain `{input}`, `{output}` and `{scratch}`; they are replaced
/// with the HTML file, the expected PDF file and the scratch directory.
#[derive(Debug, Clone)]
pub struct ProcessPdfRenderer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    temp_dir: PathBuf,
}

pub const DEFAULT_PDF_ARGS: &[&str] = &[
    "--headless",
    "--disable-gpu",
    "--no-sandbox",
    "--no-pdf-header-footer",
    "--user-data-dir={scratch}/profile",
    "--print-to-pdf={output}",
    "{input}",
];

impl ProcessPdfRenderer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            temp_dir: temp_dir.into(),
        }
    }

    fn command_args(&self, input: &Path, output: &Path, scratch: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let scratch = scratch.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{scratch}", &scratch)
            })
            .collect()
    }
}

/// Removes the scratch directory however the render ends. Inside a runtime
/// the removal runs on the blocking pool.
struct ScratchDir(PathBuf);

fn remove_scratch(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = ?path, error = %e, "Failed to remove render scratch directory");
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let path = std::mem::take(&mut self.0);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_scratch(&path));
            }
            Err(_) => remove_scratch(&path),
        }
    }
}

#[async_trait]
impl HtmlToPdfRenderer for ProcessPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, TemplateError> {
        let scratch = ScratchDir(self.temp_dir.join(format!("render-{}", uuid::Uuid::new_v4())));
        tokio::fs::create_dir_all(&scratch.0)
            .await
            .map_err(|e| TemplateError::RenderFailed(format!("scratch directory: {}", e)))?;

        let input = scratch.0.join("document.html");
        let output = scratch.0.join("document.pdf");
        tokio::fs::write(&input, html)
            .await
            .map_err(|e| TemplateError::RenderFailed(format!("write input: {}", e)))?;

        let args = self.command_args(&input, &output, &scratch.0);

        tracing::debug!(
            program = %self.program,
            args = ?args,
            timeout_secs = %self.timeout.as_secs(),
            "Executing PDF renderer"
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&scratch.0)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TemplateError::RenderFailed(format!("spawn {}: {}", self.program, e)))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(|e| TemplateError::RenderFailed(e.to_string()))?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out PDF renderer");
                }
                return Err(TemplateError::RenderTimeout(self.timeout));
            }
        };

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            tracing::error!(
                program = %self.program,
                status = %status,
                stderr = %stderr,
                "PDF renderer failed"
            );
            return Err(TemplateError::RenderFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        let pdf = match tokio::fs::read(&output).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::EmptyOutput)
            }
            Err(e) => return Err(TemplateError::RenderFailed(format!("read output: {}", e))),
        };

        tracing::debug!(
            program = %self.program,
            output_size = pdf.len(),
            "PDF renderer succeeded"
        );

        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_fragment_with_print_styles() {
        let html = wrap_for_print("Declaração <1>", "<p>x</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Declaração &lt;1&gt;</title>"));
        assert!(html.contains("display: table-header-group"));
        assert!(html.contains("page-break-inside: avoid"));
        assert!(html.contains("<p>x</p>"));
    }

    #[test]
    fn placeholders_in_args_are_expanded() {
        let renderer = ProcessPdfRenderer::new(
            "chromium",
            DEFAULT_PDF_ARGS.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(30),
            "/tmp",
        );
        let args = renderer.command_args(
            Path::new("/tmp/r/in.html"),
            Path::new("/tmp/r/out.pdf"),
            Path::new("/tmp/r"),
        );
        assert!(args.contains(&"--print-to-pdf=/tmp/r/out.pdf".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/r/profile".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/r/in.html"));
    }

    #[tokio::test]
    async fn scratch_directory_is_removed_on_drop() {
        let path = std::env::temp_dir().join(format!("scratch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(path.join("profile")).unwrap();
        drop(ScratchDir(path.clone()));

        for _ in 0..50 {
            if !path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("scratch directory {:?} was not removed", path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_output_is_empty_output() {
        let renderer = ProcessPdfRenderer::new(
            "true",
            Vec::new(),
            Duration::from_secs(5),
            std::env::temp_dir(),
        );
        let err = renderer.render("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, TemplateError::EmptyOutput));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_renderer_times_out() {
        let renderer = ProcessPdfRenderer::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
            std::env::temp_dir(),
        );
        let err = renderer.render("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, TemplateError::RenderTimeout(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_renderer_is_render_failure() {
        let renderer = ProcessPdfRenderer::new(
            "false",
            Vec::new(),
            Duration::from_secs(5),
            std::env::temp_dir(),
        );
        let err = renderer.render("<p>x</p>").await.unwrap_err();
        assert!(matches!(err, TemplateError::RenderFailed(_)));
    }
}
