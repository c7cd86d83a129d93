//! R snippets sent to the sandbox and parsers for what they print.
//!
//! Plot markers use `<`, `>` and `:`, none of which appear in base64 output,
//! so the payload can be cut out of stdout without ambiguity.

use sdk::SandboxInfo;

/// Printed by the upload commands once the target file exists
pub const UPLOAD_SUCCESS_MARKER: &str = "SUCCESS: File saved to";

const PLOT_BEGIN_MARKER: &str = "<<<PLOT_BEGIN>>>";

const ENSURE_BASE64ENC: &str = r#"if (!requireNamespace("base64enc", quietly = TRUE)) {
  install.packages("base64enc", repos = "https://cloud.r-project.org/")
}"#;

const R_VERSION_PREFIX: &str = "R Version:";
const SYSTEM_INFO_PREFIX: &str = "System Info:";
const PACKAGES_PREFIX: &str = "Installed Packages:";

/// Prints R version, system info and installed packages, one line each
pub const INFO_COMMAND: &str = r#"r_version <- paste0(R.version$major, ".", R.version$minor)
pkgs <- installed.packages()[, c("Package", "Version"), drop = FALSE]
pkgs_str <- paste0(pkgs[, "Package"], " (", pkgs[, "Version"], ")", collapse = ", ")
sys_info <- Sys.info()
sys_info_str <- paste(names(sys_info), sys_info, sep = ": ", collapse = ", ")
cat("R Version:", r_version, "\n")
cat("System Info:", sys_info_str, "\n")
cat("Installed Packages:", pkgs_str, "\n")"#;

/// Quote `value` as an R string literal
pub fn r_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn create_dir_command(dir: &str) -> String {
    format!(
        "dir.create({}, showWarnings = FALSE, recursive = TRUE)",
        r_string(dir)
    )
}

fn confirm_saved(path: &str) -> String {
    let path = r_string(path);
    format!(
        r#"if (file.exists({path})) {{
  cat("{UPLOAD_SUCCESS_MARKER}", {path})
}} else {{
  cat("ERROR: Failed to save file")
}}"#
    )
}

/// Write `text` to `path` exactly, without a trailing newline
pub fn write_text_command(path: &str, text: &str) -> String {
    format!(
        r#"local({{
  con <- file({path}, "w", encoding = "UTF-8")
  writeLines({text}, con, sep = "")
  close(con)
}})
{confirm}"#,
        path = r_string(path),
        text = r_string(text),
        confirm = confirm_saved(path),
    )
}

/// Decode base64 `content` inside the sandbox and write the bytes to `path`
pub fn write_binary_command(path: &str, content_base64: &str) -> String {
    format!(
        r#"{ENSURE_BASE64ENC}
local({{
  con <- file({path}, "wb")
  base64enc::base64decode(what = {content}, output = con)
  close(con)
}})
{confirm}"#,
        path = r_string(path),
        content = r_string(content_base64),
        confirm = confirm_saved(path),
    )
}

pub fn file_info_command(path: &str) -> String {
    let path = r_string(path);
    format!(
        r#"cat("File exists:", file.exists({path}), "\n")
cat("File size:", file.info({path})$size, "bytes\n")"#
    )
}

pub fn encoded_marker(filename: &str) -> String {
    format!("<<<PLOT_ENCODED:{filename}>>>")
}

pub fn not_found_marker(filename: &str) -> String {
    format!("<<<PLOT_NOT_FOUND:{filename}>>>")
}

/// Print the base64 of `filename` between markers, or a not-found marker
pub fn encode_file_command(filename: &str) -> String {
    let quoted = r_string(filename);
    format!(
        r#"if (file.exists({quoted})) {{
{ENSURE_BASE64ENC}
  cat("\n{PLOT_BEGIN_MARKER}")
  cat(base64enc::base64encode({quoted}))
  cat({success}, "\n", sep = "")
}} else {{
  cat("\n", {missing}, "\n", sep = "")
}}"#,
        success = r_string(&encoded_marker(filename)),
        missing = r_string(&not_found_marker(filename)),
    )
}

/// Base64 payload printed by [`encode_file_command`], if the file was found
pub fn parse_encoded_output(stdout: &str, filename: &str) -> Option<String> {
    let (before, _) = stdout.split_once(&encoded_marker(filename))?;
    let payload = match before.rsplit_once(PLOT_BEGIN_MARKER) {
        Some((_, payload)) => payload,
        None => before,
    };
    let payload: String = payload.split_whitespace().collect();
    (!payload.is_empty()).then_some(payload)
}

pub fn upload_succeeded(stdout: &str) -> bool {
    stdout.contains(UPLOAD_SUCCESS_MARKER)
}

/// Fill a [`SandboxInfo`] from the output of [`INFO_COMMAND`]
pub fn parse_info(stdout: &str) -> SandboxInfo {
    let mut info = SandboxInfo::default();
    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix(R_VERSION_PREFIX) {
            info.r_version = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(SYSTEM_INFO_PREFIX) {
            info.system_info = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(PACKAGES_PREFIX) {
            let packages = rest
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            info.installed_packages = Some(packages);
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r_string_escapes() {
        assert_eq!(r_string("plain.csv"), "\"plain.csv\"");
        assert_eq!(r_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(r_string("x\ny"), "\"x\\ny\"");
        assert_eq!(r_string("it's"), "\"it's\"");
    }

    #[test]
    fn test_text_write_quotes_content() {
        let cmd = write_text_command("uploads/notes.txt", "say \"hi\"\n");
        assert!(cmd.contains(r#"writeLines("say \"hi\"\n", con, sep = "")"#));
        assert!(cmd.contains(r#"cat("SUCCESS: File saved to", "uploads/notes.txt")"#));
    }

    #[test]
    fn test_binary_write_installs_base64enc() {
        let cmd = write_binary_command("uploads/data.bin", "AAEC");
        assert!(cmd.contains("install.packages(\"base64enc\""));
        assert!(cmd.contains(r#"base64decode(what = "AAEC", output = con)"#));
        assert!(cmd.contains(r#"file("uploads/data.bin", "wb")"#));
    }

    #[test]
    fn test_parse_encoded_output() {
        let stdout = "Installing...\n<<<PLOT_BEGIN>>>iVBORw0K\nGgo=<<<PLOT_ENCODED:plot.png>>>\n";
        assert_eq!(
            parse_encoded_output(stdout, "plot.png").as_deref(),
            Some("iVBORw0KGgo=")
        );
    }

    #[test]
    fn test_parse_encoded_output_not_found() {
        let stdout = "\n<<<PLOT_NOT_FOUND:plot.png>>>\n";
        assert_eq!(parse_encoded_output(stdout, "plot.png"), None);
    }

    #[test]
    fn test_encoded_marker_is_filename_specific() {
        let stdout = "<<<PLOT_BEGIN>>>AAAA<<<PLOT_ENCODED:a.png>>>\n";
        assert_eq!(parse_encoded_output(stdout, "b.png"), None);
    }

    #[test]
    fn test_parse_info() {
        let stdout = "R Version: 4.3.1 \nSystem Info: sysname: Linux, release: 6.1 \nInstalled Packages: base (4.3.1), ggplot2 (3.4.4) \n";
        let info = parse_info(stdout);
        assert_eq!(info.r_version.as_deref(), Some("4.3.1"));
        assert_eq!(info.system_info.as_deref(), Some("sysname: Linux, release: 6.1"));
        assert_eq!(
            info.installed_packages,
            Some(vec!["base (4.3.1)".to_string(), "ggplot2 (3.4.4)".to_string()])
        );
        assert!(info.error.is_none());
    }

    #[test]
    fn test_parse_info_missing_lines() {
        let info = parse_info("R Version: 4.4.0\n");
        assert_eq!(info.r_version.as_deref(), Some("4.4.0"));
        assert!(info.system_info.is_none());
        assert!(info.installed_packages.is_none());
    }

    #[test]
    fn test_upload_marker() {
        assert!(upload_succeeded("SUCCESS: File saved to uploads/a.csv"));
        assert!(!upload_succeeded("ERROR: Failed to save file"));
    }
}
