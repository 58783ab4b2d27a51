//! Pulls DSL regions out of a host source file, blanking everything else so
//! line numbers (and therefore diagnostics) still point at the host file.

/// Delimiter configuration for [`extract`]. Defaults to the symmetric `%%`
/// marker used for both opening and closing a region.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
  pub start: String,
  pub end: String,
}

impl Default for ExtractConfig {
  fn default() -> Self {
    Self {
      start: "%%".to_string(),
      end: "%%".to_string(),
    }
  }
}

impl ExtractConfig {
  pub fn symmetric(delimiter: impl Into<String>) -> Self {
    let delimiter = delimiter.into();
    Self {
      start: delimiter.clone(),
      end: delimiter,
    }
  }

  pub fn asymmetric(start: impl Into<String>, end: impl Into<String>) -> Self {
    Self {
      start: start.into(),
      end: end.into(),
    }
  }
}

/// Extract DSL text from `host`, line by line. The result has exactly as
/// many lines as `host`; every line outside a DSL region (and the
/// delimiter lines themselves) is replaced by an empty line, so that the
/// lexer/parser's line numbers still identify the right place in the host
/// file. A file may contain multiple regions; an unterminated trailing
/// region is implicitly closed at end of file.
pub fn extract(host: &str, config: &ExtractConfig) -> String {
  let mut out = String::with_capacity(host.len());
  let mut inside = false;

  for line in host.lines() {
    let trimmed = line.trim_end_matches('\r');
    if !inside && trimmed == config.start {
      inside = true;
    } else if inside && trimmed == config.end {
      inside = false;
    } else if inside {
      out.push_str(trimmed);
    }
    out.push('\n');
  }

  out
}
