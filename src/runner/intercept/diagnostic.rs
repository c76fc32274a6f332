//! Structured classloader failures and their text rendering.
//!
//! Rendered layout (both codes share it, `Error:` appears only when there is a cause):
//!
//! ```text
//! Exception:
//!     CLASSLOADER-00001: module cannot be loaded
//! Class:
//!     Shop::Cart
//! Method:
//!     new()
//! Error:
//!     Can't locate Shop/Cart.unit in search path (search path contains: lib)
//! Stack:
//!     (eval) [main.script:3]
//!       Shop::checkout() [lib/Shop.unit:9] <== ERROR
//! ```

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::frame::Frame;
use crate::runner::ds::type_name::TypeName;

const INDENT: &str = "    ";
const ERROR_MARK: &str = " <== ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The unit for the type could not be loaded.
    LoadFailed,
    /// The unit loaded but the method is still not there.
    MethodMissing,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::LoadFailed => "CLASSLOADER-00001",
            ErrorCode::MethodMissing => "CLASSLOADER-00002",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::LoadFailed => "module cannot be loaded",
            ErrorCode::MethodMissing => "method does not exist",
        }
    }

    /// Neither failure goes away by trying again.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A classloader failure. Built once at the raise site and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    code: ErrorCode,
    type_name: TypeName,
    method: String,
    cause: Option<String>,
    frames: Vec<Frame>,
}

impl Diagnostic {
    /// `CLASSLOADER-00001`. The cause's trailing ` at <file> line <n>.` is dropped since
    /// the stack already says where things happened.
    pub fn load_failed(
        type_name: TypeName,
        method: &str,
        cause: &dyn Display,
        frames: Vec<Frame>,
    ) -> Self {
        Diagnostic {
            code: ErrorCode::LoadFailed,
            type_name,
            method: method.to_string(),
            cause: Some(strip_location(&cause.to_string())),
            frames,
        }
    }

    /// `CLASSLOADER-00002`.
    pub fn method_missing(type_name: TypeName, method: &str, frames: Vec<Frame>) -> Self {
        Diagnostic {
            code: ErrorCode::MethodMissing,
            type_name,
            method: method.to_string(),
            cause: None,
            frames,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Captured call chain, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "Exception:".to_string(),
            format!("{}{}: {}", INDENT, self.code.code(), self.code.message()),
            "Class:".to_string(),
            format!("{}{}", INDENT, self.type_name),
            "Method:".to_string(),
            format!("{}{}()", INDENT, self.method),
        ];
        if let Some(cause) = &self.cause {
            lines.push("Error:".to_string());
            for line in cause.lines() {
                lines.push(format!("{}{}", INDENT, line));
            }
        }
        lines.push("Stack:".to_string());
        let innermost = self.frames.len().saturating_sub(1);
        for (depth, frame) in self.frames.iter().enumerate() {
            let mark = if depth == innermost { ERROR_MARK } else { "" };
            lines.push(format!(
                "{}{}{}{}",
                INDENT,
                "  ".repeat(depth),
                frame,
                mark
            ));
        }
        lines.join("\n")
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for Diagnostic {}

/// Remove one trailing `" at <file> line <n>."` from an error message.
pub fn strip_location(message: &str) -> String {
    let trimmed = message.trim_end();
    let body = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if let Some(idx) = body.rfind(" at ") {
        if is_location(&body[idx + 4..]) {
            return body[..idx].trim_end().to_string();
        }
    }
    trimmed.to_string()
}

fn is_location(text: &str) -> bool {
    match text.rsplit_once(" line ") {
        Some((file, line)) => {
            !file.trim().is_empty()
                && !line.is_empty()
                && line.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::frame::SourcePos;

    fn t(name: &str) -> TypeName {
        TypeName::parse(name).unwrap()
    }

    #[test]
    fn test_strip_location() {
        assert_eq!(strip_location("boom at lib/Bad.unit line 3."), "boom");
        assert_eq!(strip_location("boom at lib/Bad.unit line 3.\n"), "boom");
        assert_eq!(strip_location("boom at x line 12"), "boom");
        assert_eq!(
            strip_location("look at this mess at main.script line 1."),
            "look at this mess"
        );
        assert_eq!(strip_location("aimed at nothing"), "aimed at nothing");
        assert_eq!(strip_location("no location."), "no location.");
    }

    #[test]
    fn test_render_load_failure() {
        let frames = vec![
            Frame::eval(SourcePos::new("main.script", 3), false),
            Frame::method(t("Shop"), "checkout", SourcePos::new("lib/Shop.unit", 9), false),
        ];
        let d = Diagnostic::load_failed(
            t("Shop::Cart"),
            "new",
            &"Can't locate Shop/Cart.unit in search path (search path contains: lib) at lib/Shop.unit line 9.",
            frames,
        );
        let expected = "\
Exception:
    CLASSLOADER-00001: module cannot be loaded
Class:
    Shop::Cart
Method:
    new()
Error:
    Can't locate Shop/Cart.unit in search path (search path contains: lib)
Stack:
    (eval) [main.script:3]
      Shop::checkout() [lib/Shop.unit:9] <== ERROR";
        assert_eq!(d.render(), expected);
        assert_eq!(d.to_string(), expected);
        assert_eq!(d.code(), ErrorCode::LoadFailed);
    }

    #[test]
    fn test_render_method_missing_has_no_error_section() {
        let frames = vec![
            Frame::eval(SourcePos::new("main.script", 1), false),
            Frame::method(t("A"), "run", SourcePos::new("lib/A.unit", 2), false),
            Frame::method(t("B"), "go", SourcePos::new("lib/B.unit", 7), false),
        ];
        let d = Diagnostic::method_missing(t("Present"), "xxx", frames);
        let expected = "\
Exception:
    CLASSLOADER-00002: method does not exist
Class:
    Present
Method:
    xxx()
Stack:
    (eval) [main.script:1]
      A::run() [lib/A.unit:2]
        B::go() [lib/B.unit:7] <== ERROR";
        assert_eq!(d.render(), expected);
        assert!(d.cause().is_none());
        assert!(!d.code().is_retryable());
    }
}
