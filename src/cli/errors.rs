//! Error display formatting for the CLI.

use crate::error::Error;

/// Prints an error message, either as JSON or user-friendly format.
pub fn print_error_with_json(error: &Error, json_format: bool) {
    if !json_format {
        print_error(error);
        return;
    }
    let json_error = error.to_json();
    let Ok(json_output) = serde_json::to_string_pretty(&json_error) else {
        print_error(error);
        return;
    };
    eprintln!("{json_output}");
}

fn title(error: &Error) -> &'static str {
    match error {
        Error::Io(_) => "File System Error",
        Error::Network(e) if e.is_connect() => "Connection Error",
        Error::Network(e) if e.is_timeout() => "Timeout Error",
        Error::Network(_) => "Network Error",
        Error::Json(_) => "JSON Parsing Error",
        Error::Store(_) | Error::MalformedDatabase { .. } => "Database Error",
        Error::Url(_) => "URL Error",
        Error::NoServiceSet | Error::NoSuchService { .. } | Error::ServiceExists { .. } => {
            "Service Error"
        }
        Error::NoAlias { .. } | Error::NoAliases => "Alias Error",
        Error::Hook { .. } => "Hook Error",
        Error::Filter { .. } => "Filter Error",
        Error::InvalidPath { .. }
        | Error::NoDestination
        | Error::InvalidName { .. }
        | Error::InvalidMethod { .. }
        | Error::InvalidStoredValue { .. }
        | Error::InvalidArgument(_) => "Error",
    }
}

/// Prints a user-friendly error message with a hint where one helps.
pub fn print_error(error: &Error) {
    let title = title(error);
    match error.to_json().context {
        Some(hint) => eprintln!("{title}\n{error}\n\nHint: {hint}"),
        None => eprintln!("{title}\n{error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(title(&Error::NoServiceSet), "Service Error");
        assert_eq!(title(&Error::NoAliases), "Alias Error");
        assert_eq!(title(&Error::malformed("info")), "Database Error");
        assert_eq!(title(&Error::InvalidArgument("x".into())), "Error");
    }
}
