//! Handler for `rest <alias> ...`.
//!
//! Aliases are not known to the static command tree. Their arguments arrive
//! raw, the alias is loaded from the store, and a command is generated for it
//! with one `--<param>` flag per parameter the alias references.

use crate::cli::commands::request::send;
use crate::cli::{GlobalArgs, RequestFlags};
use crate::config::manager::{AliasTarget, ServiceManager};
use crate::error::Error;
use crate::invocation::RequestCall;
use crate::output::Output;
use crate::store::default_db_path;
use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Args, Command, FromArgMatches};
use std::collections::BTreeSet;
use std::path::PathBuf;

const DATA_ARG: &str = "data";

fn param_id(param: &str) -> String {
    format!("param:{param}")
}

/// Value of `--long VALUE`, `--long=VALUE` or `-s VALUE` in raw arguments,
/// read before the real parse so the alias can be loaded.
#[must_use]
pub fn scan_flag(args: &[String], long: &str, short: Option<char>) -> Option<String> {
    let long_flag = format!("--{long}");
    let long_eq = format!("--{long}=");
    let short_flag = short.map(|c| format!("-{c}"));

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }
        if let Some(value) = arg.strip_prefix(&long_eq) {
            return Some(value.to_string());
        }
        if *arg == long_flag || short_flag.as_deref() == Some(arg.as_str()) {
            return iter.next().cloned();
        }
    }
    None
}

/// Counts `-v`, `-vv` and `--verbose` in raw arguments.
#[must_use]
pub fn scan_verbosity(args: &[String]) -> u8 {
    let count: usize = args
        .iter()
        .take_while(|arg| *arg != "--")
        .map(|arg| {
            if arg == "--verbose" {
                return 1;
            }
            match arg.strip_prefix('-') {
                Some(rest) if !rest.is_empty() && rest.chars().all(|c| c == 'v') => rest.len(),
                _ => 0,
            }
        })
        .sum();
    u8::try_from(count).unwrap_or(u8::MAX)
}

/// `true` if `switch` appears before any `--`.
#[must_use]
pub fn scan_switch(args: &[String], switch: &str) -> bool {
    args.iter().take_while(|arg| *arg != "--").any(|arg| arg == switch)
}

/// Generates the command for one alias.
///
/// Parameters whose names collide with a built-in flag get no flag of their
/// own; they can still be set with `--parameter NAME=VALUE`.
#[must_use]
pub fn alias_command(target: &AliasTarget) -> Command {
    let alias = &target.alias;
    let request_line = format!("{} {}", alias.method.as_str().to_uppercase(), alias.path);
    let about = alias
        .description
        .clone()
        .unwrap_or_else(|| request_line.clone());

    let mut command = Command::new(alias.name.clone())
        .about(about)
        .after_help(format!("Sends {request_line} to service '{}'.", target.service))
        .arg(
            Arg::new(DATA_ARG)
                .value_name("DATA")
                .help("Request body, replacing the alias's stored data"),
        );
    command = GlobalArgs::augment_args(command);
    command = RequestFlags::augment_args(command);

    let taken: BTreeSet<String> = command
        .get_arguments()
        .filter_map(|arg| arg.get_long().map(str::to_string))
        .chain(["help".to_string()])
        .collect();
    for param in &target.params {
        if taken.contains(param) {
            tracing::debug!(param = %param, "parameter shadows a built-in flag, use --parameter");
            continue;
        }
        command = command.arg(
            Arg::new(param_id(param))
                .long(param.clone())
                .value_name("VALUE")
                .help(format!("Value for the '{param}' parameter"))
                .help_heading("Alias parameters"),
        );
    }
    command
}

/// Turns parsed alias arguments into a request.
///
/// # Errors
///
/// Returns an error if the flags cannot be extracted from `matches`.
pub fn alias_call(target: &AliasTarget, matches: &ArgMatches) -> Result<RequestCall, Error> {
    let flags = RequestFlags::from_arg_matches(matches)
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;

    let mut cli = flags.to_settings();
    for param in &target.params {
        if let Some(value) = matches
            .try_get_one::<String>(&param_id(param))
            .ok()
            .flatten()
        {
            cli.parameters.insert(param.clone(), value.clone());
        }
    }

    let data = matches
        .get_one::<String>(DATA_ARG)
        .cloned()
        .unwrap_or_else(|| target.alias.data.clone());

    Ok(RequestCall {
        service: Some(target.service.clone()),
        method: target.alias.method,
        path: target.alias.path.clone(),
        data,
        alias: Some(target.alias.name.clone()),
        cli,
        no_headers: flags.no_headers,
        no_queries: flags.no_queries,
    })
}

/// Runs `rest <alias> [args...]`. `args[0]` is the alias name.
pub async fn execute_alias_command(global: &GlobalArgs, args: Vec<String>) -> Result<i32, Error> {
    let Some((name, rest)) = args.split_first() else {
        return Err(Error::InvalidArgument("missing alias name".to_string()));
    };

    let service = scan_flag(rest, "service", Some('s'));
    let db = match scan_flag(rest, "db", None)
        .map(PathBuf::from)
        .or_else(|| global.db.clone())
    {
        Some(path) => path,
        None => default_db_path()?,
    };
    let manager = ServiceManager::open(&db)?;
    let target = manager.alias_target(service.as_deref(), name)?;

    let matches = match alias_command(&target)
        .try_get_matches_from(std::iter::once(name.clone()).chain(rest.iter().cloned()))
    {
        Ok(matches) => matches,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => {
            e.print()?;
            return Ok(0);
        }
        Err(e) => {
            return Err(Error::InvalidArgument(format!(
                "invalid arguments for alias '{name}': {e}"
            )))
        }
    };

    let local = GlobalArgs::from_arg_matches(&matches)
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let output = Output::new(
        global.quiet || local.quiet,
        global.json_errors || local.json_errors,
    );
    let call = alias_call(&target, &matches)?;
    send(manager.store(), &output, &call).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::alias::AliasDef;
    use crate::invocation::HttpMethod;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    fn target() -> AliasTarget {
        AliasTarget {
            service: "api".into(),
            alias: AliasDef {
                name: "user".into(),
                description: Some("Fetch a user".into()),
                method: HttpMethod::Get,
                path: "/users/:id".into(),
                data: "{\"stored\":true}".into(),
            },
            params: BTreeSet::from(["id".to_string(), "host".to_string()]),
        }
    }

    fn parse(raw: &[&str]) -> RequestCall {
        let matches = alias_command(&target())
            .try_get_matches_from(std::iter::once("user".to_string()).chain(args(raw)))
            .unwrap();
        alias_call(&target(), &matches).unwrap()
    }

    #[test]
    fn test_scan_flag_forms() {
        let raw = args(&["--id", "1", "-s", "billing", "--db=/tmp/x.db"]);
        assert_eq!(scan_flag(&raw, "service", Some('s')).as_deref(), Some("billing"));
        assert_eq!(scan_flag(&raw, "db", None).as_deref(), Some("/tmp/x.db"));
        assert_eq!(scan_flag(&raw, "host", None), None);
        assert_eq!(scan_flag(&args(&["--", "--db", "x"]), "db", None), None);
    }

    #[test]
    fn test_scan_verbosity() {
        assert_eq!(scan_verbosity(&args(&["-v", "--id", "1", "-vv"])), 3);
        assert_eq!(scan_verbosity(&args(&["--verbose"])), 1);
        assert_eq!(scan_verbosity(&args(&["-x", "-"])), 0);
    }

    #[test]
    fn test_param_flags_fill_cli_parameters() {
        let call = parse(&["--id", "42"]);
        assert_eq!(call.cli.parameters["id"], "42");
        assert_eq!(call.path, "/users/:id");
        assert_eq!(call.alias.as_deref(), Some("user"));
        assert_eq!(call.service.as_deref(), Some("api"));
        assert_eq!(call.data, "{\"stored\":true}");
    }

    #[test]
    fn test_colliding_param_uses_builtin_flag() {
        let call = parse(&["--host", "example.org"]);
        assert_eq!(call.cli.host.as_deref(), Some("example.org"));
        assert!(!call.cli.parameters.contains_key("host"));

        let call = parse(&["--parameter", "host=h1"]);
        assert_eq!(call.cli.parameters["host"], "h1");
    }

    #[test]
    fn test_data_argument_replaces_stored_data() {
        let call = parse(&["{\"new\":1}", "--pretty"]);
        assert_eq!(call.data, "{\"new\":1}");
        assert_eq!(call.cli.pretty, Some(true));
    }

    #[test]
    fn test_help_mentions_description() {
        let help = alias_command(&target()).render_help().to_string();
        assert!(help.contains("Fetch a user"));
        assert!(help.contains("--id"));
        assert!(help.contains("GET /users/:id"));
    }
}
